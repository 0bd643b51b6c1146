use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::{fmt::Display, str::FromStr};

/// One ranked line of a leaderboard page, as sent by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub player_name: String,
    /// Frame count for location leaderboards, points for events.
    pub score: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardPage {
    pub leaderboard_id: String,
    pub entries: Vec<LeaderboardEntry>,
    /// Rank of the entry preceding this page (0 for the first page).
    pub start_rank: u32,
    pub fetched_at: DateTime<Utc>,
}

/// Position after which a leaderboard page starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub last_score: u64,
    pub last_player_id: String,
    pub start_rank: u32,
}

/// Parameters of a single leaderboard page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    pub leaderboard_id: String,
    pub count: u32,
    pub last_score: Option<u64>,
    pub last_player_id: Option<String>,
    pub start_rank: u32,
}

/// Player snapshot returned by the detail endpoint. `score` is the score the
/// player had when this snapshot was taken.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlayerDetail {
    pub player_id: String,
    #[serde(deserialize_with = "lenient")]
    pub power: f64,
    #[serde(deserialize_with = "lenient")]
    pub score: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LeaderboardPage {
    /// Cursor to request the page that follows this one. `None` for an empty page.
    pub fn next_cursor(&self) -> Option<PageCursor> {
        self.entries.last().map(|last| PageCursor {
            last_score: last.score,
            last_player_id: last.player_id.clone(),
            start_rank: self.start_rank + self.entries.len() as u32,
        })
    }

    /// The API is trusted to send entries in rank order, ie. with monotonic
    /// scores (ascending for times, descending for points).
    pub fn is_rank_ordered(&self) -> bool {
        let scores = || self.entries.windows(2).map(|w| (w[0].score, w[1].score));
        scores().all(|(a, b)| a <= b) || scores().all(|(a, b)| a >= b)
    }
}

impl PageQuery {
    pub fn first(leaderboard_id: &str, count: u32) -> Self {
        PageQuery {
            leaderboard_id: leaderboard_id.to_string(),
            count,
            last_score: None,
            last_player_id: None,
            start_rank: 0,
        }
    }

    pub fn after(leaderboard_id: &str, count: u32, cursor: &PageCursor) -> Self {
        PageQuery {
            leaderboard_id: leaderboard_id.to_string(),
            count,
            last_score: Some(cursor.last_score),
            last_player_id: Some(cursor.last_player_id.clone()),
            start_rank: cursor.start_rank,
        }
    }

    /// Deterministic key covering every parameter. Serialized as a JSON array so
    /// that separators inside ids cannot make two tuples collide, with unset
    /// options rendered as `null`.
    pub fn cache_key(&self) -> String {
        serde_json::json!([
            self.leaderboard_id,
            self.count,
            self.last_score,
            self.last_player_id,
            self.start_rank
        ])
        .to_string()
    }
}

/// Key of a player detail in the detail cache.
pub fn detail_cache_key(leaderboard_id: &str, player_id: &str) -> String {
    serde_json::json!([leaderboard_id, player_id]).to_string()
}

// Repaired detail payloads quote every value, numbers included.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Native(T),
    Text(String),
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match Lenient::<T>::deserialize(deserializer)? {
        Lenient::Native(value) => Ok(value),
        Lenient::Text(text) => text.trim().parse().map_err(de::Error::custom),
    }
}

/// Display rows of one leaderboard page.
#[derive(Debug, Clone, PartialEq)]
pub struct Standings<R> {
    pub rows: Vec<R>,
    /// When the page was fetched upstream. Cached pages keep their original time.
    pub fetched_at: DateTime<Utc>,
}

/// Row of a location leaderboard, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationRow {
    pub rank: u32,
    pub name: String,
    pub time: String,
    pub power: f64,
}

/// Row of an event leaderboard, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub rank: u32,
    pub name: String,
    pub score: u64,
}
