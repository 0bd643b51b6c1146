use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::{repair::repair, Upstream};
use crate::core::models::{LeaderboardEntry, LeaderboardPage, PageQuery, PlayerDetail};
use crate::error::{LbError, LbResult};

enum Endpoint {
    LeaderboardPage,
    PlayerDetail,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endpoint::LeaderboardPage => write!(f, "/lb/location_get.php"),
            Endpoint::PlayerDetail => write!(f, "/lb/location_player.php"),
        }
    }
}

/// HTTP client for the Stone Story RPG leaderboard API.
pub struct StoneStory {
    http_client: Client,
    base_url: String,
}

impl StoneStory {
    pub fn new(base_url: String, timeout: Duration) -> LbResult<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post(&self, endpoint: &Endpoint, form: &[(&str, String)]) -> LbResult<String> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {url}");

        let response = self.http_client.post(&url).form(form).send().await?;

        match response.status() {
            status if status.is_success() => Ok(response.text().await?),
            status => Err(LbError::Upstream(format!("{url} answered {status}"))),
        }
    }

    /// Parse the body of a leaderboard page response.
    pub fn parse_leaderboard_page(query: &PageQuery, body: &str) -> LbResult<LeaderboardPage> {
        // Response from the leaderboard endpoint.
        // Defined here as it is only used by this function.
        #[derive(Debug, Deserialize)]
        struct LeaderboardResponse {
            entries: Vec<LeaderboardEntry>,
        }

        let parsed = serde_json::from_str::<LeaderboardResponse>(body).map_err(|e| {
            LbError::MalformedResponse {
                raw: body.to_string(),
                repaired: body.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(LeaderboardPage {
            leaderboard_id: query.leaderboard_id.clone(),
            entries: parsed.entries,
            start_rank: query.start_rank,
            fetched_at: Utc::now(),
        })
    }

    /// Repair then parse the body of a player detail response.
    pub fn parse_player_detail(body: &str) -> LbResult<PlayerDetail> {
        let repaired = repair(body);
        serde_json::from_str::<PlayerDetail>(&repaired).map_err(|e| LbError::MalformedResponse {
            raw: body.to_string(),
            repaired,
            reason: e.to_string(),
        })
    }
}

/// Form fields of a leaderboard page request. Unset options are left out.
fn leaderboard_form(query: &PageQuery) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("leaderboard_id", query.leaderboard_id.clone()),
        ("count", query.count.to_string()),
    ];
    if let Some(last_score) = query.last_score {
        form.push(("last_score", last_score.to_string()));
    }
    if let Some(last_player_id) = &query.last_player_id {
        form.push(("last_player_id", last_player_id.clone()));
    }
    form
}

#[async_trait]
impl Upstream for StoneStory {
    async fn leaderboard_page(&self, query: &PageQuery) -> LbResult<LeaderboardPage> {
        info!(
            leaderboard = %query.leaderboard_id,
            count = query.count,
            "Fetching leaderboard page."
        );
        let body = self
            .post(&Endpoint::LeaderboardPage, &leaderboard_form(query))
            .await?;
        StoneStory::parse_leaderboard_page(query, &body)
    }

    async fn player_detail(&self, leaderboard_id: &str, player_id: &str) -> LbResult<PlayerDetail> {
        info!(leaderboard = %leaderboard_id, player = %player_id, "Fetching player detail.");
        let form = [
            ("leaderboard_id", leaderboard_id.to_string()),
            ("player_id", player_id.to_string()),
        ];
        let body = self.post(&Endpoint::PlayerDetail, &form).await?;
        StoneStory::parse_player_detail(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::PageCursor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Local server answering every request with `status` and `body`, or
    /// never answering when `status` is `None`. Returns its base url.
    async fn stub_server(status: Option<&'static str>, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    match status {
                        Some(status) => {
                            let response = format!(
                                "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                                body.len()
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                        }
                        None => tokio::time::sleep(Duration::from_secs(60)).await,
                    }
                });
            }
        });
        format!("http://{addr}")
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let read = socket.read(&mut buf).await.unwrap_or(0);
            if read == 0 {
                return;
            }
            request.extend_from_slice(&buf[..read]);
            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let line = line.to_ascii_lowercase();
                        line.strip_prefix("content-length:")
                            .map(|value| value.trim().parse::<usize>().unwrap_or(0))
                    })
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn error_status_is_an_upstream_error() {
        let base_url = stub_server(Some("503 Service Unavailable"), "").await;
        let client = StoneStory::new(base_url, Duration::from_secs(5)).unwrap();

        let result = client
            .leaderboard_page(&PageQuery::first("rocky_plateau_15", 5))
            .await;

        match result {
            Err(LbError::Upstream(message)) => {
                assert!(message.contains("/lb/location_get.php"), "{message}");
                assert!(message.contains("503"), "{message}");
            }
            other => panic!("expected an upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stalled_server_times_out_as_upstream_error() {
        let base_url = stub_server(None, "").await;
        let client = StoneStory::new(base_url, Duration::from_millis(300)).unwrap();

        let result = client.player_detail("rocky_plateau_15", "xyz").await;

        match result {
            Err(LbError::Upstream(message)) => {
                assert!(message.starts_with("request timed out"), "{message}")
            }
            other => panic!("expected an upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn detail_response_is_repaired_over_http() {
        let base_url = stub_server(Some("200 OK"), "{player_id:xyz,power:42.5,score:930}").await;
        let client = StoneStory::new(base_url, Duration::from_secs(5)).unwrap();

        let detail = client.player_detail("rocky_plateau_15", "xyz").await.unwrap();

        assert_eq!(detail.player_id, "xyz");
        assert_eq!(detail.power, 42.5);
        assert_eq!(detail.score, 930);
    }

    #[test]
    fn leaderboard_form_omits_unset_options() {
        let form = leaderboard_form(&PageQuery::first("rocky_plateau_15", 50));
        assert_eq!(
            form,
            vec![
                ("leaderboard_id", "rocky_plateau_15".to_string()),
                ("count", "50".to_string()),
            ]
        );
    }

    #[test]
    fn leaderboard_form_sends_cursor() {
        let cursor = PageCursor {
            last_score: 5430,
            last_player_id: "p9".to_string(),
            start_rank: 50,
        };
        let form = leaderboard_form(&PageQuery::after("temple_3", 5, &cursor));
        assert!(form.contains(&("last_score", "5430".to_string())));
        assert!(form.contains(&("last_player_id", "p9".to_string())));
        assert_eq!(form.len(), 4);
    }

    #[test]
    fn parses_leaderboard_page() {
        let body = r#"{"entries":[
            {"player_id":"a1","player_name":"Fox","score":930},
            {"player_id":"b2","player_name":"Owl","score":5430}
        ]}"#;
        let query = PageQuery::first("rocky_plateau_15", 2);
        let page = StoneStory::parse_leaderboard_page(&query, body).unwrap();

        assert_eq!(page.leaderboard_id, "rocky_plateau_15");
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[1].player_name, "Owl");
        assert_eq!(page.entries[1].score, 5430);
    }

    #[test]
    fn invalid_leaderboard_page_is_reported() {
        let query = PageQuery::first("rocky_plateau_15", 2);
        let err = StoneStory::parse_leaderboard_page(&query, "<html>").unwrap_err();
        assert!(matches!(err, LbError::MalformedResponse { .. }));
    }

    #[test]
    fn parses_repaired_player_detail() {
        let detail = StoneStory::parse_player_detail(
            "{leaderboard_id:rocky_plateau_15,player_id:xyz,player_name:Mr:Fox,power:42,score:930}",
        )
        .unwrap();

        assert_eq!(detail.player_id, "xyz");
        assert_eq!(detail.power, 42.0);
        assert_eq!(detail.score, 930);
        assert_eq!(detail.extra["player_name"], "Mr:Fox");
    }

    #[test]
    fn unrepairable_detail_keeps_both_payloads() {
        let raw = "{player_id:xyz,power:}";
        match StoneStory::parse_player_detail(raw) {
            Err(LbError::MalformedResponse { raw: r, repaired, .. }) => {
                assert_eq!(r, raw);
                assert_eq!(repaired, r#"{"player_id":"xyz","power":}"#);
            }
            other => panic!("expected a malformed response, got {other:?}"),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = StoneStory::new(
            "https://stonestoryrpg.com/".to_string(),
            Duration::from_secs(10),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://stonestoryrpg.com");
    }
}
