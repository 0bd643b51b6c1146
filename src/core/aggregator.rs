use futures::{future::join_all, TryStreamExt};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    client::Upstream,
    core::{
        models::{
            detail_cache_key, EventRow, LeaderboardEntry, LeaderboardPage, LocationRow,
            PageCursor, PageQuery, PlayerDetail, Standings,
        },
        registry::{resolve_event, LocationBoard},
    },
    error::LbResult,
    storage::CacheStore,
    throttle::{BatchScheduler, TokenBucket},
    utils::format_time,
};

/// How the per-entry detail lookups of a page are scheduled.
#[derive(Debug, Clone, Copy)]
pub enum FanOut {
    /// All lookups at once, paced only by the token bucket.
    Concurrent,
    /// Fixed-size batches separated by a fixed pause.
    Batched(BatchScheduler),
}

#[derive(Debug, Clone, Copy)]
pub struct AggregatorOptions {
    /// Page size requested from the leaderboard endpoint.
    pub amount_to_fetch: u32,
    pub fan_out: FanOut,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        AggregatorOptions {
            amount_to_fetch: 5,
            fan_out: FanOut::Concurrent,
        }
    }
}

pub type LeaderboardCache = CacheStore<Arc<LeaderboardPage>>;
pub type DetailCache = CacheStore<PlayerDetail>;

/// Turns leaderboard pages and player details into display rows, going through
/// the caches and the rate limiter.
pub struct Aggregator {
    upstream: Arc<dyn Upstream>,
    leaderboards: Arc<LeaderboardCache>,
    details: Arc<DetailCache>,
    limiter: Arc<TokenBucket>,
    options: AggregatorOptions,
}

impl Aggregator {
    pub fn new(
        upstream: Arc<dyn Upstream>,
        leaderboards: Arc<LeaderboardCache>,
        details: Arc<DetailCache>,
        limiter: Arc<TokenBucket>,
        options: AggregatorOptions,
    ) -> Self {
        Aggregator {
            upstream,
            leaderboards,
            details,
            limiter,
            options,
        }
    }

    pub fn leaderboards(&self) -> &LeaderboardCache {
        &self.leaderboards
    }

    pub fn details(&self) -> &DetailCache {
        &self.details
    }

    /// First page of a location leaderboard, with each player's power.
    pub async fn location_leaderboard(
        &self,
        leaderboard_id: &str,
    ) -> LbResult<Standings<LocationRow>> {
        LocationBoard::resolve(leaderboard_id)?;
        let query = PageQuery::first(leaderboard_id, self.options.amount_to_fetch);
        let page = self.page(query).await?;
        self.location_rows(&page).await
    }

    /// Page of a location leaderboard following `cursor`.
    pub async fn location_leaderboard_after(
        &self,
        leaderboard_id: &str,
        cursor: &PageCursor,
    ) -> LbResult<Standings<LocationRow>> {
        LocationBoard::resolve(leaderboard_id)?;
        let query = PageQuery::after(leaderboard_id, self.options.amount_to_fetch, cursor);
        let page = self.page(query).await?;
        self.location_rows(&page).await
    }

    /// First page of an event leaderboard. Events carry no player details.
    pub async fn event_leaderboard(&self, event_id: &str) -> LbResult<Standings<EventRow>> {
        resolve_event(event_id)?;
        let query = PageQuery::first(event_id, self.options.amount_to_fetch);
        let page = self.page(query).await?;

        let rows = page
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| EventRow {
                rank: rank(&page, index),
                name: entry.player_name.clone(),
                score: entry.score,
            })
            .collect();
        Ok(Standings {
            rows,
            fetched_at: page.fetched_at,
        })
    }

    /// Cursor of the page following the cached first page of `leaderboard_id`.
    pub fn next_cursor(&self, leaderboard_id: &str) -> Option<PageCursor> {
        let query = PageQuery::first(leaderboard_id, self.options.amount_to_fetch);
        self.leaderboards
            .get(&query.cache_key())
            .and_then(|page| page.next_cursor())
    }

    async fn page(&self, query: PageQuery) -> LbResult<Arc<LeaderboardPage>> {
        let page = self
            .leaderboards
            .fetch_cached(&query.cache_key(), || async {
                self.upstream.leaderboard_page(&query).await.map(Arc::new)
            })
            .await?;

        if !page.is_rank_ordered() {
            warn!(
                leaderboard = %page.leaderboard_id,
                "Entries are not in rank order, displaying them as received."
            );
        }
        Ok(page)
    }

    async fn location_rows(&self, page: &LeaderboardPage) -> LbResult<Standings<LocationRow>> {
        let entries: Vec<(usize, LeaderboardEntry)> =
            page.entries.iter().cloned().enumerate().collect();
        let task =
            move |(index, entry): (usize, LeaderboardEntry)| self.location_row(page, index, entry);

        let rows: Vec<LocationRow> = match self.options.fan_out {
            FanOut::Concurrent => join_all(entries.into_iter().map(task))
                .await
                .into_iter()
                .collect::<LbResult<Vec<_>>>()?,
            FanOut::Batched(scheduler) => {
                info!(
                    leaderboard = %page.leaderboard_id,
                    entries = entries.len(),
                    batches = scheduler.batches(entries.len()),
                    "Resolving player details in batches."
                );
                scheduler.process(entries, task).try_collect().await?
            }
        };

        Ok(Standings {
            rows,
            fetched_at: page.fetched_at,
        })
    }

    async fn location_row(
        &self,
        page: &LeaderboardPage,
        index: usize,
        entry: LeaderboardEntry,
    ) -> LbResult<LocationRow> {
        let detail = self.player_detail(&page.leaderboard_id, &entry).await?;
        Ok(LocationRow {
            rank: rank(page, index),
            name: entry.player_name,
            time: format_time(entry.score),
            power: detail.power,
        })
    }

    /// Cached detail of the player behind `entry`, refetched when the cached
    /// snapshot was taken at a different score.
    async fn player_detail(
        &self,
        leaderboard_id: &str,
        entry: &LeaderboardEntry,
    ) -> LbResult<PlayerDetail> {
        let key = detail_cache_key(leaderboard_id, &entry.player_id);
        self.details
            .fetch_cached_where(
                &key,
                |cached| cached.score == entry.score,
                || async {
                    info!(
                        player = %entry.player_id,
                        score = entry.score,
                        "Score changed, fetching new player data."
                    );
                    self.limiter.acquire().await;
                    self.upstream
                        .player_detail(leaderboard_id, &entry.player_id)
                        .await
                },
            )
            .await
    }
}

fn rank(page: &LeaderboardPage, index: usize) -> u32 {
    page.start_rank + index as u32 + 1
}
