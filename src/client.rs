pub mod repair;
pub mod stonestory;

use async_trait::async_trait;

use crate::core::models::{LeaderboardPage, PageQuery, PlayerDetail};
use crate::error::LbResult;

/// Source of leaderboard data. Implementations never retry: failures are
/// returned to the caller as `LbError::Upstream`.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn leaderboard_page(&self, query: &PageQuery) -> LbResult<LeaderboardPage>;

    async fn player_detail(&self, leaderboard_id: &str, player_id: &str) -> LbResult<PlayerDetail>;
}
