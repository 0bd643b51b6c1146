use clap::Parser;
use serde::Serialize;

use crate::config::FanOutMode;

#[derive(Debug, Parser, Serialize)]
#[command(about = "Browse Stone Story RPG leaderboards.")]
pub struct Cli {
    /// Location leaderboard id, eg. rocky_plateau_15
    #[arg(default_value = "rocky_plateau_15")]
    #[serde(skip)]
    pub leaderboard: String,

    /// Show this event leaderboard instead of a location
    #[arg(long)]
    #[serde(skip)]
    pub event: Option<String>,

    /// Also show the page following the first one
    #[arg(long)]
    #[serde(skip)]
    pub next: bool,

    /// Render again every N seconds, going through the caches
    #[arg(long, value_name = "SECONDS")]
    #[serde(skip)]
    pub watch: Option<u64>,

    /// Entries requested per leaderboard page
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_to_fetch: Option<u32>,

    /// How player details of a page are fetched
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fan_out: Option<FanOutMode>,
}
