use crate::cli::Cli;
use crate::core::aggregator::{AggregatorOptions, FanOut};
use crate::error::{LbError, LbResult};
use crate::throttle::{BatchScheduler, TokenBucket};
use clap::ValueEnum;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

const LOCAL_SETTINGS_YAML_FILE: &str = ".env.local.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FanOutMode {
    /// Every detail lookup of a page at once, paced by the token bucket
    Concurrent,
    /// Detail lookups in fixed-size batches with a pause in between
    Batched,
}

// All settings may be configured via environment variables. Example:
// AMOUNT_TO_FETCH="50" would set amount_to_fetch to 50.
// Command line flags take precedence over the environment, which takes
// precedence over the local yaml file.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_timeout_sec")]
    pub api_timeout_sec: u64,
    #[serde(default = "default_amount_to_fetch")]
    pub amount_to_fetch: u32,
    #[serde(default = "default_leaderboard_ttl_sec")]
    pub leaderboard_ttl_sec: u64,
    // Outbound player detail requests per second
    #[serde(default = "default_rate_limit_capacity")]
    pub rate_limit_capacity: u32,
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,
    #[serde(default = "default_fan_out")]
    pub fan_out: FanOutMode,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

impl Settings {
    pub fn new(cli: &Cli) -> LbResult<Self> {
        let mut figment = Figment::new();
        if Path::new(LOCAL_SETTINGS_YAML_FILE).exists() {
            println!(
                "\n######################################\n\
                   ##   Found '.env.local.yaml' file,  ##\n\
                   ##   loading local configuration.   ##\n\
                   ######################################\n\
                "
            );
            figment = figment.merge(Yaml::file(LOCAL_SETTINGS_YAML_FILE));
        }

        Settings::from_figment(figment.merge(Env::raw()).merge(Serialized::globals(cli)))
    }

    pub fn from_figment(figment: Figment) -> LbResult<Self> {
        let settings: Settings = figment.extract()?;
        if settings.rate_limit_capacity == 0 {
            return Err(LbError::Config(
                "rate_limit_capacity must be at least 1 request per second".to_string(),
            ));
        }
        Ok(settings)
    }

    pub fn get_trace_level(&self) -> Level {
        self.trace_level.parse().unwrap_or(Level::INFO)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_sec)
    }

    pub fn leaderboard_ttl(&self) -> Duration {
        Duration::from_secs(self.leaderboard_ttl_sec)
    }

    pub fn token_bucket(&self) -> TokenBucket {
        TokenBucket::new(self.rate_limit_capacity)
            .with_min_backoff(Duration::from_millis(self.rate_limit_backoff_ms))
    }

    pub fn aggregator_options(&self) -> AggregatorOptions {
        let fan_out = match self.fan_out {
            FanOutMode::Concurrent => FanOut::Concurrent,
            FanOutMode::Batched => FanOut::Batched(BatchScheduler::new(
                self.batch_size,
                Duration::from_millis(self.batch_delay_ms),
            )),
        };
        AggregatorOptions {
            amount_to_fetch: self.amount_to_fetch,
            fan_out,
        }
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_base_url() -> String {
    "https://stonestoryrpg.com".to_string()
}

fn default_api_timeout_sec() -> u64 {
    10
}

fn default_amount_to_fetch() -> u32 {
    5
}

fn default_leaderboard_ttl_sec() -> u64 {
    300
}

fn default_rate_limit_capacity() -> u32 {
    30
}

fn default_rate_limit_backoff_ms() -> u64 {
    50
}

fn default_fan_out() -> FanOutMode {
    FanOutMode::Concurrent
}

fn default_batch_size() -> usize {
    25
}

fn default_batch_delay_ms() -> u64 {
    1000
}
