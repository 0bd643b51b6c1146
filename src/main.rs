use stoneboard::cli::Cli;
use stoneboard::client::stonestory::StoneStory;
use stoneboard::config::Settings;
use stoneboard::core::{
    aggregator::Aggregator,
    display,
    registry::{self, LocationBoard},
    templates::Template,
};
use stoneboard::error::{LbError, LbResult};
use stoneboard::storage::CacheStore;

use chrono::{DateTime, Utc};
use clap::Parser;
use minijinja::context;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = Settings::new(&cli)?;

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(settings.get_trace_level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let aggregator = build_aggregator(&settings)?;

    match cli.watch {
        None => {
            if !render(&aggregator, &cli).await {
                std::process::exit(1);
            }
        }
        Some(seconds) => {
            info!("Refreshing every {seconds}s.");
            let mut interval = tokio::time::interval(Duration::from_secs(seconds.max(1)));
            loop {
                interval.tick().await;
                render(&aggregator, &cli).await;
                info!(
                    pages = aggregator.leaderboards().len(),
                    players = aggregator.details().len(),
                    "Cache state."
                );
            }
        }
    }

    Ok(())
}

fn build_aggregator(settings: &Settings) -> LbResult<Aggregator> {
    let upstream = StoneStory::new(settings.base_url.clone(), settings.api_timeout())?;
    Ok(Aggregator::new(
        Arc::new(upstream),
        Arc::new(CacheStore::with_ttl("leaderboards", settings.leaderboard_ttl())),
        Arc::new(CacheStore::unbounded("details")),
        Arc::new(settings.token_bucket()),
        settings.aggregator_options(),
    ))
}

/// Print the requested leaderboard, or what went wrong. Returns whether it succeeded.
async fn render(aggregator: &Aggregator, cli: &Cli) -> bool {
    match leaderboard_text(aggregator, cli).await {
        Ok(text) => {
            println!("{text}");
            true
        }
        Err(e) => {
            error!("Error fetching data: {e}");
            println!("{}", failure_text(&e));
            false
        }
    }
}

async fn leaderboard_text(aggregator: &Aggregator, cli: &Cli) -> LbResult<String> {
    match &cli.event {
        Some(event_id) => {
            let event = registry::resolve_event(event_id)?;
            let standings = aggregator.event_leaderboard(event_id).await?;
            Template::EventBoard.render(context! {
                title => event.name(),
                timestamp => timestamp(standings.fetched_at),
                table => display::event_table(&standings.rows),
            })
        }
        None => {
            let board = LocationBoard::resolve(&cli.leaderboard)?;
            let mut standings = aggregator.location_leaderboard(&cli.leaderboard).await?;
            if cli.next {
                if let Some(cursor) = aggregator.next_cursor(&cli.leaderboard) {
                    let next = aggregator
                        .location_leaderboard_after(&cli.leaderboard, &cursor)
                        .await?;
                    // Label the combined table with the oldest page.
                    standings.fetched_at = standings.fetched_at.min(next.fetched_at);
                    standings.rows.extend(next.rows);
                }
            }
            Template::LocationBoard.render(context! {
                title => board.title(),
                timestamp => timestamp(standings.fetched_at),
                table => display::location_table(&standings.rows),
            })
        }
    }
}

fn timestamp(fetched_at: DateTime<Utc>) -> String {
    fetched_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn failure_text(e: &LbError) -> String {
    let rendered = match e {
        LbError::NotFound(message) => {
            let (locations, events) = registry::known_ids();
            Template::NotFound.render(context! { message, locations, events })
        }
        _ => Template::Failure.render(context! { message => e.to_string() }),
    };
    rendered.unwrap_or_else(|_| e.to_string())
}
