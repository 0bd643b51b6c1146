use crate::core::models::{EventRow, LocationRow};
use itertools::Itertools;

// Display location leaderboard rows
pub fn location_table(rows: &[LocationRow]) -> String {
    // the width of the maximum rank to be displayed
    let width_rank = rows
        .iter()
        .map(|row| row.rank.to_string().len())
        .max()
        .unwrap_or_default();

    // the length of the longest name
    let width_name = rows
        .iter()
        .map(|row| row.name.chars().count())
        .max()
        .unwrap_or_default();

    let width_time = rows
        .iter()
        .map(|row| row.time.len())
        .max()
        .unwrap_or_default();

    rows.iter()
        .map(|row| {
            format!(
                "{:>width_rank$}) {:<width_name$}  {:>width_time$}  ⚡{}",
                row.rank, row.name, row.time, row.power
            )
        })
        .join("\n")
}

// Display event leaderboard rows
pub fn event_table(rows: &[EventRow]) -> String {
    let width_rank = rows
        .iter()
        .map(|row| row.rank.to_string().len())
        .max()
        .unwrap_or_default();

    let width_name = rows
        .iter()
        .map(|row| row.name.chars().count())
        .max()
        .unwrap_or_default();

    rows.iter()
        .map(|row| {
            format!(
                "{:>width_rank$}) {:<width_name$}  {}",
                row.rank, row.name, row.score
            )
        })
        .join("\n")
}
