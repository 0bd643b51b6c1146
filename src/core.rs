pub mod aggregator;
pub mod display;
pub mod models;
pub mod registry;
pub mod templates;
