pub mod builder;
pub mod config;
pub mod data;
pub mod demo;
pub mod fetch;
pub mod normalize;
pub mod orchestrator;
pub mod platform;
pub mod record;
pub mod strategy;
pub mod upsert;

mod error;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::CrawlConfig;
pub use data::{Database, Table};
pub use error::CrawlerError;
pub use fetch::{FetchSession, Fetcher, HttpFetcher};
pub use orchestrator::{CrawlReport, Orchestrator, Stage, StageFailure};
pub use platform::Crawler;
pub use record::{Platform, Restaurant, Review};
pub use upsert::{Stored, UpsertGateway};
