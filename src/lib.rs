pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod scrape;
pub mod services;

pub use cache::{SnapshotCache, SnapshotStore};
pub use config::AppConfig;
pub use domain::{Snapshot, TeamRecord};
pub use error::{RankingsError, Result};
pub use services::{Aggregator, Refresher, Scheduler};
