
pub mod activity;
pub mod activity_log;
pub mod aggregation;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod ingestion;
pub mod transport;

pub use aggregation::{AggregationConfig, AggregationCoordinator};
pub use error::{AggregationError, Result};
