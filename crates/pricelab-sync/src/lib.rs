//! Orchestration of catalog synchronization and scrape runs.
//!
//! The engine walks the remote catalog hierarchy and reconciles it into the
//! local store. Failure handling is layered: the initial catalog listing is
//! fatal, a failing catalog or category-product unit is skipped and counted,
//! and every upstream fetch gets a fixed-delay retry before its failure
//! propagates to the skip logic.

pub mod engine;
pub mod error;
mod retry;
pub mod scrape_run;

pub use engine::{SyncEngine, SyncOptions, SyncReport};
pub use error::SyncError;
pub use scrape_run::{run_category_scrape, ScrapeReport};
