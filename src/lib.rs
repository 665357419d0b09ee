// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod crawl;
pub mod error;

// ---- Re-exports for stable public API ----
pub use crate::crawl::config::{load_config_default, CrawlerConfig};
pub use crate::crawl::fingerprint::{fingerprint, Fingerprint};
pub use crate::crawl::runner::{BatchRunner, RunPhase, RunReport};
pub use crate::crawl::types::{Item, SourceProvider};
pub use crate::error::CrawlError;

use chrono::Local;

/// Load configuration and run one crawl for local today.
///
/// Configuration problems are reported as a failed run, never as an `Err`:
/// the caller always gets a summary and a count.
pub async fn run_once_from_env() -> RunReport {
    let cfg = match load_config_default() {
        Ok(cfg) => cfg,
        Err(e) => {
            return RunReport::failed(
                Local::now().date_naive(),
                CrawlError::Config(format!("{e:#}")),
            );
        }
    };
    tracing::debug!(target: "crawl", ?cfg, "config loaded");
    cfg.build_runner(Local::now().date_naive()).run().await
}
