//! dedup-crawler — Binary Entrypoint
//! Runs one fetch → dedup → persist cycle and prints the number of new items.
//!
//! Scheduling is external (cron or similar). Invocations must not overlap:
//! the seen-set file has no locking.

use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs to stderr by default; `LOG_FORMAT=json` switches to JSON lines.
/// `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dedup_crawler=info,crawl=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let report = dedup_crawler::run_once_from_env().await;

    println!("{}", report.summary());
    println!("{}", report.new_items());

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
