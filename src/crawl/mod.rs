// src/crawl/mod.rs
pub mod config;
pub mod fallback;
pub mod fingerprint;
pub mod providers;
pub mod runner;
pub mod snapshot;
pub mod store;
pub mod types;

use chrono::NaiveDate;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;
use std::collections::HashSet;

use crate::crawl::fingerprint::{fingerprint, Fingerprint};
use crate::crawl::types::Item;

/// One-time metrics registration (so series show up before the first increment).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "crawl_items_fetched_total",
            "Items received from the source (or fallback) before dedup."
        );
        describe_counter!(
            "crawl_items_new_total",
            "Items accepted as never seen before."
        );
        describe_counter!(
            "crawl_duplicates_total",
            "Items skipped because their fingerprint was already seen."
        );
        describe_counter!(
            "crawl_source_errors_total",
            "Source fetch errors and empty fetches."
        );
        describe_counter!(
            "crawl_fallback_total",
            "Runs that used the synthetic fallback batch."
        );
        describe_counter!(
            "crawl_runs_failed_total",
            "Runs that ended in the Failed phase."
        );
        describe_histogram!("crawl_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("crawl_seen_set_size", "Fingerprints in the seen-set after a run.");
        describe_gauge!("crawl_last_run_ts", "Unix ts when the crawler last ran.");
    });
}

/// Outcome of splitting one batch against the seen-set.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// New items, input order, stamped with fingerprint and crawl date.
    pub accepted: Vec<Item>,
    /// Every duplicate occurrence, including repeats inside the batch.
    pub rejected_count: usize,
    pub updated_seen: HashSet<Fingerprint>,
}

impl Partition {
    /// Fingerprints added on top of the input set.
    pub fn new_fingerprints(&self) -> usize {
        self.accepted.len()
    }
}

/// Split `batch` into never-seen items and duplicates in a single pass.
/// First occurrence wins; `seen` itself is left untouched.
pub fn partition(
    batch: Vec<Item>,
    seen: &HashSet<Fingerprint>,
    run_date: NaiveDate,
) -> Partition {
    let mut updated_seen = seen.clone();
    let mut accepted = Vec::with_capacity(batch.len());
    let mut rejected_count = 0usize;

    for mut item in batch {
        let fp = fingerprint(&item);
        if updated_seen.contains(&fp) {
            tracing::debug!(target: "crawl", title = %item.title, "skipping duplicate");
            rejected_count += 1;
            continue;
        }
        updated_seen.insert(fp.clone());
        item.fingerprint = Some(fp);
        item.crawl_date = Some(run_date);
        accepted.push(item);
    }

    Partition {
        accepted,
        rejected_count,
        updated_seen,
    }
}
