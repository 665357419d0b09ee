// src/crawl/runner.rs
//! One fetch → dedup → persist cycle.
//!
//! Phases run strictly in order: `Idle → Fetching → Deduplicating → Persisting → Done`,
//! with `Failed` reachable from any step. `BatchRunner::run` never returns an
//! error: every failure is folded into the `RunReport`, which then counts zero
//! new items so the run can simply be re-invoked later.

use chrono::{Local, NaiveDate, Utc};
use metrics::{counter, gauge};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::crawl::fallback::FallbackPolicy;
use crate::crawl::snapshot::{Snapshot, SnapshotSink};
use crate::crawl::store::{SeenState, SeenStore};
use crate::crawl::types::{Item, SourceProvider};
use crate::crawl::{ensure_metrics_described, partition, Partition};
use crate::error::CrawlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Fetching,
    Deduplicating,
    Persisting,
    Done,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Deduplicating => "deduplicating",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the deduplicated batch came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOrigin {
    /// Nothing fetched yet.
    Pending,
    Source,
    Fallback,
    /// Source failed or was empty and no fallback is configured.
    Unavailable,
}

impl BatchOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Source => "source",
            Self::Fallback => "fallback",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_date: NaiveDate,
    pub phase: RunPhase,
    pub origin: BatchOrigin,
    pub total_fetched: usize,
    pub unique_new: usize,
    pub duplicates_skipped: usize,
    pub seen_set_size: usize,
    pub snapshot_path: Option<PathBuf>,
    /// Phase that was active when the run failed.
    pub failed_in: Option<RunPhase>,
    pub error: Option<String>,
}

impl RunReport {
    fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            phase: RunPhase::Idle,
            origin: BatchOrigin::Pending,
            total_fetched: 0,
            unique_new: 0,
            duplicates_skipped: 0,
            seen_set_size: 0,
            snapshot_path: None,
            failed_in: None,
            error: None,
        }
    }

    /// Report for a run that could not even be wired up.
    pub fn failed(run_date: NaiveDate, err: CrawlError) -> Self {
        fail(Self::new(run_date), err)
    }

    pub fn is_success(&self) -> bool {
        self.phase == RunPhase::Done
    }

    /// The run's observable result: new items persisted, zero unless `Done`.
    pub fn new_items(&self) -> usize {
        if self.is_success() {
            self.unique_new
        } else {
            0
        }
    }

    pub fn summary(&self) -> String {
        let day = self.run_date.format("%Y-%m-%d");
        if !self.is_success() {
            return format!(
                "crawl {day} failed in {}: {}; 0 new items",
                self.failed_in.unwrap_or(self.phase),
                self.error.as_deref().unwrap_or("unknown error")
            );
        }
        let mut line = format!(
            "crawl {day}: fetched {} ({}), {} new, {} duplicates skipped",
            self.total_fetched,
            self.origin.as_str(),
            self.unique_new,
            self.duplicates_skipped
        );
        if let Some(p) = &self.snapshot_path {
            line.push_str(&format!(" -> {}", p.display()));
        }
        line
    }
}

pub struct BatchRunner {
    provider: Arc<dyn SourceProvider>,
    fallback: FallbackPolicy,
    store: Arc<dyn SeenStore>,
    sink: Arc<dyn SnapshotSink>,
    run_date: NaiveDate,
}

impl BatchRunner {
    /// Fallback disabled and run date = local today until configured otherwise.
    pub fn new(
        provider: Arc<dyn SourceProvider>,
        store: Arc<dyn SeenStore>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            provider,
            fallback: FallbackPolicy::disabled(),
            store,
            sink,
            run_date: Local::now().date_naive(),
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackPolicy) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_run_date(mut self, run_date: NaiveDate) -> Self {
        self.run_date = run_date;
        self
    }

    pub fn run_date(&self) -> NaiveDate {
        self.run_date
    }

    pub async fn run(&self) -> RunReport {
        ensure_metrics_described();
        let mut report = RunReport::new(self.run_date);
        gauge!("crawl_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

        advance(&mut report, RunPhase::Fetching);
        let batch = self.fetch(&mut report).await;
        report.total_fetched = batch.len();
        counter!("crawl_items_fetched_total").increment(batch.len() as u64);

        advance(&mut report, RunPhase::Deduplicating);
        let loaded = match self.store.load() {
            Ok(s) => s,
            Err(e) => return fail(report, e),
        };
        let part = partition(batch, &loaded.fingerprints, self.run_date);
        report.duplicates_skipped = part.rejected_count;

        advance(&mut report, RunPhase::Persisting);
        if let Err(e) = self.persist(&loaded, part, &mut report) {
            return fail(report, e);
        }

        advance(&mut report, RunPhase::Done);
        counter!("crawl_items_new_total").increment(report.unique_new as u64);
        counter!("crawl_duplicates_total").increment(report.duplicates_skipped as u64);
        gauge!("crawl_seen_set_size").set(report.seen_set_size as f64);

        info!(
            target: "crawl",
            provider = self.provider.name(),
            origin = report.origin.as_str(),
            fetched = report.total_fetched,
            new = report.unique_new,
            duplicates = report.duplicates_skipped,
            seen = report.seen_set_size,
            "crawl run finished"
        );
        report
    }

    async fn fetch(&self, report: &mut RunReport) -> Vec<Item> {
        let reason = match self.provider.fetch_latest().await {
            Ok(items) if !items.is_empty() => {
                report.origin = BatchOrigin::Source;
                return items;
            }
            Ok(_) => "source returned no items".to_string(),
            Err(e) => format!("{e:#}"),
        };
        counter!("crawl_source_errors_total").increment(1);

        match self.fallback.generate(self.run_date) {
            Some(items) => {
                warn!(
                    target: "crawl",
                    provider = self.provider.name(),
                    %reason,
                    generated = items.len(),
                    "no data from source, using fallback batch"
                );
                counter!("crawl_fallback_total").increment(1);
                report.origin = BatchOrigin::Fallback;
                items
            }
            None => {
                let err = CrawlError::SourceUnavailable(reason);
                warn!(
                    target: "crawl",
                    provider = self.provider.name(),
                    error = %err,
                    "continuing with empty batch"
                );
                report.origin = BatchOrigin::Unavailable;
                Vec::new()
            }
        }
    }

    /// Seen-set first, then snapshot. If the snapshot cannot be written the
    /// previous seen-set is put back so those items are offered again next run.
    fn persist(
        &self,
        loaded: &SeenState,
        part: Partition,
        report: &mut RunReport,
    ) -> Result<(), CrawlError> {
        let grew = part.updated_seen.len() > loaded.len();
        let updated = SeenState {
            last_update: Some(self.run_date),
            fingerprints: part.updated_seen,
        };
        if grew {
            self.store.save(&updated, self.run_date)?;
            debug!(
                target: "crawl",
                added = part.accepted.len(),
                total = updated.len(),
                "seen-set saved"
            );
        }
        report.seen_set_size = updated.len();

        if part.accepted.is_empty() {
            return Ok(());
        }

        let snapshot = Snapshot::new(self.run_date, part.accepted);
        match self.sink.store(&snapshot) {
            Ok(path) => {
                info!(
                    target: "crawl",
                    path = %path.display(),
                    count = snapshot.total_count,
                    "snapshot written"
                );
                report.unique_new = snapshot.total_count;
                report.snapshot_path = Some(path);
                Ok(())
            }
            Err(e) => {
                if grew {
                    self.restore(loaded);
                }
                Err(e)
            }
        }
    }

    fn restore(&self, previous: &SeenState) {
        let date = previous.last_update.unwrap_or(self.run_date);
        if let Err(e) = self.store.save(previous, date) {
            warn!(
                target: "crawl",
                error = %e,
                "could not restore previous seen-set; accepted items will not be re-offered"
            );
        }
    }
}

fn advance(report: &mut RunReport, next: RunPhase) {
    debug!(target: "crawl", from = %report.phase, to = %next, "phase");
    report.phase = next;
}

fn fail(mut report: RunReport, err: CrawlError) -> RunReport {
    error!(
        target: "crawl",
        phase = %report.phase,
        kind = err.kind(),
        error = %err,
        "crawl run failed"
    );
    counter!("crawl_runs_failed_total").increment(1);
    report.error = Some(err.to_string());
    report.failed_in = Some(report.phase);
    report.phase = RunPhase::Failed;
    report.unique_new = 0;
    report.snapshot_path = None;
    report
}
