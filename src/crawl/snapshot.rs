// src/crawl/snapshot.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::crawl::store::write_atomic;
use crate::crawl::types::Item;
use crate::error::CrawlError;

/// Items accepted as new by one run. Written once, never touched again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(alias = "crawl_date")]
    pub run_date: NaiveDate,
    pub total_count: usize,
    #[serde(alias = "data")]
    pub items: Vec<Item>,
}

impl Snapshot {
    pub fn new(run_date: NaiveDate, items: Vec<Item>) -> Self {
        Self {
            run_date,
            total_count: items.len(),
            items,
        }
    }
}

pub trait SnapshotSink: Send + Sync {
    /// Persist the snapshot, returning where it landed.
    fn store(&self, snapshot: &Snapshot) -> Result<PathBuf, CrawlError>;
}

/// Writes `<dir>/<prefix>_<YYYY-MM-DD>.json`.
///
/// A second run on the same day never overwrites: it takes the first free
/// `<prefix>_<date>_<n>.json` with n = 2, 3, ...
#[derive(Debug, Clone)]
pub struct DirSnapshotSink {
    dir: PathBuf,
    prefix: String,
}

impl DirSnapshotSink {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        let day = date.format("%Y-%m-%d");
        let base = self.dir.join(format!("{}_{day}.json", self.prefix));
        if !base.exists() {
            return base;
        }
        (2u32..)
            .map(|n| self.dir.join(format!("{}_{day}_{n}.json", self.prefix)))
            .find(|p| !p.exists())
            .unwrap_or(base)
    }
}

impl SnapshotSink for DirSnapshotSink {
    fn store(&self, snapshot: &Snapshot) -> Result<PathBuf, CrawlError> {
        let path = self.path_for(snapshot.run_date);
        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| {
            CrawlError::persistence(&path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        write_atomic(&path, &json)?;
        Ok(path)
    }
}

// --- Test helper ---
#[derive(Debug, Default)]
pub struct MemorySnapshotSink {
    pub stored: Mutex<Vec<Snapshot>>,
    fail: bool,
}

impl MemorySnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotSink for MemorySnapshotSink {
    fn store(&self, snapshot: &Snapshot) -> Result<PathBuf, CrawlError> {
        if self.fail {
            return Err(CrawlError::persistence(
                "<memory>",
                io::Error::other("snapshot sink disabled"),
            ));
        }
        let mut v = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        v.push(snapshot.clone());
        Ok(PathBuf::from(format!("<memory>/{}", v.len())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn writes_dated_file_with_count() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirSnapshotSink::new(tmp.path(), "ai_video_data");
        let snap = Snapshot::new(day(), vec![Item::new("A1", "T"), Item::new("A2", "T")]);

        let path = sink.store(&snap).unwrap();
        assert_eq!(path, tmp.path().join("ai_video_data_2026-10-18.json"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["run_date"], "2026-10-18");
        assert_eq!(raw["total_count"], 2);
        assert_eq!(raw["items"].as_array().unwrap().len(), 2);
        assert!(raw.get("crawl_date").is_none());
        assert!(raw.get("data").is_none());
    }

    #[test]
    fn older_snapshot_keys_still_read() {
        let old = r#"{"crawl_date": "2026-10-18", "total_count": 1, "data": [{"id": "A1"}]}"#;
        let snap: Snapshot = serde_json::from_str(old).unwrap();
        assert_eq!(snap.run_date, day());
        assert_eq!(snap.items[0].id, "A1");
    }

    #[test]
    fn same_day_runs_get_numbered_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirSnapshotSink::new(tmp.path(), "snap");
        let snap = Snapshot::new(day(), vec![Item::new("A1", "T")]);

        let first = sink.store(&snap).unwrap();
        let second = sink.store(&snap).unwrap();
        let third = sink.store(&snap).unwrap();
        assert_eq!(first.file_name().unwrap(), "snap_2026-10-18.json");
        assert_eq!(second.file_name().unwrap(), "snap_2026-10-18_2.json");
        assert_eq!(third.file_name().unwrap(), "snap_2026-10-18_3.json");
    }

    #[test]
    fn creates_missing_output_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirSnapshotSink::new(tmp.path().join("out/daily"), "snap");
        let path = sink.store(&Snapshot::new(day(), vec![Item::new("x", "y")])).unwrap();
        assert!(path.exists());
    }
}
