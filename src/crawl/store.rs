// src/crawl/store.rs
//! Durable seen-set: every fingerprint ever accepted, plus the date it last grew.
//!
//! `load`/`save` are the only mutation points. Business logic never touches the
//! backing file directly. There is no locking: two overlapping runs can lose
//! each other's updates, so invocations must be serialized by the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::crawl::fingerprint::Fingerprint;
use crate::error::CrawlError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenState {
    pub last_update: Option<NaiveDate>,
    pub fingerprints: HashSet<Fingerprint>,
}

impl SeenState {
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

/// What to do when the persisted seen-set cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptStatePolicy {
    /// Warn, move the file aside and continue with an empty set.
    #[default]
    Recover,
    /// Surface `CorruptState` and let the run fail.
    Fail,
}

pub trait SeenStore: Send + Sync {
    /// Missing store ⇒ empty state, not an error.
    fn load(&self) -> Result<SeenState, CrawlError>;
    /// Replace the persisted state wholesale, stamping `date` as last update.
    fn save(&self, state: &SeenState, date: NaiveDate) -> Result<(), CrawlError>;
}

// On-disk shape. `crawled_hashes` is the key older files used.
#[derive(Debug, Serialize, Deserialize)]
struct SeenFile {
    #[serde(default)]
    last_update: Option<NaiveDate>,
    #[serde(default, alias = "crawled_hashes")]
    fingerprints: Vec<Fingerprint>,
}

fn parse_seen(bytes: &[u8]) -> Result<SeenState, serde_json::Error> {
    let file: SeenFile = serde_json::from_slice(bytes)?;
    Ok(SeenState {
        last_update: file.last_update,
        fingerprints: file.fingerprints.into_iter().collect(),
    })
}

/// JSON file backed seen-set.
#[derive(Debug, Clone)]
pub struct JsonFileSeenStore {
    path: PathBuf,
    policy: CorruptStatePolicy,
}

impl JsonFileSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            policy: CorruptStatePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CorruptStatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the unreadable file around so the next save does not bury it.
    fn quarantine(&self) -> Option<PathBuf> {
        let ts = chrono::Utc::now().timestamp();
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".corrupt-{ts}"));
        let target = PathBuf::from(name);
        match fs::rename(&self.path, &target) {
            Ok(()) => Some(target),
            Err(e) => {
                warn!(
                    target: "crawl",
                    error = %e,
                    path = %self.path.display(),
                    "could not move corrupt seen-set aside"
                );
                None
            }
        }
    }
}

impl SeenStore for JsonFileSeenStore {
    fn load(&self) -> Result<SeenState, CrawlError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SeenState::default()),
            Err(e) => return Err(CrawlError::persistence(&self.path, e)),
        };

        match parse_seen(&bytes) {
            Ok(state) => Ok(state),
            Err(source) => {
                let err = CrawlError::CorruptState {
                    path: self.path.clone(),
                    source,
                };
                match self.policy {
                    CorruptStatePolicy::Fail => Err(err),
                    CorruptStatePolicy::Recover => {
                        let moved_to = self.quarantine();
                        warn!(
                            target: "crawl",
                            error = %err,
                            moved_to = ?moved_to,
                            "seen-set unreadable, starting from empty set"
                        );
                        Ok(SeenState::default())
                    }
                }
            }
        }
    }

    fn save(&self, state: &SeenState, date: NaiveDate) -> Result<(), CrawlError> {
        let mut fingerprints: Vec<Fingerprint> = state.fingerprints.iter().cloned().collect();
        fingerprints.sort();
        let file = SeenFile {
            last_update: Some(date),
            fingerprints,
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| {
            CrawlError::persistence(&self.path, io::Error::new(io::ErrorKind::InvalidData, e))
        })?;
        write_atomic(&self.path, &json)
    }
}

/// Write to `<path>.tmp`, then rename over `path`. Creates parent dirs.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CrawlError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| CrawlError::persistence(parent, e))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let res = (|| -> io::Result<()> {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = res {
        let _ = fs::remove_file(&tmp);
        return Err(CrawlError::persistence(path, e));
    }
    Ok(())
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySeenStore {
    state: Mutex<SeenState>,
    fail_saves: bool,
    pub saves: Mutex<Vec<NaiveDate>>,
}

impl MemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: SeenState) -> Self {
        Self {
            state: Mutex::new(state),
            ..Self::default()
        }
    }

    /// Every `save` returns `PersistenceFailure`.
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn state(&self) -> SeenState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl SeenStore for MemorySeenStore {
    fn load(&self) -> Result<SeenState, CrawlError> {
        Ok(self.state())
    }

    fn save(&self, state: &SeenState, date: NaiveDate) -> Result<(), CrawlError> {
        if self.fail_saves {
            return Err(CrawlError::persistence(
                "<memory>",
                io::Error::other("save disabled"),
            ));
        }
        let mut next = state.clone();
        next.last_update = Some(date);
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(date);
        Ok(())
    }
}
