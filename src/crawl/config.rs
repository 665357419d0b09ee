// src/crawl/config.rs
use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::crawl::fallback::FallbackPolicy;
use crate::crawl::providers::json_feed::JsonFeedProvider;
use crate::crawl::providers::NullProvider;
use crate::crawl::runner::BatchRunner;
use crate::crawl::snapshot::DirSnapshotSink;
use crate::crawl::store::{CorruptStatePolicy, JsonFileSeenStore};
use crate::crawl::types::SourceProvider;

pub const ENV_CONFIG_PATH: &str = "CRAWLER_CONFIG_PATH";
pub const ENV_DATA_DIR: &str = "CRAWLER_DATA_DIR";
pub const ENV_SOURCE_URL: &str = "CRAWLER_SOURCE_URL";
pub const ENV_FALLBACK: &str = "CRAWLER_FALLBACK";

const DEFAULT_TOML_PATH: &str = "config/crawler.toml";
const DEFAULT_JSON_PATH: &str = "config/crawler.json";

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_seen_file() -> String {
    "crawled_data.json".to_string()
}
fn default_snapshot_prefix() -> String {
    "ai_video_data".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_fallback_count() -> usize {
    100
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    #[default]
    None,
    File {
        path: PathBuf,
    },
    Http {
        url: String,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_fallback_count")]
    pub count: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            count: default_fallback_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Seen-set and snapshots live here.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_seen_file")]
    pub seen_file: String,
    #[serde(default = "default_snapshot_prefix")]
    pub snapshot_prefix: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub fallback: FallbackConfig,
    #[serde(default)]
    pub corrupt_state: CorruptStatePolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            seen_file: default_seen_file(),
            snapshot_prefix: default_snapshot_prefix(),
            source: SourceConfig::default(),
            fallback: FallbackConfig::default(),
            corrupt_state: CorruptStatePolicy::default(),
        }
    }
}

impl CrawlerConfig {
    pub fn seen_path(&self) -> PathBuf {
        self.data_dir.join(&self.seen_file)
    }

    /// Apply `CRAWLER_*` env overrides on top of file values.
    pub fn apply_env(mut self) -> Self {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.trim().is_empty() {
                self.data_dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(url) = std::env::var(ENV_SOURCE_URL) {
            if !url.trim().is_empty() {
                let timeout_secs = match self.source {
                    SourceConfig::Http { timeout_secs, .. } => timeout_secs,
                    _ => default_timeout_secs(),
                };
                self.source = SourceConfig::Http {
                    url: url.trim().to_string(),
                    timeout_secs,
                };
            }
        }
        if let Ok(v) = std::env::var(ENV_FALLBACK) {
            self.fallback.enabled = !matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "off" | "no"
            );
        }
        self
    }

    pub fn provider(&self) -> Arc<dyn SourceProvider> {
        match &self.source {
            SourceConfig::None => Arc::new(NullProvider),
            SourceConfig::File { path } => Arc::new(JsonFeedProvider::from_path(path)),
            SourceConfig::Http { url, timeout_secs } => {
                Arc::new(JsonFeedProvider::from_url(url.clone(), *timeout_secs))
            }
        }
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        if self.fallback.enabled {
            FallbackPolicy::synthetic(self.fallback.count)
        } else {
            FallbackPolicy::disabled()
        }
    }

    /// Wire file store, snapshot directory, provider and fallback for one run.
    pub fn build_runner(&self, run_date: NaiveDate) -> BatchRunner {
        let store = JsonFileSeenStore::new(self.seen_path()).with_policy(self.corrupt_state);
        let sink = DirSnapshotSink::new(&self.data_dir, &self.snapshot_prefix);
        BatchRunner::new(self.provider(), Arc::new(store), Arc::new(sink))
            .with_fallback(self.fallback_policy())
            .with_run_date(run_date)
    }
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<CrawlerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading crawler config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $CRAWLER_CONFIG_PATH
/// 2) config/crawler.toml
/// 3) config/crawler.json
/// 4) built-in defaults
///
/// Env overrides are applied in every case.
pub fn load_config_default() -> Result<CrawlerConfig> {
    let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        load_config_from(&pb)?
    } else if Path::new(DEFAULT_TOML_PATH).exists() {
        load_config_from(Path::new(DEFAULT_TOML_PATH))?
    } else if Path::new(DEFAULT_JSON_PATH).exists() {
        load_config_from(Path::new(DEFAULT_JSON_PATH))?
    } else {
        CrawlerConfig::default()
    };
    Ok(cfg.apply_env())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<CrawlerConfig> {
    let looks_json = s.trim_start().starts_with('{');
    if hint_ext == "json" || (hint_ext != "toml" && looks_json) {
        return serde_json::from_str(s).context("parsing crawler config json");
    }
    toml::from_str(s).context("parsing crawler config toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = parse_config("", "toml").unwrap();
        assert_eq!(cfg, CrawlerConfig::default());
        assert_eq!(cfg.seen_path(), PathBuf::from("./crawled_data.json"));
    }

    #[test]
    fn toml_and_json_forms_parse() {
        let toml = r#"
            data_dir = "data"
            corrupt_state = "fail"

            [source]
            kind = "http"
            url = "http://127.0.0.1:9/feed"

            [fallback]
            enabled = false
        "#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.corrupt_state, CorruptStatePolicy::Fail);
        assert_eq!(
            cfg.source,
            SourceConfig::Http {
                url: "http://127.0.0.1:9/feed".into(),
                timeout_secs: 30
            }
        );
        assert!(!cfg.fallback.enabled);
        assert_eq!(cfg.fallback.count, 100);

        let json = r#"{
            "source": {"kind": "file", "path": "dump.json"},
            "snapshot_prefix": "daily"
        }"#;
        let cfg = parse_config(json, "").unwrap();
        assert_eq!(
            cfg.source,
            SourceConfig::File {
                path: PathBuf::from("dump.json")
            }
        );
        assert_eq!(cfg.snapshot_prefix, "daily");
    }

    #[test]
    fn unknown_source_kind_is_rejected() {
        assert!(parse_config("[source]\nkind = \"ftp\"", "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_DATA_DIR);
        env::remove_var(ENV_SOURCE_URL);
        env::remove_var(ENV_FALLBACK);

        // nothing on disk → defaults
        assert_eq!(load_config_default().unwrap(), CrawlerConfig::default());

        // config/crawler.toml is picked up
        fs::create_dir_all("config").unwrap();
        fs::write(DEFAULT_TOML_PATH, "seen_file = \"seen.json\"").unwrap();
        assert_eq!(load_config_default().unwrap().seen_file, "seen.json");

        // env path wins
        let p_json = tmp.path().join("other.json");
        fs::write(&p_json, r#"{"seen_file": "from-env.json"}"#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p_json.display().to_string());
        assert_eq!(load_config_default().unwrap().seen_file, "from-env.json");

        // dangling env path is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(load_config_default().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }

    #[serial_test::serial]
    #[test]
    fn env_overrides_apply() {
        env::set_var(ENV_DATA_DIR, "/var/lib/crawler");
        env::set_var(ENV_SOURCE_URL, "http://example.test/feed.json");
        env::set_var(ENV_FALLBACK, "false");

        let cfg = CrawlerConfig::default().apply_env();
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/crawler"));
        assert!(matches!(
            cfg.source,
            SourceConfig::Http { ref url, .. } if url == "http://example.test/feed.json"
        ));
        assert!(!cfg.fallback.enabled);
        assert!(!cfg.fallback_policy().enabled);

        env::remove_var(ENV_DATA_DIR);
        env::remove_var(ENV_SOURCE_URL);
        env::remove_var(ENV_FALLBACK);
    }
}
