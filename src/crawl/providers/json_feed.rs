// src/crawl/providers/json_feed.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::histogram;
use std::path::PathBuf;
use std::time::Duration;

use crate::crawl::providers::parse_items;
use crate::crawl::types::{Item, SourceProvider};

/// JSON item feed read from disk (e.g. an external crawler's dump) or over HTTP.
pub struct JsonFeedProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    File(PathBuf),
    Http {
        url: String,
        client: reqwest::Client,
        timeout: Duration,
    },
}

impl JsonFeedProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::File(path.into()),
        }
    }

    pub fn from_url(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client: reqwest::Client::new(),
                timeout: Duration::from_secs(timeout_secs.max(1)),
            },
        }
    }

    fn parse_timed(body: &str) -> Result<Vec<Item>> {
        let t0 = std::time::Instant::now();
        let items = parse_items(body)?;
        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("crawl_parse_ms").record(ms);
        Ok(items)
    }
}

#[async_trait]
impl SourceProvider for JsonFeedProvider {
    async fn fetch_latest(&self) -> Result<Vec<Item>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_timed(s),

            Mode::File(path) => {
                let body = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("reading feed {}", path.display()))?;
                Self::parse_timed(&body)
            }

            Mode::Http {
                url,
                client,
                timeout,
            } => {
                let resp = client
                    .get(url.as_str())
                    .timeout(*timeout)
                    .send()
                    .await
                    .with_context(|| format!("feed http get {url}"))?;
                let status = resp.status();
                if !status.is_success() {
                    anyhow::bail!("feed {url} returned status {status}");
                }
                let body = resp.text().await.context("feed http .text()")?;
                Self::parse_timed(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::File(_) => "json-file",
            Mode::Http { .. } => "json-http",
        }
    }
}
