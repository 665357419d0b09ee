// src/crawl/providers/mod.rs
pub mod json_feed;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::crawl::types::{Item, SourceProvider};

// --- tolerant feed shapes ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedBody {
    Bare(Vec<Value>),
    // `{"run_date", "total_count", "items"}` snapshots land here too
    Wrapped { items: Vec<Value> },
    // older snapshot files, so they can still be replayed as a feed
    Legacy { data: Vec<Value> },
}

/// Parse a JSON feed: a bare array, `{"items": [...]}` or `{"data": [...]}`.
///
/// Records are read one by one; a record that is not an object is skipped
/// with a warning instead of failing the whole batch.
pub fn parse_items(body: &str) -> Result<Vec<Item>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let parsed: FeedBody = serde_json::from_str(trimmed).context("parsing item feed json")?;
    let records = match parsed {
        FeedBody::Bare(v) => v,
        FeedBody::Wrapped { items } => items,
        FeedBody::Legacy { data } => data,
    };

    let total = records.len();
    let items: Vec<Item> = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, raw)| match serde_json::from_value::<Item>(raw) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(target: "crawl", index = idx, error = %e, "skipping feed record");
                None
            }
        })
        .collect();
    if items.len() < total {
        warn!(
            target: "crawl",
            skipped = total - items.len(),
            kept = items.len(),
            "feed had unreadable records"
        );
    }
    Ok(items)
}

/// Used when no source is configured; the run then relies on the fallback policy.
pub struct NullProvider;

#[async_trait]
impl SourceProvider for NullProvider {
    async fn fetch_latest(&self) -> Result<Vec<Item>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_three_shapes() {
        let bare = r#"[{"id": "1", "title": "a"}]"#;
        let snap = r#"{"run_date": "2026-10-18", "total_count": 1, "items": [{"id": "1"}]}"#;
        let legacy = r#"{"crawl_date": "2026-10-18", "data": [{"id": "1"}, {"id": "2"}]}"#;
        assert_eq!(parse_items(bare).unwrap().len(), 1);
        assert_eq!(parse_items(snap).unwrap()[0].id, "1");
        let l = parse_items(legacy).unwrap();
        assert_eq!(l.len(), 2);
        assert_eq!(l[1].title, "");
    }

    #[test]
    fn blank_or_null_is_empty_batch() {
        assert!(parse_items("  ").unwrap().is_empty());
        assert!(parse_items("null").unwrap().is_empty());
    }

    #[test]
    fn unknown_fields_survive() {
        let v = parse_items(r#"[{"id": "1", "title": "a", "bvid": "BV1x", "duration": 30}]"#)
            .unwrap();
        assert_eq!(v[0].extra["bvid"], "BV1x");
        assert_eq!(v[0].extra["duration"], 30);
    }

    #[test]
    fn loosely_typed_records_do_not_sink_the_batch() {
        let feed = r#"[
            {"id": 170001, "title": "numeric id"},
            {"id": "BV2", "title": null},
            {"id": "BV3", "title": "counts as text", "view_count": "1500", "like_count": 2.5},
            {"id": false, "title": "bool id"},
            {"title": "no id"},
            42,
            "not a record",
            {"id": "BV4", "title": "plain"}
        ]"#;
        let items = parse_items(feed).unwrap();
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["170001", "BV2", "BV3", "false", "", "BV4"]);
        assert_eq!(items[1].title, "");
        assert_eq!(items[2].view_count, Some(1500));
        assert_eq!(items[2].like_count, Some(2));
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_items(r#"{"nope": true}"#).is_err());
        assert!(parse_items("<rss/>").is_err());
    }
}
