// src/crawl/fallback.rs
//! Substitute batch used when the source comes back empty or errors out.

use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;

use crate::crawl::types::Item;

pub type BatchGenerator = Arc<dyn Fn(NaiveDate) -> Vec<Item> + Send + Sync>;

#[derive(Clone)]
pub struct FallbackPolicy {
    pub enabled: bool,
    pub generator: BatchGenerator,
}

impl fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackPolicy")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl FallbackPolicy {
    pub fn new<F>(generator: F) -> Self
    where
        F: Fn(NaiveDate) -> Vec<Item> + Send + Sync + 'static,
    {
        Self {
            enabled: true,
            generator: Arc::new(generator),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            generator: Arc::new(|_| Vec::new()),
        }
    }

    /// Placeholder batch of `count` videos keyed by date.
    pub fn synthetic(count: usize) -> Self {
        Self::new(move |date| synthetic_batch(date, count))
    }

    /// `None` when disabled.
    pub fn generate(&self, date: NaiveDate) -> Option<Vec<Item>> {
        self.enabled.then(|| (self.generator)(date))
    }
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

pub fn synthetic_batch(date: NaiveDate, count: usize) -> Vec<Item> {
    let compact = date.format("%Y%m%d");
    let month_day = date.format("%m-%d");
    (0..count)
        .map(|i| {
            let mut item = Item::new(
                format!("AI_VIDEO_{compact}_{i}"),
                format!("AI生成图片视频教程 {} - {month_day}", i + 1),
            );
            item.author = Some("AI创作者".to_string());
            item.view_count = Some(1000 + i as u64);
            item.like_count = Some(100 + i as u64);
            item.category = Some("AI图片视频".to_string());
            item
        })
        .collect()
}
