// src/crawl/fingerprint.rs
//! Content fingerprints: SHA-256 over `"{id}_{title}"`, rendered as lowercase hex.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::crawl::types::Item;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub fn fingerprint_fields(id: &str, title: &str) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(b"_");
    hasher.update(title.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Fingerprint(out)
}

pub fn fingerprint(item: &Item) -> Fingerprint {
    fingerprint_fields(&item.id, &item.title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_fields_same_digest() {
        let a = Item::new("A1", "T");
        let mut b = Item::new("A1", "T");
        b.author = Some("someone else".into());
        b.view_count = Some(42);
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&a));
    }

    #[test]
    fn different_fields_differ() {
        let base = fingerprint_fields("A1", "T");
        assert_ne!(base, fingerprint_fields("A2", "T"));
        assert_ne!(base, fingerprint_fields("A1", "T2"));
    }

    #[test]
    fn digest_is_sha256_of_joined_fields() {
        // sha256("_") — both fields empty
        assert_eq!(
            fingerprint_fields("", "").as_str(),
            "d2e2adf7177b7a8afddbc12d1634cf23ea1a71020f6a1308070a16400fb68fde"
        );
        let fp = fingerprint_fields("BV1", "标题");
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn missing_fields_are_empty_strings() {
        let item: Item = serde_json::from_str(r#"{"author": "x"}"#).unwrap();
        assert_eq!(fingerprint(&item), fingerprint_fields("", ""));
    }
}
