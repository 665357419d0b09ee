// tests/crawl_dedup.rs
use chrono::NaiveDate;
use dedup_crawler::crawl::fingerprint::fingerprint_fields;
use dedup_crawler::crawl::partition;
use dedup_crawler::{fingerprint, Item};
use std::collections::HashSet;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

#[test]
fn scenario_in_batch_duplicate() {
    let batch = vec![
        Item::new("A1", "T"),
        Item::new("A1", "T"),
        Item::new("A2", "T"),
    ];
    let p = partition(batch, &HashSet::new(), day());

    assert_eq!(p.accepted.len(), 2);
    assert_eq!((p.accepted[0].id.as_str(), p.accepted[0].title.as_str()), ("A1", "T"));
    assert_eq!((p.accepted[1].id.as_str(), p.accepted[1].title.as_str()), ("A2", "T"));
    assert_eq!(p.rejected_count, 1);
    assert_eq!(p.updated_seen.len(), 2);
}

#[test]
fn scenario_already_seen() {
    let seen: HashSet<_> = [fingerprint_fields("A1", "T")].into_iter().collect();
    let p = partition(vec![Item::new("A1", "T")], &seen, day());
    assert!(p.accepted.is_empty());
    assert_eq!(p.rejected_count, 1);
    assert_eq!(p.updated_seen, seen);
}

#[test]
fn scenario_empty_batch() {
    let p = partition(Vec::new(), &HashSet::new(), day());
    assert!(p.accepted.is_empty());
    assert_eq!(p.rejected_count, 0);
    assert!(p.updated_seen.is_empty());
}

#[test]
fn fingerprint_equality_tracks_identifying_fields_only() {
    let mut a = Item::new("BV1", "same title");
    let mut b = Item::new("BV1", "same title");
    a.view_count = Some(1);
    b.view_count = Some(999);
    b.author = Some("other".into());
    assert_eq!(fingerprint(&a), fingerprint(&b));

    let c = Item::new("BV2", "same title");
    assert_ne!(fingerprint(&a), fingerprint(&c));

    // the separator is part of the hashed content
    assert_eq!(
        fingerprint(&Item::new("A1", "T")).as_str(),
        "34ffb7c6e6300c9841b8e3e8d7de7e03ae6761364a67e383f5dfc9615ac3f604"
    );
}

#[test]
fn order_follows_first_occurrence() {
    let batch: Vec<Item> = ["c", "a", "c", "b", "a", "d"]
        .iter()
        .map(|id| Item::new(*id, "t"))
        .collect();
    let p = partition(batch, &HashSet::new(), day());
    let ids: Vec<&str> = p.accepted.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a", "b", "d"]);
    assert_eq!(p.rejected_count, 2);
}
