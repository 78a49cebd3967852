#[path = "common/mod.rs"]
mod common;

use common::*;
use serde_json::json;
use subsift::{ContentItem, StoredRecord};

#[test]
fn listing_post_resolves_into_canonical_fields() {
    let data = listing_post_json("p1", DAY1_NOON);
    let item = ContentItem::post_from_listing(&data).unwrap();
    match &item {
        ContentItem::Post(p) => {
            assert_eq!(p.id, "p1");
            assert_eq!(p.author.as_deref(), Some("alice"));
            assert_eq!(p.created_utc, DAY1_NOON);
            assert_eq!(p.title, "a title");
            assert_eq!(p.selftext, "a body");
            assert_eq!(p.num_comments, Some(2));
        }
        ContentItem::Comment(_) => panic!("expected a post"),
    }
}

#[test]
fn listing_comment_keeps_prefixed_parent_refs() {
    let data = json!({
        "id": "c1",
        "author": "bob",
        "created_utc": DAY1_NOON as f64,
        "subreddit": "testsub",
        "score": 3,
        "body": "reply text",
        "parent_id": "t1_c0",
        "link_id": "t3_p1"
    });
    let item = ContentItem::comment_from_listing(&data).unwrap();
    match &item {
        ContentItem::Comment(c) => {
            assert_eq!(c.parent_id.as_deref(), Some("t1_c0"));
            assert_eq!(c.link_id.as_deref(), Some("t3_p1"));
        }
        ContentItem::Post(_) => panic!("expected a comment"),
    }
}

#[test]
fn malformed_listing_entries_resolve_to_none() {
    // Missing id.
    assert!(ContentItem::post_from_listing(&json!({"created_utc": 1.0})).is_none());
    // Missing created_utc.
    assert!(ContentItem::comment_from_listing(&json!({"id": "c1"})).is_none());
    // Null author is tolerated.
    let data = json!({"id": "p1", "created_utc": DAY1_NOON as f64, "author": null});
    let item = ContentItem::post_from_listing(&data).unwrap();
    assert_eq!(item.author(), None);
}

#[test]
fn stored_record_roundtrips_through_json() {
    let data = listing_post_json("p1", DAY1_NOON);
    let item = ContentItem::post_from_listing(&data).unwrap();
    let record = item.to_stored_record("2024-03-01T12:00:00Z");

    let encoded = serde_json::to_string(&record).unwrap();
    let decoded: StoredRecord = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.id, "p1");
    assert_eq!(decoded.kind, "post");
    assert_eq!(decoded.raw_data.title.as_deref(), Some("a title"));
    assert_eq!(decoded.raw_data.body.as_deref(), Some("a body"));
    assert!(decoded.parent_id.is_none());
}

#[test]
fn degraded_rows_fall_back_to_empty_text() {
    use subsift::{comment_parts, post_text, CommentExtract};

    let extract = post_text("this is not json");
    assert!(extract.is_degraded());
    assert_eq!(extract.into_text(), "");

    assert!(matches!(comment_parts("{broken"), CommentExtract::Degraded));
}
