// Shared fixtures; not every test binary exercises every helper.
#![allow(dead_code)]

use anyhow::Result;
use serde_json::json;
use subsift::{Comment, ContentItem, Post, Store, TextClassifier};

/// Fresh in-memory mirror with the base schema applied.
pub fn make_store() -> Store {
    let store = Store::open_in_memory().unwrap();
    store.ensure_base_schema().unwrap();
    store
}

/// Insert a post row the way ingestion would.
pub fn seed_post(store: &Store, id: &str, author: &str, created_utc: i64, title: &str, body: &str) {
    let item = ContentItem::Post(Post {
        id: id.to_string(),
        author: Some(author.to_string()),
        created_utc,
        subreddit: "testsub".to_string(),
        score: 1,
        title: title.to_string(),
        selftext: body.to_string(),
        url: None,
        permalink: None,
        num_comments: None,
    });
    assert!(store.insert_item(&item, "2024-03-01T00:00:00Z").unwrap());
}

/// Insert a comment row; parent references carry their type prefixes,
/// e.g. ("t1_c1", "t3_p1").
pub fn seed_comment(
    store: &Store,
    id: &str,
    author: &str,
    created_utc: i64,
    body: &str,
    parent_id: Option<&str>,
    link_id: Option<&str>,
) {
    let item = ContentItem::Comment(Comment {
        id: id.to_string(),
        author: Some(author.to_string()),
        created_utc,
        subreddit: "testsub".to_string(),
        score: 1,
        body: body.to_string(),
        parent_id: parent_id.map(|s| s.to_string()),
        link_id: link_id.map(|s| s.to_string()),
    });
    assert!(store.insert_item(&item, "2024-03-01T00:00:00Z").unwrap());
}

/// Deterministic stand-in for a loaded model: each label scores high when
/// its trigger substring appears in the input, low otherwise. Counts calls
/// so batching behavior is observable.
pub struct FakeModel {
    labels: Vec<String>,
    triggers: Vec<(String, String)>,
    pub calls: std::cell::Cell<usize>,
}

impl FakeModel {
    pub fn new(rules: &[(&str, &str)]) -> Self {
        Self {
            labels: rules.iter().map(|(l, _)| l.to_string()).collect(),
            triggers: rules.iter().map(|(l, t)| (l.to_string(), t.to_string())).collect(),
            calls: std::cell::Cell::new(0),
        }
    }
}

impl TextClassifier for FakeModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.set(self.calls.get() + 1);
        Ok(texts
            .iter()
            .map(|t| {
                self.triggers
                    .iter()
                    .map(|(_, trigger)| if t.contains(trigger.as_str()) { 0.95 } else { 0.05 })
                    .collect()
            })
            .collect())
    }
}

// Epoch timestamps inside two distinct UTC days, for day-bucketing tests.
pub const DAY1_NOON: i64 = 1_709_294_400; // 2024-03-01 12:00:00 UTC
pub const DAY2_NOON: i64 = 1_709_380_800; // 2024-03-02 12:00:00 UTC

pub fn listing_post_json(id: &str, created_utc: i64) -> serde_json::Value {
    json!({
        "id": id,
        "author": "alice",
        "created_utc": created_utc as f64,
        "subreddit": "testsub",
        "score": 10,
        "title": "a title",
        "selftext": "a body",
        "url": "https://example.com/x",
        "permalink": "/r/testsub/comments/x",
        "num_comments": 2
    })
}
