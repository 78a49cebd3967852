#[path = "common/mod.rs"]
mod common;

use common::*;
use subsift::{Comment, ContentItem, FsArchive, ItemKind, Post};

fn sample_post(id: &str, created_utc: i64) -> ContentItem {
    ContentItem::Post(Post {
        id: id.to_string(),
        author: Some("alice".to_string()),
        created_utc,
        subreddit: "testsub".to_string(),
        score: 7,
        title: "a title".to_string(),
        selftext: "a body".to_string(),
        url: None,
        permalink: None,
        num_comments: Some(0),
    })
}

#[test]
fn keys_follow_date_type_id_layout() {
    let key = FsArchive::key_for(ItemKind::Post, "abc", DAY1_NOON);
    assert_eq!(key, "raw-data/2024/03/01/post/abc.json");
    let key = FsArchive::key_for(ItemKind::Comment, "xyz", DAY2_NOON);
    assert_eq!(key, "raw-data/2024/03/02/comment/xyz.json");
}

#[test]
fn put_then_query_by_id_author_and_day() {
    let dir = tempfile::tempdir().unwrap();
    let archive = FsArchive::open(dir.path()).unwrap();

    archive.put(&sample_post("p1", DAY1_NOON), "2024-03-01T12:00:00Z").unwrap();
    archive
        .put(
            &ContentItem::Comment(Comment {
                id: "c1".to_string(),
                author: Some("bob".to_string()),
                created_utc: DAY2_NOON,
                subreddit: "testsub".to_string(),
                score: 1,
                body: "hello there".to_string(),
                parent_id: Some("t3_p1".to_string()),
                link_id: Some("t3_p1".to_string()),
            }),
            "2024-03-02T12:00:00Z",
        )
        .unwrap();

    let meta = archive.find_by_id("p1").unwrap().unwrap();
    assert_eq!(meta.kind, "post");
    assert_eq!(meta.title.as_deref(), Some("a title"));

    let by_bob = archive.find_by_author("bob").unwrap();
    assert_eq!(by_bob.len(), 1);
    assert_eq!(by_bob[0].id, "c1");
    assert_eq!(by_bob[0].body_length, "hello there".len());

    let day1 = archive.find_by_day("2024/03/01").unwrap();
    assert_eq!(day1.len(), 1);
    assert_eq!(day1[0].id, "p1");

    assert_eq!(archive.scan().unwrap().len(), 2);
    assert!(archive.find_by_id("missing").unwrap().is_none());
}

#[test]
fn rewriting_an_id_supersedes_its_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let archive = FsArchive::open(dir.path()).unwrap();

    archive.put(&sample_post("p1", DAY1_NOON), "2024-03-01T12:00:00Z").unwrap();
    archive.put(&sample_post("p1", DAY1_NOON), "2024-03-05T09:00:00Z").unwrap();

    // One logical entry, carrying the latest processed_at.
    assert_eq!(archive.scan().unwrap().len(), 1);
    let meta = archive.find_by_id("p1").unwrap().unwrap();
    assert_eq!(meta.processed_at, "2024-03-05T09:00:00Z");

    // The document itself was replaced in place.
    let raw = archive.read_raw(&meta).unwrap();
    assert_eq!(raw.get("timestamp").and_then(|v| v.as_str()), Some("2024-03-05T09:00:00Z"));
}
