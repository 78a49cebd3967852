#[path = "common/mod.rs"]
mod common;

use common::*;
use subsift::{compose_context, resolve_parent_text, strip_kind_prefix, PARENT_SEPARATOR};

#[test]
fn strips_type_prefixes() {
    assert_eq!(strip_kind_prefix("t1_abc"), "abc");
    assert_eq!(strip_kind_prefix("t3_xyz"), "xyz");
    assert_eq!(strip_kind_prefix("bare"), "bare");
    assert_eq!(strip_kind_prefix("t1_"), "t1_");
}

#[test]
fn direct_comment_parent_wins_over_thread_root() {
    let store = make_store();
    seed_post(&store, "p1", "bob", DAY1_NOON, "root title", "root body");
    seed_comment(&store, "c1", "alice", DAY1_NOON, "the parent comment", Some("t3_p1"), Some("t3_p1"));

    // Child of c1: its parent id resolves to a comment with a body, so the
    // thread-root post must not be consulted even though it has text too.
    let text = resolve_parent_text(&store, Some("t1_c1"), Some("t3_p1"));
    assert_eq!(text, "the parent comment");
}

#[test]
fn parent_id_pointing_at_a_post_returns_title_and_body() {
    let store = make_store();
    seed_post(&store, "p1", "bob", DAY1_NOON, "root title", "root body");

    let text = resolve_parent_text(&store, Some("t3_p1"), Some("t3_p1"));
    assert_eq!(text, "root title root body");
}

#[test]
fn missing_direct_parent_falls_back_to_thread_root() {
    let store = make_store();
    seed_post(&store, "p1", "bob", DAY1_NOON, "root title", "root body");

    // c9 was never mirrored (deleted at the source).
    let text = resolve_parent_text(&store, Some("t1_c9"), Some("t3_p1"));
    assert_eq!(text, "root title root body");
}

#[test]
fn empty_bodied_parent_comment_is_skipped() {
    let store = make_store();
    seed_post(&store, "p1", "bob", DAY1_NOON, "root title", "root body");
    seed_comment(&store, "c1", "alice", DAY1_NOON, "   ", Some("t3_p1"), Some("t3_p1"));

    let text = resolve_parent_text(&store, Some("t1_c1"), Some("t3_p1"));
    assert_eq!(text, "root title root body");
}

#[test]
fn no_references_resolves_to_empty() {
    let store = make_store();
    assert_eq!(resolve_parent_text(&store, None, None), "");
    assert_eq!(resolve_parent_text(&store, Some("t1_nope"), Some("t3_nope")), "");
}

#[test]
fn context_composition_puts_child_first() {
    let composed = compose_context("child body", "parent text");
    assert_eq!(composed, format!("child body{PARENT_SEPARATOR}parent text"));
    assert!(composed.starts_with("child body"));

    assert_eq!(compose_context("child body", ""), "child body");
}
