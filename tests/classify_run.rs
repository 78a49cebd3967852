#[path = "common/mod.rs"]
mod common;

use common::*;
use subsift::{
    run_classification, BatchClassifier, Cutoffs, ModelSpec, PipelineOptions, ThresholdTable,
};

fn fake_spec() -> ModelSpec {
    ModelSpec::custom(
        "fake-model",
        ThresholdTable::new([("bad", Cutoffs { high: 0.50, medium: 0.30 })]),
    )
}

fn quiet_opts() -> PipelineOptions {
    PipelineOptions::default().with_progress(false).with_batch_size(2)
}

#[test]
fn empty_slots_bypass_the_model_and_keep_positions() {
    let fake = FakeModel::new(&[("bad", "toxic")]);
    let batcher = BatchClassifier::new(&fake);

    let out = batcher
        .classify(&["".to_string(), "some toxic text".to_string(), "".to_string()])
        .unwrap();
    assert_eq!(out.len(), 3);
    assert!(out[0].is_all_zero());
    assert!(out[2].is_all_zero());
    assert!(!out[1].is_all_zero());
    assert_eq!(fake.calls.get(), 1);

    // Batching does not alter per-item scores.
    let solo = batcher.classify_one("some toxic text").unwrap();
    assert_eq!(out[1], solo);
}

#[test]
fn all_empty_batch_consumes_no_model_invocation() {
    let fake = FakeModel::new(&[("bad", "toxic")]);
    let batcher = BatchClassifier::new(&fake);

    let out = batcher.classify(&["".to_string(), "   ".to_string()]).unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|s| s.is_all_zero()));
    assert_eq!(fake.calls.get(), 0);
}

#[test]
fn deleted_item_is_persisted_without_scores() {
    let store = make_store();
    seed_post(&store, "p1", "alice", DAY1_NOON, "", "[deleted]");

    let fake = FakeModel::new(&[("bad", "badword")]);
    let spec = fake_spec();
    let summary = run_classification(&store, &fake, &spec, &quiet_opts()).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.classified, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.flagged, 0);

    let cols = vec!["bad".to_string()];
    let row = store.classification("p1", &cols).unwrap().unwrap();
    assert_eq!(row.item_type, "post");
    assert!(row.flags.is_deleted);
    assert!(!row.flags.is_removed);
    assert!(!row.flags.is_empty);
    assert_eq!(row.text_cleaned, "");
    // Score columns stay at their 0.0 default.
    assert_eq!(row.scores, vec![("bad".to_string(), 0.0)]);
}

#[test]
fn deobfuscated_text_scores_identically_to_plain_text() {
    let store = make_store();
    seed_comment(&store, "c1", "alice", DAY1_NOON, "badword here", None, None);
    seed_comment(&store, "c2", "bob", DAY1_NOON, "b@dw0rd here", None, None);

    let fake = FakeModel::new(&[("bad", "badword")]);
    let spec = fake_spec();
    let summary = run_classification(&store, &fake, &spec, &quiet_opts()).unwrap();

    assert_eq!(summary.classified, 2);
    assert_eq!(summary.flagged, 2);

    let cols = vec!["bad".to_string()];
    let plain = store.classification("c1", &cols).unwrap().unwrap();
    let obfuscated = store.classification("c2", &cols).unwrap().unwrap();
    assert_eq!(plain.scores, obfuscated.scores);
    assert!(plain.scores[0].1 > 0.5);

    // The stored cleaned text is pre-deobfuscation.
    assert_eq!(obfuscated.text_cleaned, "b@dw0rd here");
}

#[test]
fn full_run_summary_accounts_for_every_item() {
    let store = make_store();
    seed_post(&store, "p1", "alice", DAY1_NOON, "Calm title", "calm text");
    seed_post(&store, "p2", "bob", DAY1_NOON, "", "[deleted]");
    seed_post(&store, "p3", "carol", DAY1_NOON, "", "");
    seed_comment(&store, "c1", "dave", DAY1_NOON, "badword here", Some("t3_p1"), Some("t3_p1"));
    seed_comment(&store, "c2", "erin", DAY1_NOON, "[removed]", Some("t3_p1"), Some("t3_p1"));

    let fake = FakeModel::new(&[("bad", "badword")]);
    let spec = fake_spec();
    let summary = run_classification(&store, &fake, &spec, &quiet_opts()).unwrap();

    assert_eq!(summary.processed, 5);
    assert_eq!(summary.classified, 2); // p1 and c1
    assert_eq!(summary.skipped, 3); // p2 deleted, p3 empty, c2 removed
    assert_eq!(summary.flagged, 1); // c1
    assert_eq!(summary.degraded, 0);
    assert!((summary.flagged_rate_percent() - 20.0).abs() < 1e-9);

    let cols = vec!["bad".to_string()];
    let p3 = store.classification("p3", &cols).unwrap().unwrap();
    assert!(p3.flags.is_empty);
    let c2 = store.classification("c2", &cols).unwrap().unwrap();
    assert!(c2.flags.is_removed);
    assert_eq!(c2.item_type, "comment");
}

#[test]
fn comment_classification_input_includes_parent_context() {
    let store = make_store();
    // The parent post carries the trigger; the comment itself is innocuous.
    seed_post(&store, "p1", "alice", DAY1_NOON, "badword in title", "root body");
    seed_comment(&store, "c1", "bob", DAY1_NOON, "totally calm reply", Some("t3_p1"), Some("t3_p1"));

    let fake = FakeModel::new(&[("bad", "badword")]);
    let spec = fake_spec();
    run_classification(&store, &fake, &spec, &quiet_opts()).unwrap();

    let cols = vec!["bad".to_string()];
    let row = store.classification("c1", &cols).unwrap().unwrap();
    // Context text flows into the model input...
    assert!(row.scores[0].1 > 0.5);
    // ...and the child body leads the composed cleaned text.
    assert!(row.text_cleaned.starts_with("totally calm reply"));
    assert!(row.text_cleaned.contains("parent: badword in title"));
}

#[test]
fn rerunning_classification_overwrites_rows_idempotently() {
    let store = make_store();
    seed_comment(&store, "c1", "alice", DAY1_NOON, "badword here", None, None);

    let fake = FakeModel::new(&[("bad", "badword")]);
    let spec = fake_spec();
    run_classification(&store, &fake, &spec, &quiet_opts()).unwrap();
    run_classification(&store, &fake, &spec, &quiet_opts()).unwrap();

    let cols = vec!["bad".to_string()];
    let row = store.classification("c1", &cols).unwrap().unwrap();
    assert!(row.scores[0].1 > 0.5);
}
