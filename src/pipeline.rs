//! Classification run: walk every stored post and comment, normalize,
//! resolve comment context, score in batches, apply thresholds and upsert
//! one classification row per item. Interruptions are safe to resume by
//! re-running: every write is an upsert keyed by item id.

use crate::classifier::{BatchClassifier, Scores, TextClassifier};
use crate::clean::clean_text;
use crate::config::{ModelSpec, PipelineOptions};
use crate::deobfuscate::deobfuscate;
use crate::flag::evaluate;
use crate::item::{comment_parts, post_text, CommentExtract, ItemKind};
use crate::parents::{compose_context, resolve_parent_text};
use crate::progress::make_count_progress;
use crate::store::{ClassificationRow, Store};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Identity terms watched by review telemetry: items mentioning one of these
/// while scoring under the review label's high cutoff are logged for a human
/// pass, since they are where model misses hurt the most.
const PROTECTED_TERMS: &[&str] = &[
    "black", "asian", "white", "latino", "muslim", "jew", "jewish", "christian", "arab",
    "indian", "gay", "trans", "lgbt", "women", "female", "male", "immigrant", "chinese",
    "korean", "mexican", "african", "hispanic", "queer", "lesbian", "turk", "armenian",
];

#[derive(Clone, Copy, Debug, Default)]
pub struct RunSummary {
    /// Items walked, classified or not.
    pub processed: u64,
    /// Items that went through the model.
    pub classified: u64,
    pub flagged: u64,
    /// Deleted/removed/empty items persisted without classification.
    pub skipped: u64,
    /// Items whose stored record failed to parse and degraded to empty text.
    pub degraded: u64,
}

impl RunSummary {
    pub fn flagged_rate_percent(&self) -> f64 {
        if self.processed == 0 {
            0.0
        } else {
            100.0 * self.flagged as f64 / self.processed as f64
        }
    }
}

/// One item waiting for the next inference batch.
struct Pending {
    id: String,
    kind: ItemKind,
    cleaned: String,
    input: String,
}

pub fn run_classification(
    store: &Store,
    model: &dyn TextClassifier,
    spec: &ModelSpec,
    opts: &PipelineOptions,
) -> Result<RunSummary> {
    let label_cols = store.ensure_classification_schema(model.labels())?;
    let batcher = BatchClassifier::new(model);

    let posts = store.posts()?;
    let comments = store.comments()?;
    tracing::info!(posts = posts.len(), comments = comments.len(), "starting classification");

    let total = (posts.len() + comments.len()) as u64;
    let pb = opts.progress.then(|| make_count_progress(total, "Classifying"));

    let mut summary = RunSummary::default();
    let mut queue: Vec<Pending> = Vec::with_capacity(opts.batch_size);
    let mut ready: Vec<ClassificationRow> = Vec::new();

    for row in &posts {
        let extract = post_text(&row.raw_json);
        if extract.is_degraded() {
            summary.degraded += 1;
        }
        let cleaned = clean_text(&extract.into_text());
        step(&mut summary, &pb, opts);

        if cleaned.flags.skip_classification() {
            summary.skipped += 1;
            ready.push(skip_row(&row.id, ItemKind::Post, cleaned.text, cleaned.flags));
        } else {
            let input = deobfuscate(&cleaned.text);
            queue.push(Pending { id: row.id.clone(), kind: ItemKind::Post, cleaned: cleaned.text, input });
        }
        maybe_flush(store, &batcher, spec, opts, &label_cols, &mut queue, &mut ready, &mut summary)?;
    }

    for row in &comments {
        let (body, parent_id, link_id) = match comment_parts(&row.raw_json) {
            CommentExtract::Ok { body, parent_id, link_id } => (body, parent_id, link_id),
            CommentExtract::Degraded => {
                summary.degraded += 1;
                (String::new(), None, None)
            }
        };

        // Markers are detected on the comment's own body, before any parent
        // context is attached.
        let body_clean = clean_text(&body);
        step(&mut summary, &pb, opts);

        if body_clean.flags.skip_classification() {
            summary.skipped += 1;
            ready.push(skip_row(&row.id, ItemKind::Comment, body_clean.text, body_clean.flags));
        } else {
            let parent = resolve_parent_text(store, parent_id.as_deref(), link_id.as_deref());
            let cleaned = clean_text(&compose_context(&body, &parent));
            if cleaned.flags.skip_classification() {
                summary.skipped += 1;
                ready.push(skip_row(&row.id, ItemKind::Comment, cleaned.text, cleaned.flags));
            } else {
                let input = deobfuscate(&cleaned.text);
                queue.push(Pending {
                    id: row.id.clone(),
                    kind: ItemKind::Comment,
                    cleaned: cleaned.text,
                    input,
                });
            }
        }
        maybe_flush(store, &batcher, spec, opts, &label_cols, &mut queue, &mut ready, &mut summary)?;
    }

    flush(store, &batcher, spec, &label_cols, &mut queue, &mut ready, &mut summary)?;

    if let Some(pb) = &pb {
        pb.finish_with_message("Classifying done");
    }
    tracing::info!(
        processed = summary.processed,
        classified = summary.classified,
        flagged = summary.flagged,
        skipped = summary.skipped,
        degraded = summary.degraded,
        flagged_rate = format!("{:.1}%", summary.flagged_rate_percent()),
        "classification complete"
    );
    Ok(summary)
}

fn step(summary: &mut RunSummary, pb: &Option<ProgressBar>, opts: &PipelineOptions) {
    summary.processed += 1;
    if let Some(pb) = pb {
        pb.inc(1);
    }
    if summary.processed % opts.log_every == 0 {
        tracing::debug!(processed = summary.processed, "progress");
    }
}

fn skip_row(
    id: &str,
    kind: ItemKind,
    text_cleaned: String,
    flags: crate::clean::CleanFlags,
) -> ClassificationRow {
    ClassificationRow {
        id: id.to_string(),
        kind,
        text_cleaned,
        flags,
        scores: Vec::new(),
        timestamp: now_rfc3339(),
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

fn maybe_flush(
    store: &Store,
    batcher: &BatchClassifier<'_>,
    spec: &ModelSpec,
    opts: &PipelineOptions,
    label_cols: &[String],
    queue: &mut Vec<Pending>,
    ready: &mut Vec<ClassificationRow>,
    summary: &mut RunSummary,
) -> Result<()> {
    // Flush on a full inference batch, or when skip rows alone have piled up
    // enough to warrant a commit.
    if queue.len() >= opts.batch_size || ready.len() >= opts.batch_size * 8 {
        flush(store, batcher, spec, label_cols, queue, ready, summary)?;
    }
    Ok(())
}

/// Score the queued batch, apply thresholds and telemetry, and commit the
/// accumulated rows in one short transaction.
fn flush(
    store: &Store,
    batcher: &BatchClassifier<'_>,
    spec: &ModelSpec,
    label_cols: &[String],
    queue: &mut Vec<Pending>,
    ready: &mut Vec<ClassificationRow>,
    summary: &mut RunSummary,
) -> Result<()> {
    if !queue.is_empty() {
        let inputs: Vec<String> = queue.iter().map(|p| p.input.clone()).collect();
        let batch_scores = batcher.classify(&inputs).context("batch classification")?;
        let timestamp = now_rfc3339();

        for (pending, scores) in queue.drain(..).zip(batch_scores) {
            summary.classified += 1;
            let flag = evaluate(&scores, &spec.thresholds);
            review_telemetry(spec, &pending, &scores);
            if flag.is_flagged {
                summary.flagged += 1;
                tracing::info!(
                    id = %pending.id,
                    kind = %pending.kind,
                    reason = %flag.reason_string(),
                    "flagged"
                );
            }
            let score_cols = label_cols
                .iter()
                .zip(scores.iter())
                .map(|(col, (_, s))| (col.clone(), s))
                .collect();
            ready.push(ClassificationRow {
                id: pending.id,
                kind: pending.kind,
                text_cleaned: pending.cleaned,
                flags: Default::default(),
                scores: score_cols,
                timestamp: timestamp.clone(),
            });
        }
    }

    if !ready.is_empty() {
        store.begin()?;
        for row in ready.drain(..) {
            store.upsert_classification(&row)?;
        }
        store.commit()?;
    }
    Ok(())
}

/// Borderline and protected-term telemetry around the review label, kept from
/// the deployed system: these log lines feed the manual review queue.
fn review_telemetry(spec: &ModelSpec, pending: &Pending, scores: &Scores) {
    let Some(cutoffs) = spec.thresholds.get(&spec.review_label) else {
        return;
    };
    let score = scores.get(&spec.review_label).unwrap_or(0.0);
    let snippet: String = pending.cleaned.chars().take(160).collect();

    if score >= spec.borderline_floor && score < cutoffs.high {
        tracing::info!(
            id = %pending.id,
            label = %spec.review_label,
            score = format!("{score:.2}"),
            text = %snippet,
            "borderline"
        );
    }
    if score < cutoffs.high && PROTECTED_TERMS.iter().any(|w| pending.cleaned.contains(w)) {
        tracing::info!(
            id = %pending.id,
            label = %spec.review_label,
            score = format!("{score:.2}"),
            text = %snippet,
            "protected term present but under cutoff"
        );
    }
}
