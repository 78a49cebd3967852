//! Ingest run: mirror recent posts and their comment trees into SQLite,
//! skipping ids already present. All inserts are idempotent, so an
//! interrupted run is resumed by simply re-invoking it.

use crate::archive::FsArchive;
use crate::config::PipelineOptions;
use crate::item::{ContentItem, ItemKind};
use crate::reddit::{RedditClient, POLITENESS_PAUSE};
use crate::store::Store;
use anyhow::{Context, Result};
use std::thread::sleep;
use time::format_description::well_known::Rfc3339;
use time::{Duration as TimeDuration, OffsetDateTime};

#[derive(Clone, Copy, Debug, Default)]
pub struct IngestSummary {
    pub posts_added: u64,
    pub posts_skipped: u64,
    pub comments_added: u64,
    pub comments_skipped: u64,
}

pub fn run_ingest(
    store: &Store,
    client: &RedditClient,
    opts: &PipelineOptions,
    archive: Option<&FsArchive>,
) -> Result<IngestSummary> {
    store.ensure_base_schema()?;

    let mut existing_posts = store.existing_ids(ItemKind::Post)?;
    let mut existing_comments = store.existing_ids(ItemKind::Comment)?;
    tracing::info!(
        subreddit = %opts.subreddit,
        posts = existing_posts.len(),
        comments = existing_comments.len(),
        "existing items in mirror"
    );

    let cutoff_epoch = opts.lookback_days.map(|days| {
        (OffsetDateTime::now_utc() - TimeDuration::days(days as i64)).unix_timestamp()
    });

    let listings = client
        .new_posts(&opts.subreddit, opts.post_limit)
        .with_context(|| format!("fetch r/{} listing", opts.subreddit))?;
    tracing::info!(count = listings.len(), "fetched post listing");

    let mut summary = IngestSummary::default();
    store.begin()?;

    for data in &listings {
        let Some(item) = ContentItem::post_from_listing(data) else {
            tracing::warn!("skipping malformed post listing entry");
            continue;
        };

        // Listings are newest-first, so the first post past the cutoff ends
        // the walk.
        if let Some(cutoff) = cutoff_epoch {
            if item.created_utc() < cutoff {
                break;
            }
        }
        if existing_posts.contains(item.id()) {
            summary.posts_skipped += 1;
            continue;
        }

        let post_id = item.id().to_string();
        match persist(store, archive, &item) {
            Ok(true) => {
                existing_posts.insert(post_id.clone());
                summary.posts_added += 1;
                if summary.posts_added % 10 == 0 {
                    store.commit()?;
                    store.begin()?;
                    tracing::info!(added = summary.posts_added, "posts committed");
                    sleep(POLITENESS_PAUSE);
                }
            }
            Ok(false) => {
                summary.posts_skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(id = %post_id, error = %e, "failed storing post");
                continue;
            }
        }

        if opts.posts_only {
            continue;
        }
        match client.post_comments(&opts.subreddit, &post_id) {
            Ok(nodes) => {
                for node in &nodes {
                    let Some(comment) = ContentItem::comment_from_listing(node) else {
                        continue;
                    };
                    if let Some(cutoff) = cutoff_epoch {
                        if comment.created_utc() < cutoff {
                            continue;
                        }
                    }
                    if existing_comments.contains(comment.id()) {
                        summary.comments_skipped += 1;
                        continue;
                    }
                    match persist(store, archive, &comment) {
                        Ok(true) => {
                            existing_comments.insert(comment.id().to_string());
                            summary.comments_added += 1;
                            if summary.comments_added % 50 == 0 {
                                store.commit()?;
                                store.begin()?;
                                tracing::info!(
                                    added = summary.comments_added,
                                    "comments committed"
                                );
                            }
                        }
                        Ok(false) => summary.comments_skipped += 1,
                        Err(e) => {
                            tracing::warn!(id = %comment.id(), error = %e, "failed storing comment");
                        }
                    }
                }
            }
            Err(e) => {
                // One bad thread never sinks the run.
                tracing::warn!(post = %post_id, error = %e, "failed fetching comment tree");
            }
        }
    }

    store.commit()?;
    tracing::info!(
        posts_added = summary.posts_added,
        posts_skipped = summary.posts_skipped,
        comments_added = summary.comments_added,
        comments_skipped = summary.comments_skipped,
        "ingest complete"
    );
    Ok(summary)
}

/// Insert into the mirror and, when configured, write the raw document
/// through to the archive. Archive failures are logged, never fatal.
fn persist(store: &Store, archive: Option<&FsArchive>, item: &ContentItem) -> Result<bool> {
    let now = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
    let inserted = store.insert_item(item, &now)?;
    if inserted {
        if let Some(archive) = archive {
            if let Err(e) = archive.put(item, &now) {
                tracing::warn!(id = %item.id(), error = %e, "archive write failed");
            }
        }
    }
    Ok(inserted)
}
