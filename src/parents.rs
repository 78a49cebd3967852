//! Parent-context resolution: find the nearest available ancestor text for a
//! comment so the classifier sees the thread it is replying into.

use crate::store::Store;

/// Marker separating a comment's own body from its parent context in the
/// composed classifier input. The child comes first so model-side truncation
/// drops the context before the comment under evaluation.
pub const PARENT_SEPARATOR: &str = "\n\nPARENT: ";

/// Drop a "t1_"/"t3_" style type prefix, leaving the bare item id.
pub fn strip_kind_prefix(id: &str) -> &str {
    match id.split_once('_') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => id,
    }
}

/// Best-available ancestor text for a comment, or empty when none is found.
///
/// A direct parent reference is ambiguous between comment and post without
/// its type tag, so both are probed, comment first (comments are by far the
/// more common direct parent). When the immediate parent is missing from the
/// mirror (deleted at the source, or simply never fetched), the thread-root
/// post still provides topical context.
pub fn resolve_parent_text(
    store: &Store,
    parent_id: Option<&str>,
    link_id: Option<&str>,
) -> String {
    if parent_id.is_none() && link_id.is_none() {
        return String::new();
    }

    if let Some(pid) = parent_id.map(strip_kind_prefix) {
        match store.comment_body(pid) {
            Ok(Some(body)) => return body,
            Ok(None) => {}
            Err(e) => tracing::debug!(id = pid, error = %e, "parent comment lookup failed"),
        }
        match store.post_text(pid) {
            Ok(Some(text)) => return text,
            Ok(None) => {}
            Err(e) => tracing::debug!(id = pid, error = %e, "parent post lookup failed"),
        }
    }

    if let Some(lid) = link_id.map(strip_kind_prefix) {
        match store.post_text(lid) {
            Ok(Some(text)) => return text,
            Ok(None) => {}
            Err(e) => tracing::debug!(id = lid, error = %e, "thread-root lookup failed"),
        }
    }

    String::new()
}

/// Compose the text to classify for a comment: own body first, then the
/// parent context behind the separator. Empty context yields the bare body.
pub fn compose_context(body: &str, parent: &str) -> String {
    if parent.is_empty() {
        body.trim().to_string()
    } else {
        format!("{}{}{}", body, PARENT_SEPARATOR, parent).trim().to_string()
    }
}
