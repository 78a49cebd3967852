//! Canonical content shapes: the Post/Comment sum type resolved once at
//! ingestion, the stored-record JSON layout, and the explicit
//! success-or-degraded result for pulling text back out of stored rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemKind {
    Post,
    Comment,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Post => "post",
            ItemKind::Comment => "comment",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct Post {
    pub id: String,
    pub author: Option<String>,
    pub created_utc: i64,
    pub subreddit: String,
    pub score: i64,
    pub title: String,
    pub selftext: String,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub num_comments: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub author: Option<String>,
    pub created_utc: i64,
    pub subreddit: String,
    pub score: i64,
    pub body: String,
    /// Direct parent reference with its type prefix intact ("t1_.." or "t3_..").
    pub parent_id: Option<String>,
    /// Thread-root reference, always a post ("t3_..").
    pub link_id: Option<String>,
}

/// A post or comment, resolved from heterogeneous platform JSON into named
/// fields exactly once, at ingestion time.
#[derive(Clone, Debug)]
pub enum ContentItem {
    Post(Post),
    Comment(Comment),
}

impl ContentItem {
    pub fn id(&self) -> &str {
        match self {
            ContentItem::Post(p) => &p.id,
            ContentItem::Comment(c) => &c.id,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ContentItem::Post(_) => ItemKind::Post,
            ContentItem::Comment(_) => ItemKind::Comment,
        }
    }

    pub fn created_utc(&self) -> i64 {
        match self {
            ContentItem::Post(p) => p.created_utc,
            ContentItem::Comment(c) => c.created_utc,
        }
    }

    pub fn author(&self) -> Option<&str> {
        match self {
            ContentItem::Post(p) => p.author.as_deref(),
            ContentItem::Comment(c) => c.author.as_deref(),
        }
    }

    pub fn score(&self) -> i64 {
        match self {
            ContentItem::Post(p) => p.score,
            ContentItem::Comment(c) => c.score,
        }
    }

    /// Resolve one listing child's `data` object into a post. Returns None
    /// when required fields are missing (malformed listings are skipped, not
    /// fatal).
    pub fn post_from_listing(data: &Value) -> Option<ContentItem> {
        let id = data.get("id")?.as_str()?.to_string();
        let created_utc = data.get("created_utc")?.as_f64()? as i64;
        Some(ContentItem::Post(Post {
            id,
            author: author_of(data),
            created_utc,
            subreddit: str_field(data, "subreddit").unwrap_or_default(),
            score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
            title: str_field(data, "title").unwrap_or_default(),
            selftext: str_field(data, "selftext").unwrap_or_default(),
            url: str_field(data, "url"),
            permalink: str_field(data, "permalink"),
            num_comments: data.get("num_comments").and_then(Value::as_i64),
        }))
    }

    /// Resolve one comment-tree node's `data` object into a comment.
    pub fn comment_from_listing(data: &Value) -> Option<ContentItem> {
        let id = data.get("id")?.as_str()?.to_string();
        let created_utc = data.get("created_utc")?.as_f64()? as i64;
        Some(ContentItem::Comment(Comment {
            id,
            author: author_of(data),
            created_utc,
            subreddit: str_field(data, "subreddit").unwrap_or_default(),
            score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
            body: str_field(data, "body").unwrap_or_default(),
            parent_id: str_field(data, "parent_id"),
            link_id: str_field(data, "link_id"),
        }))
    }

    /// Serialize into the stored-record layout persisted in `raw_json`
    /// columns and archive documents. Comment parent references sit at the
    /// top level with type prefixes intact; `raw_data` carries the
    /// platform-native text fields.
    pub fn to_stored_record(&self, timestamp_rfc3339: &str) -> StoredRecord {
        match self {
            ContentItem::Post(p) => StoredRecord {
                id: p.id.clone(),
                kind: "post".to_string(),
                subreddit: p.subreddit.clone(),
                author: p.author.clone(),
                created_utc: p.created_utc,
                timestamp: timestamp_rfc3339.to_string(),
                score: p.score,
                parent_id: None,
                link_id: None,
                raw_data: RawData {
                    title: Some(p.title.clone()),
                    body: Some(p.selftext.clone()),
                    url: p.url.clone(),
                    permalink: p.permalink.clone(),
                    num_comments: p.num_comments,
                },
            },
            ContentItem::Comment(c) => StoredRecord {
                id: c.id.clone(),
                kind: "comment".to_string(),
                subreddit: c.subreddit.clone(),
                author: c.author.clone(),
                created_utc: c.created_utc,
                timestamp: timestamp_rfc3339.to_string(),
                score: c.score,
                parent_id: c.parent_id.clone(),
                link_id: c.link_id.clone(),
                raw_data: RawData {
                    title: None,
                    body: Some(c.body.clone()),
                    url: None,
                    permalink: None,
                    num_comments: None,
                },
            },
        }
    }
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(|s| s.to_string())
}

fn author_of(v: &Value) -> Option<String> {
    // Deleted accounts surface as JSON null or the empty string.
    v.get("author").and_then(Value::as_str).filter(|s| !s.is_empty()).map(|s| s.to_string())
}

/// The JSON document stored in `raw_json` columns and the raw archive.
/// Extra fields on read are ignored; absent fields default.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_utc: i64,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,
    #[serde(default)]
    pub raw_data: RawData,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_comments: Option<i64>,
}

/// Result of pulling classifiable text out of a stored row. Malformed
/// raw JSON degrades to empty text instead of erroring; the pipeline counts
/// degraded rows separately in its summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextExtract {
    Ok(String),
    Degraded,
}

impl TextExtract {
    pub fn is_degraded(&self) -> bool {
        matches!(self, TextExtract::Degraded)
    }

    pub fn into_text(self) -> String {
        match self {
            TextExtract::Ok(t) => t,
            TextExtract::Degraded => String::new(),
        }
    }
}

/// Title + body of a stored post row, space-joined and trimmed.
pub fn post_text(raw_json: &str) -> TextExtract {
    match serde_json::from_str::<StoredRecord>(raw_json) {
        Ok(rec) => {
            let title = rec.raw_data.title.unwrap_or_default();
            let body = rec.raw_data.body.unwrap_or_default();
            TextExtract::Ok(format!("{} {}", title, body).trim().to_string())
        }
        Err(_) => TextExtract::Degraded,
    }
}

/// Body of a stored comment row plus its top-level parent references.
pub fn comment_parts(raw_json: &str) -> CommentExtract {
    match serde_json::from_str::<StoredRecord>(raw_json) {
        Ok(rec) => CommentExtract::Ok {
            body: rec.raw_data.body.unwrap_or_default(),
            parent_id: rec.parent_id,
            link_id: rec.link_id,
        },
        Err(_) => CommentExtract::Degraded,
    }
}

/// Comment flavor of [`TextExtract`], carrying the parent references needed
/// for context resolution alongside the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommentExtract {
    Ok { body: String, parent_id: Option<String>, link_id: Option<String> },
    Degraded,
}

impl CommentExtract {
    pub fn is_degraded(&self) -> bool {
        matches!(self, CommentExtract::Degraded)
    }
}
