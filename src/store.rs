//! SQLite mirror of the subreddit: base `posts`/`comments` tables keyed by id
//! with the full stored record in `raw_json`, one classification table with a
//! REAL column per active model label, and two daily topic-mention tables.
//!
//! The database may be read by other local processes while a run writes, so
//! connections open in WAL mode with a busy timeout, and bulk writers commit
//! in short periodic transactions rather than one giant one.

use crate::clean::CleanFlags;
use crate::item::{ContentItem, ItemKind, StoredRecord};
use crate::parents::strip_kind_prefix;
use crate::util::sanitize_label;
use ahash::AHashSet;
use anyhow::{bail, Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

pub struct Store {
    conn: Connection,
}

/// One base-table row as the pipeline consumes it.
#[derive(Clone, Debug)]
pub struct ItemRow {
    pub id: String,
    pub raw_json: String,
    pub created_utc: Option<i64>,
}

/// A classification row ready to upsert. `scores` pairs sanitized column
/// names with values and is empty for skip rows (deleted/removed/empty).
#[derive(Clone, Debug)]
pub struct ClassificationRow {
    pub id: String,
    pub kind: ItemKind,
    pub text_cleaned: String,
    pub flags: CleanFlags,
    pub scores: Vec<(String, f32)>,
    pub timestamp: String,
}

/// Readback shape used by consumers and tests.
#[derive(Clone, Debug)]
pub struct StoredClassification {
    pub item_type: String,
    pub text_cleaned: String,
    pub flags: CleanFlags,
    pub scores: Vec<(String, f64)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicDailyRow {
    pub day: String,
    pub term: String,
    pub count: u64,
    pub total_items: u64,
    pub rate_per_1k: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TopicCatDailyRow {
    pub day: String,
    pub category: String,
    pub term: String,
    pub count: u64,
    pub total_items: u64,
    pub rate_per_1k: f64,
}

impl Store {
    /// Open the mirror, creating the file if needed (ingestion entry point).
    pub fn create_or_open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open database {}", path.as_ref().display()))?;
        Self::from_conn(conn)
    }

    /// Open an existing mirror; a missing file is fatal (classification and
    /// aggregation never run against an empty database by accident).
    pub fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let p = path.as_ref();
        if !p.exists() {
            bail!("database not found: {}", p.display());
        }
        let conn =
            Connection::open(p).with_context(|| format!("open database {}", p.display()))?;
        Self::from_conn(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_conn(Connection::open_in_memory()?)
    }

    fn from_conn(conn: Connection) -> Result<Self> {
        // WAL tolerates a concurrent local reader (dashboard, sqlite shell)
        // while a run writes; in-memory connections just report "memory".
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        conn.busy_timeout(Duration::from_secs(30))?;
        Ok(Self { conn })
    }

    /// Begin a short write transaction. Writers call this around batches and
    /// re-begin after each `commit`, mirroring the periodic-commit discipline.
    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    // ---------------- base tables ----------------

    pub fn ensure_base_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS posts (
                 id TEXT PRIMARY KEY,
                 author TEXT,
                 created_utc INTEGER,
                 title TEXT,
                 body TEXT,
                 score INTEGER,
                 num_comments INTEGER,
                 url TEXT,
                 permalink TEXT,
                 subreddit TEXT,
                 raw_json TEXT,
                 timestamp TEXT
             );
             CREATE TABLE IF NOT EXISTS comments (
                 id TEXT PRIMARY KEY,
                 parent_id TEXT,
                 link_id TEXT,
                 author TEXT,
                 created_utc INTEGER,
                 body TEXT,
                 score INTEGER,
                 subreddit TEXT,
                 raw_json TEXT,
                 timestamp TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_utc);
             CREATE INDEX IF NOT EXISTS idx_comments_created ON comments(created_utc);
             CREATE INDEX IF NOT EXISTS idx_comments_link ON comments(link_id);
             CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);",
        )?;
        Ok(())
    }

    pub fn existing_ids(&self, kind: ItemKind) -> Result<AHashSet<String>> {
        let sql = match kind {
            ItemKind::Post => "SELECT id FROM posts",
            ItemKind::Comment => "SELECT id FROM comments",
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut out = AHashSet::new();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for id in rows {
            out.insert(id?);
        }
        Ok(out)
    }

    /// Insert a new item; existing ids are left untouched (idempotent
    /// re-ingestion). Returns whether a row was actually written.
    pub fn insert_item(&self, item: &ContentItem, timestamp_rfc3339: &str) -> Result<bool> {
        let record: StoredRecord = item.to_stored_record(timestamp_rfc3339);
        let raw_json = serde_json::to_string(&record)?;
        let changed = match item {
            ContentItem::Post(p) => self.conn.execute(
                "INSERT OR IGNORE INTO posts
                 (id, author, created_utc, title, body, score, num_comments,
                  url, permalink, subreddit, raw_json, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    p.id,
                    p.author,
                    p.created_utc,
                    p.title,
                    p.selftext,
                    p.score,
                    p.num_comments,
                    p.url,
                    p.permalink,
                    p.subreddit,
                    raw_json,
                    timestamp_rfc3339,
                ],
            )?,
            ContentItem::Comment(c) => self.conn.execute(
                "INSERT OR IGNORE INTO comments
                 (id, parent_id, link_id, author, created_utc, body, score,
                  subreddit, raw_json, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    c.id,
                    // Columns hold the bare ids for query convenience; the
                    // prefixed originals live at the top level of raw_json.
                    c.parent_id.as_deref().map(strip_kind_prefix),
                    c.link_id.as_deref().map(strip_kind_prefix),
                    c.author,
                    c.created_utc,
                    c.body,
                    c.score,
                    c.subreddit,
                    raw_json,
                    timestamp_rfc3339,
                ],
            )?,
        };
        Ok(changed > 0)
    }

    pub fn posts(&self) -> Result<Vec<ItemRow>> {
        self.item_rows("SELECT id, raw_json, created_utc FROM posts")
    }

    pub fn comments(&self) -> Result<Vec<ItemRow>> {
        self.item_rows("SELECT id, raw_json, created_utc FROM comments")
    }

    fn item_rows(&self, sql: &str) -> Result<Vec<ItemRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(ItemRow { id: row.get(0)?, raw_json: row.get(1)?, created_utc: row.get(2)? })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    /// Body of the comment with this bare id, if stored and parseable.
    pub fn comment_body(&self, id: &str) -> Result<Option<String>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT raw_json FROM comments WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(raw
            .and_then(|j| serde_json::from_str::<StoredRecord>(&j).ok())
            .and_then(|r| r.raw_data.body)
            .filter(|b| !b.trim().is_empty()))
    }

    /// Title + body of the post with this bare id, if stored and parseable.
    pub fn post_text(&self, id: &str) -> Result<Option<String>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT raw_json FROM posts WHERE id = ?1", params![id], |row| row.get(0))
            .optional()?;
        Ok(raw
            .and_then(|j| serde_json::from_str::<StoredRecord>(&j).ok())
            .map(|r| {
                let title = r.raw_data.title.unwrap_or_default();
                let body = r.raw_data.body.unwrap_or_default();
                format!("{} {}", title, body).trim().to_string()
            })
            .filter(|t| !t.is_empty()))
    }

    // ---------------- classification table ----------------

    /// Create the classification table if missing and make sure it carries one
    /// REAL column per label, adding columns for labels it has never seen.
    /// Returns the sanitized column names in label order.
    pub fn ensure_classification_schema(&self, labels: &[String]) -> Result<Vec<String>> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS toxicity_classifications (
                 id TEXT PRIMARY KEY,
                 item_type TEXT CHECK(item_type IN ('post', 'comment')),
                 text_cleaned TEXT,
                 is_deleted INTEGER DEFAULT 0,
                 is_removed INTEGER DEFAULT 0,
                 is_empty INTEGER DEFAULT 0,
                 classification_timestamp TEXT
             );
             CREATE INDEX IF NOT EXISTS idx_toxicity_type
                 ON toxicity_classifications(item_type);",
        )?;

        let mut existing = AHashSet::new();
        let mut stmt = self.conn.prepare("PRAGMA table_info(toxicity_classifications)")?;
        let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
        for n in names {
            existing.insert(n?);
        }

        let mut cols = Vec::with_capacity(labels.len());
        for label in labels {
            let col = sanitize_label(label);
            if !existing.contains(&col) {
                self.conn.execute_batch(&format!(
                    "ALTER TABLE toxicity_classifications ADD COLUMN \"{col}\" REAL DEFAULT 0.0"
                ))?;
            }
            cols.push(col);
        }
        Ok(cols)
    }

    /// Insert-or-replace one classification row. Reprocessing overwrites the
    /// prior row; no history is retained.
    pub fn upsert_classification(&self, row: &ClassificationRow) -> Result<()> {
        let mut columns = vec![
            "id",
            "item_type",
            "text_cleaned",
            "is_deleted",
            "is_removed",
            "is_empty",
            "classification_timestamp",
        ]
        .into_iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>();
        let mut values: Vec<SqlValue> = vec![
            SqlValue::Text(row.id.clone()),
            SqlValue::Text(row.kind.as_str().to_string()),
            SqlValue::Text(row.text_cleaned.clone()),
            SqlValue::Integer(row.flags.is_deleted as i64),
            SqlValue::Integer(row.flags.is_removed as i64),
            SqlValue::Integer(row.flags.is_empty as i64),
            SqlValue::Text(row.timestamp.clone()),
        ];
        for (col, score) in &row.scores {
            columns.push(format!("\"{col}\""));
            values.push(SqlValue::Real(*score as f64));
        }
        let placeholders =
            (1..=values.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO toxicity_classifications ({}) VALUES ({})",
            columns.join(", "),
            placeholders
        );
        self.conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(())
    }

    /// Read one classification row back, with scores for the given columns.
    pub fn classification(
        &self,
        id: &str,
        cols: &[String],
    ) -> Result<Option<StoredClassification>> {
        let col_list = if cols.is_empty() {
            String::new()
        } else {
            format!(", {}", cols.iter().map(|c| format!("\"{c}\"")).collect::<Vec<_>>().join(", "))
        };
        let sql = format!(
            "SELECT item_type, text_cleaned, is_deleted, is_removed, is_empty{col_list}
             FROM toxicity_classifications WHERE id = ?1"
        );
        let row = self
            .conn
            .query_row(&sql, params![id], |row| {
                let item_type: String = row.get(0)?;
                let text_cleaned: Option<String> = row.get(1)?;
                let is_deleted: i64 = row.get(2)?;
                let is_removed: i64 = row.get(3)?;
                let is_empty: i64 = row.get(4)?;
                let mut scores = Vec::with_capacity(cols.len());
                for (i, col) in cols.iter().enumerate() {
                    let v: Option<f64> = row.get(5 + i)?;
                    scores.push((col.clone(), v.unwrap_or(0.0)));
                }
                Ok(StoredClassification {
                    item_type,
                    text_cleaned: text_cleaned.unwrap_or_default(),
                    flags: CleanFlags {
                        is_deleted: is_deleted != 0,
                        is_removed: is_removed != 0,
                        is_empty: is_empty != 0,
                    },
                    scores,
                })
            })
            .optional()?;
        Ok(row)
    }

    // ---------------- topic-mention tables ----------------

    pub fn ensure_topic_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS topic_mentions_daily (
                 day TEXT,
                 term TEXT,
                 count INTEGER,
                 total_items INTEGER,
                 rate_per_1k REAL,
                 PRIMARY KEY(day, term)
             );
             CREATE INDEX IF NOT EXISTS idx_topic_day ON topic_mentions_daily(day);
             CREATE TABLE IF NOT EXISTS topic_mentions_cat_daily (
                 day TEXT,
                 category TEXT,
                 term TEXT,
                 count INTEGER,
                 total_items INTEGER,
                 rate_per_1k REAL,
                 PRIMARY KEY(day, category, term)
             );
             CREATE INDEX IF NOT EXISTS idx_topic_cat_day ON topic_mentions_cat_daily(day);
             CREATE INDEX IF NOT EXISTS idx_topic_cat_category
                 ON topic_mentions_cat_daily(category);",
        )?;
        Ok(())
    }

    /// Full-rebuild support: wipe prior aggregates so a recompute cannot
    /// double-count across runs.
    pub fn clear_topic_tables(&self) -> Result<()> {
        self.conn.execute_batch(
            "DELETE FROM topic_mentions_daily;
             DELETE FROM topic_mentions_cat_daily;",
        )?;
        Ok(())
    }

    pub fn upsert_topic_daily(&self, rows: &[TopicDailyRow]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO topic_mentions_daily (day, term, count, total_items, rate_per_1k)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(day, term) DO UPDATE SET
               count = excluded.count,
               total_items = excluded.total_items,
               rate_per_1k = excluded.rate_per_1k",
        )?;
        for r in rows {
            stmt.execute(params![
                r.day,
                r.term,
                r.count as i64,
                r.total_items as i64,
                r.rate_per_1k
            ])?;
        }
        Ok(())
    }

    pub fn upsert_topic_cat_daily(&self, rows: &[TopicCatDailyRow]) -> Result<()> {
        let mut stmt = self.conn.prepare(
            "INSERT INTO topic_mentions_cat_daily
               (day, category, term, count, total_items, rate_per_1k)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(day, category, term) DO UPDATE SET
               count = excluded.count,
               total_items = excluded.total_items,
               rate_per_1k = excluded.rate_per_1k",
        )?;
        for r in rows {
            stmt.execute(params![
                r.day,
                r.category,
                r.term,
                r.count as i64,
                r.total_items as i64,
                r.rate_per_1k
            ])?;
        }
        Ok(())
    }

    pub fn topic_daily_rows(&self) -> Result<Vec<TopicDailyRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT day, term, count, total_items, rate_per_1k
             FROM topic_mentions_daily ORDER BY day, term",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TopicDailyRow {
                day: row.get(0)?,
                term: row.get(1)?,
                count: row.get::<_, i64>(2)? as u64,
                total_items: row.get::<_, i64>(3)? as u64,
                rate_per_1k: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }

    pub fn topic_cat_daily_rows(&self) -> Result<Vec<TopicCatDailyRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT day, category, term, count, total_items, rate_per_1k
             FROM topic_mentions_cat_daily ORDER BY day, category, term",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(TopicCatDailyRow {
                day: row.get(0)?,
                category: row.get(1)?,
                term: row.get(2)?,
                count: row.get::<_, i64>(3)? as u64,
                total_items: row.get::<_, i64>(4)? as u64,
                rate_per_1k: row.get(5)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}
