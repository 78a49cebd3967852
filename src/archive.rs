//! Filesystem raw-record archive: one JSON document per item under a
//! date/type/id key, plus an append-only NDJSON metadata index queryable by
//! id, author or day. Stands in for the cloud object/metadata store pair;
//! rewriting an id replaces its document and supersedes its metadata line.

use crate::item::{ContentItem, ItemKind};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

const METADATA_FILE: &str = "metadata.ndjson";

/// One metadata index entry per archived document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveMeta {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Relative document key: raw-data/YYYY/MM/DD/<kind>/<id>.json
    pub key: String,
    pub subreddit: String,
    pub author: Option<String>,
    pub score: i64,
    pub created_utc: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body_length: usize,
    pub processed_at: String,
}

pub struct FsArchive {
    root: PathBuf,
}

impl FsArchive {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("create archive root {}", root.display()))?;
        Ok(Self { root })
    }

    /// Document key for an item: date path from its creation time, then kind,
    /// then id.
    pub fn key_for(kind: ItemKind, id: &str, created_utc: i64) -> String {
        let date = OffsetDateTime::from_unix_timestamp(created_utc)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
            .date();
        format!(
            "raw-data/{:04}/{:02}/{:02}/{}/{}.json",
            date.year(),
            date.month() as u8,
            date.day(),
            kind.as_str(),
            id
        )
    }

    /// Write one item's stored record and append its metadata line.
    /// Returns the document key.
    pub fn put(&self, item: &ContentItem, processed_at_rfc3339: &str) -> Result<String> {
        let key = Self::key_for(item.kind(), item.id(), item.created_utc());
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = item.to_stored_record(processed_at_rfc3339);
        let file = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, &record)?;
        w.flush()?;

        let (title, body_length) = match item {
            ContentItem::Post(p) => (Some(p.title.clone()), p.selftext.len()),
            ContentItem::Comment(c) => (None, c.body.len()),
        };
        let meta = ArchiveMeta {
            id: item.id().to_string(),
            kind: item.kind().as_str().to_string(),
            key: key.clone(),
            subreddit: match item {
                ContentItem::Post(p) => p.subreddit.clone(),
                ContentItem::Comment(c) => c.subreddit.clone(),
            },
            author: item.author().map(|s| s.to_string()),
            score: item.score(),
            created_utc: item.created_utc(),
            title,
            body_length,
            processed_at: processed_at_rfc3339.to_string(),
        };
        let mut index = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.root.join(METADATA_FILE))?;
        let mut line = serde_json::to_string(&meta)?;
        line.push('\n');
        index.write_all(line.as_bytes())?;
        Ok(key)
    }

    /// Latest metadata entry for an id, if archived.
    pub fn find_by_id(&self, id: &str) -> Result<Option<ArchiveMeta>> {
        let mut found = None;
        self.for_each_meta(|m| {
            if m.id == id {
                found = Some(m);
            }
        })?;
        Ok(found)
    }

    pub fn find_by_author(&self, author: &str) -> Result<Vec<ArchiveMeta>> {
        self.filtered(|m| m.author.as_deref() == Some(author))
    }

    /// Entries whose document key falls under a "YYYY/MM/DD"-style prefix
    /// (any prefix of the date path works: "2024", "2024/03", ...).
    pub fn find_by_day(&self, date_prefix: &str) -> Result<Vec<ArchiveMeta>> {
        let full_prefix = format!("raw-data/{}", date_prefix.trim_matches('/'));
        self.filtered(|m| m.key.starts_with(&full_prefix))
    }

    pub fn scan(&self) -> Result<Vec<ArchiveMeta>> {
        self.filtered(|_| true)
    }

    /// Load the archived document behind a metadata entry.
    pub fn read_raw(&self, meta: &ArchiveMeta) -> Result<Value> {
        let path = self.root.join(&meta.key);
        let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Newest-entry-wins filter over the index (rewrites supersede).
    fn filtered(&self, mut keep: impl FnMut(&ArchiveMeta) -> bool) -> Result<Vec<ArchiveMeta>> {
        let mut by_id: Vec<ArchiveMeta> = Vec::new();
        self.for_each_meta(|m| {
            if let Some(slot) = by_id.iter_mut().find(|e| e.id == m.id) {
                *slot = m;
            } else {
                by_id.push(m);
            }
        })?;
        Ok(by_id.into_iter().filter(|m| keep(m)).collect())
    }

    fn for_each_meta(&self, mut f: impl FnMut(ArchiveMeta)) -> Result<()> {
        let path = self.root.join(METADATA_FILE);
        if !path.exists() {
            return Ok(());
        }
        let file = File::open(&path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ArchiveMeta>(&line) {
                Ok(meta) => f(meta),
                Err(e) => tracing::warn!(error = %e, "skipping malformed metadata line"),
            }
        }
        Ok(())
    }
}
