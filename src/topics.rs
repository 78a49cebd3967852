//! Daily topic-mention aggregation: binary per-item term detection over
//! normalized text, bucketed by UTC calendar day, upserted into the two
//! aggregate tables. Re-running with rebuild enabled is idempotent.

use crate::item::StoredRecord;
use crate::progress::make_count_progress;
use crate::store::{Store, TopicCatDailyRow, TopicDailyRow};
use ahash::AHashMap;
use anyhow::Result;
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use time::OffsetDateTime;

/// Compiled term patterns: the flat legacy set plus the categorized set.
/// Patterns match anywhere in normalized text; counting is per item, not per
/// occurrence.
pub struct TermSet {
    flat: Vec<(String, Regex)>,
    categories: Vec<(String, Vec<(String, Regex)>)>,
}

fn compile(pattern: &str) -> Regex {
    RegexBuilder::new(pattern).case_insensitive(true).build().expect("builtin term pattern")
}

impl TermSet {
    pub fn builtin() -> Self {
        let flat = [
            ("black", r"\bblacks?\b"),
            ("asian", r"\basians?\b"),
            ("white", r"\bwhites?\b"),
            ("racism", r"\bracism\b|\bracists?\b"),
            ("financial aid", r"\bfinancial[\s\-]?aid\b"),
        ];
        let categories: &[(&str, &[(&str, &str)])] = &[
            (
                "race_ethnicity",
                &[
                    ("black", r"\bblacks?\b"),
                    ("white", r"\bwhites?\b"),
                    ("asian", r"\basians?\b"),
                    ("latino", r"\blatinos?\b|\blatinx\b"),
                    ("hispanic", r"\bhispanics?\b"),
                    ("arab", r"\barabs?\b"),
                    ("african", r"\bafricans?\b"),
                ],
            ),
            (
                "countries",
                &[
                    ("china", r"\bchina\b|\bchinese\b"),
                    ("india", r"\bindia\b|\bindians?\b"),
                    ("united states", r"\b(united states|usa|u\.s\.a\.|america|americans?)\b"),
                    ("korea", r"\b(south\s+)?korea(ns?)?\b|\bnorth\s+korea\b"),
                    ("mexico", r"\bmexico\b|\bmexicans?\b"),
                    ("turkey", r"\bturkey\b|\bturks?\b"),
                    ("russia", r"\brussia\b|\brussians?\b"),
                ],
            ),
            (
                "gender_sexuality",
                &[
                    ("women", r"\bwom[ae]n\b"),
                    ("men", r"\bmen\b|\bman\b"),
                    ("female", r"\bfemales?\b"),
                    ("male", r"\bmales?\b"),
                    ("trans", r"\btrans(gender|sexual)?\b"),
                    ("lgbtq", r"\blgbt(q|\+)?\b|\bgay\b|\blesbians?\b|\bqueer\b"),
                ],
            ),
            (
                "profanity",
                &[
                    ("fuck", r"\bfuck(ing|er|s)?\b"),
                    ("shit", r"\bshit(ty|s)?\b"),
                    ("bitch", r"\bbitch(es)?\b"),
                    ("asshole", r"\bassholes?\b"),
                    ("bastard", r"\bbastards?\b"),
                    ("dumbass", r"\bdumbass(es)?\b"),
                ],
            ),
            (
                "academics_finance",
                &[
                    ("financial aid", r"\bfinancial[\s\-]?aid\b"),
                    ("scholarship", r"\bscholarships?\b"),
                    ("tuition", r"\btuition\b"),
                    ("fafsa", r"\bfafsa\b"),
                    ("loan", r"\b(student[\s\-]?)?loans?\b"),
                ],
            ),
            (
                "safety_crime",
                &[
                    ("assault", r"\bassault(ed|s|ing)?\b"),
                    ("robbery", r"\brobber(y|ies)\b"),
                    ("police", r"\bpolice\b|\bnypd\b"),
                    ("crime", r"\bcrimes?\b"),
                ],
            ),
            (
                "housing",
                &[
                    ("housing", r"\bhousing\b"),
                    ("dorm", r"\bdorms?\b"),
                    ("rent", r"\brent(ed|ing|s)?\b|\brental\b"),
                    ("lease", r"\blease(d|s|ing)?\b"),
                    ("landlord", r"\blandlords?\b"),
                ],
            ),
        ];

        Self {
            flat: flat.iter().map(|(t, p)| (t.to_string(), compile(p))).collect(),
            categories: categories
                .iter()
                .map(|(c, terms)| {
                    (
                        c.to_string(),
                        terms.iter().map(|(t, p)| (t.to_string(), compile(p))).collect(),
                    )
                })
                .collect(),
        }
    }
}

/// Lighter normalization than the classifier's: strip markdown links, URLs,
/// user mentions and HTML entities, collapse whitespace, lowercase. The two
/// normalizers are independent by design.
pub fn normalize_topic_text(raw: &str) -> String {
    use regex::Regex as Re;
    use std::sync::LazyLock;
    static RE_MD_LINK: LazyLock<Re> = LazyLock::new(|| Re::new(r"\[[^\]]*\]\([^)]*\)").unwrap());
    static RE_URL: LazyLock<Re> = LazyLock::new(|| Re::new(r"https?\S+|www\.\S+").unwrap());
    static RE_MENTION: LazyLock<Re> =
        LazyLock::new(|| Re::new(r"\bu/[A-Za-z0-9_-]+|(?:^|\s)@[A-Za-z0-9_-]+").unwrap());
    static RE_ENTITY: LazyLock<Re> = LazyLock::new(|| Re::new(r"&[a-zA-Z]+;").unwrap());
    static RE_WS: LazyLock<Re> = LazyLock::new(|| Re::new(r"\s+").unwrap());

    let s = RE_MD_LINK.replace_all(raw, " ");
    let s = RE_URL.replace_all(&s, " ");
    let s = RE_MENTION.replace_all(&s, " ");
    let s = RE_ENTITY.replace_all(&s, " ");
    let s = RE_WS.replace_all(&s, " ");
    s.trim().to_lowercase()
}

/// UTC calendar day ("YYYY-MM-DD") for an epoch-seconds timestamp.
pub fn day_from_epoch(ts: i64) -> Option<String> {
    let fmt = time::macros::format_description!("[year]-[month]-[day]");
    let dt = OffsetDateTime::from_unix_timestamp(ts).ok()?;
    dt.date().format(fmt).ok()
}

/// Per-run aggregation state: day totals plus binary per-item term counts.
/// Built per worker chunk, merged pairwise.
#[derive(Default)]
pub struct TopicAggregate {
    totals: AHashMap<String, u64>,
    flat: AHashMap<(String, String), u64>,
    cats: AHashMap<(String, String, String), u64>,
}

impl TopicAggregate {
    /// Fold one item in. Items with no timestamp or nothing left after
    /// normalization are not counted at all.
    pub fn ingest(&mut self, terms: &TermSet, created_utc: i64, raw_text: &str) {
        if raw_text.is_empty() {
            return;
        }
        let text = normalize_topic_text(raw_text);
        if text.is_empty() {
            return;
        }
        let Some(day) = day_from_epoch(created_utc) else {
            return;
        };

        *self.totals.entry(day.clone()).or_insert(0) += 1;

        for (term, pattern) in &terms.flat {
            if pattern.is_match(&text) {
                *self.flat.entry((day.clone(), term.clone())).or_insert(0) += 1;
            }
        }
        for (category, cat_terms) in &terms.categories {
            for (term, pattern) in cat_terms {
                if pattern.is_match(&text) {
                    *self
                        .cats
                        .entry((day.clone(), category.clone(), term.clone()))
                        .or_insert(0) += 1;
                }
            }
        }
    }

    pub fn merge(&mut self, other: Self) {
        for (k, v) in other.totals {
            *self.totals.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.flat {
            *self.flat.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.cats {
            *self.cats.entry(k).or_insert(0) += v;
        }
    }

    /// Finalize into sorted upsert rows with rates computed.
    pub fn into_rows(self) -> (Vec<TopicDailyRow>, Vec<TopicCatDailyRow>) {
        let totals = self.totals;
        let total_for = |day: &str| totals.get(day).copied().unwrap_or(0);

        let mut flat: Vec<TopicDailyRow> = self
            .flat
            .into_iter()
            .map(|((day, term), count)| {
                let total = total_for(&day);
                TopicDailyRow {
                    rate_per_1k: 1000.0 * count as f64 / total.max(1) as f64,
                    day,
                    term,
                    count,
                    total_items: total,
                }
            })
            .collect();
        flat.sort_by(|a, b| (&a.day, &a.term).cmp(&(&b.day, &b.term)));

        let mut cats: Vec<TopicCatDailyRow> = self
            .cats
            .into_iter()
            .map(|((day, category, term), count)| {
                let total = total_for(&day);
                TopicCatDailyRow {
                    rate_per_1k: 1000.0 * count as f64 / total.max(1) as f64,
                    day,
                    category,
                    term,
                    count,
                    total_items: total,
                }
            })
            .collect();
        cats.sort_by(|a, b| (&a.day, &a.category, &a.term).cmp(&(&b.day, &b.category, &b.term)));

        (flat, cats)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TopicSummary {
    pub items_scanned: u64,
    pub flat_rows: usize,
    pub cat_rows: usize,
}

/// Text that participates in topic counting, per item kind: posts keep their
/// title when the body is a deleted/removed marker; marker-bodied comments
/// are skipped outright.
fn topic_text_for(record: &StoredRecord) -> String {
    let body = record.raw_data.body.clone().unwrap_or_default();
    match record.kind.as_str() {
        "post" => {
            let title = record.raw_data.title.clone().unwrap_or_default();
            if crate::clean::is_marker(&body) {
                title
            } else {
                format!("{} {}", title, body).trim().to_string()
            }
        }
        _ => {
            if crate::clean::is_marker(&body) {
                String::new()
            } else {
                body
            }
        }
    }
}

/// Stream every stored item through the aggregator and upsert the results.
/// `rebuild` truncates both aggregate tables first.
pub fn run_topics(
    store: &Store,
    terms: &TermSet,
    rebuild: bool,
    progress: bool,
) -> Result<TopicSummary> {
    store.ensure_topic_schema()?;
    if rebuild {
        store.clear_topic_tables()?;
        tracing::info!("cleared existing topic mention tables");
    }

    // (created_utc, text) pairs for every item worth scanning.
    let mut inputs: Vec<(i64, String)> = Vec::new();
    for row in store.posts()?.into_iter().chain(store.comments()?) {
        let Ok(record) = serde_json::from_str::<StoredRecord>(&row.raw_json) else {
            continue;
        };
        let ts = row.created_utc.unwrap_or(record.created_utc);
        if ts <= 0 {
            continue;
        }
        let text = topic_text_for(&record);
        if !text.is_empty() {
            inputs.push((ts, text));
        }
    }

    let pb = progress.then(|| make_count_progress(inputs.len() as u64, "Scanning topics"));

    let aggregate = inputs
        .par_chunks(1024)
        .map(|chunk| {
            let mut agg = TopicAggregate::default();
            for (ts, text) in chunk {
                agg.ingest(terms, *ts, text);
            }
            if let Some(pb) = &pb {
                pb.inc(chunk.len() as u64);
            }
            agg
        })
        .reduce(TopicAggregate::default, |mut a, b| {
            a.merge(b);
            a
        });

    if let Some(pb) = &pb {
        pb.finish_with_message("Scanning topics done");
    }

    let items_scanned = inputs.len() as u64;
    let (flat_rows, cat_rows) = aggregate.into_rows();

    store.begin()?;
    store.upsert_topic_daily(&flat_rows)?;
    store.upsert_topic_cat_daily(&cat_rows)?;
    store.commit()?;

    let mut per_category: AHashMap<&str, u64> = AHashMap::new();
    for row in &cat_rows {
        *per_category.entry(row.category.as_str()).or_insert(0) += row.count;
    }
    let mut category_summary: Vec<_> = per_category.into_iter().collect();
    category_summary.sort();
    for (category, mentions) in category_summary {
        tracing::info!(category, mentions, "category total");
    }
    tracing::info!(
        flat_rows = flat_rows.len(),
        cat_rows = cat_rows.len(),
        items = items_scanned,
        "topic mention tables upserted"
    );

    Ok(TopicSummary { items_scanned, flat_rows: flat_rows.len(), cat_rows: cat_rows.len() })
}
