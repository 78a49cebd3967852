//! Minimal synchronous Reddit reader over the public JSON listing endpoints.
//! Rate limiting is handled with an explicit bounded backoff policy rather
//! than an open-ended sleep loop.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::thread::sleep;
use std::time::Duration;

const BASE_URL: &str = "https://www.reddit.com";
/// Reddit caps a single listing page at 100 children.
const PAGE_SIZE: usize = 100;
/// Flat pause between listing fetches; politeness, not correctness.
pub const POLITENESS_PAUSE: Duration = Duration::from_millis(300);

/// Bounded retry policy for 429/5xx responses: `initial` delay doubling per
/// attempt, at most `max_retries` attempts, `Retry-After` honored when sent.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self { initial: Duration::from_secs(2), max_retries: 4 }
    }
}

impl BackoffPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.initial.saturating_mul(1u32 << attempt.min(16))
    }
}

pub struct RedditClient {
    http: reqwest::blocking::Client,
    backoff: BackoffPolicy,
}

impl RedditClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self { http, backoff: BackoffPolicy::default() })
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    fn get_json(&self, url: &str) -> Result<Value> {
        let mut attempt = 0u32;
        loop {
            let resp = self.http.get(url).send().with_context(|| format!("GET {url}"))?;
            let status = resp.status();

            if status.as_u16() == 429 || status.is_server_error() {
                if attempt >= self.backoff.max_retries {
                    bail!("{url} still failing with {status} after {attempt} retries");
                }
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                let delay = retry_after.unwrap_or_else(|| self.backoff.delay_for(attempt));
                tracing::warn!(url, %status, ?delay, attempt, "rate limited, backing off");
                sleep(delay);
                attempt += 1;
                continue;
            }
            if !status.is_success() {
                bail!("{url} returned {status}");
            }
            return resp.json::<Value>().with_context(|| format!("decode {url}"));
        }
    }

    /// Newest-first posts for a subreddit, up to `limit`, walking `after`
    /// pagination. Each element is the listing child's `data` object.
    pub fn new_posts(&self, subreddit: &str, limit: usize) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        let mut after: Option<String> = None;

        while out.len() < limit {
            let page = PAGE_SIZE.min(limit - out.len());
            let url = match &after {
                Some(a) => {
                    format!("{BASE_URL}/r/{subreddit}/new.json?limit={page}&after={a}&raw_json=1")
                }
                None => format!("{BASE_URL}/r/{subreddit}/new.json?limit={page}&raw_json=1"),
            };
            let listing = self.get_json(&url)?;

            let children = listing
                .pointer("/data/children")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if children.is_empty() {
                break;
            }
            for child in &children {
                if child.get("kind").and_then(Value::as_str) == Some("t3") {
                    if let Some(data) = child.get("data") {
                        out.push(data.clone());
                    }
                }
            }

            after = listing
                .pointer("/data/after")
                .and_then(Value::as_str)
                .map(|s| s.to_string());
            if after.is_none() {
                break;
            }
            sleep(POLITENESS_PAUSE);
        }
        Ok(out)
    }

    /// The full comment tree for a post, flattened depth-first. "more"
    /// placeholders are dropped, matching a replace_more(limit=0) walk.
    pub fn post_comments(&self, subreddit: &str, post_id: &str) -> Result<Vec<Value>> {
        let url =
            format!("{BASE_URL}/r/{subreddit}/comments/{post_id}.json?limit=500&raw_json=1");
        let doc = self.get_json(&url)?;

        // The endpoint returns [post listing, comment listing].
        let mut out = Vec::new();
        if let Some(comment_listing) = doc.get(1) {
            if let Some(children) = comment_listing.pointer("/data/children").and_then(Value::as_array)
            {
                for child in children {
                    flatten_comment(child, &mut out);
                }
            }
        }
        Ok(out)
    }
}

fn flatten_comment(node: &Value, out: &mut Vec<Value>) {
    if node.get("kind").and_then(Value::as_str) != Some("t1") {
        return;
    }
    let Some(data) = node.get("data") else {
        return;
    };
    out.push(data.clone());

    // `replies` is the empty string for leaves, a listing otherwise.
    if let Some(children) = data.pointer("/replies/data/children").and_then(Value::as_array) {
        for child in children {
            flatten_comment(child, out);
        }
    }
}
