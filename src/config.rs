use crate::flag::ThresholdTable;
use std::path::{Path, PathBuf};

/// Everything a model variant needs to plug into the pipeline: weights
/// identity, flagging cutoffs and review-telemetry knobs. Adding a new
/// variant means supplying a new `ModelSpec`, not forking the pipeline.
#[derive(Clone, Debug)]
pub struct ModelSpec {
    /// Hugging Face repo id, or a local directory holding
    /// config.json / tokenizer.json / model.safetensors.
    pub model_id: String,
    pub thresholds: ThresholdTable,
    /// Label whose borderline scores are logged for human review.
    pub review_label: String,
    /// Lower bound of the "borderline" band; upper bound is the review
    /// label's high cutoff.
    pub borderline_floor: f32,
}

impl ModelSpec {
    /// Seven-facet toxicity model (per-facet sigmoid heads).
    pub fn toxicity() -> Self {
        Self {
            model_id: "unitary/unbiased-toxic-roberta".to_string(),
            thresholds: ThresholdTable::toxicity(),
            review_label: "identity_attack".to_string(),
            borderline_floor: 0.30,
        }
    }

    /// Binary hate/non-hate model; only the HATE head participates.
    pub fn hate() -> Self {
        Self {
            model_id: "Hate-speech-CNERG/dehatebert-mono-english".to_string(),
            thresholds: ThresholdTable::hate(),
            review_label: "HATE".to_string(),
            borderline_floor: 0.05,
        }
    }

    /// Arbitrary BERT-family sequence-classification checkpoint with a
    /// caller-supplied threshold table.
    pub fn custom(model_id: impl Into<String>, thresholds: ThresholdTable) -> Self {
        let review_label = thresholds
            .iter()
            .next()
            .map(|(l, _)| l.to_string())
            .unwrap_or_default();
        Self { model_id: model_id.into(), thresholds, review_label, borderline_floor: 0.0 }
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub db_path: PathBuf,
    pub subreddit: String,            // normalized lowercase, no "r/"
    pub batch_size: usize,            // inference batch size
    pub max_input_tokens: usize,      // per-item truncation limit
    pub lookback_days: Option<u32>,   // ingest: skip items older than this
    pub post_limit: usize,            // ingest: max listing posts to walk
    pub posts_only: bool,             // ingest: skip comment trees
    pub archive_dir: Option<PathBuf>, // ingest: raw-record archive root
    pub progress: bool,
    pub log_every: u64,               // periodic progress log interval
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("subsift.sqlite"),
            subreddit: "nyu".to_string(),
            batch_size: 32,
            max_input_tokens: 512,
            lookback_days: None,
            post_limit: 1000,
            posts_only: false,
            archive_dir: None,
            progress: true,
            log_every: 50,
        }
    }
}

impl PipelineOptions {
    pub fn with_db_path(mut self, path: impl AsRef<Path>) -> Self {
        self.db_path = path.as_ref().to_path_buf();
        self
    }
    pub fn with_subreddit(mut self, sub: impl AsRef<str>) -> Self {
        let mut s = sub.as_ref().trim().to_lowercase();
        if let Some(rest) = s.strip_prefix("r/") {
            s = rest.to_string();
        }
        self.subreddit = s;
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    pub fn with_max_input_tokens(mut self, n: usize) -> Self {
        self.max_input_tokens = n.max(16);
        self
    }
    pub fn with_lookback_days(mut self, days: Option<u32>) -> Self {
        self.lookback_days = days;
        self
    }
    pub fn with_post_limit(mut self, n: usize) -> Self {
        self.post_limit = n.max(1);
        self
    }
    pub fn with_posts_only(mut self, yes: bool) -> Self {
        self.posts_only = yes;
        self
    }
    pub fn with_archive_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.archive_dir = dir;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_log_every(mut self, n: u64) -> Self {
        self.log_every = n.max(1);
        self
    }
}
