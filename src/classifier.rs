//! Batch classification adapter: maps cleaned text through a scoring model
//! while short-circuiting empty inputs, preserving input order one-to-one.

use anyhow::{ensure, Result};

/// Per-item label scores in the model's output-head order.
/// Probabilities are independent per label (multi-label sigmoid output), so
/// two labels can both sit near 1.0 for the same item.
#[derive(Clone, Debug, PartialEq)]
pub struct Scores(Vec<(String, f32)>);

impl Scores {
    pub fn new(pairs: Vec<(String, f32)>) -> Self {
        Self(pairs)
    }

    /// All-zero score vector, one entry per known label.
    pub fn zeroed(labels: &[String]) -> Self {
        Self(labels.iter().map(|l| (l.clone(), 0.0)).collect())
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(l, s)| (l.as_str(), *s))
    }

    pub fn is_all_zero(&self) -> bool {
        self.0.iter().all(|(_, s)| *s == 0.0)
    }
}

/// A loaded sequence-classification model. The label set is open: names come
/// from the model's own configuration at load time, never hardcoded here.
pub trait TextClassifier {
    fn labels(&self) -> &[String];

    /// Score a batch of non-empty texts. Returns one probability vector per
    /// input, aligned with `labels()`, same length and order as `texts`.
    fn predict(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Order-preserving batch adapter over a `TextClassifier`.
///
/// Empty/whitespace-only entries never reach the model: they get an all-zero
/// vector without consuming an inference call. Batched and one-at-a-time
/// invocations produce identical scores for the same input text.
pub struct BatchClassifier<'a> {
    model: &'a dyn TextClassifier,
}

impl<'a> BatchClassifier<'a> {
    pub fn new(model: &'a dyn TextClassifier) -> Self {
        Self { model }
    }

    pub fn labels(&self) -> &[String] {
        self.model.labels()
    }

    pub fn classify_one(&self, text: &str) -> Result<Scores> {
        let mut out = self.classify(std::slice::from_ref(&text.to_string()))?;
        Ok(out.pop().unwrap_or_else(|| Scores::zeroed(self.model.labels())))
    }

    pub fn classify(&self, texts: &[String]) -> Result<Vec<Scores>> {
        let labels = self.model.labels();

        // Map each input slot to its position in the dense batch, or None for
        // entries that are empty after trimming.
        let mut valid: Vec<&str> = Vec::with_capacity(texts.len());
        let mut slots: Vec<Option<usize>> = Vec::with_capacity(texts.len());
        for t in texts {
            if t.trim().is_empty() {
                slots.push(None);
            } else {
                slots.push(Some(valid.len()));
                valid.push(t.as_str());
            }
        }

        if valid.is_empty() {
            return Ok(texts.iter().map(|_| Scores::zeroed(labels)).collect());
        }

        let probs = self.model.predict(&valid)?;
        ensure!(
            probs.len() == valid.len(),
            "model returned {} score vectors for {} inputs",
            probs.len(),
            valid.len()
        );

        let mut out = Vec::with_capacity(texts.len());
        for slot in slots {
            match slot {
                None => out.push(Scores::zeroed(labels)),
                Some(i) => {
                    let pairs = labels
                        .iter()
                        .enumerate()
                        .map(|(j, l)| (l.clone(), probs[i].get(j).copied().unwrap_or(0.0)))
                        .collect();
                    out.push(Scores::new(pairs));
                }
            }
        }
        Ok(out)
    }
}
