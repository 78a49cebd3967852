//! Threshold tables and the flagging decision: pure function of
//! (classification scores, configured cutoffs).

use crate::classifier::Scores;

/// Probability cutoffs for one label. `high` decides flagging; `medium` is
/// kept for display-level bucketing by dashboard consumers. Expected
/// `high >= medium`, not enforced here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cutoffs {
    pub high: f32,
    pub medium: f32,
}

/// Ordered label -> cutoffs table. Iteration order is the order labels are
/// listed in the reason string, so tables are built as ordered vectors rather
/// than hash maps.
#[derive(Clone, Debug, Default)]
pub struct ThresholdTable {
    entries: Vec<(String, Cutoffs)>,
}

impl ThresholdTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Cutoffs)>,
        S: Into<String>,
    {
        Self { entries: entries.into_iter().map(|(l, c)| (l.into(), c)).collect() }
    }

    pub fn get(&self, label: &str) -> Option<Cutoffs> {
        self.entries.iter().find(|(l, _)| l == label).map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Cutoffs)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cutoffs tuned for the seven-facet toxicity model, biased toward
    /// identity-attack recall.
    pub fn toxicity() -> Self {
        Self::new([
            ("toxicity", Cutoffs { high: 0.70, medium: 0.50 }),
            ("insult", Cutoffs { high: 0.78, medium: 0.55 }),
            ("identity_attack", Cutoffs { high: 0.58, medium: 0.38 }),
            ("threat", Cutoffs { high: 0.68, medium: 0.55 }),
            ("sexual_explicit", Cutoffs { high: 0.75, medium: 0.55 }),
            ("obscene", Cutoffs { high: 0.80, medium: 0.60 }),
            ("severe_toxicity", Cutoffs { high: 0.80, medium: 0.60 }),
        ])
    }

    /// Cutoffs for the binary hate/non-hate model. Only the HATE head
    /// participates in flagging; NON_HATE is intentionally absent.
    pub fn hate() -> Self {
        Self::new([("HATE", Cutoffs { high: 0.20, medium: 0.20 })])
    }
}

/// Outcome of applying a threshold table to one item's scores.
#[derive(Clone, Debug, Default)]
pub struct FlagResult {
    pub is_flagged: bool,
    /// Every (label, score) pair that crossed its own high cutoff, in table order.
    pub reasons: Vec<(String, f32)>,
}

impl FlagResult {
    /// Comma-joined human-readable reason, scores to two decimals:
    /// "toxicity(0.91), insult(0.83)".
    pub fn reason_string(&self) -> String {
        self.reasons
            .iter()
            .map(|(l, s)| format!("{l}({s:.2})"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Compare each table label's score against its high cutoff. A label absent
/// from the scored output counts as 0 and never triggers. The table alone
/// decides which labels participate, so narrowing a deployment to a single
/// head is a configuration change, not a code change.
pub fn evaluate(scores: &Scores, table: &ThresholdTable) -> FlagResult {
    let mut reasons = Vec::new();
    for (label, cutoffs) in table.iter() {
        let score = scores.get(label).unwrap_or(0.0);
        if score >= cutoffs.high {
            reasons.push((label.to_string(), score));
        }
    }
    FlagResult { is_flagged: !reasons.is_empty(), reasons }
}
