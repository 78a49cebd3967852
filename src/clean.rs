//! Text normalizer: turns raw platform markup into classifier-ready text and
//! reports deletion/removal/emptiness flags. Never errors, whatever the input.

use regex::Regex;
use std::sync::LazyLock;

const DELETED_MARKER: &str = "[deleted]";
const REMOVED_MARKER: &str = "[removed]";

static RE_MD_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").unwrap());
static RE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?\S+|www\S+").unwrap());
// The @ form only counts at a token start: a mid-word "@" is far more likely
// obfuscation ("p@ssw0rd") that the deobfuscation pass needs to see intact.
static RE_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bu/[A-Za-z0-9_-]+|(?:^|\s)@[A-Za-z0-9_-]+").unwrap());
static RE_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&[a-zA-Z]+;").unwrap());
static RE_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_~`]+").unwrap());
static RE_QUOTE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^>\s*").unwrap());
static RE_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Mutually-informative content flags. `is_deleted`/`is_removed` mean the raw
/// text was exactly a marker token; `is_empty` means nothing survived
/// cleaning (which can happen to non-empty raw text made of pure noise).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanFlags {
    pub is_deleted: bool,
    pub is_removed: bool,
    pub is_empty: bool,
}

impl CleanFlags {
    /// True when classification should be skipped entirely.
    pub fn skip_classification(&self) -> bool {
        self.is_deleted || self.is_removed || self.is_empty
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cleaned {
    pub text: String,
    pub flags: CleanFlags,
}

/// Normalize raw content for classification.
///
/// Rules, in order: whitespace-only input is empty; a bare deletion/removal
/// marker (trimmed, case-insensitive) sets its flag and yields empty text;
/// otherwise markdown links, URLs and user mentions are stripped (mentions
/// become a placeholder), common HTML entities decoded and the rest dropped,
/// emphasis markers and leading quote markers removed, whitespace collapsed,
/// and the result trimmed and lowercased. `is_empty` reflects the final text.
pub fn clean_text(raw: &str) -> Cleaned {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Cleaned {
            text: String::new(),
            flags: CleanFlags { is_empty: true, ..Default::default() },
        };
    }
    if trimmed.eq_ignore_ascii_case(DELETED_MARKER) {
        return Cleaned {
            text: String::new(),
            flags: CleanFlags { is_deleted: true, ..Default::default() },
        };
    }
    if trimmed.eq_ignore_ascii_case(REMOVED_MARKER) {
        return Cleaned {
            text: String::new(),
            flags: CleanFlags { is_removed: true, ..Default::default() },
        };
    }

    // Markdown links go first so their embedded URLs vanish with the brackets
    // instead of leaving "[label](" residue behind.
    let s = RE_MD_LINK.replace_all(trimmed, "");
    let s = RE_URL.replace_all(&s, "");
    let s = RE_MENTION.replace_all(&s, " <user>");
    let s = s.replace("&amp;", "&").replace("&lt;", "<").replace("&gt;", ">");
    let s = RE_ENTITY.replace_all(&s, " ");
    let s = RE_EMPHASIS.replace_all(&s, "");
    let s = RE_QUOTE.replace_all(&s, "");
    let s = RE_WS.replace_all(&s, " ");
    let text = s.trim().to_lowercase();

    let is_empty = text.is_empty();
    Cleaned { text, flags: CleanFlags { is_empty, ..Default::default() } }
}

/// True when the trimmed text is exactly a deletion or removal marker.
pub fn is_marker(text: &str) -> bool {
    let t = text.trim();
    t.eq_ignore_ascii_case(DELETED_MARKER) || t.eq_ignore_ascii_case(REMOVED_MARKER)
}
