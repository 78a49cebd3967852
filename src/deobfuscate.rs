//! Light de-obfuscation for common symbol-for-letter substitutions
//! ("p@ssw0rd" -> "password"). Counters leetspeak-style evasion of keyword
//! and model detection without disturbing ordinary text much.

/// Substitute symbol characters back to the letters they visually resemble.
/// Pure per-character map; idempotent on text containing none of the mapped
/// symbols. Applied only to text headed for the classifier, never to
/// deleted/removed/empty content.
pub fn deobfuscate(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '$' => 's',
            '@' => 'a',
            '!' => 'i',
            '1' => 'l',
            '0' => 'o',
            '3' => 'e',
            '*' => 'a',
            other => other,
        })
        .collect()
}
