use subsift::{clean_text, deobfuscate};

#[test]
fn whitespace_only_is_empty() {
    for raw in ["", "   ", "\n\t  \n"] {
        let c = clean_text(raw);
        assert_eq!(c.text, "");
        assert!(c.flags.is_empty);
        assert!(!c.flags.is_deleted);
        assert!(!c.flags.is_removed);
    }
}

#[test]
fn deletion_marker_sets_only_deleted() {
    for raw in ["[deleted]", "  [deleted]  ", "[DELETED]", "[Deleted]"] {
        let c = clean_text(raw);
        assert!(c.flags.is_deleted, "{raw:?}");
        assert!(!c.flags.is_removed);
        assert!(!c.flags.is_empty);
        assert_eq!(c.text, "");
    }
}

#[test]
fn removal_marker_sets_only_removed() {
    let c = clean_text(" [Removed] ");
    assert!(c.flags.is_removed);
    assert!(!c.flags.is_deleted);
    assert!(!c.flags.is_empty);
}

#[test]
fn marker_inside_longer_text_is_not_a_marker() {
    let c = clean_text("this was [deleted] by someone");
    assert!(!c.flags.is_deleted);
    assert_eq!(c.text, "this was [deleted] by someone");
}

#[test]
fn urls_and_mentions_are_stripped() {
    let c = clean_text("See https://example.com/a?b=1 and www.example.org now");
    assert_eq!(c.text, "see and now");

    let c = clean_text("thanks u/Some_User-99 and @other-person!");
    assert_eq!(c.text, "thanks <user> and <user>!");
}

#[test]
fn markdown_and_entities_are_stripped() {
    let c = clean_text("**bold** _it_ ~~strike~~ `code` &amp; &lt;tag&gt; &nbsp; done");
    assert_eq!(c.text, "bold it strike code & <tag> done");

    let c = clean_text("[click here](https://example.com/path) trailing");
    assert_eq!(c.text, "trailing");
}

#[test]
fn quote_markers_dropped_per_line() {
    let c = clean_text("> quoted line\n> another\nreply text");
    assert_eq!(c.text, "quoted line another reply text");
}

#[test]
fn noise_only_input_becomes_empty() {
    let c = clean_text("https://a.example [x](https://b.example) **  **");
    assert_eq!(c.text, "");
    assert!(c.flags.is_empty);
    assert!(!c.flags.is_deleted);
    assert!(!c.flags.is_removed);
}

#[test]
fn bare_mention_leaves_placeholder_not_empty() {
    let c = clean_text("u/someone");
    assert_eq!(c.text, "<user>");
    assert!(!c.flags.is_empty);
}

#[test]
fn output_is_lowercased_and_whitespace_collapsed() {
    let c = clean_text("  Mixed   CASE\n\nacross  Lines ");
    assert_eq!(c.text, "mixed case across lines");
}

#[test]
fn never_panics_on_weird_input() {
    for raw in ["\u{0000}", "🦀🦀🦀", "a\r\nb\rc", "&&&&;;;", "][)(", "\u{202e}rtl"] {
        let _ = clean_text(raw);
    }
}

#[test]
fn mid_word_at_sign_survives_for_deobfuscation() {
    let c = clean_text("my p@ssw0rd leaked");
    assert_eq!(c.text, "my p@ssw0rd leaked");
    assert_eq!(deobfuscate(&c.text), "my password leaked");
}

#[test]
fn deobfuscation_maps_symbols_to_letters() {
    assert_eq!(deobfuscate("p@ssw0rd"), "password");
    assert_eq!(deobfuscate("$3xism"), "sexism");
    assert_eq!(deobfuscate("h!"), "hi");
    assert_eq!(deobfuscate("1oud *nd c1ear"), "loud and clear");
}

#[test]
fn deobfuscation_is_idempotent_without_mapped_symbols() {
    let plain = "nothing to substitute here";
    assert_eq!(deobfuscate(plain), plain);
    assert_eq!(deobfuscate(&deobfuscate(plain)), plain);
}
