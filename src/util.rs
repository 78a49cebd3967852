use std::sync::Once;

static INIT_ONCE: Once = Once::new();

/// Install the global tracing subscriber once. Honors RUST_LOG, defaults to "info".
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Turn a model label into a safe SQLite column name: lowercase, with every
/// non-alphanumeric run collapsed to a single underscore.
/// "identity_attack" stays as-is; "HATE" becomes "hate"; "sexual explicit"
/// becomes "sexual_explicit".
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_underscore = false;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_underscore = false;
        } else if !last_underscore && !out.is_empty() {
            out.push('_');
            last_underscore = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("label");
    }
    out
}
