use std::sync::LazyLock;

use regex::Regex;

static CONTROL_KEYS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Shift|Control|Alt|Meta|Tab|Enter|Backspace|CapsLock|Escape|Arrow\w*")
        .expect("control-key pattern is valid")
});

static NOT_CODE_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\-]").expect("code-char pattern is valid"));

/// Strip keyboard control-key names and every character outside `[A-Za-z0-9-]`.
pub fn clean_barcode(raw: &str) -> String {
    let without_keys = CONTROL_KEYS.replace_all(raw, "");
    NOT_CODE_CHAR.replace_all(&without_keys, "").into_owned()
}

/// Cleaned code, or `None` if fewer than `min_len` usable characters remain.
pub fn accept_code(raw: &str, min_len: usize) -> Option<String> {
    let cleaned = clean_barcode(raw);
    (cleaned.chars().count() >= min_len && !cleaned.is_empty()).then_some(cleaned)
}
