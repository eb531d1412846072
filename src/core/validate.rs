//! Normalization and validity rules for generated alternatives

use crate::config;
use crate::types::AssetType;

const LABEL: &str = "alternative:";

/// Canonicalize raw model output: strip echoed `Alternative:` labels,
/// collapse line breaks and whitespace runs to single spaces, trim, and drop
/// trailing periods.
///
/// Normalization is idempotent; both the label strip and the trailing-period
/// strip run to a fixpoint rather than once.
pub fn normalize(raw: &str) -> String {
    let mut text = raw.trim();

    loop {
        let stripped = strip_label(text);
        if stripped.len() == text.len() {
            break;
        }
        text = stripped;
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = collapsed.as_str();
    loop {
        let trimmed = out.trim_end().trim_end_matches('.');
        if trimmed.len() == out.len() {
            break;
        }
        out = trimmed;
    }
    out.to_string()
}

fn strip_label(text: &str) -> &str {
    match text.get(..LABEL.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(LABEL) => text[LABEL.len()..].trim_start(),
        _ => text,
    }
}

/// `?`, `!` and `"` are illegal anywhere in an alternative, not only as
/// delimiters. Empty text is invalid.
pub fn is_valid(text: &str) -> bool {
    !text.is_empty() && !text.chars().any(|c| matches!(c, '?' | '!' | '"'))
}

/// Length ceiling for an asset-type label; unknown labels use the default.
pub fn ceiling_for(asset_type: &str) -> usize {
    AssetType::parse(asset_type)
        .map(|t| t.max_chars())
        .unwrap_or(config::DEFAULT_MAX_CHARS)
}

/// Ceiling check in characters, not bytes. Exact fit is accepted; anything
/// longer is rejected, never truncated.
pub fn within_length(text: &str, asset_type: &str) -> bool {
    text.chars().count() <= ceiling_for(asset_type)
}
