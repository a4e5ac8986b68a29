//! # Message Sanitization
//!
//! Scrubs error text before it crosses the trust boundary. Filesystem
//! paths, bearer tokens, and secret-bearing key assignments never leave
//! the core; the unsanitized original should only ever be logged at
//! debug level.

const REDACTED: &str = "[redacted]";
const PATH_PLACEHOLDER: &str = "[path]";

/// Key names whose values are secrets wherever they appear, in `key=value`
/// assignments or `key: value` labels.
const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "authorization",
    "credential",
];

/// Sanitize one error message. Token-based scrubbing over whitespace
/// splits, recognizing:
///
/// - `key=value` assignments where the key ends in a sensitive word
/// - `key:` labels with a sensitive word, redacting the following token
/// - `bearer <token>` sequences in any capitalization
/// - absolute unix paths and windows drive paths
pub fn sanitize_message(message: &str) -> String {
    let mut sanitized = Vec::new();
    let mut redact_next = false;

    for token in message.split_whitespace() {
        let lowered = token.to_lowercase();

        if redact_next {
            sanitized.push(REDACTED.to_string());
            // "authorization: Bearer xyz" keeps redacting past the scheme
            redact_next = lowered == "bearer";
            continue;
        }

        if lowered == "bearer" {
            sanitized.push(token.to_string());
            redact_next = true;
        } else if let Some(masked) = mask_assignment(token) {
            sanitized.push(masked);
        } else if is_sensitive_label(&lowered) {
            sanitized.push(token.to_string());
            redact_next = true;
        } else if looks_like_path(token) {
            sanitized.push(PATH_PLACEHOLDER.to_string());
        } else {
            sanitized.push(token.to_string());
        }
    }

    sanitized.join(" ")
}

/// `api_key=abc123` → `api_key=[redacted]`. Keys match on suffix so
/// prefixed forms like `db_password=` are caught too.
fn mask_assignment(token: &str) -> Option<String> {
    let eq = token.find('=')?;
    let key = token[..eq].to_lowercase();
    if SENSITIVE_KEYS
        .iter()
        .any(|sensitive| key.ends_with(sensitive))
    {
        Some(format!("{}={}", &token[..eq], REDACTED))
    } else {
        None
    }
}

fn is_sensitive_label(lowered: &str) -> bool {
    if !lowered.ends_with(':') {
        return false;
    }
    let stem = lowered.trim_end_matches(':');
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| stem.ends_with(sensitive))
}

fn looks_like_path(token: &str) -> bool {
    let trimmed =
        token.trim_matches(|c: char| matches!(c, '\'' | '"' | '(' | ')' | ',' | ';' | '.'));
    if trimmed.len() < 2 {
        return false;
    }
    if trimmed.starts_with('/') {
        return trimmed[1..].chars().any(|c| c.is_ascii_alphanumeric());
    }
    let bytes = trimmed.as_bytes();
    bytes.len() > 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}
