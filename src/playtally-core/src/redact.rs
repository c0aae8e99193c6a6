//! Redaction of secrets in strings that end up in logs.

use std::borrow::Cow;

/// Patterns whose following value is sensitive.
const SENSITIVE_PATTERNS: &[(&str, &str)] = &[
    ("api_key=", "api_key=[REDACTED]"),
    ("password=", "password=[REDACTED]"),
    ("sk=", "sk=[REDACTED]"),
    ("token=", "token=[REDACTED]"),
];

/// Daemon protocol command that carries a password argument.
const PASSWORD_COMMAND: &str = "password ";

/// Redact query parameters carrying keys or passwords and the argument of a
/// daemon `password` command line.
///
/// ```
/// use playtally_core::redact::redact_secrets;
///
/// let url = "https://ws.audioscrobbler.com/2.0/?method=artist.getsimilar&api_key=abc123";
/// assert!(!redact_secrets(url).contains("abc123"));
/// assert_eq!(redact_secrets("password \"hunter2\""), "password [REDACTED]");
/// ```
pub fn redact_secrets(input: &str) -> Cow<'_, str> {
    if input.starts_with(PASSWORD_COMMAND) {
        return Cow::Owned(format!("{PASSWORD_COMMAND}[REDACTED]"));
    }

    let mut result = Cow::Borrowed(input);
    for (pattern, replacement) in SENSITIVE_PATTERNS {
        if result.contains(pattern) {
            let redacted = redact_pattern_value(&result, pattern, replacement);
            result = Cow::Owned(redacted);
        }
    }
    result
}

/// Replace the value after each occurrence of `pattern`, up to the next
/// delimiter.
fn redact_pattern_value(input: &str, pattern: &str, replacement: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;

    while let Some(pos) = remaining.find(pattern) {
        // `sk=` must not fire inside `task=` and the like.
        let boundary = remaining[..pos]
            .chars()
            .last()
            .map_or(true, |c| matches!(c, '?' | '&' | ' ' | '"'));
        if !boundary {
            let skip = pos + pattern.len();
            result.push_str(&remaining[..skip]);
            remaining = &remaining[skip..];
            continue;
        }

        result.push_str(&remaining[..pos]);
        result.push_str(replacement);

        let after_pattern = &remaining[pos + pattern.len()..];
        let end = after_pattern
            .find(|c: char| c.is_whitespace() || c == '&' || c == '"' || c == '\'')
            .unwrap_or(after_pattern.len());
        remaining = &after_pattern[end..];
    }

    result.push_str(remaining);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_api_key_query_param() {
        let input = "https://ws.audioscrobbler.com/2.0/?method=artist.getsimilar&artist=Low&api_key=deadbeef&format=json";
        let output = redact_secrets(input);
        assert!(!output.contains("deadbeef"));
        assert!(output.contains("api_key=[REDACTED]"));
        assert!(output.contains("format=json"));
        assert!(output.contains("artist=Low"));
    }

    #[test]
    fn redacts_password_command() {
        assert_eq!(redact_secrets("password \"s3cret\""), "password [REDACTED]");
    }

    #[test]
    fn leaves_other_commands_alone() {
        assert_eq!(redact_secrets("playlistinfo"), "playlistinfo");
        assert!(matches!(redact_secrets("status"), Cow::Borrowed(_)));
    }

    #[test]
    fn pattern_needs_a_boundary() {
        let input = "https://example.com/?task=scan&sk=abc";
        let output = redact_secrets(input);
        assert!(output.contains("task=scan"));
        assert!(!output.contains("abc"));
    }
}
