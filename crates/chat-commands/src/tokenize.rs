//! Splitting argument strings into tokens.

use regex::Regex;
use std::sync::OnceLock;

fn double_quoted() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\s*(?:"(.*?)"|(\S+))\s*"#).unwrap())
}

fn any_quoted() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"\s*(?:"(.*?)"|'(.*?)'|(\S+))\s*"#).unwrap())
}

/// Split `arg_string` into tokens, keeping quoted text together.
///
/// With `limit`, at most that many tokens are returned. The last one holds
/// the rest of the string as written, minus one pair of wrapping quotes.
///
/// ```
/// use chat_commands::tokenize::parse_args;
///
/// assert_eq!(parse_args(r#"foo "bar baz" qux"#, None, false), vec!["foo", "bar baz", "qux"]);
/// assert_eq!(parse_args(r#"foo "bar baz" qux"#, Some(2), false), vec!["foo", r#""bar baz" qux"#]);
/// ```
pub fn parse_args(arg_string: &str, limit: Option<usize>, allow_single_quotes: bool) -> Vec<String> {
    let trimmed = arg_string.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if limit == Some(1) {
        return vec![trimmed.to_string()];
    }

    let pattern = if allow_single_quotes {
        any_quoted()
    } else {
        double_quoted()
    };
    let limit = limit.filter(|&n| n > 0);

    let mut tokens = Vec::new();
    for caps in pattern.captures_iter(trimmed) {
        if limit.is_some_and(|n| tokens.len() + 1 == n) {
            let start = caps.get(0).map_or(trimmed.len(), |m| m.start());
            let rest = strip_wrapping_quotes(&trimmed[start..], allow_single_quotes);
            if !rest.is_empty() {
                tokens.push(rest.to_string());
            }
            break;
        }

        let token = caps.iter().skip(1).flatten().next().map(|m| m.as_str());
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            tokens.push(token.to_string());
        }
    }

    tokens
}

/// Remove one pair of matching quotes wrapping `value`.
pub fn strip_wrapping_quotes(value: &str, allow_single_quotes: bool) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if quote == '\'' && !allow_single_quotes {
            continue;
        }
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}
