//! Making user and error text safe to echo back into chat.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

const MARKDOWN_CHARS: &[char] = &['\\', '*', '_', '~', '`', '|'];

/// Placeholder for redacted secrets.
pub const REDACTED: &str = "[redacted]";

/// Backslash-escape markdown control characters.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Break `@` mentions with a zero-width space.
pub fn defuse_mentions(text: &str) -> String {
    text.replace('@', "@\u{200B}")
}

/// First `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Replaces known secrets in text shown to users.
#[derive(Default, Clone)]
pub struct Redactor {
    secrets: Vec<SecretString>,
}

impl Redactor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, secret: SecretString) -> Self {
        self.add(secret);
        self
    }

    pub fn add(&mut self, secret: SecretString) {
        if !secret.expose_secret().is_empty() {
            self.secrets.push(secret);
        }
    }

    pub fn redact(&self, text: &str) -> String {
        self.secrets
            .iter()
            .fold(text.to_string(), |acc, secret| {
                acc.replace(secret.expose_secret().as_str(), REDACTED)
            })
    }
}

impl fmt::Debug for Redactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redactor")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("*bold* _it_ `code`"), r"\*bold\* \_it\_ \`code\`");
    }

    #[test]
    fn test_defuse_mentions() {
        assert_eq!(defuse_mentions("@everyone"), "@\u{200B}everyone");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn test_redactor_hides_secrets() {
        let redactor = Redactor::new()
            .with_secret(SecretString::new("s3cr3t".into()))
            .with_secret(SecretString::new(String::new()));
        assert_eq!(
            redactor.redact("token s3cr3t leaked"),
            "token [redacted] leaked"
        );
    }
}
