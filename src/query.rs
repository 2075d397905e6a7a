//! Query text and the two forms derived from it.
//!
//! The sanitized form goes into a shell command line; the reduced form is
//! what gets searched for literally inside opened documents and emphasized
//! in rendered results.
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    static ref FIELD_FILTER_RE: Regex =
        Regex::new(r"\S+:\S+\s+").expect("valid field filter regex");
}

/// Escapes `text` for use inside a single-quoted shell argument.
///
/// Each `'` closes the quote, emits an escaped quote and reopens it.
pub fn sanitize(text: &str) -> String {
    text.replace('\'', r"'\''")
}

/// Strips engine query syntax, leaving a term for literal searching.
///
/// Double quotes are dropped and every `token:value ` clause is removed
/// together with the whitespace that follows it. Free text that happens to
/// contain a colon is removed as well.
pub fn reduce(text: &str) -> String {
    let unquoted = text.replace('"', "");
    FIELD_FILTER_RE
        .replace_all(&unquoted, "")
        .trim()
        .to_string()
}

/// A query as the user typed it, kept for the lifetime of a search session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Query {
    text: String,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn sanitized(&self) -> String {
        sanitize(&self.text)
    }

    pub fn reduced(&self) -> String {
        reduce(&self.text)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Evaluates a POSIX shell word made of single-quoted runs and `\'`.
    fn shell_unquote(word: &str) -> String {
        let mut out = String::new();
        let mut chars = word.chars();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            match (quoted, c) {
                (false, '\'') | (true, '\'') => quoted = !quoted,
                (false, '\\') => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                (_, c) => out.push(c),
            }
        }
        out
    }

    #[test]
    fn sanitize_escapes_only_single_quotes() {
        assert_eq!(sanitize("it's"), r"it'\''s");
        assert_eq!(sanitize("a \"b\" $HOME `x`"), "a \"b\" $HOME `x`");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn reduce_strips_quotes_and_field_filters() {
        assert_eq!(
            reduce("\"deep learning\" author:smith notes"),
            "deep learning notes"
        );
        assert_eq!(reduce("ext:pdf dir:/tmp invoice"), "invoice");
    }

    #[test]
    fn reduce_keeps_trailing_filter_without_whitespace() {
        assert_eq!(reduce("notes author:smith"), "notes author:smith");
    }

    #[test]
    fn reduce_over_strips_free_text_colons() {
        assert_eq!(reduce("meeting at 10:30 today"), "meeting at today");
    }

    #[test]
    fn query_exposes_both_forms() {
        let q = Query::new("  \"o'neil\" title:report  ");
        assert_eq!(q.as_str(), "\"o'neil\" title:report");
        assert_eq!(q.sanitized(), r#""o'\''neil" title:report"#);
        assert_eq!(q.reduced(), "o'neil title:report");
    }

    #[test]
    fn reduce_is_idempotent_on_documented_example() {
        let once = reduce("\"deep learning\" author:smith notes");
        assert_eq!(reduce(&once), once);
    }

    #[cfg(unix)]
    #[test]
    fn sanitized_query_survives_a_real_shell() {
        let original = "don't 'stop' me $now";
        let script = format!("printf '%s' '{}'", sanitize(original));
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(&script)
            .output()
            .unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), original);
    }

    proptest! {
        #[test]
        fn sanitize_round_trips_through_single_quotes(s in "[a-z' \"$\\\\]{0,24}") {
            let word = format!("'{}'", sanitize(&s));
            prop_assert_eq!(shell_unquote(&word), s);
        }

        #[test]
        fn reduce_is_idempotent(s in "[a-z:\" ]{0,32}") {
            let once = reduce(&s);
            prop_assert_eq!(reduce(&once), once);
        }
    }
}
