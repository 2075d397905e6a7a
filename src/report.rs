//! Parser for the engine's plain-text report.
//!
//! A listing is a sequence of records, each one line of the form
//!
//! ```text
//! text/plain	[file:///a/b/report.txt]	[report.txt]	2048	bytes
//! ```
//!
//! optionally followed by an `ABSTRACT` ... `/ABSTRACT` block.
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

lazy_static! {
    static ref RECORD_RE: Regex = Regex::new(
        r"^(?P<mime>[\w.+-]+/[\w.+-]+)\s+\[(?P<url>.*?)\]\s+\[(?P<title>[^\]]*)\](?:\s+(?P<size>\d+)\s+bytes)?"
    )
    .expect("valid record regex");
}

const ABSTRACT_OPEN: &str = "ABSTRACT";
const ABSTRACT_CLOSE: &str = "/ABSTRACT";

/// One match as listed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultRecord {
    pub mime: String,
    pub url: String,
    pub title: String,
    pub size: Option<u64>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

impl ResultRecord {
    /// Filesystem path for `file://` URLs, the URL itself otherwise.
    pub fn target(&self) -> &str {
        self.url.strip_prefix("file://").unwrap_or(&self.url)
    }

    /// Final component of the target.
    pub fn file_name(&self) -> String {
        let target = self.target().trim_end_matches('/');
        Path::new(target)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| target.to_string())
    }
}

/// Records in engine order plus any lines that belonged to none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub records: Vec<ResultRecord>,
    pub stray: Vec<String>,
}

pub fn parse_listing(text: &str) -> Listing {
    let mut listing = Listing::default();
    let mut in_abstract = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if in_abstract {
            if trimmed == ABSTRACT_CLOSE {
                in_abstract = false;
            } else if let Some(record) = listing.records.last_mut() {
                // Some engine versions close the block on the same line.
                let body = trimmed.strip_suffix(ABSTRACT_CLOSE).map(str::trim_end);
                push_abstract_line(record, body.unwrap_or(trimmed));
                if body.is_some() {
                    in_abstract = false;
                }
            }
            continue;
        }

        if let Some(caps) = RECORD_RE.captures(line) {
            listing.records.push(ResultRecord {
                mime: caps["mime"].to_string(),
                url: caps["url"].to_string(),
                title: caps["title"].to_string(),
                size: caps.name("size").and_then(|m| m.as_str().parse().ok()),
                abstract_text: String::new(),
            });
        } else if trimmed == ABSTRACT_OPEN && !listing.records.is_empty() {
            in_abstract = true;
        } else if !trimmed.is_empty() && trimmed != ABSTRACT_CLOSE {
            listing.stray.push(line.to_string());
        }
    }

    listing
}

fn push_abstract_line(record: &mut ResultRecord, line: &str) {
    if line.is_empty() {
        return;
    }
    if !record.abstract_text.is_empty() {
        record.abstract_text.push(' ');
    }
    record.abstract_text.push_str(line);
}

/// Non-blank header lines, as printed.
pub fn parse_header(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_RECORDS: &str = "text/plain\t[file:///a/b/report.txt]\t[report.txt]\t2048\tbytes\t\n\
ABSTRACT\n\
 The project plan for\n\
 next quarter.\n\
/ABSTRACT\n\
message/rfc822\t[file:///mail/inbox/42]\t[Re: plan]\t512\tbytes\t\n";

    #[test]
    fn parses_records_with_and_without_abstracts() {
        let listing = parse_listing(TWO_RECORDS);
        assert_eq!(listing.records.len(), 2);
        assert!(listing.stray.is_empty());

        let first = &listing.records[0];
        assert_eq!(first.mime, "text/plain");
        assert_eq!(first.target(), "/a/b/report.txt");
        assert_eq!(first.file_name(), "report.txt");
        assert_eq!(first.size, Some(2048));
        assert_eq!(first.abstract_text, "The project plan for next quarter.");

        let second = &listing.records[1];
        assert_eq!(second.title, "Re: plan");
        assert_eq!(second.file_name(), "42");
        assert!(second.abstract_text.is_empty());
    }

    #[test]
    fn inline_abstract_close_is_accepted() {
        let text = "text/html\t[file:///w/index.html]\t[Home]\t10\tbytes\nABSTRACT\nwelcome home /ABSTRACT\n";
        let listing = parse_listing(text);
        assert_eq!(listing.records[0].abstract_text, "welcome home");
    }

    #[test]
    fn non_file_urls_keep_the_url_as_target() {
        let text = "text/html\t[https://example.org/docs/page]\t[Page]\n";
        let record = &parse_listing(text).records[0];
        assert_eq!(record.target(), "https://example.org/docs/page");
        assert_eq!(record.file_name(), "page");
        assert_eq!(record.size, None);
    }

    #[test]
    fn unrecognised_lines_are_kept_aside() {
        let listing = parse_listing("Abnormal termination\n\n");
        assert!(listing.records.is_empty());
        assert_eq!(listing.stray, vec!["Abnormal termination"]);
    }

    #[test]
    fn header_drops_blank_lines() {
        assert_eq!(
            parse_header("Recoll query: (plan)\n\n5 results\n"),
            vec!["Recoll query: (plan)", "5 results"]
        );
    }
}
