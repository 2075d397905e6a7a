//! Builds the linked outline shown for one page of results.
use crate::error::Result;
use crate::report::{Listing, ResultRecord};
use colored::Colorize;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Coarse grouping derived from a record's MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Text,
    Inode,
    Email,
    Image,
    Application,
    Other(String),
}

impl Category {
    pub fn from_mime(mime: &str) -> Self {
        if mime == "message/rfc822" {
            Category::Email
        } else if mime.starts_with("text/") {
            Category::Text
        } else if mime.starts_with("inode/") {
            Category::Inode
        } else if mime.starts_with("image/") {
            Category::Image
        } else if mime.starts_with("application/") {
            Category::Application
        } else {
            Category::Other(mime.to_string())
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Text => f.write_str("text"),
            Category::Inode => f.write_str("inode"),
            Category::Email => f.write_str("e-mail"),
            Category::Image => f.write_str("image"),
            Category::Application => f.write_str("application"),
            Category::Other(mime) => f.write_str(mime),
        }
    }
}

impl Serialize for Category {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub target: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// One-based rank across the whole result set.
    pub rank: usize,
    pub link: Link,
    pub mime: String,
    pub title: String,
    pub size: Option<u64>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub category: Category,
    pub entries: Vec<Entry>,
}

/// A formatted page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedDocument {
    pub query: String,
    pub term: String,
    pub start: usize,
    pub end: usize,
    pub header: Vec<String>,
    pub sections: Vec<Section>,
    pub notes: Vec<String>,
}

impl FormattedDocument {
    pub fn window_label(&self) -> String {
        format!("Results: {} - {}", self.start, self.end)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.sections.iter().flat_map(|s| s.entries.iter())
    }

    pub fn entry_count(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }

    /// Entry by its rank, as shown next to it in the text rendering.
    pub fn entry_by_rank(&self, rank: usize) -> Option<&Entry> {
        self.entries().find(|e| e.rank == rank)
    }
}

/// Turns parsed engine output into a [`FormattedDocument`].
pub struct ResultFormatter {
    fill_column: usize,
}

impl ResultFormatter {
    pub fn new(fill_column: usize) -> Self {
        Self {
            fill_column: fill_column.max(1),
        }
    }

    pub fn build(
        &self,
        query: &str,
        term: &str,
        (start, end): (usize, usize),
        header: Vec<String>,
        listing: Listing,
    ) -> FormattedDocument {
        let mut sections: Vec<Section> = Vec::new();

        for (offset, record) in listing.records.into_iter().enumerate() {
            let category = Category::from_mime(&record.mime);
            let entry = entry_from_record(start + offset + 1, record);
            match sections.last_mut() {
                Some(section) if section.category == category => section.entries.push(entry),
                _ => sections.push(Section {
                    category,
                    entries: vec![entry],
                }),
            }
        }

        FormattedDocument {
            query: query.to_string(),
            term: term.to_string(),
            start,
            end,
            header,
            sections,
            notes: listing.stray,
        }
    }

    /// Org-mode outline with `[[target][label]]` links.
    pub fn to_org(&self, doc: &FormattedDocument) -> Result<String> {
        let emphasis = Emphasis::new(&doc.term)?;
        let mut out = String::new();

        out.push_str(&format!("#+TITLE: Recoll search: {}\n", doc.query));
        out.push_str(&format!("* {}\n", doc.window_label()));
        self.push_paragraph(&mut out, &doc.header.join("\n"), &emphasis, OrgMarkup);
        for note in &doc.notes {
            self.push_paragraph(&mut out, note, &emphasis, OrgMarkup);
        }

        for section in &doc.sections {
            out.push_str(&format!("** {}\n", section.category));
            for entry in &section.entries {
                out.push_str(&format!(
                    "*** [[{}][{}]]\n",
                    org_link_target(&entry.link.target),
                    org_link_label(&entry.link.label)
                ));
                self.push_paragraph(&mut out, &entry.abstract_text, &emphasis, OrgMarkup);
            }
        }

        Ok(out)
    }

    /// Numbered, coloured listing for the terminal.
    pub fn to_text(&self, doc: &FormattedDocument, color: bool) -> Result<String> {
        let emphasis = Emphasis::new(&doc.term)?;
        let markup = TerminalMarkup { color };
        let mut out = String::new();

        let label = doc.window_label();
        out.push_str(&format!("{}\n", paint(&label, color, |s| s.green().bold())));
        self.push_paragraph(&mut out, &doc.header.join("\n"), &emphasis, markup);
        for note in &doc.notes {
            self.push_paragraph(&mut out, note, &emphasis, markup);
        }

        if doc.is_empty() {
            out.push_str(&format!(
                "{}\n",
                paint("No results on this page", color, |s| s.yellow())
            ));
        }

        for section in &doc.sections {
            let heading = section.category.to_string();
            out.push_str(&format!("\n{}\n", paint(&heading, color, |s| s.cyan().bold())));
            for entry in &section.entries {
                let rank = format!("[{}]", entry.rank);
                out.push_str(&format!(
                    "{} {}  {}\n",
                    paint(&rank, color, |s| s.yellow()),
                    paint(&entry.link.label, color, |s| s.bold()),
                    paint(&entry.link.target, color, |s| s.dimmed())
                ));
                self.push_paragraph(&mut out, &entry.abstract_text, &emphasis, markup);
            }
        }

        Ok(out)
    }

    pub fn to_json(&self, doc: &FormattedDocument) -> Result<String> {
        Ok(serde_json::to_string_pretty(doc)?)
    }

    fn push_paragraph(
        &self,
        out: &mut String,
        text: &str,
        emphasis: &Emphasis,
        markup: impl Markup,
    ) {
        if text.trim().is_empty() {
            return;
        }
        let filled = fill(text, self.fill_column);
        for line in emphasis.apply(&filled, &markup).lines() {
            out.push_str(&markup.body_line(line));
            out.push('\n');
        }
    }
}

fn entry_from_record(rank: usize, record: ResultRecord) -> Entry {
    let link = Link {
        target: record.target().to_string(),
        label: record.file_name(),
    };
    Entry {
        rank,
        link,
        mime: record.mime,
        title: record.title,
        size: record.size,
        abstract_text: record.abstract_text,
    }
}

fn paint(text: &str, color: bool, style: impl Fn(&str) -> colored::ColoredString) -> String {
    if color {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

/// Re-fills each blank-line separated paragraph to `width` columns.
pub fn fill(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(fill_words(&current, width));
                current.clear();
            }
        } else {
            current.extend(line.split_whitespace());
        }
    }
    if !current.is_empty() {
        paragraphs.push(fill_words(&current, width));
    }

    paragraphs.join("\n\n")
}

fn fill_words(words: &[&str], width: usize) -> String {
    let mut out = String::new();
    let mut line_len = 0;
    for word in words {
        let len = word.chars().count();
        if line_len > 0 && line_len + 1 + len > width {
            out.push('\n');
            line_len = 0;
        } else if line_len > 0 {
            out.push(' ');
            line_len += 1;
        }
        out.push_str(word);
        line_len += len;
    }
    out
}

trait Markup {
    fn emphasize(&self, text: &str) -> String;

    fn body_line<'t>(&self, line: &'t str) -> Cow<'t, str> {
        Cow::Borrowed(line)
    }
}

#[derive(Clone, Copy)]
struct OrgMarkup;

impl Markup for OrgMarkup {
    fn emphasize(&self, text: &str) -> String {
        format!("*/{text}/*")
    }

    /// Body text must not read as a headline.
    fn body_line<'t>(&self, line: &'t str) -> Cow<'t, str> {
        let stars = line.trim_start_matches('*');
        if stars.len() < line.len() && (stars.is_empty() || stars.starts_with(char::is_whitespace)) {
            Cow::Owned(format!(",{line}"))
        } else {
            Cow::Borrowed(line)
        }
    }
}

/// Percent-escapes the characters that would end an Org link early.
fn org_link_target(target: &str) -> String {
    target
        .replace('%', "%25")
        .replace('[', "%5B")
        .replace(']', "%5D")
}

fn org_link_label(label: &str) -> String {
    label.replace('[', "%5B").replace(']', "%5D")
}

#[derive(Clone, Copy)]
struct TerminalMarkup {
    color: bool,
}

impl Markup for TerminalMarkup {
    fn emphasize(&self, text: &str) -> String {
        if self.color {
            text.bold().italic().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Case-insensitive matcher for the reduced query term.
///
/// Words of the term may be separated by any run of whitespace so that a
/// match survives being wrapped across lines.
struct Emphasis {
    pattern: Option<Regex>,
}

impl Emphasis {
    fn new(term: &str) -> Result<Self> {
        let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
        if words.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = Regex::new(&format!("(?i){}", words.join(r"\s+")))?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    fn apply(&self, text: &str, markup: &impl Markup) -> String {
        match &self.pattern {
            Some(re) => re
                .replace_all(text, |caps: &regex::Captures| markup.emphasize(&caps[0]))
                .into_owned(),
            None => text.to_string(),
        }
    }
}
