//! A read-only terminal view of an opened document.
use crate::config::OpenConfig;
use crate::dispatch::{FileKind, Viewer};
use crate::error::{RecollOutlineError, Result};
use crate::query::sanitize;
use colored::Colorize;
use log::{debug, info};
use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::env;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

const DEFAULT_WIDTH: usize = 80;
const PREVIEW_LINES: usize = 40;

/// One line matching the search term, with its surroundings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub line_number: usize,
    pub line: String,
    pub context_before: Vec<(usize, String)>,
    pub context_after: Vec<(usize, String)>,
}

/// Case-insensitive literal search over `text`, line by line.
pub fn find_hits(text: &str, term: &str, context_lines: usize) -> Result<Vec<Hit>> {
    let re = term_regex(term)?;
    let lines: Vec<&str> = text.lines().collect();
    let mut hits = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !re.is_match(line) {
            continue;
        }
        let start_idx = i.saturating_sub(context_lines);
        let end_idx = (i + context_lines + 1).min(lines.len());
        hits.push(Hit {
            line_number: i + 1,
            line: line.to_string(),
            context_before: (start_idx..i)
                .map(|idx| (idx + 1, lines[idx].to_string()))
                .collect(),
            context_after: ((i + 1)..end_idx)
                .map(|idx| (idx + 1, lines[idx].to_string()))
                .collect(),
        });
    }

    Ok(hits)
}

fn term_regex(term: &str) -> Result<Regex> {
    Ok(Regex::new(&format!("(?i){}", regex::escape(term)))?)
}

/// Whether the program a command line starts with can be found.
pub fn command_available(command_line: &str) -> bool {
    let Some(program) = command_line.split_whitespace().next() else {
        return false;
    };
    if program.contains('/') {
        return Path::new(program).is_file();
    }
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

fn run_capture(command_line: &str) -> Result<String> {
    debug!("Running viewer helper: {command_line}");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command_line)
        .stdin(Stdio::null())
        .output()?;
    if !output.status.success() {
        return Err(RecollOutlineError::MissingCapability(format!(
            "`{command_line}` failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub struct TerminalViewer {
    path: PathBuf,
    kind: FileKind,
    config: OpenConfig,
    content: Option<String>,
    cache_dir: Option<PathBuf>,
    width: usize,
    color: bool,
    read_only: bool,
    searched: bool,
    output: Vec<String>,
}

impl TerminalViewer {
    pub fn open(path: &Path, mime: Option<&str>, config: &OpenConfig, color: bool) -> Result<Self> {
        let kind = FileKind::detect(path, mime);
        let content = match kind {
            FileKind::PagedImage => None,
            FileKind::Markup | FileKind::Text => {
                Some(String::from_utf8_lossy(&fs::read(path)?).into_owned())
            }
        };
        info!("Opened {} as {:?}", path.display(), kind);

        Ok(Self {
            path: path.to_path_buf(),
            kind,
            config: config.clone(),
            content,
            cache_dir: dirs::cache_dir().map(|d| d.join("recoll-outline")),
            width: DEFAULT_WIDTH,
            color,
            read_only: false,
            searched: false,
            output: Vec::new(),
        })
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Everything the view shows: a banner, then hits or a preview.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        let mut banner = format!("{}", self.path.display());
        if self.read_only {
            banner.push_str(" [read-only]");
        }
        lines.push(if self.color {
            banner.green().bold().to_string()
        } else {
            banner
        });

        if self.searched {
            lines.extend(self.output.iter().cloned());
        } else if let Some(content) = &self.content {
            lines.extend(
                content
                    .lines()
                    .take(PREVIEW_LINES)
                    .map(|l| clip(l, self.width)),
            );
        }
        lines.join("\n")
    }

    fn quoted_path(&self) -> String {
        format!("'{}'", sanitize(&self.path.to_string_lossy()))
    }

    fn cache_path(&self) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.cache_dir else {
            return Ok(None);
        };
        let metadata = fs::metadata(&self.path)?;
        let mut hasher = DefaultHasher::new();
        self.path.hash(&mut hasher);
        metadata.len().hash(&mut hasher);
        if let Ok(modified) = metadata.modified() {
            modified.hash(&mut hasher);
        }
        Ok(Some(dir.join(format!("{:016x}.txt", hasher.finish()))))
    }

    fn extracted_text(&self) -> Result<String> {
        let cache = self.cache_path()?;
        if let Some(cached) = cache.as_ref().filter(|p| p.is_file()) {
            debug!("Using cached text {}", cached.display());
            return Ok(fs::read_to_string(cached)?);
        }

        let text = run_capture(&format!(
            "{} {} -",
            self.config.text_extractor,
            self.quoted_path()
        ))?;
        if let Some(cache) = cache {
            if let Some(parent) = cache.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&cache, &text)?;
            debug!("Cached extracted text at {}", cache.display());
        }
        Ok(text)
    }

    fn record_hits(&mut self, text: &str, term: &str) -> Result<usize> {
        let hits = find_hits(text, term, self.config.context_lines)?;
        let re = term_regex(term)?;
        self.searched = true;
        self.output.clear();

        let summary = format!("{} line(s) matching '{}'", hits.len(), term);
        self.output.push(if self.color {
            summary.cyan().to_string()
        } else {
            summary
        });

        for hit in &hits {
            self.output.push("-".repeat(self.width.min(DEFAULT_WIDTH)));
            for (num, line) in &hit.context_before {
                self.output.push(format!("  {num} │ {}", clip(line, self.width)));
            }
            let line = clip(&hit.line, self.width);
            let line = if self.color {
                re.replace_all(&line, |c: &regex::Captures| {
                    c[0].yellow().bold().to_string()
                })
                .into_owned()
            } else {
                line
            };
            self.output.push(format!("→ {} │ {line}", hit.line_number));
            for (num, line) in &hit.context_after {
                self.output.push(format!("  {num} │ {}", clip(line, self.width)));
            }
        }
        Ok(hits.len())
    }
}

fn clip(line: &str, width: usize) -> String {
    line.chars().take(width).collect()
}

impl Viewer for TerminalViewer {
    fn file_kind(&self) -> FileKind {
        self.kind
    }

    fn is_paged(&self) -> bool {
        self.kind == FileKind::PagedImage
    }

    fn can_render_markup(&self) -> bool {
        command_available(&self.config.markup_renderer)
    }

    fn has_native_search(&self) -> bool {
        self.content.is_some()
    }

    fn has_cached_text_search(&self) -> bool {
        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        self.config
            .extractable_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(&ext))
            && command_available(&self.config.text_extractor)
    }

    fn render_markup(&mut self) -> Result<()> {
        let rendered = run_capture(&format!(
            "{} {}",
            self.config.markup_renderer,
            self.quoted_path()
        ))?;
        self.content = Some(rendered);
        Ok(())
    }

    fn fit_page(&mut self) -> Result<()> {
        self.width = crossterm::terminal::size()
            .map(|(cols, _)| usize::from(cols))
            .unwrap_or(DEFAULT_WIDTH)
            .max(1);
        debug!("Fitted page to {} columns", self.width);
        Ok(())
    }

    fn native_search(&mut self, term: &str) -> Result<usize> {
        let content = self.content.clone().ok_or_else(|| {
            RecollOutlineError::MissingCapability("document has no text to search".to_string())
        })?;
        self.record_hits(&content, term)
    }

    fn cached_text_search(&mut self, term: &str) -> Result<usize> {
        let text = self.extracted_text()?;
        self.record_hits(&text, term)
    }

    fn set_read_only(&mut self) {
        self.read_only = true;
    }
}
