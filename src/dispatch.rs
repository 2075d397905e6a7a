//! What happens after a result has been opened.
use crate::config::OpenConfig;
use crate::error::{RecollOutlineError, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::Path;

const MARKUP_EXTENSIONS: &[&str] = &["html", "htm", "xhtml", "shtml"];
const MARKUP_MIMES: &[&str] = &["text/html", "application/xhtml+xml"];
const PAGED_EXTENSIONS: &[&str] = &["pdf", "ps", "eps", "djvu", "dvi"];
const PAGED_MIMES: &[&str] = &[
    "application/pdf",
    "application/postscript",
    "image/vnd.djvu",
    "application/x-dvi",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileKind {
    Markup,
    PagedImage,
    Text,
}

impl FileKind {
    /// Uses the engine's MIME type when it is decisive, else the extension.
    pub fn detect(path: &Path, mime: Option<&str>) -> Self {
        if let Some(mime) = mime {
            if MARKUP_MIMES.contains(&mime) {
                return FileKind::Markup;
            }
            if PAGED_MIMES.contains(&mime) {
                return FileKind::PagedImage;
            }
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if MARKUP_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Markup
        } else if PAGED_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::PagedImage
        } else {
            FileKind::Text
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SearchBackend {
    Native,
    CachedText,
}

/// A viewing surface holding one opened document.
#[cfg_attr(test, mockall::automock)]
pub trait Viewer {
    fn file_kind(&self) -> FileKind;

    /// True for page-oriented viewers (PDF, PostScript, DjVu).
    fn is_paged(&self) -> bool;

    fn can_render_markup(&self) -> bool;
    fn has_native_search(&self) -> bool;
    fn has_cached_text_search(&self) -> bool;

    fn render_markup(&mut self) -> Result<()>;
    fn fit_page(&mut self) -> Result<()>;

    /// Returns the number of matching lines.
    fn native_search(&mut self, term: &str) -> Result<usize>;
    fn cached_text_search(&mut self, term: &str) -> Result<usize>;

    fn set_read_only(&mut self);
}

/// Lets the user confirm or edit the term before searching.
#[cfg_attr(test, mockall::automock)]
pub trait Prompter {
    fn confirm_term(&self, term: &str) -> Result<String>;
}

/// Asks on the terminal through dialoguer.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm_term(&self, term: &str) -> Result<String> {
        let answer: String = dialoguer::Input::new()
            .with_prompt("Search file for")
            .default(term.to_string())
            .allow_empty(true)
            .interact_text()?;
        Ok(answer)
    }
}

/// Accepts the suggested term unchanged; for non-interactive runs.
pub struct AcceptPrompter;

impl Prompter for AcceptPrompter {
    fn confirm_term(&self, term: &str) -> Result<String> {
        Ok(term.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Step {
    RenderedMarkup,
    FitPage,
    Searched {
        term: String,
        backend: SearchBackend,
        hits: usize,
    },
    ReadOnly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub steps: Vec<Step>,
    pub notices: Vec<String>,
}

impl DispatchReport {
    fn notice(&mut self, message: String) {
        warn!("{message}");
        self.notices.push(message);
    }

    /// Records recoverable failures as notices and propagates the rest.
    fn absorb(&mut self, result: Result<Step>) -> Result<()> {
        match result {
            Ok(step) => {
                debug!("Post-open step done: {step:?}");
                self.steps.push(step);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                self.notice(e.to_string());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub render_markup: bool,
    pub auto_file_search: bool,
    pub prompt_before_search: bool,
    pub read_only: bool,
}

impl From<&OpenConfig> for DispatchOptions {
    fn from(config: &OpenConfig) -> Self {
        Self {
            render_markup: config.render_markup,
            auto_file_search: config.auto_file_search,
            prompt_before_search: config.prompt_before_search,
            read_only: config.result_read_only,
        }
    }
}

pub struct Dispatcher {
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(options: DispatchOptions) -> Self {
        Self { options }
    }

    /// Runs render, fit, search and read-only steps in that order.
    pub fn dispatch(
        &self,
        viewer: &mut dyn Viewer,
        term: &str,
        prompter: &dyn Prompter,
    ) -> Result<DispatchReport> {
        let mut report = DispatchReport::default();

        if self.options.render_markup && viewer.file_kind() == FileKind::Markup {
            let rendered = if viewer.can_render_markup() {
                viewer.render_markup().map(|_| Step::RenderedMarkup)
            } else {
                Err(RecollOutlineError::MissingCapability(
                    "no markup renderer found; showing source".to_string(),
                ))
            };
            report.absorb(rendered)?;
        }

        if viewer.is_paged() {
            report.absorb(viewer.fit_page().map(|_| Step::FitPage))?;
        }

        if self.options.auto_file_search {
            let term = if self.options.prompt_before_search {
                prompter.confirm_term(term)?
            } else {
                term.to_string()
            };
            let term = term.trim();
            if term.is_empty() {
                info!("No search term; skipping in-document search");
            } else {
                let searched = search(viewer, term);
                report.absorb(searched)?;
            }
        }

        if self.options.read_only {
            viewer.set_read_only();
            report.steps.push(Step::ReadOnly);
        }

        Ok(report)
    }
}

fn search(viewer: &mut dyn Viewer, term: &str) -> Result<Step> {
    let backend = if viewer.is_paged() && !viewer.has_native_search() {
        if viewer.has_cached_text_search() {
            SearchBackend::CachedText
        } else {
            return Err(RecollOutlineError::MissingCapability(
                "this viewer has no text search and no text extractor is available".to_string(),
            ));
        }
    } else {
        SearchBackend::Native
    };

    let hits = match backend {
        SearchBackend::Native => viewer.native_search(term)?,
        SearchBackend::CachedText => viewer.cached_text_search(term)?,
    };
    Ok(Step::Searched {
        term: term.to_string(),
        backend,
        hits,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn all_on() -> DispatchOptions {
        DispatchOptions {
            render_markup: true,
            auto_file_search: true,
            prompt_before_search: false,
            read_only: true,
        }
    }

    fn text_viewer() -> MockViewer {
        let mut viewer = MockViewer::new();
        viewer.expect_file_kind().return_const(FileKind::Text);
        viewer.expect_is_paged().return_const(false);
        viewer.expect_has_native_search().return_const(true);
        viewer
    }

    #[test]
    fn detects_kind_from_mime_then_extension() {
        assert_eq!(FileKind::detect(Path::new("/x/a.HTML"), None), FileKind::Markup);
        assert_eq!(FileKind::detect(Path::new("/x/a.pdf"), None), FileKind::PagedImage);
        assert_eq!(FileKind::detect(Path::new("/x/a.txt"), None), FileKind::Text);
        assert_eq!(
            FileKind::detect(Path::new("/mail/42"), Some("text/html")),
            FileKind::Markup
        );
        assert_eq!(
            FileKind::detect(Path::new("/x/a.txt"), Some("text/plain")),
            FileKind::Text
        );
    }

    #[test]
    fn text_file_gets_native_search_then_read_only() {
        let mut viewer = text_viewer();
        viewer
            .expect_native_search()
            .with(eq("plan"))
            .times(1)
            .returning(|_| Ok(3));
        viewer.expect_set_read_only().times(1).return_const(());

        let report = Dispatcher::new(all_on())
            .dispatch(&mut viewer, "plan", &AcceptPrompter)
            .unwrap();
        assert_eq!(
            report.steps,
            vec![
                Step::Searched {
                    term: "plan".into(),
                    backend: SearchBackend::Native,
                    hits: 3
                },
                Step::ReadOnly
            ]
        );
        assert!(report.notices.is_empty());
    }

    #[test]
    fn markup_is_rendered_before_searching() {
        let mut viewer = MockViewer::new();
        let mut seq = mockall::Sequence::new();
        viewer.expect_file_kind().return_const(FileKind::Markup);
        viewer.expect_is_paged().return_const(false);
        viewer.expect_has_native_search().return_const(true);
        viewer.expect_can_render_markup().return_const(true);
        viewer
            .expect_render_markup()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        viewer
            .expect_native_search()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(1));

        let mut options = all_on();
        options.read_only = false;
        let report = Dispatcher::new(options)
            .dispatch(&mut viewer, "home", &AcceptPrompter)
            .unwrap();
        assert_eq!(report.steps[0], Step::RenderedMarkup);
    }

    #[test]
    fn missing_renderer_is_a_notice_not_an_error() {
        let mut viewer = MockViewer::new();
        viewer.expect_file_kind().return_const(FileKind::Markup);
        viewer.expect_is_paged().return_const(false);
        viewer.expect_can_render_markup().return_const(false);
        viewer.expect_render_markup().never();

        let options = DispatchOptions {
            auto_file_search: false,
            read_only: false,
            ..all_on()
        };
        let report = Dispatcher::new(options)
            .dispatch(&mut viewer, "home", &AcceptPrompter)
            .unwrap();
        assert!(report.steps.is_empty());
        assert_eq!(report.notices.len(), 1);
    }

    #[test]
    fn paged_viewer_fits_page_and_uses_cached_text() {
        let mut viewer = MockViewer::new();
        viewer.expect_file_kind().return_const(FileKind::PagedImage);
        viewer.expect_is_paged().return_const(true);
        viewer.expect_has_native_search().return_const(false);
        viewer.expect_has_cached_text_search().return_const(true);
        viewer.expect_fit_page().times(1).returning(|| Ok(()));
        viewer
            .expect_cached_text_search()
            .with(eq("budget"))
            .returning(|_| Ok(2));
        viewer.expect_native_search().never();

        let options = DispatchOptions {
            read_only: false,
            ..all_on()
        };
        let report = Dispatcher::new(options)
            .dispatch(&mut viewer, "budget", &AcceptPrompter)
            .unwrap();
        assert_eq!(report.steps[0], Step::FitPage);
        assert!(matches!(
            report.steps[1],
            Step::Searched {
                backend: SearchBackend::CachedText,
                hits: 2,
                ..
            }
        ));
    }

    #[test]
    fn paged_viewer_without_extractor_reports_once() {
        let mut viewer = MockViewer::new();
        viewer.expect_file_kind().return_const(FileKind::PagedImage);
        viewer.expect_is_paged().return_const(true);
        viewer.expect_has_native_search().return_const(false);
        viewer.expect_has_cached_text_search().return_const(false);
        viewer.expect_fit_page().returning(|| Ok(()));
        viewer.expect_set_read_only().return_const(());

        let report = Dispatcher::new(all_on())
            .dispatch(&mut viewer, "budget", &AcceptPrompter)
            .unwrap();
        assert_eq!(report.notices.len(), 1);
        assert_eq!(report.steps, vec![Step::FitPage, Step::ReadOnly]);
    }

    #[test]
    fn prompt_can_edit_or_cancel_the_term() {
        let mut viewer = text_viewer();
        viewer
            .expect_native_search()
            .with(eq("edited"))
            .times(1)
            .returning(|_| Ok(0));
        let mut prompter = MockPrompter::new();
        prompter
            .expect_confirm_term()
            .with(eq("plan"))
            .returning(|_| Ok("edited".to_string()));

        let options = DispatchOptions {
            prompt_before_search: true,
            read_only: false,
            ..all_on()
        };
        Dispatcher::new(options)
            .dispatch(&mut viewer, "plan", &prompter)
            .unwrap();

        let mut viewer = text_viewer();
        viewer.expect_native_search().never();
        let mut prompter = MockPrompter::new();
        prompter
            .expect_confirm_term()
            .returning(|_| Ok("  ".to_string()));
        let report = Dispatcher::new(options)
            .dispatch(&mut viewer, "plan", &prompter)
            .unwrap();
        assert!(report.steps.is_empty());
    }

    #[test]
    fn disabled_search_skips_prompt() {
        let mut viewer = text_viewer();
        viewer.expect_native_search().never();
        let mut prompter = MockPrompter::new();
        prompter.expect_confirm_term().never();

        let options = DispatchOptions {
            auto_file_search: false,
            prompt_before_search: true,
            read_only: false,
            render_markup: true,
        };
        let report = Dispatcher::new(options)
            .dispatch(&mut viewer, "plan", &prompter)
            .unwrap();
        assert!(report.steps.is_empty());
    }
}
