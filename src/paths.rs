//! Directory layout of a book project.
//!
//! Every path the pipeline reads or writes is derived here from a
//! [`ProjectSelector`]. For a project `P` and language `L` (empty, or `/L`
//! when a translation is selected) the layout is:
//!
//! ```text
//! P{L}/images/_source/      # originals
//! P{L}/images/print-pdf/    # CMYK (or gray) for print
//! P{L}/images/screen-pdf/
//! P{L}/images/web/          # optimised + srcset sizes
//! P{L}/images/epub/
//! P{L}/images/app/
//! _site/P{L}/text/          # rendered HTML
//! _site/epub{L}/text/       # e-book HTML, renamed to .xhtml on packaging
//! ```
//!
//! Resolution is pure: nothing here touches the filesystem.

use crate::metadata::Work;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Root of the rendered site.
pub const SITE_DIR: &str = "_site";

/// Which asset tree to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSelector {
    pub directory: String,
    pub language: Option<String>,
}

impl ProjectSelector {
    /// Build a selector, treating blank values like the CLI defaults.
    pub fn new(directory: &str, language: Option<&str>) -> Self {
        let directory = match directory.trim() {
            "" => "book".to_string(),
            d => d.to_string(),
        };
        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from);
        Self {
            directory,
            language,
        }
    }

    /// `P{L}`: the project directory with the optional `/L` suffix.
    fn base(&self) -> PathBuf {
        let mut base = PathBuf::from(&self.directory);
        if let Some(lang) = &self.language {
            base.push(lang);
        }
        base
    }

    /// `epub{L}` under the site root.
    fn epub_base(&self) -> PathBuf {
        let mut base = PathBuf::from("epub");
        if let Some(lang) = &self.language {
            base.push(lang);
        }
        base
    }
}

impl Default for ProjectSelector {
    fn default() -> Self {
        Self::new("book", None)
    }
}

/// An output directory kind that image variants write into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    PrintPdf,
    ScreenPdf,
    Web,
    Epub,
    App,
}

impl Destination {
    pub const ALL: [Destination; 5] = [
        Destination::PrintPdf,
        Destination::ScreenPdf,
        Destination::Web,
        Destination::Epub,
        Destination::App,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Destination::PrintPdf => "print-pdf",
            Destination::ScreenPdf => "screen-pdf",
            Destination::Web => "web",
            Destination::Epub => "epub",
            Destination::App => "app",
        }
    }
}

/// All directories for one (project, language) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathSet {
    pub source: PathBuf,
    pub print_pdf: PathBuf,
    pub screen_pdf: PathBuf,
    pub web: PathBuf,
    pub epub: PathBuf,
    pub app: PathBuf,
    /// Rendered HTML for this project and language.
    pub text: PathBuf,
    /// Packaging root of the e-book (`_site/epub{L}/`).
    pub epub_root: PathBuf,
    /// E-book HTML fragments (`_site/epub{L}/text/`).
    pub epub_text: PathBuf,
}

impl PathSet {
    /// Derive every path for `selector`, relative to the project root.
    pub fn resolve(selector: &ProjectSelector) -> Self {
        let images = selector.base().join("images");
        let epub_root = Path::new(SITE_DIR).join(selector.epub_base());
        Self {
            source: images.join("_source"),
            print_pdf: images.join(Destination::PrintPdf.dir_name()),
            screen_pdf: images.join(Destination::ScreenPdf.dir_name()),
            web: images.join(Destination::Web.dir_name()),
            epub: images.join(Destination::Epub.dir_name()),
            app: images.join(Destination::App.dir_name()),
            text: Path::new(SITE_DIR).join(selector.base()).join("text"),
            epub_text: epub_root.join("text"),
            epub_root,
        }
    }

    /// Rebase every path under `root`.
    pub fn under(&self, root: &Path) -> Self {
        Self {
            source: root.join(&self.source),
            print_pdf: root.join(&self.print_pdf),
            screen_pdf: root.join(&self.screen_pdf),
            web: root.join(&self.web),
            epub: root.join(&self.epub),
            app: root.join(&self.app),
            text: root.join(&self.text),
            epub_root: root.join(&self.epub_root),
            epub_text: root.join(&self.epub_text),
        }
    }

    pub fn destination(&self, dest: Destination) -> &Path {
        match dest {
            Destination::PrintPdf => &self.print_pdf,
            Destination::ScreenPdf => &self.screen_pdf,
            Destination::Web => &self.web,
            Destination::Epub => &self.epub,
            Destination::App => &self.app,
        }
    }
}

/// Text directory of one work, optionally for one of its translations.
pub fn text_dir(work: &str, language: Option<&str>) -> PathBuf {
    let mut dir = Path::new(SITE_DIR).join(work);
    if let Some(lang) = language {
        dir.push(lang);
    }
    dir.join("text")
}

/// Every HTML text directory across all works and translations.
///
/// Each work contributes its root-language directory first, then one
/// directory per translation, in metadata order.
pub fn flattened_text_dirs(works: &[Work]) -> Vec<PathBuf> {
    works
        .iter()
        .flat_map(|work| {
            std::iter::once(text_dir(&work.directory, None)).chain(
                work.translations
                    .iter()
                    .map(|t| text_dir(&work.directory, Some(&t.directory))),
            )
        })
        .collect()
}
