//! E-book post-processing.
//!
//! EPUB readers want XHTML. After the site has been rendered into
//! `_site/epub{L}/text/`, this stage:
//!
//! 1. rewrites internal links ending in `.html` (optionally followed by a
//!    `#fragment`) to `.xhtml`, in every `*.html` text file plus the
//!    package manifest (`package.opf`) and navigation (`toc.ncx`);
//! 2. renames every `*.html` text file to `*.xhtml`.
//!
//! Rewriting only selects files still named `.html`, so a second run after
//! renaming leaves the text files alone. External links (anything with a
//! scheme, or protocol-relative `//host` URLs) are never touched.

use crate::paths::PathSet;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

/// Files in the e-book root whose links are rewritten alongside the text.
pub const MANIFEST_FILES: [&str; 2] = ["package.opf", "toc.ncx"];

#[derive(Error, Debug)]
pub enum EpubError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to list {path}: {source}")]
    List {
        path: PathBuf,
        source: walkdir::Error,
    },
}

static LINK_ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(href|src)(\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).unwrap()
});

static SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EpubReport {
    /// Files whose links changed.
    pub rewritten: usize,
    /// Text files renamed to `.xhtml`.
    pub renamed: usize,
}

impl fmt::Display for EpubReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files rewritten, {} renamed to .xhtml",
            self.rewritten, self.renamed
        )
    }
}

/// Rewrite one link target, or `None` if it should stay as is.
fn rewrite_target(target: &str) -> Option<String> {
    if target.starts_with("//") || SCHEME.is_match(target) {
        return None;
    }
    let (path, fragment) = match target.find('#') {
        Some(i) => target.split_at(i),
        None => (target, ""),
    };
    // Same case-insensitive match as the files `rename_html` picks up
    let split = path.len().checked_sub(".html".len())?;
    let (stem, extension) = (path.get(..split)?, path.get(split..)?);
    if !extension.eq_ignore_ascii_case(".html") {
        return None;
    }
    Some(format!("{stem}.xhtml{fragment}"))
}

/// Rewrite every internal `.html` link in `content`.
pub fn rewrite_html_links(content: &str) -> String {
    LINK_ATTRIBUTE
        .replace_all(content, |caps: &Captures| {
            let (value, quote) = match (caps.get(3), caps.get(4)) {
                (Some(v), _) => (v.as_str(), '"'),
                (None, Some(v)) => (v.as_str(), '\''),
                (None, None) => return caps[0].to_string(),
            };
            match rewrite_target(value) {
                Some(new) => format!("{}{}{quote}{new}{quote}", &caps[1], &caps[2]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// `*.html` files directly in `dir`. Missing dir → none.
fn html_files(dir: &Path) -> Result<Vec<PathBuf>, EpubError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| EpubError::List {
            path: dir.to_path_buf(),
            source,
        })?;
        let is_html = entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("html"));
        if is_html {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn rewrite_file(path: &Path) -> Result<bool, EpubError> {
    let content = fs::read_to_string(path).map_err(|source| EpubError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let rewritten = rewrite_html_links(&content);
    if rewritten == content {
        return Ok(false);
    }
    fs::write(path, rewritten).map_err(|source| EpubError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// Rewrite links in the e-book text files and manifests.
///
/// Returns the number of files that changed. Missing manifest files are
/// skipped.
pub fn rewrite_links(paths: &PathSet) -> Result<usize, EpubError> {
    let mut targets = html_files(&paths.epub_text)?;
    targets.extend(
        MANIFEST_FILES
            .iter()
            .map(|name| paths.epub_root.join(name))
            .filter(|p| p.is_file()),
    );

    let mut changed = 0;
    for path in &targets {
        if rewrite_file(path)? {
            tracing::debug!(file = %path.display(), "rewrote links");
            changed += 1;
        }
    }
    Ok(changed)
}

/// Rename every `*.html` text file to `*.xhtml`, replacing any existing one.
pub fn rename_html(paths: &PathSet) -> Result<usize, EpubError> {
    let files = html_files(&paths.epub_text)?;
    for path in &files {
        let target = path.with_extension("xhtml");
        fs::rename(path, &target).map_err(|source| EpubError::Write {
            path: target.clone(),
            source,
        })?;
    }
    Ok(files.len())
}

/// Rewrite, then rename.
pub fn post_process(paths: &PathSet) -> Result<EpubReport, EpubError> {
    tracing::info!(dir = %paths.epub_text.display(), "preparing e-book text");
    let rewritten = rewrite_links(paths)?;
    let renamed = rename_html(paths)?;
    Ok(EpubReport { rewritten, renamed })
}
