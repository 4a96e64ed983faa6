//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Logging goes through
//! `tracing` on stderr; these lines are the command's actual result.
//!
//! # Output Format
//!
//! ## Images
//!
//! ```text
//! Images
//!     svg: 2 processed, 0 current, 0 failed
//!     printpdf: 14 processed, 0 current, 0 failed
//!     optimise: skipped (color profile not found: _tools/profiles/sRGB.icc)
//! 16 processed, 0 current, 0 failed, 1 variant skipped
//! ```
//!
//! ## Paths
//!
//! ```text
//! Project book (fr)
//!     Source: book/fr/images/_source
//!     print-pdf: book/fr/images/print-pdf
//!     ...
//! Text directories
//!     _site/book/text
//!     _site/book/fr/text
//! ```

use crate::paths::Destination;
use crate::process::RunReport;
use crate::project::{Inspection, Project};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Show `path` relative to the project root when it lives under it.
fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn project_header(project: &Project) -> String {
    match &project.selector.language {
        Some(lang) => format!("Project {} ({})", project.selector.directory, lang),
        None => format!("Project {}", project.selector.directory),
    }
}

// ============================================================================
// images
// ============================================================================

/// One line per variant, in execution order, then the totals.
pub fn format_run_report(report: &RunReport) -> Vec<String> {
    let mut lines = vec!["Images".to_string()];
    for variant in &report.variants {
        lines.push(format!("{}{}", indent(1), variant));
    }
    lines.push(report.to_string());
    lines
}

pub fn print_run_report(report: &RunReport) {
    for line in format_run_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// paths
// ============================================================================

/// Every resolved directory for the selected project, plus the text
/// directories of all works and translations.
pub fn format_paths(project: &Project) -> Vec<String> {
    let root = &project.root;
    let paths = &project.paths;
    let mut lines = vec![project_header(project)];

    lines.push(format!(
        "{}Source: {}",
        indent(1),
        display_path(root, &paths.source)
    ));
    for dest in Destination::ALL {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            dest.dir_name(),
            display_path(root, paths.destination(dest))
        ));
    }
    lines.push(format!("{}Text: {}", indent(1), display_path(root, &paths.text)));
    lines.push(format!(
        "{}E-book text: {}",
        indent(1),
        display_path(root, &paths.epub_text)
    ));

    lines.push("Text directories".to_string());
    if project.metadata.text_paths.is_empty() {
        lines.push(format!("{}(no works in metadata)", indent(1)));
    }
    for dir in &project.metadata.text_paths {
        lines.push(format!("{}{}", indent(1), dir.display()));
    }
    lines
}

pub fn print_paths(project: &Project) {
    for line in format_paths(project) {
        println!("{}", line);
    }
}

// ============================================================================
// check
// ============================================================================

/// Inventory of sources, metadata and profiles.
pub fn format_check(project: &Project, inspection: &Inspection) -> Vec<String> {
    let mut lines = vec![project_header(project)];
    lines.push(format!(
        "{}{} raster sources, {} SVG sources",
        indent(1),
        inspection.rasters,
        inspection.svgs
    ));
    lines.push(format!(
        "{}{} works, {} languages, {} image overrides",
        indent(1),
        project.metadata.books.len(),
        project.metadata.languages.len(),
        project.overrides.len()
    ));

    lines.push("Color profiles".to_string());
    for (name, found) in &inspection.profiles {
        let status = if *found { "ok" } else { "MISSING" };
        lines.push(format!("{}{}: {}", indent(1), name, status));
    }
    lines
}

pub fn print_check(project: &Project, inspection: &Inspection) {
    for line in format_check(project, inspection) {
        println!("{}", line);
    }
}
