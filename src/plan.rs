//! Per-variant job planning.
//!
//! For one [`VariantSpec`] and the list of source files, decides which files
//! need work and with which parameters:
//!
//! 1. Look up the file's override by exact base filename. Only the print
//!    variant honours it: any color space other than the print default
//!    swaps in the grayscale profile pair. Every other file gets the
//!    variant defaults.
//! 2. Width, quality and suffix come straight from the variant.
//! 3. Files whose output is current in *every* destination are skipped.
//! 4. Everything else becomes a [`TransformJob`].
//!
//! Planning reads modification times but never writes.

use crate::imaging::ColorSpace;
use crate::metadata::ImageOverrides;
use crate::paths::PathSet;
use crate::staleness::is_stale_anywhere;
use crate::variants::{GRAY_PROFILE, VariantName, VariantSpec, output_name};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One source file × one variant.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformJob {
    pub source: PathBuf,
    pub file_name: String,
    pub output_name: String,
    pub variant: &'static VariantSpec,
    pub color_profile: &'static str,
    pub color_space: ColorSpace,
    /// Every directory the single transformed result is written to.
    pub destinations: Vec<PathBuf>,
}

/// Jobs for one variant, plus the files that were already current.
#[derive(Debug, Clone)]
pub struct Plan {
    pub variant: &'static VariantSpec,
    pub jobs: Vec<TransformJob>,
    pub current: Vec<String>,
}

/// List files directly inside `dir` whose extension is in `extensions`.
///
/// Matching is case-insensitive. A missing directory yields an empty list.
/// Results are sorted by name for readable logs; nothing depends on it.
pub fn list_sources(dir: &Path, extensions: &[String]) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if matches {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Profile and color space for `file_name` under `variant`.
pub fn resolve_color(
    variant: &VariantSpec,
    overrides: &ImageOverrides,
    file_name: &str,
) -> (&'static str, ColorSpace) {
    let default = (variant.color_profile, variant.color_space);
    if variant.name != VariantName::PrintPdf {
        return default;
    }
    match overrides
        .get(file_name)
        .and_then(|o| o.print_pdf_color_space)
    {
        Some(space) if space != variant.color_space => (GRAY_PROFILE, ColorSpace::Gray),
        _ => default,
    }
}

/// Build the job list for one variant.
pub fn plan_variant(
    variant: &'static VariantSpec,
    sources: &[PathBuf],
    overrides: &ImageOverrides,
    paths: &PathSet,
) -> Plan {
    let destinations: Vec<PathBuf> = variant
        .destinations
        .iter()
        .map(|d| paths.destination(*d).to_path_buf())
        .collect();

    let mut jobs = Vec::new();
    let mut current = Vec::new();

    for source in sources {
        let Some(file_name) = source.file_name().and_then(|f| f.to_str()) else {
            tracing::warn!(source = %source.display(), "skipping file with non-UTF-8 name");
            continue;
        };
        let out_name = output_name(file_name, variant.suffix);

        if !is_stale_anywhere(source, &destinations, &out_name) {
            current.push(file_name.to_string());
            continue;
        }

        let (color_profile, color_space) = resolve_color(variant, overrides, file_name);
        jobs.push(TransformJob {
            source: source.clone(),
            file_name: file_name.to_string(),
            output_name: out_name,
            variant,
            color_profile,
            color_space,
            destinations: destinations.clone(),
        });
    }

    Plan {
        variant,
        jobs,
        current,
    }
}
