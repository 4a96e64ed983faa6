//! Shared test utilities for the book-assets test suite.
//!
//! Provides synthetic image writers, mtime control for staleness tests, and
//! a scaffolded project in a temp directory.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (_tmp, project) = project_with_sources(&["cover.jpg"]);
//! write_profiles(&project, ALL_PROFILES);
//! set_mtime(&project.paths.source.join("cover.jpg"), 1_000);
//! ```

use crate::config::AssetsConfig;
use crate::metadata::{BookMetadata, ImageOverrides};
use crate::paths::ProjectSelector;
use crate::project::Project;
use crate::variants::{GRAY_PROFILE, PRINT_PROFILE, SCREEN_PROFILE};
use image::{ImageBuffer, Rgb};
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Every profile the variant table can ask for.
pub const ALL_PROFILES: &[&str] = &[PRINT_PROFILE, SCREEN_PROFILE, GRAY_PROFILE];

// =========================================================================
// Images
// =========================================================================

fn gradient(width: u32, height: u32) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
    ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a small gradient JPEG.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    gradient(width, height).save(path).unwrap();
}

/// Write a small gradient PNG.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height).save(path).unwrap();
}

// =========================================================================
// Filesystem
// =========================================================================

/// Set a file's modification time to `secs` after the epoch.
pub fn set_mtime(path: &Path, secs: u64) {
    let file = File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

// =========================================================================
// Project scaffolding
// =========================================================================

/// A default project in a temp dir with placeholder source files.
///
/// The files only contain a few bytes; use a `MockBackend` with them.
pub fn project_with_sources(files: &[&str]) -> (TempDir, Project) {
    let tmp = TempDir::new().unwrap();
    let project = Project::new(
        tmp.path(),
        ProjectSelector::default(),
        AssetsConfig::default(),
        BookMetadata::default(),
        ImageOverrides::default(),
    );
    fs::create_dir_all(&project.paths.source).unwrap();
    for f in files {
        fs::write(project.paths.source.join(f), "src").unwrap();
    }
    (tmp, project)
}

/// Write placeholder ICC profiles into the project's profile directory.
pub fn write_profiles(project: &Project, names: &[&str]) {
    let dir = project.profiles_dir();
    fs::create_dir_all(&dir).unwrap();
    for name in names {
        fs::write(dir.join(name), b"icc").unwrap();
    }
}
