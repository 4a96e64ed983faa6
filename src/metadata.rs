//! Project metadata: works, translations and per-image overrides.
//!
//! Two YAML documents drive the pipeline:
//!
//! - **`_data/meta.yml`** lists the works in the project and their
//!   translations. It is the single source of truth for "every translation",
//!   used to build the flattened list of HTML text directories.
//!
//!   ```yaml
//!   works:
//!     - directory: "book"
//!       translations:
//!         - directory: "fr"
//!   ```
//!
//! - **`_data/images.yml`** lists exceptions to the default transformation
//!   parameters, keyed by exact source filename.
//!
//!   ```yaml
//!   - file: "diagram.png"
//!     print-pdf:
//!       colorspace: "gray"
//!   ```
//!
//! Both files are optional: a missing file yields an empty structure. A file
//! that exists but does not parse is a hard error, because silently ignoring
//! it would produce wrong output for every affected image.

use crate::imaging::ColorSpace;
use crate::paths::flattened_text_dirs;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// A translation of a work, stored in a subdirectory of it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Translation {
    pub directory: String,
}

/// A work (book) in the project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Work {
    pub directory: String,
    #[serde(default)]
    pub translations: Vec<Translation>,
}

/// Raw shape of `meta.yml`. Everything except `works` is ignored.
#[derive(Debug, Default, Deserialize)]
struct MetaFile {
    #[serde(default)]
    works: Vec<Work>,
}

/// Indexed view of the project metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub works: Vec<Work>,
    /// Work directory names, in file order.
    pub books: Vec<String>,
    /// Translation directory names, first-seen order, deduplicated.
    pub languages: Vec<String>,
    /// Flattened HTML text directories across every work and translation.
    pub text_paths: Vec<PathBuf>,
}

impl BookMetadata {
    pub fn from_works(works: Vec<Work>) -> Self {
        let books = works.iter().map(|w| w.directory.clone()).collect();
        let mut languages: Vec<String> = Vec::new();
        for t in works.iter().flat_map(|w| &w.translations) {
            if !languages.contains(&t.directory) {
                languages.push(t.directory.clone());
            }
        }
        let text_paths = flattened_text_dirs(&works);
        Self {
            works,
            books,
            languages,
            text_paths,
        }
    }

    /// Load `meta.yml`. Missing file → empty metadata.
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let Some(content) = read_optional(path)? else {
            return Ok(Self::default());
        };
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, MetadataError> {
        // An empty document deserializes as null
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let meta: MetaFile = serde_yaml::from_str(content).map_err(|source| MetadataError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_works(meta.works))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct PrintPdfSettings {
    colorspace: Option<ColorSpace>,
}

#[derive(Debug, Clone, Deserialize)]
struct OverrideEntry {
    file: String,
    #[serde(rename = "print-pdf", default)]
    print_pdf: PrintPdfSettings,
}

/// A per-file exception to the default transformation parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOverride {
    pub file: String,
    pub print_pdf_color_space: Option<ColorSpace>,
}

/// Override table keyed by exact base filename.
#[derive(Debug, Clone, Default)]
pub struct ImageOverrides {
    by_file: HashMap<String, ImageOverride>,
}

impl ImageOverrides {
    /// Load `images.yml`. Missing file → no overrides.
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let Some(content) = read_optional(path)? else {
            return Ok(Self::default());
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let entries: Vec<OverrideEntry> =
            serde_yaml::from_str(&content).map_err(|source| MetadataError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_entries(entries.into_iter().map(|e| ImageOverride {
            file: e.file,
            print_pdf_color_space: e.print_pdf.colorspace,
        })))
    }

    /// Build the table; a later entry for the same file wins.
    pub fn from_entries(entries: impl IntoIterator<Item = ImageOverride>) -> Self {
        Self {
            by_file: entries
                .into_iter()
                .map(|o| (o.file.clone(), o))
                .collect(),
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&ImageOverride> {
        self.by_file.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.by_file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, MetadataError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(MetadataError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
