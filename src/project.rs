//! The loaded project: paths, configuration and metadata in one value.
//!
//! Built once per invocation and passed by reference to every stage.

use crate::config::{self, AssetsConfig, ConfigError};
use crate::metadata::{BookMetadata, ImageOverrides, MetadataError};
use crate::paths::{PathSet, ProjectSelector};
use crate::plan::list_sources;
use crate::variants::{GRAY_PROFILE, PRINT_PROFILE, SCREEN_PROFILE};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
}

/// What a `check` run found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inspection {
    pub rasters: usize,
    pub svgs: usize,
    /// Each known profile and whether it exists.
    pub profiles: Vec<(&'static str, bool)>,
}

#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub selector: ProjectSelector,
    /// Already rebased under `root`.
    pub paths: PathSet,
    pub config: AssetsConfig,
    pub metadata: BookMetadata,
    pub overrides: ImageOverrides,
}

impl Project {
    /// Assemble a project from already-loaded parts.
    pub fn new(
        root: &Path,
        selector: ProjectSelector,
        config: AssetsConfig,
        metadata: BookMetadata,
        overrides: ImageOverrides,
    ) -> Self {
        let paths = PathSet::resolve(&selector).under(root);
        Self {
            root: root.to_path_buf(),
            selector,
            paths,
            config,
            metadata,
            overrides,
        }
    }

    /// Load config from `config_path`, then the metadata files it names.
    ///
    /// A missing config or metadata file falls back to defaults; a malformed
    /// one is an error.
    pub fn load(
        root: &Path,
        selector: ProjectSelector,
        config_path: &Path,
    ) -> Result<Self, ProjectError> {
        let config = config::load_config(config_path)?;
        let metadata = BookMetadata::load(&root.join(&config.data.meta))?;
        let overrides = ImageOverrides::load(&root.join(&config.data.images))?;
        tracing::debug!(
            works = metadata.works.len(),
            overrides = overrides.len(),
            "loaded project metadata"
        );
        Ok(Self::new(root, selector, config, metadata, overrides))
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join(&self.config.profiles.dir)
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(name)
    }

    /// Count sources and look for every profile, without writing anything.
    pub fn inspect(&self) -> std::io::Result<Inspection> {
        let rasters = list_sources(&self.paths.source, &self.config.images.filetypes)?.len();
        let svgs = list_sources(&self.paths.source, &["svg".to_string()])?.len();
        let profiles = [PRINT_PROFILE, SCREEN_PROFILE, GRAY_PROFILE]
            .into_iter()
            .map(|name| (name, self.profile_path(name).is_file()))
            .collect();
        Ok(Inspection {
            rasters,
            svgs,
            profiles,
        })
    }
}
