//! Project configuration module.
//!
//! Handles loading and validating `assets.toml`. The file is optional: stock
//! defaults reproduce the classic layout of a book project, and a user file
//! only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! filetypes = ["jpg", "jpeg", "gif", "png"]  # Raster extensions to derive
//! backend = "graphicsmagick"                # or "rust"
//! gm_path = "gm"                            # GraphicsMagick executable
//!
//! [profiles]
//! dir = "_tools/profiles"   # Where ICC color profiles live
//!
//! [data]
//! meta = "_data/meta.yml"     # Works and translations
//! images = "_data/images.yml" # Per-image overrides
//!
//! [scripts]
//! src = []                  # Script files to minify
//! dest = "assets/js"        # Where minified scripts go
//! eslint = "eslint"         # Linter executable for `lint` and `watch`
//! eslint_config = "eslint.json"  # Passed to eslint when the file exists
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default file name of the project config, looked up in the project root.
pub const CONFIG_FILENAME: &str = "assets.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `assets.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    /// Raster image settings.
    pub images: ImagesConfig,
    /// Color profile lookup.
    pub profiles: ProfilesConfig,
    /// Metadata file locations.
    pub data: DataConfig,
    /// Script minification.
    pub scripts: ScriptsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AssetsConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.filetypes.is_empty() {
            return Err(ConfigError::Validation(
                "images.filetypes must not be empty".into(),
            ));
        }
        if self
            .images
            .filetypes
            .iter()
            .any(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(ConfigError::Validation(
                "images.filetypes entries are bare extensions like \"jpg\"".into(),
            ));
        }
        if self
            .images
            .filetypes
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case("svg"))
        {
            return Err(ConfigError::Validation(
                "images.filetypes must not list svg; SVGs have their own stage".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Which image backend performs pixel work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Shell out to `gm` (GraphicsMagick). Handles CMYK print output.
    #[default]
    GraphicsMagick,
    /// Pure Rust via the `image` crate. RGB and grayscale only.
    Rust,
}

/// Raster image settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// File extensions (without the dot) picked up from the source directory.
    /// SVG is handled by its own branch and never listed here.
    pub filetypes: Vec<String>,
    pub backend: BackendKind,
    /// GraphicsMagick executable, looked up on `PATH` unless absolute.
    pub gm_path: PathBuf,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            filetypes: ["jpg", "jpeg", "gif", "png"]
                .into_iter()
                .map(String::from)
                .collect(),
            backend: BackendKind::default(),
            gm_path: PathBuf::from("gm"),
        }
    }
}

/// Color profile lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilesConfig {
    /// Directory holding the `.icc` files, relative to the project root.
    pub dir: PathBuf,
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("_tools/profiles"),
        }
    }
}

/// Metadata file locations, relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub meta: PathBuf,
    pub images: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            meta: PathBuf::from("_data/meta.yml"),
            images: PathBuf::from("_data/images.yml"),
        }
    }
}

/// Script minification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsConfig {
    /// Script files to minify. Empty means the stage does nothing.
    pub src: Vec<PathBuf>,
    pub dest: PathBuf,
    /// Linter executable.
    pub eslint: PathBuf,
    /// Linter config, relative to the project root. Skipped when missing.
    pub eslint_config: PathBuf,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            src: Vec::new(),
            dest: PathBuf::from("assets/js"),
            eslint: PathBuf::from("eslint"),
            eslint_config: PathBuf::from("eslint.json"),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AssetsConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from the given file.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the stock defaults.
pub fn load_config(config_path: &Path) -> Result<AssetsConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(config_path)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: AssetsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `assets.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# book-assets configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Raster images
# ---------------------------------------------------------------------------
[images]
# Extensions picked up from <book>/images/_source/. SVG files always go
# through their own sanitising branch and must not be listed here.
filetypes = ["jpg", "jpeg", "gif", "png"]

# "graphicsmagick" shells out to `gm` and supports CMYK print output.
# "rust" needs no external tools but only produces RGB and grayscale.
backend = "graphicsmagick"

# GraphicsMagick executable for the "graphicsmagick" backend.
gm_path = "gm"

# ---------------------------------------------------------------------------
# Color profiles
# ---------------------------------------------------------------------------
[profiles]
# Must contain PSOcoated_v3.icc, sRGB_v4_ICC_preference_displayclass.icc
# and Grey_Fogra39L.icc. A missing profile skips only the variants using it.
dir = "_tools/profiles"

# ---------------------------------------------------------------------------
# Metadata
# ---------------------------------------------------------------------------
[data]
# Works and their translations.
meta = "_data/meta.yml"
# Per-image overrides, e.g. grayscale print output.
images = "_data/images.yml"

# ---------------------------------------------------------------------------
# Scripts
# ---------------------------------------------------------------------------
[scripts]
# Files to minify, e.g. ["assets/js/src/nav.js"]. Empty = nothing to do.
src = []
dest = "assets/js"

# Linter run by `book-assets lint` and on every change under
# `book-assets watch`. It is called with --fix, so it may edit the sources.
eslint = "eslint"
# Handed to eslint as --config when the file exists.
eslint_config = "eslint.json"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
