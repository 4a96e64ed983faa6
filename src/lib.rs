//! # Book Assets
//!
//! Derives every publication-specific asset set of a book project from one
//! directory of originals. A single source image becomes a CMYK print file,
//! an sRGB screen/e-reader/app file and a ladder of responsive web sizes.
//! SVGs are sanitised, scripts minified, and the rendered e-book HTML is
//! turned into XHTML.
//!
//! # Architecture
//!
//! ```text
//! assets.toml + _data/*.yml ──► Project (loaded once)
//!                                   │
//!   images/_source/ ──► svg ──► printpdf ──► optimise ──► small … max
//!                        │        └────── plan → execute (rayon) ──► images/<dest>/
//!   _site/epub/text/ ──► epub (rewrite links, rename to .xhtml)
//!   scripts.src ──► scripts (eslint --fix, minify → .min.js) ◄── watch
//! ```
//!
//! Stage order is strict. Within a variant, files are independent and run
//! in parallel. Repeated runs are incremental: an output at least as new as
//! its source is left alone.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `assets.toml` loading, merging over stock defaults, validation |
//! | [`metadata`] | Works, translations and per-image overrides from YAML |
//! | [`paths`] | Directory layout for a (project, language) pair |
//! | [`project`] | Paths, config and metadata loaded once per run |
//! | [`staleness`] | Modification-time checks |
//! | [`variants`] | The ordered variant table |
//! | [`plan`] | Per-variant job planning with override lookup |
//! | [`process`] | Variant execution, fan-out and per-variant reports |
//! | [`imaging`] | Dimension math and the pixel backends (pure Rust, GraphicsMagick) |
//! | [`svg`] | SVG sanitation |
//! | [`epub`] | Link rewriting and `.xhtml` renaming for e-book packaging |
//! | [`scripts`] | Conservative JavaScript minification, `eslint` runs |
//! | [`watch`] | Rebuild scripts when a source changes |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Table, One Stage
//!
//! Every raster variant is a row in [`variants::variant_table`]. There is one
//! parameterised stage that walks the table, so adding a web size is a
//! one-line change and every variant gets the same staleness, profile and
//! failure handling.
//!
//! ## Transform Once, Write Many
//!
//! A backend returns encoded bytes instead of writing a file. The executor
//! writes the same bytes to every destination of the variant, so the four
//! copies of an optimised image can never disagree.
//!
//! ## Two Backends
//!
//! Print output needs real CMYK separation against an ICC profile, which
//! the `image` crate cannot do. [`imaging::MagickBackend`] shells out to
//! GraphicsMagick and is the default. [`imaging::RustBackend`] needs no
//! external tools and covers the RGB and grayscale variants.

pub mod config;
pub mod epub;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod paths;
pub mod plan;
pub mod process;
pub mod project;
pub mod scripts;
pub mod staleness;
pub mod svg;
pub mod variants;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
