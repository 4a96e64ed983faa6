//! Image processing behind a backend trait.
//!
//! | Operation | Rust backend | GraphicsMagick backend |
//! |---|---|---|
//! | **Identify** | `image::image_dimensions` | `gm identify` |
//! | **Resize** | Lanczos3 | `-resize WxH!` |
//! | **Color** | RGB / gray + embedded ICC | `-profile` + `-colorspace` (incl. CMYK) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`] + [`MagickBackend`]

pub mod backend;
mod calculations;
pub mod magick_backend;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{OutputSize, calculate_output_dimensions};
pub use magick_backend::MagickBackend;
pub use params::{ColorSpace, OutputFormat, Quality, TransformParams};
pub use rust_backend::RustBackend;
