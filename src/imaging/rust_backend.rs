//! Pure Rust image processing backend, no external tools.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF) | `image` crate (pure Rust decoders) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Color space | `to_rgb8` / `to_luma8` |
//! | Color profile | embedded as ICC via `ImageEncoder::set_icc_profile` |
//! | Encode | JPEG (with quality), PNG, GIF |
//!
//! There is no CMS here: the profile is attached, not applied. CMYK output
//! needs real separation and is rejected; configure the GraphicsMagick
//! backend for print PDF.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ColorSpace, OutputFormat, TransformParams};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

/// Pure Rust backend using the `image` crate.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Convert pixels to the target color space.
///
/// Alpha survives only where the output format can carry it.
fn convert_color(
    img: DynamicImage,
    space: ColorSpace,
    format: OutputFormat,
) -> Result<DynamicImage, BackendError> {
    let keep_alpha = format != OutputFormat::Jpeg && img.color().has_alpha();
    match space {
        ColorSpace::Rgb if keep_alpha => Ok(DynamicImage::ImageRgba8(img.to_rgba8())),
        ColorSpace::Rgb => Ok(DynamicImage::ImageRgb8(img.to_rgb8())),
        ColorSpace::Gray if keep_alpha => Ok(DynamicImage::ImageLumaA8(img.to_luma_alpha8())),
        ColorSpace::Gray => Ok(DynamicImage::ImageLuma8(img.to_luma8())),
        ColorSpace::Cmyk => Err(BackendError::Unsupported(
            "CMYK output needs the graphicsmagick backend".into(),
        )),
    }
}

/// Attach an ICC profile to an encoder, if it supports one.
fn attach_profile(encoder: &mut impl ImageEncoder, icc: Vec<u8>, path: &Path) {
    if encoder.set_icc_profile(icc).is_err() {
        tracing::debug!(profile = %path.display(), "encoder cannot embed ICC profile");
    }
}

/// Encode an image in memory.
fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u32,
    icc: Vec<u8>,
    profile_path: &Path,
) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let result = match format {
        OutputFormat::Jpeg => {
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality as u8);
            attach_profile(&mut encoder, icc, profile_path);
            img.write_with_encoder(encoder)
        }
        OutputFormat::Png => {
            let mut encoder = PngEncoder::new(&mut buf);
            attach_profile(&mut encoder, icc, profile_path);
            img.write_with_encoder(encoder)
        }
        // GIF has no ICC support; the encoder wants RGBA frames
        OutputFormat::Gif => DynamicImage::ImageRgba8(img.to_rgba8())
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif),
    };
    result.map_err(|e| BackendError::ProcessingFailed(format!("encode failed: {e}")))?;
    Ok(buf)
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn transform(&self, params: &TransformParams) -> Result<Vec<u8>, BackendError> {
        // Reject before decoding anything
        if params.color_space == ColorSpace::Cmyk {
            return Err(BackendError::Unsupported(
                "CMYK output needs the graphicsmagick backend".into(),
            ));
        }
        let icc = std::fs::read(&params.color_profile)?;
        let img = load_image(&params.source)?;

        let sized = if params.resize {
            img.resize_exact(params.width, params.height, FilterType::Lanczos3)
        } else {
            img
        };
        let converted = convert_color(sized, params.color_space, params.format)?;

        encode(
            &converted,
            params.format,
            params.quality.value(),
            icc,
            &params.color_profile,
        )
    }
}
