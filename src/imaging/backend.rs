//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations every backend must
//! support: identify and transform. A transform returns the encoded bytes
//! rather than writing a file, so the executor can fan one result out to
//! every destination directory of a variant.
//!
//! Implementations:
//! - [`RustBackend`](super::rust_backend::RustBackend): pure Rust, RGB and gray.
//! - [`MagickBackend`](super::magick_backend::MagickBackend): GraphicsMagick, adds CMYK.

use super::params::TransformParams;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` because the executor calls it from rayon worker threads.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Resize (when `params.resize`), requality and color-convert one image,
    /// returning the encoded output.
    fn transform(&self, params: &TransformParams) -> Result<Vec<u8>, BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::{ColorSpace, OutputFormat, Quality};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// Dimensions are looked up by file name so results don't depend on the
    /// order rayon happens to run jobs in.
    #[derive(Default)]
    pub struct MockBackend {
        pub dimensions: HashMap<String, Dimensions>,
        pub failing: Vec<String>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Transform {
            source: String,
            width: u32,
            height: u32,
            resize: bool,
            quality: u32,
            profile: String,
            color_space: ColorSpace,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every file reports the same size.
        pub fn with_dimensions(files: &[&str], width: u32, height: u32) -> Self {
            Self {
                dimensions: files
                    .iter()
                    .map(|f| (f.to_string(), Dimensions { width, height }))
                    .collect(),
                ..Self::default()
            }
        }

        /// Transforms of `file` fail as if it were corrupt.
        pub fn fail_on(mut self, file: &str) -> Self {
            self.failing.push(file.to_string());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        /// Recorded transforms, sorted by source for order-independent asserts.
        pub fn transforms(&self) -> Vec<RecordedOp> {
            let mut ops: Vec<RecordedOp> = self
                .get_operations()
                .into_iter()
                .filter(|op| matches!(op, RecordedOp::Transform { .. }))
                .collect();
            ops.sort_by(|a, b| format!("{a:?}").cmp(&format!("{b:?}")));
            ops
        }
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(file_name(path)));

            self.dimensions
                .get(&file_name(path))
                .copied()
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn transform(&self, params: &TransformParams) -> Result<Vec<u8>, BackendError> {
            let source = file_name(&params.source);
            self.operations.lock().unwrap().push(RecordedOp::Transform {
                source: source.clone(),
                width: params.width,
                height: params.height,
                resize: params.resize,
                quality: params.quality.value(),
                profile: file_name(&params.color_profile),
                color_space: params.color_space,
            });
            if self.failing.contains(&source) {
                return Err(BackendError::ProcessingFailed(format!(
                    "corrupt image: {source}"
                )));
            }
            Ok(format!("{source}:{}x{}", params.width, params.height).into_bytes())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(&["image.jpg"], 800, 600);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "image.jpg"));
    }

    #[test]
    fn mock_identify_unknown_file_errors() {
        let backend = MockBackend::new();
        assert!(backend.identify(Path::new("/missing.jpg")).is_err());
    }

    #[test]
    fn mock_records_transform() {
        let backend = MockBackend::new();

        let bytes = backend
            .transform(&TransformParams {
                source: "/source.jpg".into(),
                width: 800,
                height: 600,
                resize: true,
                quality: Quality::new(90),
                color_profile: "/profiles/sRGB.icc".into(),
                color_space: ColorSpace::Rgb,
                format: OutputFormat::Jpeg,
            })
            .unwrap();
        assert_eq!(bytes, b"source.jpg:800x600");

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            RecordedOp::Transform {
                width: 800,
                height: 600,
                quality: 90,
                color_space: ColorSpace::Rgb,
                ..
            }
        ));
    }
}
