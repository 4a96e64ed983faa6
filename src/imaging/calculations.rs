//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Output size for one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSize {
    pub width: u32,
    pub height: u32,
    /// Whether pixels need resampling at all.
    pub resize: bool,
}

/// Calculate the output dimensions for a target width.
///
/// Upscaling is never performed: a source narrower than (or as wide as) the
/// target keeps its native size. Wider sources are scaled down to the target
/// width, preserving aspect ratio. `None` means "native size".
///
/// # Examples
/// ```
/// # use book_assets::imaging::calculate_output_dimensions;
/// // 1600x1200 → 810 wide
/// let out = calculate_output_dimensions((1600, 1200), Some(810));
/// assert_eq!((out.width, out.height), (810, 608));
///
/// // 300x200 stays 300x200 even when 810 is requested
/// let out = calculate_output_dimensions((300, 200), Some(810));
/// assert_eq!((out.width, out.height), (300, 200));
/// ```
pub fn calculate_output_dimensions(source: (u32, u32), target_width: Option<u32>) -> OutputSize {
    let (src_w, src_h) = source;
    match target_width {
        Some(target) if target < src_w && src_w > 0 => {
            let ratio = target as f64 / src_w as f64;
            let height = ((src_h as f64 * ratio).round() as u32).max(1);
            OutputSize {
                width: target,
                height,
                resize: true,
            }
        }
        _ => OutputSize {
            width: src_w,
            height: src_h,
            resize: false,
        },
    }
}
