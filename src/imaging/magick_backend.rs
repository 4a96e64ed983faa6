//! GraphicsMagick command backend.
//!
//! Shells out to `gm`, which performs real ICC-based conversion and can
//! separate to CMYK for print. The encoded result is read from stdout, so
//! nothing is written until the executor fans it out.
//!
//! | Operation | Command |
//! |---|---|
//! | Identify | `gm identify -format "%w %h" <src>` |
//! | Transform | `gm convert <src> [-resize WxH!] -quality Q -profile <icc> -colorspace <space> <fmt>:-` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{ColorSpace, TransformParams};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Backend driving the `gm` binary.
pub struct MagickBackend {
    program: OsString,
}

impl MagickBackend {
    /// Drive `program`, normally `images.gm_path` from the config.
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[OsString]) -> Result<Vec<u8>, BackendError> {
        let output = Command::new(&self.program).args(args).output()?;
        if !output.status.success() {
            return Err(BackendError::ProcessingFailed(format!(
                "{} {} failed: {}",
                self.program.to_string_lossy(),
                args.first().map(|a| a.to_string_lossy()).unwrap_or_default(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// Parse the `"%w %h"` output of `gm identify`.
///
/// Multi-frame files (animated GIF) print one line per frame; the first wins.
fn parse_identify(stdout: &str) -> Option<Dimensions> {
    let line = stdout.lines().next()?;
    let mut parts = line.split_whitespace();
    let width = parts.next()?.parse().ok()?;
    let height = parts.next()?.parse().ok()?;
    Some(Dimensions { width, height })
}

fn colorspace_arg(space: ColorSpace) -> &'static str {
    match space {
        ColorSpace::Rgb => "RGB",
        ColorSpace::Cmyk => "CMYK",
        ColorSpace::Gray => "GRAY",
    }
}

/// Build the `gm convert` argument list for a transform.
fn convert_args(params: &TransformParams) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["convert".into(), params.source.clone().into()];
    if params.resize {
        // `!` forces the exact size; the caller has already kept the aspect ratio
        args.push("-resize".into());
        args.push(format!("{}x{}!", params.width, params.height).into());
    }
    args.push("-quality".into());
    args.push(params.quality.value().to_string().into());
    args.push("-profile".into());
    args.push(params.color_profile.clone().into());
    args.push("-colorspace".into());
    args.push(colorspace_arg(params.color_space).into());
    args.push(format!("{}:-", params.format.magick_name()).into());
    args
}

impl ImageBackend for MagickBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let stdout = self.run(&[
            "identify".into(),
            "-format".into(),
            "%w %h\n".into(),
            path.into(),
        ])?;
        parse_identify(&String::from_utf8_lossy(&stdout)).ok_or_else(|| {
            BackendError::ProcessingFailed(format!(
                "Failed to read dimensions of {}",
                path.display()
            ))
        })
    }

    fn transform(&self, params: &TransformParams) -> Result<Vec<u8>, BackendError> {
        let bytes = self.run(&convert_args(params))?;
        if bytes.is_empty() {
            return Err(BackendError::ProcessingFailed(format!(
                "gm produced no output for {}",
                params.source.display()
            )));
        }
        Ok(bytes)
    }
}
