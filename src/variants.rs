//! The declared output variants.
//!
//! One ordered table drives the whole image stage. Its order is the
//! execution order; nothing in the pipeline re-sorts it.
//!
//! | Variant | Width | Quality | Suffix | Profile | Space | Writes to |
//! |---|---|---|---|---|---|---|
//! | svg | – | – | – | – | – | every destination |
//! | printpdf | native | 90 | – | PSO Coated v3 | cmyk | print-pdf |
//! | optimise | 810 | 90 | – | sRGB v4 | rgb | screen-pdf, web, epub, app |
//! | small | 320 | 90 | `-320` | sRGB v4 | rgb | web |
//! | medium | 640 | 90 | `-640` | sRGB v4 | rgb | web |
//! | large | 1024 | 90 | `-1024` | sRGB v4 | rgb | web |
//! | xlarge | 2048 | 90 | `-2048` | sRGB v4 | rgb | web |
//! | max | native | 100 | `-max` | sRGB v4 | rgb | web |
//!
//! Upscaling is never allowed for any variant.

use crate::imaging::{ColorSpace, Quality};
use crate::paths::Destination;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Print profile for CMYK separation.
pub const PRINT_PROFILE: &str = "PSOcoated_v3.icc";
/// Screen profile shared by every RGB variant.
pub const SCREEN_PROFILE: &str = "sRGB_v4_ICC_preference_displayclass.icc";
/// Profile substituted for print output of grayscale overrides.
pub const GRAY_PROFILE: &str = "Grey_Fogra39L.icc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantName {
    Svg,
    PrintPdf,
    Optimise,
    Small,
    Medium,
    Large,
    XLarge,
    Max,
}

impl VariantName {
    /// Every variant in declared execution order.
    pub const ALL: [VariantName; 8] = [
        VariantName::Svg,
        VariantName::PrintPdf,
        VariantName::Optimise,
        VariantName::Small,
        VariantName::Medium,
        VariantName::Large,
        VariantName::XLarge,
        VariantName::Max,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VariantName::Svg => "svg",
            VariantName::PrintPdf => "printpdf",
            VariantName::Optimise => "optimise",
            VariantName::Small => "small",
            VariantName::Medium => "medium",
            VariantName::Large => "large",
            VariantName::XLarge => "xlarge",
            VariantName::Max => "max",
        }
    }
}

impl fmt::Display for VariantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VariantName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        // "images:small" is how the tasks used to be spelled
        let wanted = wanted.strip_prefix("images:").unwrap_or(&wanted);
        VariantName::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = VariantName::ALL.iter().map(|v| v.as_str()).collect();
                format!("unknown variant '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Fixed parameters of one raster variant.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSpec {
    pub name: VariantName,
    /// Target width; `None` keeps the native width.
    pub width: Option<u32>,
    pub quality: Quality,
    /// Always false. Kept explicit so the policy is visible in the table.
    pub upscale: bool,
    /// Inserted between the file stem and extension.
    pub suffix: Option<&'static str>,
    pub color_profile: &'static str,
    pub color_space: ColorSpace,
    pub destinations: &'static [Destination],
}

const WEB_ONLY: &[Destination] = &[Destination::Web];

const fn web_size(name: VariantName, width: u32, suffix: &'static str) -> VariantSpec {
    VariantSpec {
        name,
        width: Some(width),
        quality: Quality::new(90),
        upscale: false,
        suffix: Some(suffix),
        color_profile: SCREEN_PROFILE,
        color_space: ColorSpace::Rgb,
        destinations: WEB_ONLY,
    }
}

static RASTER_VARIANTS: [VariantSpec; 7] = [
    VariantSpec {
        name: VariantName::PrintPdf,
        width: None,
        quality: Quality::new(90),
        upscale: false,
        suffix: None,
        color_profile: PRINT_PROFILE,
        color_space: ColorSpace::Cmyk,
        destinations: &[Destination::PrintPdf],
    },
    VariantSpec {
        name: VariantName::Optimise,
        width: Some(810),
        quality: Quality::new(90),
        upscale: false,
        suffix: None,
        color_profile: SCREEN_PROFILE,
        color_space: ColorSpace::Rgb,
        destinations: &[
            Destination::ScreenPdf,
            Destination::Web,
            Destination::Epub,
            Destination::App,
        ],
    },
    web_size(VariantName::Small, 320, "-320"),
    web_size(VariantName::Medium, 640, "-640"),
    web_size(VariantName::Large, 1024, "-1024"),
    web_size(VariantName::XLarge, 2048, "-2048"),
    VariantSpec {
        name: VariantName::Max,
        width: None,
        quality: Quality::new(100),
        upscale: false,
        suffix: Some("-max"),
        color_profile: SCREEN_PROFILE,
        color_space: ColorSpace::Rgb,
        destinations: WEB_ONLY,
    },
];

/// Where sanitised SVGs go.
pub const SVG_DESTINATIONS: &[Destination] = &Destination::ALL;

/// Raster variants in declared order (SVG is its own branch).
pub fn variant_table() -> &'static [VariantSpec] {
    &RASTER_VARIANTS
}

/// Look up the spec of a raster variant. `None` for SVG.
#[cfg(test)]
pub(crate) fn spec_for(name: VariantName) -> Option<&'static VariantSpec> {
    RASTER_VARIANTS.iter().find(|v| v.name == name)
}

/// Output file name: `stem{suffix}.ext`.
pub fn output_name(file_name: &str, suffix: Option<&str>) -> String {
    let Some(suffix) = suffix else {
        return file_name.to_string();
    };
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &file_name[..dot], suffix, &file_name[dot..]),
        _ => format!("{file_name}{suffix}"),
    }
}
