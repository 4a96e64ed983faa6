//! Image derivation: runs every selected variant in declared order.
//!
//! SVG files take their own branch first (see [`crate::svg`]). Then, for each
//! raster variant:
//!
//! 1. **Profile check**: the variant's default ICC profile must exist, or the
//!    whole variant is skipped with a reason. Other variants still run.
//! 2. **Plan**: [`plan_variant`] decides which files are stale.
//! 3. **Alternate profiles**: profiles substituted by overrides are checked
//!    once each. Jobs needing a missing one fail with a single warning.
//! 4. **Execute**: remaining jobs run in parallel on the rayon pool:
//!    identify, compute the output size, transform once, then write the same
//!    bytes to every destination directory.
//!
//! A failing file is logged and counted; it never aborts the run. Only I/O
//! errors listing the source directory propagate.
//!
//! ## Output Structure
//!
//! ```text
//! book/images/
//! ├── _source/cover.jpg
//! ├── print-pdf/cover.jpg        # native size, CMYK
//! ├── screen-pdf/cover.jpg       # 810px, sRGB
//! ├── epub/cover.jpg
//! ├── app/cover.jpg
//! └── web/
//!     ├── cover.jpg
//!     ├── cover-320.jpg
//!     ├── cover-640.jpg
//!     ├── cover-1024.jpg
//!     ├── cover-2048.jpg
//!     └── cover-max.jpg          # native size, quality 100
//! ```

use crate::imaging::{
    BackendError, ImageBackend, OutputFormat, TransformParams, calculate_output_dimensions,
};
use crate::plan::{TransformJob, list_sources, plan_variant};
use crate::project::Project;
use crate::svg::run_svg;
use crate::variants::{VariantName, VariantSpec, variant_table};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single job failed.
#[derive(Error, Debug)]
enum JobError {
    #[error("no output format for this extension")]
    UnknownFormat,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("failed to write output: {source}")]
    Write {
        destination: PathBuf,
        source: std::io::Error,
    },
}

/// Outcome counts for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantReport {
    pub name: VariantName,
    /// Files transformed and written.
    pub processed: usize,
    /// Files already up to date everywhere.
    pub current: usize,
    pub failed: usize,
    /// Set when the variant did not run at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl VariantReport {
    pub fn new(name: VariantName) -> Self {
        Self {
            name,
            processed: 0,
            current: 0,
            failed: 0,
            skipped: None,
        }
    }
}

impl fmt::Display for VariantReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.skipped {
            Some(reason) => write!(f, "{}: skipped ({reason})", self.name),
            None => write!(
                f,
                "{}: {} processed, {} current, {} failed",
                self.name, self.processed, self.current, self.failed
            ),
        }
    }
}

/// Per-variant reports in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub variants: Vec<VariantReport>,
}

impl RunReport {
    pub fn processed(&self) -> usize {
        self.variants.iter().map(|v| v.processed).sum()
    }

    pub fn current(&self) -> usize {
        self.variants.iter().map(|v| v.current).sum()
    }

    pub fn failed(&self) -> usize {
        self.variants.iter().map(|v| v.failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.variants.iter().filter(|v| v.skipped.is_some()).count()
    }

    pub fn get(&self, name: VariantName) -> Option<&VariantReport> {
        self.variants.iter().find(|v| v.name == name)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} current, {} failed",
            self.processed(),
            self.current(),
            self.failed()
        )?;
        match self.skipped() {
            0 => Ok(()),
            1 => write!(f, ", 1 variant skipped"),
            n => write!(f, ", {n} variants skipped"),
        }
    }
}

/// Derive images for the `selected` variants, in declared order.
///
/// Selection order is ignored; [`VariantName::ALL`] runs everything.
pub fn run_images(
    project: &Project,
    backend: &impl ImageBackend,
    selected: &[VariantName],
) -> Result<RunReport, ProcessError> {
    let mut report = RunReport::default();

    if selected.contains(&VariantName::Svg) {
        report.variants.push(run_svg(&project.paths)?);
    }

    let rasters: Vec<&'static VariantSpec> = variant_table()
        .iter()
        .filter(|v| selected.contains(&v.name))
        .collect();
    if rasters.is_empty() {
        return Ok(report);
    }

    let sources = list_sources(&project.paths.source, &project.config.images.filetypes)?;
    tracing::info!(
        sources = sources.len(),
        dir = %project.paths.source.display(),
        "found raster sources"
    );

    for variant in rasters {
        report
            .variants
            .push(run_variant(project, backend, variant, &sources));
    }
    Ok(report)
}

fn run_variant(
    project: &Project,
    backend: &impl ImageBackend,
    variant: &'static VariantSpec,
    sources: &[PathBuf],
) -> VariantReport {
    let mut report = VariantReport::new(variant.name);

    let default_profile = project.profile_path(variant.color_profile);
    if !default_profile.is_file() {
        tracing::warn!(
            variant = %variant.name,
            profile = %default_profile.display(),
            "color profile not found, skipping variant"
        );
        report.skipped = Some(format!(
            "color profile not found: {}",
            default_profile.display()
        ));
        return report;
    }

    let plan = plan_variant(variant, sources, &project.overrides, &project.paths);
    report.current = plan.current.len();
    for file in &plan.current {
        tracing::debug!(file = %file, variant = %variant.name, "up to date");
    }

    let missing = missing_alternate_profiles(project, variant, &plan.jobs);
    let (runnable, blocked): (Vec<&TransformJob>, Vec<&TransformJob>) = plan
        .jobs
        .iter()
        .partition(|job| !missing.contains(job.color_profile));
    report.failed += blocked.len();

    tracing::info!(
        variant = %variant.name,
        jobs = runnable.len(),
        current = report.current,
        "deriving images"
    );

    let failures: Vec<(&TransformJob, JobError)> = runnable
        .par_iter()
        .filter_map(|job| {
            execute_job(backend, job, &project.profile_path(job.color_profile))
                .err()
                .map(|e| (*job, e))
        })
        .collect();

    for (job, error) in &failures {
        let destination = match error {
            JobError::Write { destination, .. } => destination.display().to_string(),
            _ => "-".to_string(),
        };
        tracing::warn!(
            file = %job.file_name,
            variant = %variant.name,
            destination = %destination,
            error = %error,
            "failed to derive image"
        );
    }

    report.failed += failures.len();
    report.processed = runnable.len() - failures.len();
    report
}

/// Alternate profiles that the plan needs but that are missing.
///
/// Each missing profile is reported once, however many jobs use it.
fn missing_alternate_profiles(
    project: &Project,
    variant: &VariantSpec,
    jobs: &[TransformJob],
) -> BTreeSet<&'static str> {
    let alternates: BTreeSet<&'static str> = jobs
        .iter()
        .map(|j| j.color_profile)
        .filter(|p| *p != variant.color_profile)
        .collect();

    alternates
        .into_iter()
        .filter(|name| {
            let path = project.profile_path(name);
            let exists = path.is_file();
            if !exists {
                let files = jobs.iter().filter(|j| j.color_profile == *name).count();
                tracing::warn!(
                    variant = %variant.name,
                    profile = %path.display(),
                    files,
                    "color profile not found, files using it will fail"
                );
            }
            !exists
        })
        .collect()
}

/// Transform one file once and write the result to every destination.
fn execute_job(
    backend: &impl ImageBackend,
    job: &TransformJob,
    profile: &Path,
) -> Result<(), JobError> {
    let format = OutputFormat::from_path(&job.source).ok_or(JobError::UnknownFormat)?;
    let source = backend.identify(&job.source)?;
    let size = calculate_output_dimensions((source.width, source.height), job.variant.width);

    let bytes = backend.transform(&TransformParams {
        source: job.source.clone(),
        width: size.width,
        height: size.height,
        resize: size.resize,
        quality: job.variant.quality,
        color_profile: profile.to_path_buf(),
        color_space: job.color_space,
        format,
    })?;

    for dir in &job.destinations {
        write_output(dir, &job.output_name, &bytes).map_err(|source| JobError::Write {
            destination: dir.clone(),
            source,
        })?;
    }
    tracing::debug!(
        file = %job.file_name,
        variant = %job.variant.name,
        width = size.width,
        height = size.height,
        "derived"
    );
    Ok(())
}

fn write_output(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join(name), bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ColorSpace;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::metadata::{ImageOverride, ImageOverrides};
    use crate::test_helpers::{
        ALL_PROFILES, project_with_sources, set_mtime, write_profiles,
    };
    use crate::variants::{GRAY_PROFILE, PRINT_PROFILE, SCREEN_PROFILE};

    fn transforms_for(backend: &MockBackend, source: &str) -> Vec<RecordedOp> {
        backend
            .transforms()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Transform { source: s, .. } if s == source))
            .collect()
    }

    // =========================================================================
    // Full runs
    // =========================================================================

    #[test]
    fn first_run_derives_every_variant() {
        let (_tmp, project) = project_with_sources(&["cover.jpg"]);
        write_profiles(&project, ALL_PROFILES);
        let backend = MockBackend::with_dimensions(&["cover.jpg"], 3000, 2000);

        let report = run_images(&project, &backend, &VariantName::ALL).unwrap();

        let names: Vec<VariantName> = report.variants.iter().map(|v| v.name).collect();
        assert_eq!(names, VariantName::ALL.to_vec());
        for v in &report.variants[1..] {
            assert_eq!(v.processed, 1, "variant {}", v.name);
            assert_eq!(v.failed, 0);
        }

        let web = &project.paths.web;
        for name in [
            "cover.jpg",
            "cover-320.jpg",
            "cover-640.jpg",
            "cover-1024.jpg",
            "cover-2048.jpg",
            "cover-max.jpg",
        ] {
            assert!(web.join(name).exists(), "missing web/{name}");
        }
        assert!(project.paths.print_pdf.join("cover.jpg").exists());
        assert!(project.paths.screen_pdf.join("cover.jpg").exists());
        assert!(project.paths.epub.join("cover.jpg").exists());
        assert!(project.paths.app.join("cover.jpg").exists());
    }

    #[test]
    fn fan_out_writes_identical_bytes() {
        let (_tmp, project) = project_with_sources(&["cover.jpg"]);
        write_profiles(&project, ALL_PROFILES);
        let backend = MockBackend::with_dimensions(&["cover.jpg"], 1600, 1200);

        run_images(&project, &backend, &[VariantName::Optimise]).unwrap();

        let expected = b"cover.jpg:810x608".to_vec();
        for dir in [
            &project.paths.screen_pdf,
            &project.paths.web,
            &project.paths.epub,
            &project.paths.app,
        ] {
            assert_eq!(fs::read(dir.join("cover.jpg")).unwrap(), expected);
        }
        // One transform for four destinations
        assert_eq!(transforms_for(&backend, "cover.jpg").len(), 1);
    }

    #[test]
    fn second_run_is_incremental() {
        let (_tmp, project) = project_with_sources(&["cover.jpg"]);
        write_profiles(&project, ALL_PROFILES);
        set_mtime(&project.paths.source.join("cover.jpg"), 1_000);
        let backend = MockBackend::with_dimensions(&["cover.jpg"], 1600, 1200);
        run_images(&project, &backend, &[VariantName::Optimise]).unwrap();

        let backend = MockBackend::with_dimensions(&["cover.jpg"], 1600, 1200);
        let report = run_images(&project, &backend, &[VariantName::Optimise]).unwrap();
        let optimise = report.get(VariantName::Optimise).unwrap();
        assert_eq!(optimise.processed, 0);
        assert_eq!(optimise.current, 1);
        assert!(backend.transforms().is_empty());
    }

    #[test]
    fn selection_keeps_declared_order() {
        let (_tmp, project) = project_with_sources(&["cover.jpg"]);
        write_profiles(&project, ALL_PROFILES);
        let backend = MockBackend::with_dimensions(&["cover.jpg"], 1600, 1200);

        let report =
            run_images(&project, &backend, &[VariantName::Max, VariantName::Small]).unwrap();
        let names: Vec<VariantName> = report.variants.iter().map(|v| v.name).collect();
        assert_eq!(names, vec![VariantName::Small, VariantName::Max]);
    }

    // =========================================================================
    // Dimensions and parameters
    // =========================================================================

    #[test]
    fn narrow_source_is_never_upscaled() {
        let (_tmp, project) = project_with_sources(&["icon.png"]);
        write_profiles(&project, ALL_PROFILES);
        let backend = MockBackend::with_dimensions(&["icon.png"], 500, 400);

        run_images(&project, &backend, &[VariantName::Optimise, VariantName::XLarge]).unwrap();

        for op in transforms_for(&backend, "icon.png") {
            let RecordedOp::Transform {
                width,
                height,
                resize,
                ..
            } = op
            else {
                unreachable!()
            };
            assert_eq!((width, height, resize), (500, 400, false));
        }
    }

    #[test]
    fn small_variant_scales_proportionally() {
        let (_tmp, project) = project_with_sources(&["cover.jpg"]);
        write_profiles(&project, ALL_PROFILES);
        let backend = MockBackend::with_dimensions(&["cover.jpg"], 1600, 1200);

        run_images(&project, &backend, &[VariantName::Small]).unwrap();

        assert_eq!(
            backend.transforms(),
            vec![RecordedOp::Transform {
                source: "cover.jpg".into(),
                width: 320,
                height: 240,
                resize: true,
                quality: 90,
                profile: SCREEN_PROFILE.into(),
                color_space: ColorSpace::Rgb,
            }]
        );
        assert_eq!(
            fs::read(project.paths.web.join("cover-320.jpg")).unwrap(),
            b"cover.jpg:320x240"
        );
    }

    #[test]
    fn max_variant_keeps_native_size_at_full_quality() {
        let (_tmp, project) = project_with_sources(&["cover.jpg"]);
        write_profiles(&project, ALL_PROFILES);
        let backend = MockBackend::with_dimensions(&["cover.jpg"], 4000, 3000);

        run_images(&project, &backend, &[VariantName::Max]).unwrap();

        let ops = backend.transforms();
        assert!(matches!(
            &ops[0],
            RecordedOp::Transform {
                width: 4000,
                height: 3000,
                resize: false,
                quality: 100,
                ..
            }
        ));
    }

    #[test]
    fn gray_override_uses_gray_pair_for_print() {
        let (_tmp, mut project) = project_with_sources(&["diagram.png", "photo.jpg"]);
        write_profiles(&project, ALL_PROFILES);
        project.overrides = ImageOverrides::from_entries([ImageOverride {
            file: "diagram.png".into(),
            print_pdf_color_space: Some(ColorSpace::Gray),
        }]);
        let backend = MockBackend::with_dimensions(&["diagram.png", "photo.jpg"], 1000, 800);

        run_images(&project, &backend, &[VariantName::PrintPdf]).unwrap();

        let diagram = transforms_for(&backend, "diagram.png");
        let photo = transforms_for(&backend, "photo.jpg");
        assert!(matches!(
            &diagram[0],
            RecordedOp::Transform { profile, color_space: ColorSpace::Gray, .. } if profile == GRAY_PROFILE
        ));
        assert!(matches!(
            &photo[0],
            RecordedOp::Transform { profile, color_space: ColorSpace::Cmyk, .. } if profile == PRINT_PROFILE
        ));
    }

    // =========================================================================
    // Profiles and failures
    // =========================================================================

    #[test]
    fn missing_screen_profile_skips_only_screen_variants() {
        let (_tmp, project) = project_with_sources(&["cover.jpg"]);
        write_profiles(&project, &[PRINT_PROFILE, GRAY_PROFILE]);
        let backend = MockBackend::with_dimensions(&["cover.jpg"], 1600, 1200);

        let report = run_images(
            &project,
            &backend,
            &[VariantName::PrintPdf, VariantName::Optimise],
        )
        .unwrap();

        let print = report.get(VariantName::PrintPdf).unwrap();
        assert_eq!(print.processed, 1);
        assert!(print.skipped.is_none());

        let optimise = report.get(VariantName::Optimise).unwrap();
        assert_eq!(optimise.processed, 0);
        let reason = optimise.skipped.as_deref().unwrap();
        assert!(reason.contains(SCREEN_PROFILE));
        assert!(!project.paths.web.join("cover.jpg").exists());
        assert_eq!(report.skipped(), 1);
    }

    #[test]
    fn missing_gray_profile_fails_only_overridden_files() {
        let (_tmp, mut project) = project_with_sources(&["a.png", "b.png", "photo.jpg"]);
        write_profiles(&project, &[PRINT_PROFILE, SCREEN_PROFILE]);
        project.overrides = ImageOverrides::from_entries(["a.png", "b.png"].map(|f| {
            ImageOverride {
                file: f.into(),
                print_pdf_color_space: Some(ColorSpace::Gray),
            }
        }));
        let backend = MockBackend::with_dimensions(&["a.png", "b.png", "photo.jpg"], 900, 600);

        let report = run_images(&project, &backend, &[VariantName::PrintPdf]).unwrap();
        let print = report.get(VariantName::PrintPdf).unwrap();
        assert_eq!(print.processed, 1);
        assert_eq!(print.failed, 2);
        assert!(print.skipped.is_none());
        assert!(transforms_for(&backend, "a.png").is_empty());
    }

    #[test]
    fn corrupt_file_is_counted_and_others_continue() {
        let (_tmp, project) = project_with_sources(&["bad.jpg", "good.jpg"]);
        write_profiles(&project, ALL_PROFILES);
        let backend =
            MockBackend::with_dimensions(&["bad.jpg", "good.jpg"], 1600, 1200).fail_on("bad.jpg");

        let report = run_images(&project, &backend, &[VariantName::Optimise]).unwrap();
        let optimise = report.get(VariantName::Optimise).unwrap();
        assert_eq!(optimise.processed, 1);
        assert_eq!(optimise.failed, 1);
        assert!(project.paths.web.join("good.jpg").exists());
        assert!(!project.paths.web.join("bad.jpg").exists());
    }

    #[test]
    fn unidentifiable_file_fails() {
        let (_tmp, project) = project_with_sources(&["mystery.gif"]);
        write_profiles(&project, ALL_PROFILES);
        let backend = MockBackend::new();

        let report = run_images(&project, &backend, &[VariantName::Small]).unwrap();
        assert_eq!(report.failed(), 1);
        assert!(backend.transforms().is_empty());
    }

    #[test]
    fn empty_source_dir_runs_clean() {
        let (_tmp, project) = project_with_sources(&[]);
        write_profiles(&project, ALL_PROFILES);
        let backend = MockBackend::new();

        let report = run_images(&project, &backend, &VariantName::ALL).unwrap();
        assert_eq!(report.processed(), 0);
        assert_eq!(report.failed(), 0);
        assert_eq!(report.variants.len(), VariantName::ALL.len());
    }

    // =========================================================================
    // Reports
    // =========================================================================

    #[test]
    fn run_report_display() {
        let mut skipped = VariantReport::new(VariantName::Optimise);
        skipped.skipped = Some("color profile not found".into());
        let report = RunReport {
            variants: vec![
                VariantReport {
                    name: VariantName::PrintPdf,
                    processed: 3,
                    current: 2,
                    failed: 1,
                    skipped: None,
                },
                skipped,
            ],
        };
        assert_eq!(
            report.to_string(),
            "3 processed, 2 current, 1 failed, 1 variant skipped"
        );
        assert_eq!(
            report.variants[0].to_string(),
            "printpdf: 3 processed, 2 current, 1 failed"
        );
        assert_eq!(
            report.variants[1].to_string(),
            "optimise: skipped (color profile not found)"
        );
    }
}
