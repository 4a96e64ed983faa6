use book_assets::config::{self, BackendKind};
use book_assets::imaging::{MagickBackend, RustBackend};
use book_assets::paths::ProjectSelector;
use book_assets::process::{self, RunReport};
use book_assets::project::Project;
use book_assets::variants::VariantName;
use book_assets::{epub, output, scripts, watch};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup; called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "book-assets")]
#[command(about = "Derive print, screen, web, e-reader and app assets for a book")]
#[command(long_about = "\
Derive print, screen, web, e-reader and app assets for a book

Originals live in <book>/images/_source/. Every raster image becomes:

  <book>/images/
  ├── print-pdf/cover.jpg      # native size, CMYK (PSO Coated v3)
  ├── screen-pdf/cover.jpg     # 810px, sRGB
  ├── epub/cover.jpg           # 810px, sRGB
  ├── app/cover.jpg            # 810px, sRGB
  └── web/
      ├── cover.jpg            # 810px
      ├── cover-320.jpg        # srcset sizes: 320, 640, 1024, 2048
      └── cover-max.jpg        # native size, quality 100

SVGs are sanitised and copied to every directory. Sources are never
upscaled, and outputs newer than their source are left alone.

Per-image exceptions live in _data/images.yml:

  - file: diagram.png
    print-pdf:
      colorspace: gray

Run 'book-assets gen-config' to generate a documented assets.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Project directory holding the book
    #[arg(long, default_value = "book", global = true)]
    book: String,

    /// Translation subdirectory, e.g. "fr"
    #[arg(long, global = true)]
    language: Option<String>,

    /// Project root; every other path is relative to it
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file [default: <root>/assets.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(clap::Args, Clone, Default)]
struct ImagesArgs {
    /// Only run these variants (repeatable); declared order is kept
    #[arg(long = "variant", value_name = "NAME")]
    variants: Vec<VariantName>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Derive every image variant (the default)
    Images(ImagesArgs),
    /// Minify the configured scripts
    Js,
    /// Run eslint --fix over the configured scripts
    Lint,
    /// Lint and minify the configured scripts whenever one changes
    Watch,
    /// Rewrite e-book links and rename HTML to XHTML
    Epub,
    /// Show the resolved directory layout
    Paths {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate config and metadata, list sources and profiles
    Check,
    /// Print a stock assets.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.root.join(config::CONFIG_FILENAME));
    let selector = ProjectSelector::new(&cli.book, cli.language.as_deref());
    let load = || Project::load(&cli.root, selector.clone(), &config_path);

    match cli.command.unwrap_or(Command::Images(ImagesArgs::default())) {
        Command::Images(args) => {
            let project = load()?;
            init_thread_pool(&project.config.processing);
            let selected = if args.variants.is_empty() {
                VariantName::ALL.to_vec()
            } else {
                args.variants
            };
            let report = run_images(&project, &selected)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_run_report(&report);
            }
        }
        Command::Js => {
            let project = load()?;
            let report = scripts::run_scripts(&project.config.scripts, &project.root);
            println!("{}", report);
        }
        Command::Lint => {
            let project = load()?;
            let checked = scripts::lint_scripts(&project.config.scripts, &project.root)?;
            println!("{checked} scripts linted");
        }
        Command::Watch => {
            let project = load()?;
            watch::watch_scripts(&project.config.scripts, &project.root)?;
        }
        Command::Epub => {
            let project = load()?;
            let report = epub::post_process(&project.paths)?;
            println!("{}", report);
        }
        Command::Paths { json } => {
            let project = load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&project.paths)?);
            } else {
                output::print_paths(&project);
            }
        }
        Command::Check => {
            let project = load()?;
            let inspection = project.inspect()?;
            output::print_check(&project, &inspection);
            println!("==> Project is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Run the image stage with the configured backend.
fn run_images(
    project: &Project,
    selected: &[VariantName],
) -> Result<RunReport, process::ProcessError> {
    match project.config.images.backend {
        BackendKind::GraphicsMagick => {
            let backend = MagickBackend::with_program(&project.config.images.gm_path);
            process::run_images(project, &backend, selected)
        }
        BackendKind::Rust => process::run_images(project, &RustBackend::new(), selected),
    }
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match verbose {
        0 => "book_assets=info",
        1 => "book_assets=debug",
        _ => "book_assets=trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available CPU cores.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
