//! scanview - Review tool for book-digitization scan streams
//!
//! CLI entry point

use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use scanview::{
    exit_codes, Config, DisplayPort, Flow, ImageRaster, InputEvent, InteractionController,
    MosaicLayout, MosaicTile, Point, ScanStore, Spread, Status,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "scanview",
    version,
    about = "Review book scans and assemble a searchable PDF"
)]
struct Cli {
    /// Scan directory, named after the book's barcode
    scan_dir: Option<PathBuf>,

    /// Export page artifacts but skip document assembly
    #[arg(long)]
    export_only: bool,

    /// Configuration file (default: ./scanview.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(scan_dir) = cli.scan_dir.clone() else {
        Cli::command().print_help().ok();
        println!();
        std::process::exit(exit_codes::SUCCESS);
    };
    if !scan_dir.is_dir() {
        eprintln!("Error: scan directory does not exist: {}", scan_dir.display());
        std::process::exit(exit_codes::INPUT_NOT_FOUND);
    }

    let config = load_config(&cli);

    std::process::exit(match run(&scan_dir, config, cli.export_only) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::GENERAL_ERROR
        }
    });
}

fn init_tracing(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Config {
    match &cli.config {
        Some(path) => match Config::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                Config::default()
            }
        },
        None => Config::load().unwrap_or_default(),
    }
}

// ============ Headless Session ============

fn run(
    scan_dir: &Path,
    config: Config,
    export_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = ScanStore::new(scan_dir);
    let Some(last_pair) = store.last_pair_start() else {
        return Err(format!("no scans found in {}", scan_dir.display()).into());
    };
    let tick = Duration::from_millis(config.tick_interval_ms);

    let mut controller = InteractionController::new(scan_dir, config)?;
    let mut display = HeadlessDisplay;

    println!("{}", controller.splash());
    if !controller.geometry_set() {
        println!("\nnote: no book geometry on record; pages export only once a crop is defined");
    }

    // Autoplay through the whole stream, waiting out recognizer jobs.
    loop {
        if controller.handle_event(InputEvent::Tick, &mut display) == Flow::Exit {
            break;
        }
        if controller.pair_start() >= last_pair && !controller.jobs_outstanding() {
            break;
        }
        std::thread::sleep(tick);
    }

    if export_only {
        println!("Exported artifacts through pair {}", controller.pair_start());
        return Ok(());
    }

    let bar = ProgressBar::new(1);
    bar.set_style(ProgressStyle::with_template("{wide_bar} {pos}/{len} pages")?);
    let report = controller.assemble(|done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    })?;
    bar.finish_and_clear();

    match report {
        Some(report) => println!(
            "Wrote {}: {} pages, {} text runs, {} suppressed",
            scan_dir.join(scanview::OUTPUT_NAME).display(),
            report.pages,
            report.words,
            report.skipped
        ),
        None => println!("No book geometry defined; nothing assembled"),
    }
    Ok(())
}

// ============ Headless Display ============

/// Display stub for running without a display toolkit: images are dropped,
/// text surfaces go to stdout.
struct HeadlessDisplay;

impl DisplayPort for HeadlessDisplay {
    fn size(&self) -> (u32, u32) {
        (1600, 1000)
    }

    fn set_fullscreen(&mut self, _fullscreen: bool) {}

    fn present_spread(&mut self, _spread: &Spread<ImageRaster>) {}

    fn present_drag_preview(&mut self, _from: Point, _to: Point) {}

    fn present_zoom(&mut self, _region: &ImageRaster, _at: Point) {}

    fn present_mosaic(&mut self, _layout: &MosaicLayout, _tiles: &[MosaicTile<ImageRaster>]) {}

    fn present_status(&mut self, status: &Status) {
        tracing::debug!(
            left = status.left,
            right = status.right,
            recognizing = status.recognizing,
            suppressed = status.suppressed,
            "showing pair"
        );
    }

    fn show_help(&mut self, text: &str) {
        println!("{}", text);
    }

    fn save_screenshot(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
