//! CLI binary for slides2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `DeckConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use slides2pdf::{
    build_deck, inspect_deck, resolve_slides, DeckConfig, DeckProgressCallback,
    ProgressCallback, SlideFailurePolicy,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per slide.
struct CliProgressCallback {
    bar: ProgressBar,
    slide_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_deck_start` tells us how many slides there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning slides…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            slide_started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} slides  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.slide_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl DeckProgressCallback for CliProgressCallback {
    fn on_deck_start(&self, total_slides: usize) {
        self.activate_bar(total_slides);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Rendering {total_slides} slides…"))
        ));
    }

    fn on_slide_start(&self, _ordinal: usize, _total: usize, name: &str) {
        *self
            .slide_started
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
        self.bar.set_message(name.to_string());
    }

    fn on_slide_complete(&self, ordinal: usize, total: usize, name: &str, png_bytes: usize) {
        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {:<24}  {:<10}  {}",
            green("✓"),
            ordinal,
            total,
            name,
            dim(&format!("{:>6} KiB", png_bytes / 1024)),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_slide_error(&self, ordinal: usize, total: usize, name: &str, error: &str) {
        // First line only, truncated, to keep the log tidy.
        let first = error.lines().next().unwrap_or_default();
        let msg = if first.chars().count() > 80 {
            format!("{}\u{2026}", first.chars().take(79).collect::<String>())
        } else {
            first.to_string()
        };

        self.bar.println(format!(
            "  {} Slide {:>3}/{:<3}  {:<24}  {}  {}",
            red("✗"),
            ordinal,
            total,
            name,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_deck_complete(&self, _total_slides: usize, _rendered: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render ./slides/*.html into ./deck.pdf
  slides2pdf

  # Explicit input and output
  slides2pdf talk/slides build/talk.pdf

  # 1920x1080 slides captured at 1x
  slides2pdf --width 1920 --height 1080 --scale 1 slides deck.pdf

  # Keep going past broken slides (blank page, exit code 1)
  slides2pdf --keep-going slides deck.pdf

  # Wait as long as it takes for every slide to settle
  slides2pdf --settle-timeout 0

  # Check an existing deck (page count and page sizes)
  slides2pdf --inspect-only slides deck.pdf

  # Inside a container running as root
  slides2pdf --no-sandbox --chrome /usr/bin/chromium

ORDERING:
  Slides are sorted naturally by file name: page2.html comes before
  page10.html, with or without zero padding.

ENVIRONMENT VARIABLES:
  CHROME, CHROME_PATH     Chromium executable (same as --chrome)
  PDFIUM_LIB_PATH         Path to an existing libpdfium (skips auto-download)
  SLIDES2PDF_CACHE_DIR    Override the default pdfium cache directory
  SLIDES2PDF_*            Every flag, e.g. SLIDES2PDF_SETTLE_TIMEOUT=60

SETUP:
  Install Google Chrome or Chromium. PDFium (~30 MB) is downloaded
  automatically on first run and cached in ~/.cache/slides2pdf/pdfium-7690/.
"#;

/// Render a directory of HTML slides into one PDF deck.
#[derive(Parser, Debug)]
#[command(
    name = "slides2pdf",
    version,
    about = "Render a directory of HTML slides into one PDF deck",
    long_about = "Render every HTML slide in a directory with headless Chromium (one isolated \
context per slide, 1280x720 at 2x by default) and assemble the captures into a PDF whose pages \
are exactly the slide size. Slides are ordered by natural file-name sort.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the slide files.
    #[arg(env = "SLIDES2PDF_INPUT", default_value = "slides")]
    input_dir: PathBuf,

    /// Output PDF path. Overwritten if it exists.
    #[arg(env = "SLIDES2PDF_OUTPUT", default_value = "deck.pdf")]
    output: PathBuf,

    /// Slide width in CSS pixels; also the page width in points.
    #[arg(long, env = "SLIDES2PDF_WIDTH", default_value_t = 1280,
          value_parser = clap::value_parser!(u32).range(1..=8192))]
    width: u32,

    /// Slide height in CSS pixels; also the page height in points.
    #[arg(long, env = "SLIDES2PDF_HEIGHT", default_value_t = 720,
          value_parser = clap::value_parser!(u32).range(1..=8192))]
    height: u32,

    /// Device scale factor for capture (0.25–4).
    #[arg(long, env = "SLIDES2PDF_SCALE", default_value_t = 2.0)]
    scale: f64,

    /// File extension that marks a slide.
    #[arg(long, env = "SLIDES2PDF_EXTENSION", default_value = "html")]
    extension: String,

    /// Seconds to wait for each slide's network to go idle (0 = no limit).
    #[arg(long, env = "SLIDES2PDF_SETTLE_TIMEOUT", default_value_t = 30)]
    settle_timeout: u64,

    /// Seconds to wait for the browser to start.
    #[arg(long, env = "SLIDES2PDF_LAUNCH_TIMEOUT", default_value_t = 20)]
    launch_timeout: u64,

    /// Replace failing slides with blank pages instead of stopping.
    #[arg(long, env = "SLIDES2PDF_KEEP_GOING")]
    keep_going: bool,

    /// Chrome/Chromium executable. Discovered automatically if omitted.
    #[arg(long, env = "SLIDES2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Run Chromium without its sandbox (needed as root in most containers).
    #[arg(long, env = "SLIDES2PDF_NO_SANDBOX")]
    no_sandbox: bool,

    /// Print the run report (or inspection) as JSON on stdout.
    #[arg(long, env = "SLIDES2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SLIDES2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Inspect the PDF at OUTPUT instead of building it.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SLIDES2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SLIDES2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        // A missing file is reported by inspect_deck without PDFium.
        if cli.output.is_file() {
            ensure_pdfium(cli.quiet)?;
        }
        let meta = inspect_deck(&cli.output)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.output.display());
            println!("Pages:        {}", meta.page_count);
            match meta.pages.first() {
                Some(first) if meta.is_uniform() => {
                    println!("Page size:    {} x {} pt", first.width, first.height)
                }
                Some(_) => println!("Page size:    mixed"),
                None => {}
            }
            println!("PDF Version:  {}", meta.pdf_version);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = show_progress.then(CliProgressCallback::new_dynamic);
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as Arc<dyn DeckProgressCallback>),
    )?;

    // ── Check the input, then make sure PDFium is available ──────────────
    // First run downloads the library into the cache; later runs only
    // check that it is there.
    preflight(&cli, &config, || ensure_pdfium(cli.quiet))?;

    // ── Run ──────────────────────────────────────────────────────────────
    let result = build_deck(&cli.input_dir, &cli.output, &config).await;
    if let Some(ref cb) = progress {
        cb.bar.finish_and_clear();
    }
    let report = result.context("Failed to build deck")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        for error in report.slide_errors() {
            eprintln!("{} {}", red("✗"), error);
        }
        if report.stats.placeholder_slides == 0 {
            println!(
                "{} Created {} with {} slides.",
                green("✔"),
                bold(&report.output.display().to_string()),
                report.stats.total_slides
            );
        } else {
            println!(
                "{} Created {} with {} slides ({} blank).",
                cyan("⚠"),
                bold(&report.output.display().to_string()),
                report.stats.total_slides,
                red(&report.stats.placeholder_slides.to_string()),
            );
        }
        if cli.verbose {
            eprintln!(
                "   {}",
                dim(&format!(
                    "{} x {} pt pages  —  {}ms rendering, {}ms total",
                    report.stats.page_width,
                    report.stats.page_height,
                    report.stats.render_duration_ms,
                    report.stats.total_duration_ms
                ))
            );
        }
    }

    // Blank pages mean the deck is incomplete: exit non-zero.
    report.into_result()?;
    Ok(())
}

/// Resolve the slides before `provision` runs, so a bad input directory is
/// reported without touching the network.
fn preflight(
    cli: &Cli,
    config: &DeckConfig,
    provision: impl FnOnce() -> Result<()>,
) -> Result<usize> {
    let slides =
        resolve_slides(&cli.input_dir, &config.extension).context("Failed to build deck")?;
    provision()?;
    Ok(slides.len())
}

/// Make sure libpdfium is on disk, with a download bar on first use.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if engine_auto::is_pdfium_cached() {
        return Ok(());
    }
    if quiet {
        tokio::task::block_in_place(|| engine_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.set_message("Connecting…");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        engine_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

/// Map CLI args to `DeckConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DeckConfig> {
    let mut builder = DeckConfig::builder()
        .viewport(cli.width, cli.height)
        .device_scale_factor(cli.scale)
        .extension(cli.extension.as_str())
        .settle_timeout_secs(cli.settle_timeout)
        .launch_timeout_secs(cli.launch_timeout)
        .sandbox(!cli.no_sandbox)
        .failure_policy(if cli.keep_going {
            SlideFailurePolicy::Placeholder
        } else {
            SlideFailurePolicy::Abort
        });

    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_executable(chrome);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
