//! # slides2pdf
//!
//! Turn a directory of fixed-size HTML slides into a single PDF deck.
//!
//! Each slide is loaded into a fresh, isolated context of one headless
//! Chromium, left to settle until the network goes idle, and captured as a
//! viewport PNG at 2× density. The captures become the pages of a PDF whose
//! every page is exactly the slide canvas (1280×720 points by default).
//!
//! ## Pipeline Overview
//!
//! ```text
//! slides/
//!  │
//!  ├─ 1. Input     list *.html, natural sort (page2 before page10)
//!  ├─ 2. Launch    one headless Chromium for the whole run
//!  ├─ 3. Render    per slide: new context → markup → network idle → PNG
//!  ├─ 4. Assemble  stream PNGs into a PDF on a blocking thread (pdfium)
//!  ├─ 5. Release   close the browser, success or not
//!  └─ 6. Finalize  move the finished PDF over the output path
//! ```
//!
//! A failed run never leaves a partial deck behind: the PDF is written to a
//! temporary file and only renamed into place at the end.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use slides2pdf::{build_deck, DeckConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DeckConfig::default();
//!     let report = build_deck("slides", "deck.pdf", &config).await?;
//!     eprintln!("{} pages → {}", report.stats.total_slides, report.output.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `slides2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! slides2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! A Chrome or Chromium install (found on `PATH`, in the usual install
//! locations, or via `CHROME`), and PDFium, which is downloaded and cached on
//! first use unless `PDFIUM_LIB_PATH` points at an existing copy.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DeckConfig, DeckConfigBuilder, RenderSettings, SlideFailurePolicy, Viewport};
pub use convert::{build_deck, build_deck_sync, build_deck_with, inspect_deck};
pub use error::{DeckError, SlideError};
pub use output::{DeckMetadata, DeckReport, DeckStats, PageDimensions, SlideOutcome};
pub use pipeline::assemble::{DocumentBackend, FeedMessage, PageFeed, PageSize, PdfiumBackend};
pub use pipeline::chrome::{ChromeEngine, ChromeSession};
pub use pipeline::input::{natural_cmp, resolve_slides, SlideSource};
pub use pipeline::render::{RenderEngine, RenderSession, SlideRaster};
pub use progress::{DeckProgressCallback, NoopProgressCallback, ProgressCallback};
