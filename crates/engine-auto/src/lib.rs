//! # engine-auto
//!
//! Locates the two native engines `slides2pdf` drives:
//!
//! * **Chromium**, the markup renderer. [`discover_chrome`] searches explicit
//!   environment overrides, then `PATH`, then the usual install locations for
//!   the current OS. Nothing is ever downloaded for Chromium.
//! * **PDFium**, the document writer. [`ensure_pdfium_library`] returns a
//!   cached copy of the platform shared library, downloading it from
//!   [bblanchon/pdfium-binaries](https://github.com/bblanchon/pdfium-binaries)
//!   the first time it is needed.
//!
//! ```rust,no_run
//! let chrome = engine_auto::discover_chrome().expect("no Chromium installed");
//! let pdfium = engine_auto::bind_pdfium_silent().expect("PDFium unavailable");
//! # let _ = (chrome, pdfium);
//! ```
//!
//! ## Environment variables
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `CHROME`, `CHROME_PATH` | Chromium executable to use |
//! | `PDFIUM_LIB_PATH` | Existing libpdfium; skips the download |
//! | `SLIDES2PDF_CACHE_DIR` | Root of the PDFium download cache |

mod chrome;
mod pdfium;

use std::path::PathBuf;
use thiserror::Error;

pub use chrome::{discover_chrome, discover_chrome_in, CHROME_ENV_VARS};
pub use pdfium::{
    bind_pdfium, bind_pdfium_from_path, bind_pdfium_silent, cached_pdfium_path,
    ensure_pdfium_library, is_pdfium_cached, pdfium_cache_dir, PDFIUM_VERSION,
};

/// Errors returned while locating or provisioning an engine.
#[derive(Error, Debug)]
pub enum EngineAutoError {
    /// No PDFium build is published for this OS/architecture pair.
    #[error("Unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// The cache directory could not be created.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Fetching the PDFium archive failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// The archive was fetched but the library could not be unpacked.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// The library exists on disk but could not be loaded.
    #[error("Failed to bind PDFium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },

    /// No Chromium-family executable was found in any searched location.
    #[error("No Chrome/Chromium executable found (searched {} locations)", .searched.len())]
    ChromeNotFound { searched: Vec<PathBuf> },
}
