//! Error types for the slides2pdf library.
//!
//! * [`DeckError`] is **fatal**: the run stops, the render session is
//!   released, and the output file is left untouched.
//!
//! * [`SlideError`] is **non-fatal**: one slide failed while the
//!   [`crate::config::SlideFailurePolicy::Placeholder`] policy was active. It
//!   is stored on the slide's [`crate::output::SlideOutcome`] and the slide
//!   gets a blank page so the deck keeps its page numbering.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the slides2pdf library.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The slides directory does not exist.
    #[error(
        "Slides directory not found: '{path}'\n\
Create it and add your HTML files (e.g., page1.html ... page12.html)."
    )]
    MissingInputDirectory { path: PathBuf },

    /// The slides path exists but is a file.
    #[error("'{path}' is not a directory\nPass the folder that contains your slide files.")]
    InputNotADirectory { path: PathBuf },

    /// The slides directory could not be listed.
    #[error("Failed to read slides directory '{path}': {source}")]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The directory holds no file with the slide extension.
    #[error(
        "No .{extension} files found in '{path}'\n\
Add your slides as .{extension} files and rerun."
    )]
    NoSlidesFound { path: PathBuf, extension: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// The headless browser could not be found or started.
    #[error("Rendering engine unavailable: {reason}\n{hint}")]
    EngineUnavailable { reason: String, hint: String },

    /// A slide file was listed but could not be read as UTF-8 text.
    #[error("Failed to read slide '{path}': {source}")]
    SlideUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The browser failed while loading or capturing a slide.
    #[error("Rendering failed for slide {ordinal} ({slide}): {detail}")]
    RenderFailed {
        ordinal: usize,
        slide: String,
        detail: String,
    },

    /// The slide never reached network idle within the settle timeout.
    #[error(
        "Slide {ordinal} ({slide}) did not settle within {secs}s\n\
A resource is still loading; raise --settle-timeout or pass 0 to wait indefinitely."
    )]
    SettleTimeout {
        ordinal: usize,
        slide: String,
        secs: u64,
    },

    /// A raster came back with a different size than the rest of the deck.
    #[error(
        "Slide {ordinal} ({slide}) rendered at {}x{} px but the deck is {}x{} px",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    RasterSizeMismatch {
        ordinal: usize,
        slide: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n"
    )]
    PdfiumBindingFailed(String),

    /// Could not create, write or move the output document into place.
    #[error("Failed to write output file '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },

    /// The deck was written but some slides are placeholders.
    ///
    /// Returned by [`crate::output::DeckReport::into_result`].
    #[error("{failed}/{total} slides failed and were replaced by blank pages")]
    PartialFailure { failed: usize, total: usize },

    // ── Inspect errors ────────────────────────────────────────────────────
    /// The PDF to inspect does not exist.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// The PDF to inspect could not be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeckError {
    /// `true` for failures confined to a single slide.
    ///
    /// Only these are eligible for the placeholder policy; everything else
    /// (engine gone, output unwritable) ends the run regardless.
    pub fn is_slide_failure(&self) -> bool {
        matches!(
            self,
            DeckError::SlideUnreadable { .. }
                | DeckError::RenderFailed { .. }
                | DeckError::SettleTimeout { .. }
                | DeckError::RasterSizeMismatch { .. }
        )
    }
}

/// A non-fatal error for a single slide.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum SlideError {
    /// Loading or capturing the slide failed.
    #[error("Slide {ordinal} ({slide}): {detail}")]
    RenderFailed {
        ordinal: usize,
        slide: String,
        detail: String,
    },

    /// The slide did not settle in time.
    #[error("Slide {ordinal} ({slide}): did not settle within {secs}s")]
    Timeout {
        ordinal: usize,
        slide: String,
        secs: u64,
    },
}

impl SlideError {
    /// Record `err` against slide `ordinal`.
    pub fn from_fatal(ordinal: usize, slide: &str, err: &DeckError) -> Self {
        match err {
            DeckError::SettleTimeout { secs, .. } => SlideError::Timeout {
                ordinal,
                slide: slide.to_string(),
                secs: *secs,
            },
            other => SlideError::RenderFailed {
                ordinal,
                slide: slide.to_string(),
                detail: Self::detail_of(other),
            },
        }
    }

    /// The failure itself, without the slide prefix the `Display` adds.
    fn detail_of(err: &DeckError) -> String {
        match err {
            DeckError::RenderFailed { detail, .. } => detail.clone(),
            DeckError::SlideUnreadable { path, source } => {
                format!("cannot read '{}': {source}", path.display())
            }
            DeckError::RasterSizeMismatch {
                expected, actual, ..
            } => format!(
                "rendered at {}x{} px but the deck is {}x{} px",
                actual.0, actual.1, expected.0, expected.1
            ),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_suggests_fix() {
        let e = DeckError::MissingInputDirectory {
            path: PathBuf::from("slides"),
        };
        let msg = e.to_string();
        assert!(msg.contains("'slides'"), "got: {msg}");
        assert!(msg.contains("page1.html"), "got: {msg}");
    }

    #[test]
    fn no_slides_names_extension() {
        let e = DeckError::NoSlidesFound {
            path: PathBuf::from("deck"),
            extension: "html".into(),
        };
        assert!(e.to_string().contains("No .html files found in 'deck'"));
    }

    #[test]
    fn size_mismatch_display() {
        let e = DeckError::RasterSizeMismatch {
            ordinal: 4,
            slide: "page4.html".into(),
            expected: (2560, 1440),
            actual: (1280, 720),
        };
        let msg = e.to_string();
        assert!(msg.contains("1280x720"), "got: {msg}");
        assert!(msg.contains("2560x1440"), "got: {msg}");
    }

    #[test]
    fn partial_failure_display() {
        let e = DeckError::PartialFailure {
            failed: 1,
            total: 12,
        };
        assert!(e.to_string().contains("1/12"));
    }

    #[test]
    fn slide_failures_are_classified() {
        let render = DeckError::RenderFailed {
            ordinal: 1,
            slide: "a.html".into(),
            detail: "crash".into(),
        };
        let engine = DeckError::EngineUnavailable {
            reason: "gone".into(),
            hint: String::new(),
        };
        assert!(render.is_slide_failure());
        assert!(!engine.is_slide_failure());
    }

    #[test]
    fn recorded_render_failure_names_the_slide_once() {
        let e = DeckError::RenderFailed {
            ordinal: 3,
            slide: "page3.html".into(),
            detail: "context crashed".into(),
        };
        let recorded = SlideError::from_fatal(3, "page3.html", &e);
        assert_eq!(recorded.to_string(), "Slide 3 (page3.html): context crashed");
    }

    #[test]
    fn recorded_size_mismatch_keeps_both_sizes() {
        let e = DeckError::RasterSizeMismatch {
            ordinal: 2,
            slide: "page2.html".into(),
            expected: (2560, 1440),
            actual: (800, 600),
        };
        let msg = SlideError::from_fatal(2, "page2.html", &e).to_string();
        assert_eq!(
            msg,
            "Slide 2 (page2.html): rendered at 800x600 px but the deck is 2560x1440 px"
        );
        assert_eq!(msg.matches("page2.html").count(), 1);
    }

    #[test]
    fn timeout_becomes_slide_timeout() {
        let e = DeckError::SettleTimeout {
            ordinal: 2,
            slide: "page2.html".into(),
            secs: 30,
        };
        assert_eq!(
            SlideError::from_fatal(2, "page2.html", &e),
            SlideError::Timeout {
                ordinal: 2,
                slide: "page2.html".into(),
                secs: 30
            }
        );
    }
}
