//! Progress-callback trait for per-slide events.
//!
//! Inject an [`Arc<dyn DeckProgressCallback>`] via
//! [`crate::config::DeckConfigBuilder::progress_callback`] to follow a run as
//! it renders each slide. Slides are rendered one at a time, so events for a
//! run always arrive in slide order.
//!
//! # Example
//!
//! ```rust
//! use slides2pdf::{DeckConfig, DeckProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl DeckProgressCallback for Counter {
//!     fn on_slide_complete(&self, ordinal: usize, total: usize, name: &str, _png_bytes: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{ordinal}/{total} {name}");
//!     }
//! }
//!
//! let config = DeckConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it works through the slides.
///
/// All methods default to no-ops. `ordinal` is 1-based.
pub trait DeckProgressCallback: Send + Sync {
    /// Called once the slide list is known, before the browser starts.
    fn on_deck_start(&self, total_slides: usize) {
        let _ = total_slides;
    }

    /// Called before a slide is loaded into the browser.
    fn on_slide_start(&self, ordinal: usize, total_slides: usize, name: &str) {
        let _ = (ordinal, total_slides, name);
    }

    /// Called once the slide has been captured and handed to the document.
    ///
    /// `png_bytes` is the encoded size of the captured raster.
    fn on_slide_complete(&self, ordinal: usize, total_slides: usize, name: &str, png_bytes: usize) {
        let _ = (ordinal, total_slides, name, png_bytes);
    }

    /// Called when a slide fails, whether or not the run continues.
    fn on_slide_error(&self, ordinal: usize, total_slides: usize, name: &str, error: &str) {
        let _ = (ordinal, total_slides, name, error);
    }

    /// Called once the output file is in place.
    fn on_deck_complete(&self, total_slides: usize, rendered: usize) {
        let _ = (total_slides, rendered);
    }
}

/// A callback that ignores every event.
pub struct NoopProgressCallback;

impl DeckProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DeckConfig`].
pub type ProgressCallback = Arc<dyn DeckProgressCallback>;
