//! Result types returned by a deck build or an inspection.

use crate::error::{DeckError, SlideError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideOutcome {
    /// 1-based position in the deck (and PDF page number).
    pub ordinal: usize,
    /// Slide file name.
    pub name: String,
    /// Full path of the slide source.
    pub source: PathBuf,
    /// Width of the page raster in pixels.
    pub raster_width: u32,
    /// Height of the page raster in pixels.
    pub raster_height: u32,
    /// Wall-clock time spent loading and capturing the slide.
    pub duration_ms: u64,
    /// Set when the page is a placeholder.
    pub error: Option<SlideError>,
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckStats {
    pub total_slides: usize,
    pub rendered_slides: usize,
    pub placeholder_slides: usize,
    /// Page width in PDF points.
    pub page_width: f32,
    /// Page height in PDF points.
    pub page_height: f32,
    pub total_duration_ms: u64,
    /// Time spent inside the browser, summed over slides.
    pub render_duration_ms: u64,
}

/// The outcome of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckReport {
    /// Where the deck was written.
    pub output: PathBuf,
    /// One entry per slide, in page order.
    pub slides: Vec<SlideOutcome>,
    pub stats: DeckStats,
}

impl DeckReport {
    /// Treat any placeholder page as an error.
    pub fn into_result(self) -> Result<Self, DeckError> {
        if self.stats.placeholder_slides > 0 {
            Err(DeckError::PartialFailure {
                failed: self.stats.placeholder_slides,
                total: self.stats.total_slides,
            })
        } else {
            Ok(self)
        }
    }

    /// The recorded slide errors, in page order.
    pub fn slide_errors(&self) -> impl Iterator<Item = &SlideError> {
        self.slides.iter().filter_map(|s| s.error.as_ref())
    }
}

/// Size of one PDF page in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageDimensions {
    pub width: f32,
    pub height: f32,
}

/// Structural facts about an existing deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckMetadata {
    pub page_count: usize,
    pub pages: Vec<PageDimensions>,
    pub pdf_version: String,
}

impl DeckMetadata {
    /// `true` when every page has the same size.
    pub fn is_uniform(&self) -> bool {
        self.pages.windows(2).all(|pair| pair[0] == pair[1])
    }
}
