//! The render seam: an engine that starts once per run and a session that
//! turns one slide's markup into one viewport raster.
//!
//! [`crate::pipeline::chrome::ChromeEngine`] is the production engine. Tests
//! plug in their own so the orchestration can be exercised without a browser.

use crate::config::RenderSettings;
use crate::error::DeckError;
use crate::pipeline::encode;
use crate::pipeline::input::SlideSource;

/// One captured slide: a PNG of exactly the viewport, at device scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRaster {
    /// 1-based slide position; becomes the page number.
    pub ordinal: usize,
    /// Raster width in physical pixels.
    pub width: u32,
    /// Raster height in physical pixels.
    pub height: u32,
    /// Encoded PNG bytes.
    pub png: Vec<u8>,
}

impl SlideRaster {
    /// Wrap captured PNG bytes, reading the pixel size from the PNG header.
    pub fn from_png(slide: &SlideSource, png: Vec<u8>) -> Result<Self, DeckError> {
        let (width, height) =
            encode::raster_dimensions(&png).map_err(|e| DeckError::RenderFailed {
                ordinal: slide.ordinal,
                slide: slide.name.clone(),
                detail: format!("Capture is not a readable PNG: {e}"),
            })?;
        Ok(Self {
            ordinal: slide.ordinal,
            width,
            height,
            png,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Something that can start a rendering session.
#[allow(async_fn_in_trait)]
pub trait RenderEngine {
    type Session: RenderSession;

    /// Start the engine. Called once per run, before the first slide.
    async fn launch(&self, settings: &RenderSettings) -> Result<Self::Session, DeckError>;
}

/// A running engine. Slides are rendered strictly one after another.
#[allow(async_fn_in_trait)]
pub trait RenderSession {
    /// Render one slide in a fresh isolated context and capture the viewport.
    ///
    /// The context is gone by the time this returns, whether or not the
    /// render succeeded.
    async fn render(&mut self, slide: &SlideSource, markup: &str) -> Result<SlideRaster, DeckError>;

    /// Shut the engine down. Consumes the session so it runs at most once.
    async fn release(self) -> Result<(), DeckError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn slide() -> SlideSource {
        SlideSource {
            ordinal: 3,
            name: "page3.html".into(),
            path: PathBuf::from("slides/page3.html"),
        }
    }

    #[test]
    fn raster_reads_size_from_png() {
        let png = encode::placeholder_png(64, 36).unwrap();
        let raster = SlideRaster::from_png(&slide(), png).unwrap();
        assert_eq!(raster.ordinal, 3);
        assert_eq!(raster.dimensions(), (64, 36));
    }

    #[test]
    fn non_png_capture_is_a_render_failure() {
        let err = SlideRaster::from_png(&slide(), b"not a png".to_vec()).unwrap_err();
        match err {
            DeckError::RenderFailed { ordinal, slide, .. } => {
                assert_eq!(ordinal, 3);
                assert_eq!(slide, "page3.html");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
