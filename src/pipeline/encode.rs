//! PNG helpers shared by the render and assembly stages.
//!
//! Captures arrive from the browser already PNG-encoded. The pipeline only
//! needs their pixel size up front; decoding to pixels happens once, on the
//! writer thread, right before the page is drawn.

use crate::error::DeckError;
use crate::pipeline::render::SlideRaster;
use image::codecs::png::PngDecoder;
use image::{DynamicImage, ImageDecoder, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Pixel size of a PNG, read from its header without decoding the pixels.
pub fn raster_dimensions(png: &[u8]) -> Result<(u32, u32), image::ImageError> {
    Ok(PngDecoder::new(Cursor::new(png))?.dimensions())
}

/// Decode a PNG for drawing onto a page.
pub fn decode_raster(png: &[u8]) -> Result<DynamicImage, image::ImageError> {
    image::load_from_memory_with_format(png, ImageFormat::Png)
}

/// Encode a plain white image of the given size.
pub fn placeholder_png(width: u32, height: u32) -> Result<Vec<u8>, image::ImageError> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!("Encoded {}x{} placeholder → {} bytes", width, height, buf.len());
    Ok(buf)
}

/// The blank page that stands in for a slide that failed to render.
pub fn placeholder_raster(ordinal: usize, width: u32, height: u32) -> Result<SlideRaster, DeckError> {
    let png = placeholder_png(width, height)
        .map_err(|e| DeckError::Internal(format!("Placeholder encoding failed: {e}")))?;
    Ok(SlideRaster {
        ordinal,
        width,
        height,
        png,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_white_and_sized() {
        let png = placeholder_png(8, 4).unwrap();
        assert_eq!(raster_dimensions(&png).unwrap(), (8, 4));
        let img = decode_raster(&png).unwrap().to_rgb8();
        assert!(img.pixels().all(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn placeholder_raster_keeps_ordinal() {
        let raster = placeholder_raster(5, 16, 9).unwrap();
        assert_eq!(raster.ordinal, 5);
        assert_eq!((raster.width, raster.height), (16, 9));
        assert_eq!(raster_dimensions(&raster.png).unwrap(), (16, 9));
    }

    #[test]
    fn garbage_is_not_a_png() {
        assert!(raster_dimensions(b"<html></html>").is_err());
        assert!(decode_raster(b"").is_err());
    }
}
