//! Deck-building entry points.
//!
//! [`build_deck`] is the whole pipeline with the production engines:
//!
//! ```text
//! resolve ──▶ launch ──▶ (render ──▶ append)* ──▶ release ──▶ finalize
//! ```
//!
//! [`build_deck_with`] runs the same orchestration against any
//! [`RenderEngine`] and [`DocumentBackend`].

use crate::config::{DeckConfig, SlideFailurePolicy};
use crate::error::{DeckError, SlideError};
use crate::output::{DeckMetadata, DeckReport, DeckStats, SlideOutcome};
use crate::pipeline::assemble::{DocumentAssembler, DocumentBackend, PageSize, PdfiumBackend};
use crate::pipeline::chrome::ChromeEngine;
use crate::pipeline::input::{self, SlideSource};
use crate::pipeline::render::{RenderEngine, RenderSession, SlideRaster};
use crate::pipeline::{encode, inspect};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Render every slide in `input_dir` into one PDF at `output`.
///
/// Uses a local headless Chromium and PDFium.
///
/// # Returns
/// `Ok(DeckReport)` once the file is in place. With
/// [`SlideFailurePolicy::Placeholder`] the report may list failed slides;
/// call [`DeckReport::into_result`] to treat those as an error.
///
/// # Errors
/// Any fatal [`DeckError`]. The render session has been released by then
/// and `output` is untouched.
pub async fn build_deck(
    input_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &DeckConfig,
) -> Result<DeckReport, DeckError> {
    let engine = ChromeEngine::from_config(config);
    build_deck_with(&engine, Arc::new(PdfiumBackend), input_dir, output, config).await
}

/// [`build_deck`] with a caller-supplied engine and document backend.
pub async fn build_deck_with<E, B>(
    engine: &E,
    backend: Arc<B>,
    input_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &DeckConfig,
) -> Result<DeckReport, DeckError>
where
    E: RenderEngine,
    B: DocumentBackend,
{
    let total_start = Instant::now();
    let (input_dir, output) = (input_dir.as_ref(), output.as_ref());
    info!("Building deck: {} → {}", input_dir.display(), output.display());

    // ── Step 1: Resolve slides ───────────────────────────────────────────
    let slides = input::resolve_slides(input_dir, &config.extension)?;
    let total = slides.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_deck_start(total);
    }

    // ── Step 2: Acquire the render session ───────────────────────────────
    let mut session = engine.launch(&config.render_settings()).await?;

    // ── Step 3: Open the document ────────────────────────────────────────
    let size = PageSize::from_viewport(&config.viewport);
    let mut assembler = match DocumentAssembler::open(backend, output, size).await {
        Ok(assembler) => assembler,
        Err(e) => {
            release(session).await;
            return Err(e);
        }
    };

    // ── Step 4: Render slides into pages, in order ───────────────────────
    let rendered = render_slides(&mut session, &mut assembler, &slides, config).await;

    // ── Step 5: Release the session on every path ────────────────────────
    release(session).await;

    // ── Step 6: Finalize, or discard on failure ──────────────────────────
    let (outcomes, render_duration_ms) = match rendered {
        Ok(rendered) => rendered,
        Err(e) => {
            assembler.abort().await;
            return Err(e);
        }
    };
    let document = assembler.finalize().await?;

    let placeholder_slides = outcomes.iter().filter(|o| o.error.is_some()).count();
    let stats = DeckStats {
        total_slides: total,
        rendered_slides: total - placeholder_slides,
        placeholder_slides,
        page_width: document.page_size.width,
        page_height: document.page_size.height,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
    };

    info!(
        "Deck complete: {}/{} slides rendered, {}ms total",
        stats.rendered_slides, total, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_deck_complete(total, stats.rendered_slides);
    }

    Ok(DeckReport {
        output: document.path,
        slides: outcomes,
        stats,
    })
}

/// Blocking wrapper around [`build_deck`].
///
/// Creates its own runtime, so it must not be called from async code.
pub fn build_deck_sync(
    input_dir: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &DeckConfig,
) -> Result<DeckReport, DeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(build_deck(input_dir, output, config))
}

/// Page count and page sizes of an existing PDF, without rendering it.
pub async fn inspect_deck(path: impl AsRef<Path>) -> Result<DeckMetadata, DeckError> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || inspect::read_deck_metadata(&path))
        .await
        .map_err(|e| DeckError::Internal(format!("Inspect task panicked: {}", e)))?
}

async fn render_slides<S: RenderSession>(
    session: &mut S,
    assembler: &mut DocumentAssembler,
    slides: &[SlideSource],
    config: &DeckConfig,
) -> Result<(Vec<SlideOutcome>, u64), DeckError> {
    let total = slides.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut render_duration_ms = 0;
    // Pixel size of the first real capture; every later capture must match.
    let mut deck_raster: Option<(u32, u32)> = None;

    for slide in slides {
        if let Some(ref cb) = config.progress_callback {
            cb.on_slide_start(slide.ordinal, total, &slide.name);
        }

        let start = Instant::now();
        let attempt = render_slide(session, slide, deck_raster).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        render_duration_ms += duration_ms;

        let (raster, error) = match attempt {
            Ok(raster) => {
                deck_raster.get_or_insert(raster.dimensions());
                (raster, None)
            }
            Err(e) => {
                if let Some(ref cb) = config.progress_callback {
                    cb.on_slide_error(slide.ordinal, total, &slide.name, &e.to_string());
                }
                if config.failure_policy != SlideFailurePolicy::Placeholder || !e.is_slide_failure() {
                    return Err(e);
                }
                warn!("{e}; using a blank page");
                let (width, height) = deck_raster.unwrap_or_else(|| config.viewport.pixel_size());
                let blank = encode::placeholder_raster(slide.ordinal, width, height)?;
                (blank, Some(SlideError::from_fatal(slide.ordinal, &slide.name, &e)))
            }
        };

        let (raster_width, raster_height) = raster.dimensions();
        let png_bytes = raster.png.len();
        assembler.append_page(raster).await?;

        if error.is_none() {
            if let Some(ref cb) = config.progress_callback {
                cb.on_slide_complete(slide.ordinal, total, &slide.name, png_bytes);
            }
        }
        outcomes.push(SlideOutcome {
            ordinal: slide.ordinal,
            name: slide.name.clone(),
            source: slide.path.clone(),
            raster_width,
            raster_height,
            duration_ms,
            error,
        });
    }

    Ok((outcomes, render_duration_ms))
}

async fn render_slide<S: RenderSession>(
    session: &mut S,
    slide: &SlideSource,
    expected: Option<(u32, u32)>,
) -> Result<SlideRaster, DeckError> {
    let markup = tokio::fs::read_to_string(&slide.path)
        .await
        .map_err(|source| DeckError::SlideUnreadable {
            path: slide.path.clone(),
            source,
        })?;
    debug!("Slide {} ({}): {} bytes of markup", slide.ordinal, slide.name, markup.len());

    let raster = session.render(slide, &markup).await?;
    match expected {
        Some(expected) if raster.dimensions() != expected => Err(DeckError::RasterSizeMismatch {
            ordinal: slide.ordinal,
            slide: slide.name.clone(),
            expected,
            actual: raster.dimensions(),
        }),
        _ => Ok(raster),
    }
}

async fn release<S: RenderSession>(session: S) {
    if let Err(e) = session.release().await {
        warn!("Failed to release render session: {e}");
    }
}
