//! Document assembly: one PDF page per raster, written atomically.
//!
//! `pdfium-render` documents borrow the `Pdfium` instance that created them
//! and must stay on one thread, so the whole document lives inside a single
//! `spawn_blocking` worker. The async side feeds it through a channel of
//! capacity one, so at most one raster waits in memory while the next slide
//! renders.
//!
//! The worker writes into a temporary file beside the output. Only
//! [`DocumentAssembler::finalize`] moves it over the output path; every other
//! exit (abort, error, panic, drop) deletes it, so a failed run never
//! replaces an existing deck.
//!
//! ```text
//! append_page ──▶ [chan: 1] ──▶ PageFeed ──▶ DocumentBackend ──▶ temp file
//! finalize    ──▶   Commit  ──▶ persist(temp → output)
//! ```

use crate::config::Viewport;
use crate::error::DeckError;
use crate::pipeline::encode;
use crate::pipeline::render::SlideRaster;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tempfile::TempPath;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// One point per CSS pixel, so a 1280×720 slide makes a 1280×720 pt page.
    pub fn from_viewport(viewport: &Viewport) -> Self {
        Self {
            width: viewport.width as f32,
            height: viewport.height as f32,
        }
    }
}

/// What the async side sends to the writer.
#[derive(Debug)]
pub enum FeedMessage {
    Page(SlideRaster),
    /// Every page has been sent; save the document.
    Commit,
}

/// The writer's end of the page channel, as an iterator of rasters.
///
/// Iteration ends on [`FeedMessage::Commit`] or when the sender goes away.
/// Only the former counts as a commit.
#[derive(Debug)]
pub struct PageFeed {
    rx: mpsc::Receiver<FeedMessage>,
    committed: bool,
}

impl PageFeed {
    pub fn is_committed(&self) -> bool {
        self.committed
    }
}

impl Iterator for PageFeed {
    type Item = SlideRaster;

    fn next(&mut self) -> Option<SlideRaster> {
        if self.committed {
            return None;
        }
        match self.rx.blocking_recv()? {
            FeedMessage::Page(raster) => Some(raster),
            FeedMessage::Commit => {
                self.committed = true;
                None
            }
        }
    }
}

/// Turns a stream of rasters into a document file.
///
/// `assemble` runs on a blocking thread. It should drain `feed` and, if
/// [`PageFeed::is_committed`] is then true, write the document to `dest` and
/// return the page count. Anything written to `dest` without a commit is
/// discarded.
pub trait DocumentBackend: Send + Sync + 'static {
    fn assemble(&self, size: PageSize, feed: &mut PageFeed, dest: &Path) -> Result<usize, DeckError>;
}

/// The deck as it landed on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledDocument {
    pub path: PathBuf,
    pub page_count: usize,
    pub page_size: PageSize,
}

type WriterResult = Result<Option<AssembledDocument>, DeckError>;

/// Async handle on the writer thread.
pub struct DocumentAssembler {
    tx: mpsc::Sender<FeedMessage>,
    worker: Option<JoinHandle<WriterResult>>,
    output: PathBuf,
    pages_sent: usize,
}

impl DocumentAssembler {
    /// Start a document of `size` pages destined for `output`.
    ///
    /// Creates missing parent directories and the temporary file up front so
    /// an unwritable destination fails before any slide is rendered.
    pub async fn open<B: DocumentBackend>(
        backend: Arc<B>,
        output: &Path,
        size: PageSize,
    ) -> Result<Self, DeckError> {
        let output = output.to_path_buf();
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| write_failed(&output, format!("Cannot create '{}': {e}", parent.display())))?;

        let temp = tempfile::Builder::new()
            .prefix(".slides2pdf-")
            .suffix(".pdf")
            .tempfile_in(&parent)
            .map_err(|e| write_failed(&output, format!("Cannot create temporary file: {e}")))?
            .into_temp_path();
        debug!("Assembling into {}", temp.display());

        let (tx, rx) = mpsc::channel(1);
        let feed = PageFeed { rx, committed: false };
        let dest = output.clone();
        let worker = tokio::task::spawn_blocking(move || write_document(&*backend, size, feed, temp, dest));

        Ok(Self {
            tx,
            worker: Some(worker),
            output,
            pages_sent: 0,
        })
    }

    /// Add the next page. Pages appear in the order they are appended.
    pub async fn append_page(&mut self, raster: SlideRaster) -> Result<(), DeckError> {
        let ordinal = raster.ordinal;
        if self.tx.send(FeedMessage::Page(raster)).await.is_err() {
            return Err(self.writer_stopped().await);
        }
        self.pages_sent += 1;
        debug!("Queued page {} (slide {})", self.pages_sent, ordinal);
        Ok(())
    }

    /// Save the document and move it over the output path.
    ///
    /// Resolves only once the file is fully written and in place.
    pub async fn finalize(mut self) -> Result<AssembledDocument, DeckError> {
        if self.tx.send(FeedMessage::Commit).await.is_err() {
            return Err(self.writer_stopped().await);
        }
        match self.join().await? {
            Some(document) => {
                info!(
                    "Wrote {} ({} pages)",
                    document.path.display(),
                    document.page_count
                );
                Ok(document)
            }
            None => Err(DeckError::Internal(
                "Document writer exited without saving".into(),
            )),
        }
    }

    /// Throw the document away. The output path is not touched.
    pub async fn abort(self) {
        let Self {
            tx,
            worker,
            output,
            pages_sent,
        } = self;
        // Closing the channel ends the feed without a commit.
        drop(tx);
        let Some(handle) = worker else { return };
        match handle.await {
            Ok(Ok(_)) => debug!(
                "Discarded unfinished document for {} after {} pages",
                output.display(),
                pages_sent
            ),
            Ok(Err(e)) => debug!("Document writer failed before abort: {e}"),
            Err(e) => warn!("Document writer panicked: {e}"),
        }
    }

    async fn join(&mut self) -> WriterResult {
        match self.worker.take() {
            Some(handle) => handle
                .await
                .map_err(|e| DeckError::Internal(format!("Document writer panicked: {e}")))?,
            None => Err(DeckError::Internal("Document writer already stopped".into())),
        }
    }

    async fn writer_stopped(&mut self) -> DeckError {
        match self.join().await {
            Err(e) => e,
            Ok(_) => DeckError::Internal("Document writer stopped unexpectedly".into()),
        }
    }
}

fn write_document(
    backend: &dyn DocumentBackend,
    size: PageSize,
    mut feed: PageFeed,
    temp: TempPath,
    output: PathBuf,
) -> WriterResult {
    let page_count = backend.assemble(size, &mut feed, &temp)?;
    if !feed.is_committed() {
        // `temp` is deleted on drop.
        return Ok(None);
    }
    temp.persist(&output)
        .map_err(|e| write_failed(&output, format!("Cannot move document into place: {}", e.error)))?;
    Ok(Some(AssembledDocument {
        path: output,
        page_count,
        page_size: size,
    }))
}

fn write_failed(path: &Path, detail: impl Into<String>) -> DeckError {
    DeckError::WriteFailed {
        path: path.to_path_buf(),
        detail: detail.into(),
    }
}

// ── PDFium ──────────────────────────────────────────────────────────────────

static PDFIUM: OnceLock<Pdfium> = OnceLock::new();

/// The process-wide PDFium binding, created on first use.
pub(crate) fn pdfium() -> Result<&'static Pdfium, DeckError> {
    if let Some(pdfium) = PDFIUM.get() {
        return Ok(pdfium);
    }
    let bound = engine_auto::bind_pdfium_silent()
        .map_err(|e| DeckError::PdfiumBindingFailed(e.to_string()))?;
    Ok(PDFIUM.get_or_init(|| bound))
}

/// Writes the deck with PDFium: each raster becomes one page with the image
/// stretched edge to edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumBackend;

impl DocumentBackend for PdfiumBackend {
    fn assemble(&self, size: PageSize, feed: &mut PageFeed, dest: &Path) -> Result<usize, DeckError> {
        let pdfium = pdfium()?;
        let mut document = pdfium
            .create_new_pdf()
            .map_err(|e| write_failed(dest, format!("Cannot create document: {:?}", e)))?;

        let (width, height) = (PdfPoints::new(size.width), PdfPoints::new(size.height));
        let mut page_count = 0;

        for raster in &mut *feed {
            let image = encode::decode_raster(&raster.png).map_err(|e| {
                write_failed(dest, format!("Slide {} capture could not be decoded: {e}", raster.ordinal))
            })?;

            let mut page = document
                .pages_mut()
                .create_page_at_end(PdfPagePaperSize::Custom(width, height))
                .map_err(|e| write_failed(dest, format!("Cannot add page {}: {:?}", raster.ordinal, e)))?;
            page.objects_mut()
                .create_image_object(PdfPoints::ZERO, PdfPoints::ZERO, &image, Some(width), Some(height))
                .map_err(|e| {
                    write_failed(dest, format!("Cannot draw page {}: {:?}", raster.ordinal, e))
                })?;

            page_count += 1;
            debug!(
                "Page {} ← {}x{} px raster",
                page_count, raster.width, raster.height
            );
        }

        if !feed.is_committed() {
            return Ok(page_count);
        }

        document
            .save_to_file(dest)
            .map_err(|e| write_failed(dest, format!("Cannot save document: {:?}", e)))?;
        Ok(page_count)
    }
}
