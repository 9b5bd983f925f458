//! Read back the structure of a finished deck.

use crate::error::DeckError;
use crate::output::{DeckMetadata, PageDimensions};
use crate::pipeline::assemble::pdfium;
use std::path::Path;
use tracing::debug;

/// Page count, per-page size and PDF version of the file at `path`.
///
/// Blocking: call from `spawn_blocking`.
pub fn read_deck_metadata(path: &Path) -> Result<DeckMetadata, DeckError> {
    if !path.is_file() {
        return Err(DeckError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let document = pdfium()?
        .load_pdf_from_file(path, None)
        .map_err(|e| DeckError::CorruptPdf {
            path: path.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let pages: Vec<PageDimensions> = document
        .pages()
        .iter()
        .map(|page| PageDimensions {
            width: page.width().value,
            height: page.height().value,
        })
        .collect();
    debug!("{}: {} pages", path.display(), pages.len());

    Ok(DeckMetadata {
        page_count: pages.len(),
        pages,
        pdf_version: format!("{:?}", document.version()),
    })
}
