//! Pipeline stages for HTML-slides-to-PDF assembly.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render/chrome ──▶ assemble ──▶ (inspect)
//! (dir)     (PNG per slide)    (pdfium)     (read back)
//! ```
//!
//! 1. [`input`]  — list slide files and put them in natural order
//! 2. [`render`] — the engine/session seam; [`chrome`] implements it with one
//!    headless Chromium and a fresh browser context per slide
//! 3. [`encode`] — PNG header reads, decoding and blank placeholder pages
//! 4. [`assemble`] — stream rasters into a PDF on a blocking thread and move
//!    it into place only on success
//! 5. [`inspect`] — page count and sizes of an existing deck

pub mod assemble;
pub mod chrome;
pub mod encode;
pub mod input;
pub mod inspect;
pub mod render;
