//! End-to-end tests for slides2pdf.
//!
//! These launch a real headless Chromium and write real PDFs with PDFium.
//! The PDFium writer section needs no browser.
//! They are gated behind the `E2E_ENABLED` environment variable so they do
//! not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Inside a container running as root, also set `E2E_NO_SANDBOX=1`.

use slides2pdf::pipeline::assemble::DocumentAssembler;
use slides2pdf::pipeline::encode::placeholder_raster;
use slides2pdf::{
    build_deck, inspect_deck, DeckConfig, DeckError, PageSize, PdfiumBackend,
    SlideFailurePolicy, Viewport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        init_tracing();
    }};
}

/// Library logs on stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

fn config() -> slides2pdf::DeckConfigBuilder {
    DeckConfig::builder().sandbox(std::env::var("E2E_NO_SANDBOX").is_err())
}

/// A full-bleed slide with a distinct colour and label.
fn slide(label: &str, colour: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><head><style>
  html, body {{ margin: 0; width: 1280px; height: 720px; background: {colour}; }}
  h1 {{ font: 96px sans-serif; color: white; padding: 80px; margin: 0; }}
</style></head>
<body><h1>{label}</h1></body></html>"#
    )
}

/// A slide whose image request is accepted but never answered, so the
/// network never goes idle while the returned listener is alive.
fn stalled_slide() -> (std::net::TcpListener, String) {
    let server = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = server.local_addr().unwrap().port();
    let markup = format!(
        r#"<html><body><h1>Waiting</h1><img src="http://127.0.0.1:{port}/never.png"></body></html>"#
    );
    (server, markup)
}

fn write_slides(dir: &Path, slides: &[(&str, String)]) {
    std::fs::create_dir_all(dir).unwrap();
    for (name, markup) in slides {
        std::fs::write(dir.join(name), markup).unwrap();
    }
}

fn deck_of_three(root: &Path) -> PathBuf {
    let dir = root.join("slides");
    write_slides(
        &dir,
        &[
            ("page10.html", slide("Ten", "#1b5e20")),
            ("page1.html", slide("One", "#0d47a1")),
            ("page2.html", slide("Two", "#b71c1c")),
        ],
    );
    dir
}

// ── Build + inspect ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_three_slides_make_three_slide_sized_pages() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let slides = deck_of_three(root.path());
    let output = root.path().join("deck.pdf");

    let report = build_deck(&slides, &output, &config().build().unwrap())
        .await
        .expect("build_deck() should succeed");

    let names: Vec<_> = report.slides.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["page1.html", "page2.html", "page10.html"]);
    for outcome in &report.slides {
        assert_eq!((outcome.raster_width, outcome.raster_height), (2560, 1440));
    }

    let meta = inspect_deck(&output).await.expect("inspect_deck() should succeed");
    assert_eq!(meta.page_count, 3);
    assert!(meta.is_uniform());
    for page in &meta.pages {
        assert!((page.width - 1280.0).abs() < 0.5, "width {}", page.width);
        assert!((page.height - 720.0).abs() < 0.5, "height {}", page.height);
    }
    println!("Metadata: {:?}", meta);
}

#[tokio::test]
async fn test_rerun_is_stable() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let slides = deck_of_three(root.path());
    let output = root.path().join("deck.pdf");
    let config = config().build().unwrap();

    build_deck(&slides, &output, &config).await.unwrap();
    let first = inspect_deck(&output).await.unwrap();
    build_deck(&slides, &output, &config).await.unwrap();
    let second = inspect_deck(&output).await.unwrap();

    assert_eq!(first.page_count, second.page_count);
    assert_eq!(first.pages, second.pages);
}

#[tokio::test]
async fn test_custom_canvas() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let slides = deck_of_three(root.path());
    let output = root.path().join("wide.pdf");
    let config = config()
        .viewport(1920, 1080)
        .device_scale_factor(1.0)
        .build()
        .unwrap();

    let report = build_deck(&slides, &output, &config).await.unwrap();
    assert_eq!(report.slides[0].raster_width, 1920);
    let meta = inspect_deck(&output).await.unwrap();
    assert!((meta.pages[0].width - 1920.0).abs() < 0.5);
}

// ── Settle barrier ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_never_settling_slide_times_out() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("slides");
    let (_server, stalled) = stalled_slide();
    write_slides(
        &dir,
        &[
            ("page1.html", slide("One", "#000")),
            ("page2.html", stalled),
        ],
    );
    let output = root.path().join("deck.pdf");
    std::fs::write(&output, b"previous").unwrap();

    let config = config().settle_timeout_secs(3).build().unwrap();
    let err = build_deck(&dir, &output, &config).await.unwrap_err();

    assert!(
        matches!(err, DeckError::SettleTimeout { ordinal: 2, .. }),
        "expected SettleTimeout, got: {err}"
    );
    assert_eq!(std::fs::read(&output).unwrap(), b"previous");
}

#[tokio::test]
async fn test_keep_going_inserts_blank_page() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("slides");
    let (_server, stalled) = stalled_slide();
    write_slides(
        &dir,
        &[
            ("page1.html", slide("One", "#000")),
            ("page2.html", stalled),
            ("page3.html", slide("Three", "#333")),
        ],
    );
    let output = root.path().join("deck.pdf");

    let config = config()
        .settle_timeout_secs(3)
        .failure_policy(SlideFailurePolicy::Placeholder)
        .build()
        .unwrap();
    let report = build_deck(&dir, &output, &config).await.unwrap();

    assert_eq!(report.stats.placeholder_slides, 1);
    assert_eq!(inspect_deck(&output).await.unwrap().page_count, 3);
    assert!(matches!(
        report.into_result(),
        Err(DeckError::PartialFailure { failed: 1, total: 3 })
    ));
}

// ── PDFium writer (no browser) ───────────────────────────────────────────────

#[tokio::test]
async fn test_pdfium_pages_match_the_slide_canvas() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let output = root.path().join("blank.pdf");
    let size = PageSize::from_viewport(&Viewport::default());

    let mut assembler = DocumentAssembler::open(Arc::new(PdfiumBackend), &output, size)
        .await
        .unwrap();
    for ordinal in 1..=3 {
        assembler
            .append_page(placeholder_raster(ordinal, 2560, 1440).unwrap())
            .await
            .unwrap();
    }
    let document = assembler.finalize().await.expect("finalize() should succeed");
    assert_eq!(document.page_count, 3);
    assert_eq!(document.path, output);

    let meta = inspect_deck(&output).await.unwrap();
    assert_eq!(meta.page_count, 3);
    for page in &meta.pages {
        assert!((page.width - 1280.0).abs() < 0.5, "width {}", page.width);
        assert!((page.height - 720.0).abs() < 0.5, "height {}", page.height);
    }
}

#[tokio::test]
async fn test_pdfium_page_size_ignores_raster_density() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let output = root.path().join("wide.pdf");
    let size = PageSize {
        width: 1920.0,
        height: 1080.0,
    };

    let mut assembler = DocumentAssembler::open(Arc::new(PdfiumBackend), &output, size)
        .await
        .unwrap();
    assembler
        .append_page(placeholder_raster(1, 960, 540).unwrap())
        .await
        .unwrap();
    assembler.finalize().await.unwrap();

    let meta = inspect_deck(&output).await.unwrap();
    assert_eq!(meta.page_count, 1);
    assert!((meta.pages[0].width - 1920.0).abs() < 0.5);
    assert!((meta.pages[0].height - 1080.0).abs() < 0.5);
}

#[tokio::test]
async fn test_pdfium_abort_keeps_previous_file() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let output = root.path().join("deck.pdf");
    std::fs::write(&output, b"previous").unwrap();

    let mut assembler = DocumentAssembler::open(
        Arc::new(PdfiumBackend),
        &output,
        PageSize::from_viewport(&Viewport::default()),
    )
    .await
    .unwrap();
    assembler
        .append_page(placeholder_raster(1, 2560, 1440).unwrap())
        .await
        .unwrap();
    assembler.abort().await;

    assert_eq!(std::fs::read(&output).unwrap(), b"previous");
}

// ── Inspect errors (no browser) ──────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_nonexistent() {
    e2e_skip_unless_enabled!();
    let err = inspect_deck("/tmp/definitely-not-a-deck-slides2pdf.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, DeckError::FileNotFound { .. }), "got: {err}");
}

#[tokio::test]
async fn test_inspect_garbage_is_corrupt() {
    e2e_skip_unless_enabled!();
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("broken.pdf");
    std::fs::write(&path, b"this is not a pdf").unwrap();

    let err = inspect_deck(&path).await.unwrap_err();
    assert!(matches!(err, DeckError::CorruptPdf { .. }), "got: {err}");
}
