//! Headless Chromium render engine, driven over the DevTools protocol.
//!
//! One browser process serves the whole run. Every slide gets its own
//! browser context (separate cookies, storage and cache), one page inside
//! it, and is torn down before the next slide starts.
//!
//! The settle barrier listens for page lifecycle events on the main frame.
//! Loading markup with `document.open()` restarts the frame lifecycle with an
//! `init` event, so the first `networkIdle` after that `init` belongs to the
//! slide and not to the blank page it replaced.

use crate::config::{DeckConfig, RenderSettings};
use crate::error::DeckError;
use crate::pipeline::input::SlideSource;
use crate::pipeline::render::{RenderEngine, RenderSession, SlideRaster};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLifecycleEvent, FrameId, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::target::{CreateBrowserContextParams, CreateTargetParams};
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const INSTALL_HINT: &str = "Install Google Chrome or Chromium, or point to an existing binary \
with --chrome <path> (or the CHROME environment variable).";

/// Launches a local headless Chromium.
#[derive(Debug, Clone)]
pub struct ChromeEngine {
    executable: Option<PathBuf>,
    sandbox: bool,
    launch_timeout: Duration,
}

impl ChromeEngine {
    pub fn from_config(config: &DeckConfig) -> Self {
        Self {
            executable: config.chrome_executable.clone(),
            sandbox: config.sandbox,
            launch_timeout: Duration::from_secs(config.launch_timeout_secs),
        }
    }

    /// The executable to launch: the configured one, else the discovered one.
    pub fn resolve_executable(&self) -> Result<PathBuf, DeckError> {
        if let Some(path) = &self.executable {
            if !path.is_file() {
                return Err(DeckError::EngineUnavailable {
                    reason: format!("Browser executable '{}' does not exist", path.display()),
                    hint: INSTALL_HINT.to_string(),
                });
            }
            return Ok(path.clone());
        }

        engine_auto::discover_chrome().map_err(|e| {
            let searched = match &e {
                engine_auto::EngineAutoError::ChromeNotFound { searched } => searched
                    .iter()
                    .map(|p| format!("\n  {}", p.display()))
                    .collect::<String>(),
                _ => String::new(),
            };
            DeckError::EngineUnavailable {
                reason: format!("{e}{searched}"),
                hint: INSTALL_HINT.to_string(),
            }
        })
    }
}

impl RenderEngine for ChromeEngine {
    type Session = ChromeSession;

    async fn launch(&self, settings: &RenderSettings) -> Result<ChromeSession, DeckError> {
        let executable = self.resolve_executable()?;
        let vp = settings.viewport;
        info!(
            "Launching {} ({}x{} @{}x)",
            executable.display(),
            vp.width,
            vp.height,
            vp.device_scale_factor
        );

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&executable)
            .window_size(vp.width, vp.height)
            .viewport(CdpViewport {
                width: vp.width,
                height: vp.height,
                device_scale_factor: Some(vp.device_scale_factor),
                emulating_mobile: false,
                is_landscape: vp.width >= vp.height,
                has_touch: false,
            })
            .launch_timeout(self.launch_timeout);
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        let config = builder.build().map_err(|reason| DeckError::EngineUnavailable {
            reason,
            hint: INSTALL_HINT.to_string(),
        })?;

        let (browser, mut handler) =
            Browser::launch(config)
                .await
                .map_err(|e| DeckError::EngineUnavailable {
                    reason: format!("Failed to start '{}': {e}", executable.display()),
                    hint: INSTALL_HINT.to_string(),
                })?;

        // The handler drives the websocket; the browser is unusable without it.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("DevTools handler: {e}");
                }
            }
        });

        Ok(ChromeSession {
            browser,
            handler,
            settings: *settings,
        })
    }
}

/// A running browser plus the task pumping its DevTools connection.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    settings: RenderSettings,
}

impl RenderSession for ChromeSession {
    async fn render(&mut self, slide: &SlideSource, markup: &str) -> Result<SlideRaster, DeckError> {
        let start = Instant::now();
        let context = self
            .browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| render_failed(slide, "Creating browser context failed", e))?;

        let result = self.render_in_context(context.clone(), slide, markup).await;

        if let Err(e) = self.browser.dispose_browser_context(context).await {
            warn!("Failed to dispose browser context for {}: {e}", slide.name);
        }
        debug!("Slide {} rendered in {}ms", slide.ordinal, start.elapsed().as_millis());
        result
    }

    async fn release(mut self) -> Result<(), DeckError> {
        let closed = self.browser.close().await;
        let waited = self.browser.wait().await;
        self.handler.abort();

        closed.map_err(|e| DeckError::Internal(format!("Failed to close browser: {e}")))?;
        waited.map_err(|e| DeckError::Internal(format!("Browser did not exit cleanly: {e}")))?;
        info!("Browser released");
        Ok(())
    }
}

impl ChromeSession {
    async fn render_in_context(
        &self,
        context: BrowserContextId,
        slide: &SlideSource,
        markup: &str,
    ) -> Result<SlideRaster, DeckError> {
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context)
            .build()
            .map_err(|e| render_failed(slide, "Invalid target parameters", e))?;
        let page = self
            .browser
            .new_page(target)
            .await
            .map_err(|e| render_failed(slide, "Opening page failed", e))?;

        let captured = self.capture(&page, slide, markup).await;

        if let Err(e) = page.close().await {
            debug!("Closing page for {}: {e}", slide.name);
        }
        captured
    }

    async fn capture(&self, page: &Page, slide: &SlideSource, markup: &str) -> Result<SlideRaster, DeckError> {
        let vp = self.settings.viewport;
        page.execute(SetDeviceMetricsOverrideParams::new(
            i64::from(vp.width),
            i64::from(vp.height),
            vp.device_scale_factor,
            false,
        ))
        .await
        .map_err(|e| render_failed(slide, "Setting viewport failed", e))?;
        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| render_failed(slide, "Enabling lifecycle events failed", e))?;

        // Subscribe before loading so no lifecycle event is missed.
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| render_failed(slide, "Subscribing to lifecycle events failed", e))?;
        let main_frame = page
            .mainframe()
            .await
            .map_err(|e| render_failed(slide, "Main frame lookup failed", e))?;

        let settle = async {
            page.set_content(markup)
                .await
                .map_err(|e| render_failed(slide, "Loading markup failed", e))?;
            if wait_for_network_idle(&mut lifecycle, main_frame.as_ref()).await {
                Ok(())
            } else {
                Err(render_failed(slide, "Waiting for network idle failed", "page went away"))
            }
        };
        match self.settings.settle_timeout {
            Some(limit) => tokio::time::timeout(limit, settle)
                .await
                .map_err(|_| DeckError::SettleTimeout {
                    ordinal: slide.ordinal,
                    slide: slide.name.clone(),
                    secs: limit.as_secs(),
                })??,
            None => settle.await?,
        }

        let png = page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(false)
                    .build(),
            )
            .await
            .map_err(|e| render_failed(slide, "Capture failed", e))?;
        SlideRaster::from_png(slide, png)
    }
}

/// Returns `false` if the event stream ends before the frame goes idle.
async fn wait_for_network_idle(
    events: &mut EventStream<EventLifecycleEvent>,
    main_frame: Option<&FrameId>,
) -> bool {
    let mut started = false;
    while let Some(event) = events.next().await {
        if main_frame.is_some_and(|frame| *frame != event.frame_id) {
            continue;
        }
        match event.name.as_str() {
            "init" => started = true,
            "networkIdle" if started => return true,
            _ => {}
        }
    }
    false
}

fn render_failed(slide: &SlideSource, stage: &str, err: impl Display) -> DeckError {
    DeckError::RenderFailed {
        ordinal: slide.ordinal,
        slide: slide.name.clone(),
        detail: format!("{stage}: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_explicit_executable_is_engine_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeckConfig::builder()
            .chrome_executable(dir.path().join("no-such-chrome"))
            .build()
            .unwrap();
        match ChromeEngine::from_config(&config).resolve_executable() {
            Err(DeckError::EngineUnavailable { reason, hint }) => {
                assert!(reason.contains("no-such-chrome"), "got: {reason}");
                assert!(hint.contains("--chrome"), "got: {hint}");
            }
            other => panic!("expected EngineUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn existing_explicit_executable_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("chrome");
        std::fs::write(&exe, b"").unwrap();
        let config = DeckConfig::builder().chrome_executable(&exe).build().unwrap();
        assert_eq!(ChromeEngine::from_config(&config).resolve_executable().unwrap(), exe);
    }

    #[test]
    fn engine_takes_settings_from_config() {
        let config = DeckConfig::builder()
            .sandbox(false)
            .launch_timeout_secs(5)
            .build()
            .unwrap();
        let engine = ChromeEngine::from_config(&config);
        assert!(!engine.sandbox);
        assert_eq!(engine.launch_timeout, Duration::from_secs(5));
        assert!(engine.executable.is_none());
    }
}
