//! Configuration types for slide-deck assembly.
//!
//! Every knob lives in [`DeckConfig`], built through [`DeckConfigBuilder`].
//! Setters clamp obviously out-of-range values; [`DeckConfigBuilder::build`]
//! rejects the combinations that cannot produce a deck at all.

use crate::error::DeckError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Largest accepted logical viewport edge, in CSS pixels.
pub const MAX_VIEWPORT_EDGE: u32 = 8192;

/// The logical canvas every slide is designed for, plus capture density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// CSS pixel width. Also the PDF page width in points. Default: 1280.
    pub width: u32,
    /// CSS pixel height. Also the PDF page height in points. Default: 720.
    pub height: u32,
    /// Device pixel ratio used for capture. Default: 2.0.
    pub device_scale_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_scale_factor: 2.0,
        }
    }
}

impl Viewport {
    /// Physical raster size this viewport is expected to produce.
    pub fn pixel_size(&self) -> (u32, u32) {
        let scale = |edge: u32| (f64::from(edge) * self.device_scale_factor).round() as u32;
        (scale(self.width), scale(self.height))
    }
}

/// What to do when a single slide cannot be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlideFailurePolicy {
    /// Stop the run on the first failing slide; nothing is written. (default)
    #[default]
    Abort,
    /// Put a blank page in place of the failing slide, finish the deck, and
    /// report the run as a partial failure.
    Placeholder,
}

/// Configuration for one slides-to-PDF run.
///
/// # Example
/// ```rust
/// use slides2pdf::{DeckConfig, SlideFailurePolicy};
///
/// let config = DeckConfig::builder()
///     .device_scale_factor(1.0)
///     .settle_timeout_secs(10)
///     .failure_policy(SlideFailurePolicy::Placeholder)
///     .build()
///     .unwrap();
/// assert_eq!(config.viewport.pixel_size(), (1280, 720));
/// ```
#[derive(Clone)]
pub struct DeckConfig {
    /// Slide canvas and capture density.
    pub viewport: Viewport,

    /// File extension (without the dot) that marks a slide. Matched
    /// case-insensitively. Default: `html`.
    pub extension: String,

    /// Upper bound on the per-slide settle wait, in seconds. Default: 30.
    ///
    /// `0` waits for network idle forever, so one never-finishing request
    /// stalls the whole run.
    pub settle_timeout_secs: u64,

    /// How long to wait for the browser to start, in seconds. Default: 20.
    pub launch_timeout_secs: u64,

    /// Explicit browser executable. When `None` it is discovered.
    pub chrome_executable: Option<PathBuf>,

    /// Run Chromium with its sandbox. Default: true.
    ///
    /// Containers running as root usually need this off.
    pub sandbox: bool,

    /// Behaviour on a per-slide failure. Default: [`SlideFailurePolicy::Abort`].
    pub failure_policy: SlideFailurePolicy,

    /// Optional callback for per-slide progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            extension: "html".to_string(),
            settle_timeout_secs: 30,
            launch_timeout_secs: 20,
            chrome_executable: None,
            sandbox: true,
            failure_policy: SlideFailurePolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DeckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckConfig")
            .field("viewport", &self.viewport)
            .field("extension", &self.extension)
            .field("settle_timeout_secs", &self.settle_timeout_secs)
            .field("launch_timeout_secs", &self.launch_timeout_secs)
            .field("chrome_executable", &self.chrome_executable)
            .field("sandbox", &self.sandbox)
            .field("failure_policy", &self.failure_policy)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DeckProgressCallback>"),
            )
            .finish()
    }
}

impl DeckConfig {
    /// Create a new builder for `DeckConfig`.
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder {
            config: Self::default(),
        }
    }

    /// The settle bound as a `Duration`, `None` meaning unbounded.
    pub fn settle_timeout(&self) -> Option<Duration> {
        (self.settle_timeout_secs > 0).then(|| Duration::from_secs(self.settle_timeout_secs))
    }

    /// Everything a render session needs to know, detached from the rest.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            viewport: self.viewport,
            settle_timeout: self.settle_timeout(),
        }
    }
}

/// Per-session render parameters handed to a [`crate::pipeline::render::RenderEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub viewport: Viewport,
    pub settle_timeout: Option<Duration>,
}

/// Builder for [`DeckConfig`].
#[derive(Debug)]
pub struct DeckConfigBuilder {
    config: DeckConfig,
}

impl DeckConfigBuilder {
    pub fn viewport(mut self, width: u32, height: u32) -> Self {
        self.config.viewport.width = width.clamp(1, MAX_VIEWPORT_EDGE);
        self.config.viewport.height = height.clamp(1, MAX_VIEWPORT_EDGE);
        self
    }

    pub fn device_scale_factor(mut self, scale: f64) -> Self {
        self.config.viewport.device_scale_factor = scale.clamp(0.25, 4.0);
        self
    }

    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.config.extension = ext.into().trim_start_matches('.').to_string();
        self
    }

    pub fn settle_timeout_secs(mut self, secs: u64) -> Self {
        self.config.settle_timeout_secs = secs;
        self
    }

    pub fn launch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.launch_timeout_secs = secs.max(1);
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn sandbox(mut self, enabled: bool) -> Self {
        self.config.sandbox = enabled;
        self
    }

    pub fn failure_policy(mut self, policy: SlideFailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DeckConfig, DeckError> {
        let c = &self.config;
        if c.extension.is_empty() {
            return Err(DeckError::InvalidConfig(
                "Slide extension must not be empty".into(),
            ));
        }
        if c.extension.contains(['/', '\\']) {
            return Err(DeckError::InvalidConfig(format!(
                "Slide extension '{}' must not contain path separators",
                c.extension
            )));
        }
        if !c.viewport.device_scale_factor.is_finite() || c.viewport.device_scale_factor <= 0.0 {
            return Err(DeckError::InvalidConfig(format!(
                "Device scale factor must be positive, got {}",
                c.viewport.device_scale_factor
            )));
        }
        let (w, h) = c.viewport.pixel_size();
        if w == 0 || h == 0 {
            return Err(DeckError::InvalidConfig(format!(
                "Viewport {}x{} at scale {} renders to an empty raster",
                c.viewport.width, c.viewport.height, c.viewport.device_scale_factor
            )));
        }
        Ok(self.config)
    }
}
