//! Plugin and engine configuration.
//!
//! [`PluginConfig`] is static metadata shared with the host (name, vendor,
//! version). [`EngineConfig`] describes how the render engine negotiates its
//! format and schedules render events; it can be loaded from JSON.
//!
//! # Example
//!
//! ```ignore
//! use basic_au_core::PluginConfig;
//!
//! pub static CONFIG: PluginConfig = PluginConfig::new("A Basic Audio Unit")
//!     .with_vendor("Aura Audio")
//!     .with_version("1.0.0");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};
use crate::format::RenderFormat;
use crate::types::{CHANNEL_COUNT, DEFAULT_MAX_FRAMES, DEFAULT_SAMPLE_RATE};

/// Static plugin metadata.
#[derive(Debug, Clone)]
pub struct PluginConfig {
    /// Plugin name displayed by the host.
    pub name: &'static str,

    /// Vendor/company name.
    pub vendor: &'static str,

    /// Plugin version string.
    pub version: &'static str,

    /// Whether the unit accepts MIDI input.
    pub accepts_midi: bool,

    /// Whether the unit ships a custom editor view.
    ///
    /// Hosts fall back to a generic parameter view when this is false.
    pub has_editor: bool,
}

impl PluginConfig {
    /// Create a configuration with default values.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            vendor: "Unknown Vendor",
            version: "1.0.0",
            accepts_midi: false,
            has_editor: false,
        }
    }

    /// Set the vendor name.
    pub const fn with_vendor(mut self, vendor: &'static str) -> Self {
        self.vendor = vendor;
        self
    }

    /// Set the version string.
    pub const fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    /// Declare MIDI input support.
    pub const fn with_midi_input(mut self) -> Self {
        self.accepts_midi = true;
        self
    }

    /// Declare a custom editor view.
    pub const fn with_editor(mut self) -> Self {
        self.has_editor = true;
        self
    }
}

/// When render events are applied relative to the audio they affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    /// Split the render call at event offsets so each event takes effect at
    /// its own frame.
    #[default]
    SampleAccurate,
    /// Apply the whole event list before frame 0, then render the full
    /// range in one pass.
    BufferStart,
}

/// Render engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate proposed to the host before negotiation.
    pub sample_rate: f64,
    /// Channel count proposed to the host.
    pub channel_count: usize,
    /// Largest render quantum proposed to the host.
    pub max_frames: u32,
    /// Event scheduling inside one render call.
    pub scheduling: SchedulingMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channel_count: CHANNEL_COUNT,
            max_frames: DEFAULT_MAX_FRAMES,
            scheduling: SchedulingMode::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> RenderResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| RenderError::StateError(format!("invalid engine config: {}", e)))
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> RenderResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RenderError::StateError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_json(&text)?;
        log::debug!("Loaded engine config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// The format this configuration proposes.
    pub fn format(&self) -> RenderFormat {
        RenderFormat::new(self.sample_rate, self.channel_count, self.max_frames)
    }
}
