//! # Decoder Configuration
//!
//! Options applied when a symphonia-backed decoder is opened.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// How precisely a seek should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekPrecision {
    /// Land at or before the requested timestamp.
    #[default]
    Accurate,
    /// Land on the nearest cheap position (may overshoot).
    Coarse,
}

/// Decoder options.
///
/// Every field has a serde default, so partial JSON documents are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Trim encoder delay and padding where the container describes them.
    ///
    /// Default: false.
    #[serde(default = "default_enable_gapless")]
    pub enable_gapless: bool,

    /// Ask the codec to verify decoded audio against embedded checksums.
    ///
    /// Default: false.
    #[serde(default = "default_verify")]
    pub verify: bool,

    /// Seek precision used by the packet source.
    ///
    /// Default: [`SeekPrecision::Accurate`].
    #[serde(default)]
    pub seek_mode: SeekPrecision,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            enable_gapless: default_enable_gapless(),
            verify: default_verify(),
            seek_mode: SeekPrecision::default(),
        }
    }
}

impl DecoderConfig {
    /// Configuration that verifies decoded audio where the codec supports it.
    pub fn strict() -> Self {
        Self {
            verify: true,
            ..Default::default()
        }
    }

    /// Configuration for gapless album playback.
    pub fn gapless() -> Self {
        Self {
            enable_gapless: true,
            ..Default::default()
        }
    }

    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PlaybackError::InvalidConfig(format!("Invalid decoder options: {}", e)))
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_enable_gapless() -> bool {
    false
}

fn default_verify() -> bool {
    false
}
