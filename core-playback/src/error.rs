//! # Playback Error Types
//!
//! Error types for the decode-and-extraction core.

use crate::traits::SampleFormat;
use std::fmt;
use thiserror::Error;

/// Every dimension in which a requested device configuration differs from
/// what the stream natively produces.
///
/// All fields are filled in a single negotiation pass, so a caller retrying
/// with one dimension fixed still learns about the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsupportedConfig {
    /// Requested sample rate when it differs from the native one.
    pub resample: Option<u32>,
    /// Requested channel count when it differs from the native one.
    pub rechannel: Option<u32>,
    /// Requested sample format when it differs from the native one.
    pub reformat: Option<SampleFormat>,
}

impl UnsupportedConfig {
    /// Returns `true` if no dimension mismatched.
    pub fn is_empty(&self) -> bool {
        self.resample.is_none() && self.rechannel.is_none() && self.reformat.is_none()
    }
}

impl fmt::Display for UnsupportedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(rate) = self.resample {
            parts.push(format!("Resampling is not supported (requested {} Hz)", rate));
        }
        if let Some(channels) = self.rechannel {
            parts.push(format!(
                "Rechanneling is not supported (requested {} channels)",
                channels
            ));
        }
        if let Some(format) = self.reformat {
            parts.push(format!(
                "Reformatting samples is not supported (requested {})",
                format
            ));
        }
        write!(f, "{}", parts.join("; "))
    }
}

/// Coarse classification of a [`PlaybackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source could not be opened or holds nothing decodable.
    Initialization,
    /// The requested device configuration cannot be served.
    Configuration,
    /// The codec failed mid-stream.
    Decode,
    /// The destination buffer does not fit the planar sample-group width.
    BufferGranularity,
    /// The caller used the decoder in the wrong order or out of range.
    Usage,
}

/// Errors that can occur during decoding operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Initialization Errors
    // ========================================================================
    /// Failed to open or read audio source.
    #[error("Failed to open audio source: {0}")]
    SourceError(String),

    /// Audio format is not recognized or cannot be parsed.
    #[error("Unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// Codec is not supported by the decoder.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Container was parsed but holds no decodable audio stream.
    #[error("Cannot decode audio format: {0}")]
    FormatNotDecodable(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The requested device configuration would need a conversion.
    #[error("{0}")]
    ConfigurationUnsupported(UnsupportedConfig),

    /// `read` was called before a device configuration was accepted.
    #[error("Decoder is not configured: call set_config first")]
    NotConfigured,

    /// Decoder options failed to parse or validate.
    #[error("Invalid decoder configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// Error occurred while reading or decoding a packet.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Decoder encountered an internal error.
    #[error("Decoder internal error: {0}")]
    DecoderError(String),

    /// Destination length cannot hold whole planar sample groups.
    #[error(
        "Invalid multiple length of buffer with respect to parameters: \
         {len} bytes is not a multiple of the {group}-byte sample group"
    )]
    BufferGranularity { len: usize, group: usize },

    // ========================================================================
    // Seek Errors
    // ========================================================================
    /// Seeking is not supported for this audio source.
    #[error("Seeking not supported")]
    SeekNotSupported,

    /// Seek position is out of bounds.
    #[error("Seek position out of bounds: {0:?}")]
    SeekOutOfBounds(std::time::Duration),
}

impl PlaybackError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlaybackError::SourceError(_)
            | PlaybackError::InvalidFormat(_)
            | PlaybackError::UnsupportedCodec(_)
            | PlaybackError::FormatNotDecodable(_) => ErrorKind::Initialization,
            PlaybackError::ConfigurationUnsupported(_) | PlaybackError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            PlaybackError::DecodingError(_) | PlaybackError::DecoderError(_) => ErrorKind::Decode,
            PlaybackError::BufferGranularity { .. } => ErrorKind::BufferGranularity,
            PlaybackError::NotConfigured
            | PlaybackError::SeekNotSupported
            | PlaybackError::SeekOutOfBounds(_) => ErrorKind::Usage,
        }
    }

    /// Returns `true` if the caller can retry with different arguments and
    /// keep using the same decoder.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Usage)
    }

    /// Returns `true` if this error is related to audio format/codec issues.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidFormat(_)
                | PlaybackError::UnsupportedCodec(_)
                | PlaybackError::FormatNotDecodable(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
