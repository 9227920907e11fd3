//! # Format Detection Module
//!
//! Probe hints and codec support checks for the symphonia backend.

use crate::error::{PlaybackError, Result};
use crate::traits::AudioCodec;
use std::path::Path;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Format detector for audio streams.
///
/// Generates hints for symphonia's probe and checks detected codecs against
/// the decoder features this crate was built with.
pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint from the file extension of `path`.
    pub fn hint_from_path(path: &Path) -> Hint {
        let mut hint = Hint::new();

        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            debug!("Setting probe hint extension: {}", extension);
            hint.with_extension(extension);
        } else {
            debug!("No file extension found, probe will auto-detect");
        }

        hint
    }

    /// Create a probe hint from an optional codec hint.
    pub fn hint_from_codec(codec: Option<&AudioCodec>) -> Hint {
        let mut hint = Hint::new();
        if let Some(codec) = codec {
            hint.with_extension(Self::codec_extension(codec));
        }
        hint
    }

    /// Map a symphonia codec type onto [`AudioCodec`].
    pub fn detect_codec(codec_type: CodecType) -> AudioCodec {
        use symphonia::core::codecs::*;

        if codec_type == CODEC_TYPE_MP3 {
            AudioCodec::Mp3
        } else if codec_type == CODEC_TYPE_AAC {
            AudioCodec::Aac
        } else if codec_type == CODEC_TYPE_FLAC {
            AudioCodec::Flac
        } else if codec_type == CODEC_TYPE_VORBIS {
            AudioCodec::Vorbis
        } else if codec_type == CODEC_TYPE_OPUS {
            AudioCodec::Opus
        } else if codec_type == CODEC_TYPE_ALAC {
            AudioCodec::Alac
        } else if [
            CODEC_TYPE_PCM_U8,
            CODEC_TYPE_PCM_S8,
            CODEC_TYPE_PCM_S16LE,
            CODEC_TYPE_PCM_S16BE,
            CODEC_TYPE_PCM_S24LE,
            CODEC_TYPE_PCM_S24BE,
            CODEC_TYPE_PCM_S32LE,
            CODEC_TYPE_PCM_S32BE,
            CODEC_TYPE_PCM_F32LE,
            CODEC_TYPE_PCM_F32BE,
            CODEC_TYPE_PCM_F64LE,
            CODEC_TYPE_PCM_F64BE,
        ]
        .contains(&codec_type)
        {
            AudioCodec::Wav
        } else {
            warn!("Unknown codec type: {:?}", codec_type);
            AudioCodec::Unknown
        }
    }

    /// Check that the decoder feature for `codec` is enabled.
    ///
    /// Opus is recognised but never decodable: symphonia 0.5 ships the Ogg
    /// container without an Opus codec.
    pub fn validate_codec_support(codec: &AudioCodec) -> Result<()> {
        let (enabled, feature) = match codec {
            AudioCodec::Mp3 => (cfg!(feature = "decoder-mp3"), "decoder-mp3"),
            AudioCodec::Flac => (cfg!(feature = "decoder-flac"), "decoder-flac"),
            AudioCodec::Vorbis => (cfg!(feature = "decoder-vorbis"), "decoder-vorbis"),
            AudioCodec::Aac => (cfg!(feature = "decoder-aac"), "decoder-aac"),
            AudioCodec::Wav => (cfg!(feature = "decoder-wav"), "decoder-wav"),
            AudioCodec::Alac => (cfg!(feature = "decoder-alac"), "decoder-alac"),
            AudioCodec::Opus => {
                return Err(PlaybackError::UnsupportedCodec(
                    "Opus streams cannot be decoded by this build".to_string(),
                ))
            }
            AudioCodec::Unknown => {
                return Err(PlaybackError::UnsupportedCodec(
                    "Unknown audio codec".to_string(),
                ))
            }
            AudioCodec::Other(name) => {
                return Err(PlaybackError::UnsupportedCodec(format!(
                    "Unsupported codec: {}",
                    name
                )))
            }
        };

        if enabled {
            Ok(())
        } else {
            Err(PlaybackError::UnsupportedCodec(format!(
                "{:?} decoder not enabled. Enable '{}' feature",
                codec, feature
            )))
        }
    }

    /// Get the common file extension for a codec.
    pub fn codec_extension(codec: &AudioCodec) -> &'static str {
        match codec {
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Aac => "m4a",
            AudioCodec::Flac => "flac",
            AudioCodec::Vorbis => "ogg",
            AudioCodec::Opus => "opus",
            AudioCodec::Wav => "wav",
            AudioCodec::Alac => "m4a",
            AudioCodec::Unknown => "bin",
            AudioCodec::Other(_) => "bin",
        }
    }
}
