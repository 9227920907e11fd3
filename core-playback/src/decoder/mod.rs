//! # Audio Decoder Module
//!
//! The decode-and-extraction state machine and its symphonia backend.
//!
//! ## Overview
//!
//! [`Decoder`] is generic over a [`PacketSource`](crate::traits::PacketSource)
//! and a [`CodecSession`](crate::traits::CodecSession). The pure parts
//! (decode loop, sample extractor, configuration negotiator, position
//! arithmetic) compile without any codec library. `SymphoniaDecoder` plugs in
//! the symphonia demuxers and codecs and is available with the
//! `core-decoder` feature.
//!
//! ## Supported Formats
//!
//! | Format | Codec | Feature Flag |
//! |--------|-------|--------------|
//! | MP3 | MPEG-1/2 Audio Layer III | `decoder-mp3` |
//! | FLAC | Free Lossless Audio Codec | `decoder-flac` |
//! | Vorbis | Ogg Vorbis | `decoder-vorbis` |
//! | AAC | Advanced Audio Coding (MP4) | `decoder-aac` |
//! | WAV | PCM in RIFF | `decoder-wav` |
//! | ALAC | Apple Lossless (MP4) | `decoder-alac` |
//!
//! `decoder-opus` enables the Ogg container only; Opus streams are detected
//! and rejected as unsupported.
//!
//! ## Data Flow
//!
//! ```text
//! AudioSource → PacketSource → CodecSession → sample_extractor → caller buffer
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_playback::{AudioDecoder, AudioSource, DecoderConfig, SymphoniaDecoder};
//! use std::path::PathBuf;
//!
//! # fn example() -> core_playback::Result<()> {
//! let source = AudioSource::LocalFile {
//!     path: PathBuf::from("/path/to/song.flac"),
//! };
//!
//! let mut decoder = SymphoniaDecoder::open(source, &DecoderConfig::default())?;
//! let config = decoder.preferred_config();
//! decoder.set_config(&config)?;
//!
//! let mut buf = vec![0u8; config.sample_group_width() * 1024];
//! while decoder.read(&mut buf)? > 0 {
//!     // hand interleaved samples to the device
//! }
//! # Ok(())
//! # }
//! ```

mod decode_loop;
pub mod negotiator;
mod position;
pub mod sample_extractor;

#[cfg(feature = "core-decoder")]
mod format_detector;

#[cfg(feature = "core-decoder")]
mod symphonia;

pub use decode_loop::Decoder;

#[cfg(feature = "core-decoder")]
pub use self::symphonia::{SymphoniaCodecSession, SymphoniaDecoder, SymphoniaPacketSource};

#[cfg(feature = "core-decoder")]
pub use format_detector::FormatDetector;
