//! # Playback Decoding Core
//!
//! Incremental decoding of compressed audio into caller-supplied raw sample
//! buffers.
//!
//! ## Overview
//!
//! This crate handles:
//! - The decode loop: packet resend on backpressure, end-of-stream draining
//!   and partial-frame continuation across `read` calls
//! - Sample extraction from interleaved and planar frames into interleaved
//!   output
//! - Device configuration negotiation (exact match or a descriptive refusal;
//!   no resampling, rechanneling or sample conversion)
//! - Seeking and position bookkeeping in stream ticks
//! - A symphonia-backed packet source and codec session (feature-gated)

pub mod config;
pub mod decoder;
pub mod error;
pub mod traits;

pub use config::{DecoderConfig, SeekPrecision};
pub use decoder::Decoder;
pub use error::{ErrorKind, PlaybackError, Result, UnsupportedConfig};
pub use traits::{
    AudioCodec, AudioDecoder, AudioSource, CodecSession, DecodedFrame, DeviceConfig, Packet,
    PacketRead, PacketSource, Receive, SampleFormat, SampleLayout, StreamDescriptor, Submit,
    TimeBase, Timestamp,
};

#[cfg(feature = "core-decoder")]
pub use decoder::{FormatDetector, SymphoniaDecoder};
