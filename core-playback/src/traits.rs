//! # Core Decoding Traits
//!
//! This module defines the data model and the seams of the decode core.
//!
//! ## Architecture
//!
//! The [`Decoder`](crate::decoder::Decoder) drives two collaborators:
//!
//! - **[`PacketSource`]**: owns the demuxer, hands out compressed packets and
//!   repositions on seek.
//! - **[`CodecSession`]**: owns one open codec instance. Compressed packets go
//!   in through `submit`, decoded frames come out through `receive`. The
//!   session may refuse input (`Submit::Busy`) while it still holds decoded
//!   output, which is the only flow-control signal in the loop.
//!
//! Decoded frames are copied into caller buffers by the
//! [sample extractor](crate::decoder::sample_extractor), always producing
//! interleaved output regardless of the native layout.
//!
//! ## Threading Model
//!
//! Everything here is synchronous and single-owner. A decoder instance is
//! driven by one caller at a time; nothing is shared between instances.

use crate::error::{PlaybackError, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

// ============================================================================
// Sample Format Types
// ============================================================================

/// Sample encoding of one channel sample.
///
/// This is the closed set a host can request. Width and signedness are fixed
/// per variant; there is no conversion between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    U8,
    U16,
    U24,
    U32,
    U64,
    I8,
    I16,
    I24,
    I32,
    I64,
    F32,
    F64,
}

impl SampleFormat {
    /// Size of one sample in bytes. 24-bit samples are packed into 3 bytes.
    pub fn byte_size(self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::I8 => 1,
            SampleFormat::U16 | SampleFormat::I16 => 2,
            SampleFormat::U24 | SampleFormat::I24 => 3,
            SampleFormat::U32 | SampleFormat::I32 | SampleFormat::F32 => 4,
            SampleFormat::U64 | SampleFormat::I64 | SampleFormat::F64 => 8,
        }
    }

    fn name(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::U16 => "u16",
            SampleFormat::U24 => "u24",
            SampleFormat::U32 => "u32",
            SampleFormat::U64 => "u64",
            SampleFormat::I8 => "i8",
            SampleFormat::I16 => "i16",
            SampleFormat::I24 => "i24",
            SampleFormat::I32 => "i32",
            SampleFormat::I64 => "i64",
            SampleFormat::F32 => "f32",
            SampleFormat::F64 => "f64",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the channels of a decoded frame are laid out in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleLayout {
    /// One region, channels alternating per sample (LRLRLR...).
    Interleaved,
    /// One region per channel (LLLL... RRRR...).
    Planar,
}

// ============================================================================
// Audio Sources
// ============================================================================

/// Codec families the symphonia backend can be built with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioCodec {
    Mp3,
    Aac,
    Flac,
    Vorbis,
    Opus,
    Wav,
    Alac,
    Unknown,
    Other(String),
}

/// Where the encoded audio comes from.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// A file on the local filesystem.
    LocalFile { path: PathBuf },
    /// An in-memory copy of a whole file.
    CachedChunk {
        data: Bytes,
        codec_hint: Option<AudioCodec>,
    },
}

impl AudioSource {
    /// Short description for logs; file paths are reduced to their basename.
    pub fn describe(&self) -> String {
        match self {
            AudioSource::LocalFile { path } => {
                core_runtime::logging::strip_path(&path.to_string_lossy()).to_string()
            }
            AudioSource::CachedChunk { data, .. } => {
                format!("memory buffer ({} bytes)", data.len())
            }
        }
    }
}

// ============================================================================
// Time Types
// ============================================================================

/// Seconds per tick of a stream, as a rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBase {
    pub numer: u32,
    pub denom: u32,
}

impl TimeBase {
    /// Create a time base of `numer / denom` seconds per tick.
    pub fn new(numer: u32, denom: u32) -> Self {
        Self { numer, denom }
    }

    /// The usual audio time base: one tick per sample.
    pub fn per_sample(sample_rate: u32) -> Self {
        Self::new(1, sample_rate)
    }

    /// Convert a tick count to wall-clock duration (truncating to nanoseconds).
    pub fn duration_of(&self, ticks: u64) -> Duration {
        if self.denom == 0 {
            return Duration::ZERO;
        }
        let scaled = ticks as u128 * self.numer as u128;
        let denom = self.denom as u128;
        let secs = scaled / denom;
        let nanos = (scaled % denom) * NANOS_PER_SEC / denom;
        Duration::new(secs.min(u64::MAX as u128) as u64, nanos as u32)
    }

    /// Convert a wall-clock duration to the nearest tick.
    pub fn ticks_of(&self, duration: Duration) -> u64 {
        if self.numer == 0 {
            return 0;
        }
        let divisor = self.numer as u128 * NANOS_PER_SEC;
        let ticks = (duration.as_nanos() * self.denom as u128 + divisor / 2) / divisor;
        ticks.min(u64::MAX as u128) as u64
    }
}

/// Current position and total length of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timestamp {
    pub current: Duration,
    pub total: Duration,
}

impl Timestamp {
    pub fn new(current: Duration, total: Duration) -> Self {
        Self { current, total }
    }
}

// ============================================================================
// Stream & Device Configuration
// ============================================================================

/// Native properties of the selected audio stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// Index (track id) of the selected audio stream in the container
    pub stream_index: u32,
    /// Number of audio channels (1 = mono, 2 = stereo, etc.)
    pub channel_count: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Sample encoding produced by the codec
    pub sample_format: SampleFormat,
    /// Memory layout of decoded frames
    pub layout: SampleLayout,
    /// Seconds per timestamp tick
    pub time_base: TimeBase,
    /// Total length in ticks, if the container knows it
    pub duration: Option<u64>,
    /// Short codec name for diagnostics
    pub codec: Option<String>,
}

impl StreamDescriptor {
    /// The device configuration that needs no conversion at all.
    pub fn preferred_config(&self) -> DeviceConfig {
        DeviceConfig {
            channel_count: self.channel_count,
            sample_rate: self.sample_rate,
            sample_format: self.sample_format,
        }
    }

    /// Bytes per sample group (one sample of every channel).
    pub fn sample_group_width(&self) -> usize {
        self.channel_count as usize * self.sample_format.byte_size()
    }

    /// Total length as wall-clock duration; zero when unknown.
    pub fn total_duration(&self) -> Duration {
        self.duration
            .map(|ticks| self.time_base.duration_of(ticks))
            .unwrap_or(Duration::ZERO)
    }
}

/// Output configuration requested by the audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub channel_count: u32,
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
}

impl DeviceConfig {
    pub fn new(channel_count: u32, sample_rate: u32, sample_format: SampleFormat) -> Self {
        Self {
            channel_count,
            sample_rate,
            sample_format,
        }
    }

    /// Bytes per sample group (one sample of every channel).
    pub fn sample_group_width(&self) -> usize {
        self.channel_count as usize * self.sample_format.byte_size()
    }
}

// ============================================================================
// Packets & Frames
// ============================================================================

/// One compressed packet read from the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Stream the packet belongs to
    pub stream_index: u32,
    /// Presentation timestamp in stream ticks
    pub ts: u64,
    /// Duration in stream ticks
    pub dur: u64,
    /// Compressed payload
    pub data: Bytes,
}

impl Packet {
    pub fn new(stream_index: u32, ts: u64, dur: u64, data: impl Into<Bytes>) -> Self {
        Self {
            stream_index,
            ts,
            dur,
            data: data.into(),
        }
    }
}

/// A block of decoded PCM samples in the stream's native format.
///
/// Interleaved frames carry a single plane of
/// `channels * sample_count * sample_size` bytes; planar frames carry one
/// plane of `sample_count * sample_size` bytes per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    layout: SampleLayout,
    channels: usize,
    sample_count: usize,
    sample_size: usize,
    planes: Vec<Bytes>,
    ts: u64,
    dur: u64,
}

impl DecodedFrame {
    /// Build an interleaved frame, validating the region length.
    pub fn interleaved(
        channels: usize,
        sample_count: usize,
        sample_size: usize,
        data: impl Into<Bytes>,
    ) -> Result<Self> {
        let data = data.into();
        Self::check_shape(channels, sample_size)?;

        let expected = channels * sample_count * sample_size;
        if data.len() != expected {
            return Err(PlaybackError::DecodingError(format!(
                "Interleaved frame holds {} bytes, expected {}",
                data.len(),
                expected
            )));
        }

        Ok(Self {
            layout: SampleLayout::Interleaved,
            channels,
            sample_count,
            sample_size,
            planes: vec![data],
            ts: 0,
            dur: 0,
        })
    }

    /// Build a planar frame from one plane per channel.
    pub fn planar(sample_count: usize, sample_size: usize, planes: Vec<Bytes>) -> Result<Self> {
        let channels = planes.len();
        Self::check_shape(channels, sample_size)?;

        let expected = sample_count * sample_size;
        if let Some((idx, plane)) = planes
            .iter()
            .enumerate()
            .find(|(_, plane)| plane.len() != expected)
        {
            return Err(PlaybackError::DecodingError(format!(
                "Plane {} holds {} bytes, expected {}",
                idx,
                plane.len(),
                expected
            )));
        }

        Ok(Self {
            layout: SampleLayout::Planar,
            channels,
            sample_count,
            sample_size,
            planes,
            ts: 0,
            dur: 0,
        })
    }

    fn check_shape(channels: usize, sample_size: usize) -> Result<()> {
        if channels == 0 || sample_size == 0 {
            return Err(PlaybackError::DecodingError(format!(
                "Frame with {} channels of {}-byte samples",
                channels, sample_size
            )));
        }
        Ok(())
    }

    /// Attach the presentation timestamp and duration (stream ticks).
    pub fn with_timing(mut self, ts: u64, dur: u64) -> Self {
        self.ts = ts;
        self.dur = dur;
        self
    }

    pub fn layout(&self) -> SampleLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn ts(&self) -> u64 {
        self.ts
    }

    pub fn dur(&self) -> u64 {
        self.dur
    }

    /// Bytes per sample group (one sample of every channel).
    pub fn group_width(&self) -> usize {
        self.channels * self.sample_size
    }

    /// Length of the frame in the interleaved output byte space.
    pub fn byte_len(&self) -> usize {
        self.group_width() * self.sample_count
    }

    /// Raw bytes of plane `idx` (the only plane when interleaved).
    pub fn plane(&self, idx: usize) -> &[u8] {
        &self.planes[idx]
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Outcome of asking a [`PacketSource`] for the next packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketRead {
    Packet(Packet),
    EndOfStream,
}

/// Outcome of submitting a packet to a [`CodecSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
    /// The packet was consumed.
    Accepted,
    /// The session holds undelivered output; resubmit the same packet later.
    Busy,
}

/// Outcome of asking a [`CodecSession`] for decoded output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Receive {
    Frame(DecodedFrame),
    /// No output until more input is submitted.
    NeedMoreInput,
    /// The drain signal was processed and every frame has been delivered.
    Ended,
}

/// Demuxer side of the decode loop.
pub trait PacketSource {
    /// Read the next packet of any stream.
    fn next_packet(&mut self) -> Result<PacketRead>;

    /// Reposition at or before `ts` (stream ticks) on `stream_index`.
    ///
    /// Returns the timestamp actually reached.
    fn seek(&mut self, stream_index: u32, ts: u64) -> Result<u64>;
}

/// Codec side of the decode loop.
pub trait CodecSession {
    /// Hand one compressed packet to the codec.
    fn submit(&mut self, packet: &Packet) -> Result<Submit>;

    /// Tell the codec no more packets will follow.
    fn submit_drain_signal(&mut self) -> Result<()>;

    /// Take the next decoded frame, if any.
    fn receive(&mut self) -> Result<Receive>;

    /// Drop buffered input/output and any drain state (used after seeking).
    fn flush(&mut self);
}

/// Synchronous decoder façade consumed by the host boundary.
///
/// ## Example
///
/// ```rust,ignore
/// fn pump(decoder: &mut dyn AudioDecoder, device: &mut [u8]) -> core_playback::Result<()> {
///     let config = decoder.preferred_config();
///     decoder.set_config(&config)?;
///     while decoder.read(device)? == device.len() {
///         // hand the buffer to the device
///     }
///     Ok(())
/// }
/// ```
pub trait AudioDecoder {
    /// Native properties of the decoded stream.
    fn stream(&self) -> &StreamDescriptor;

    /// The configuration that avoids any conversion.
    fn preferred_config(&self) -> DeviceConfig;

    /// Accept `requested` or report every unsupported dimension.
    fn set_config(&mut self, requested: &DeviceConfig) -> Result<()>;

    /// The accepted configuration, if any.
    fn device_config(&self) -> Option<DeviceConfig>;

    /// Fill `buf` with interleaved samples; fewer bytes only at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let (written, result) = self.read_partial(buf);
        result.map(|()| written)
    }

    /// Like [`AudioDecoder::read`], but also reports the bytes copied into
    /// `buf` before a failure. The position already includes them.
    fn read_partial(&mut self, buf: &mut [u8]) -> (usize, Result<()>);

    /// Jump to an absolute position.
    fn seek(&mut self, position: Duration) -> Result<Timestamp>;

    /// Jump relative to the current position, clamped to the stream bounds.
    fn seek_by(&mut self, delta: Duration, forward: bool) -> Result<Timestamp>;

    /// Current position and total length.
    ///
    /// `total` is zero when the stream does not declare its duration; the
    /// position then keeps growing past it.
    fn timestamp(&self) -> Timestamp;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_format_sizes() {
        assert_eq!(SampleFormat::U8.byte_size(), 1);
        assert_eq!(SampleFormat::I16.byte_size(), 2);
        assert_eq!(SampleFormat::I24.byte_size(), 3);
        assert_eq!(SampleFormat::F32.byte_size(), 4);
        assert_eq!(SampleFormat::I64.byte_size(), 8);
        assert_eq!(SampleFormat::F64.to_string(), "f64");
    }

    #[test]
    fn test_time_base_conversions() {
        let tb = TimeBase::per_sample(44100);
        assert_eq!(tb.duration_of(44100), Duration::from_secs(1));
        assert_eq!(tb.duration_of(22050), Duration::from_millis(500));
        assert_eq!(tb.ticks_of(Duration::from_secs(2)), 88200);

        // Truncated nanoseconds still round back to the same tick.
        for ticks in [1u64, 7, 1234, 999_999] {
            assert_eq!(tb.ticks_of(tb.duration_of(ticks)), ticks);
        }
    }

    #[test]
    fn test_time_base_coarse_units() {
        // Millisecond ticks, as some containers use.
        let tb = TimeBase::new(1, 1000);
        assert_eq!(tb.duration_of(1500), Duration::from_millis(1500));
        assert_eq!(tb.ticks_of(Duration::from_micros(2_400)), 2);
        assert_eq!(TimeBase::new(1, 0).duration_of(10), Duration::ZERO);
    }

    #[test]
    fn test_interleaved_frame_validates_length() {
        assert!(DecodedFrame::interleaved(2, 3, 2, vec![0u8; 12]).is_ok());
        assert!(DecodedFrame::interleaved(2, 3, 2, vec![0u8; 11]).is_err());
        assert!(DecodedFrame::interleaved(0, 3, 2, Vec::<u8>::new()).is_err());
    }

    #[test]
    fn test_planar_frame_validates_planes() {
        let ok = DecodedFrame::planar(
            4,
            2,
            vec![Bytes::from(vec![0u8; 8]), Bytes::from(vec![1u8; 8])],
        )
        .unwrap();
        assert_eq!(ok.channels(), 2);
        assert_eq!(ok.group_width(), 4);
        assert_eq!(ok.byte_len(), 16);

        let uneven = DecodedFrame::planar(
            4,
            2,
            vec![Bytes::from(vec![0u8; 8]), Bytes::from(vec![1u8; 6])],
        );
        assert!(uneven.is_err());
    }

    #[test]
    fn test_source_description_hides_directories() {
        let source = AudioSource::LocalFile {
            path: PathBuf::from("/home/someone/Music/track.flac"),
        };
        assert_eq!(source.describe(), "track.flac");

        let source = AudioSource::CachedChunk {
            data: Bytes::from_static(b"RIFF"),
            codec_hint: Some(AudioCodec::Wav),
        };
        assert_eq!(source.describe(), "memory buffer (4 bytes)");
    }

    #[test]
    fn test_preferred_config_mirrors_stream() {
        let stream = StreamDescriptor {
            stream_index: 0,
            channel_count: 2,
            sample_rate: 48000,
            sample_format: SampleFormat::I16,
            layout: SampleLayout::Planar,
            time_base: TimeBase::per_sample(48000),
            duration: Some(96000),
            codec: Some("flac".into()),
        };

        let config = stream.preferred_config();
        assert_eq!(config, DeviceConfig::new(2, 48000, SampleFormat::I16));
        assert_eq!(stream.sample_group_width(), 4);
        assert_eq!(stream.total_duration(), Duration::from_secs(2));
    }
}
