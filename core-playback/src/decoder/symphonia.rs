//! # Symphonia Backend
//!
//! [`PacketSource`] and [`CodecSession`] over the symphonia demuxers and
//! codecs, plus [`SymphoniaDecoder::open`] which wires them into a
//! [`Decoder`].
//!
//! Symphonia reports the decoded sample format only after the first packet
//! is decoded, so opening primes the session with one frame. That frame stays
//! queued and is the first one delivered by `read`.

use crate::config::{DecoderConfig, SeekPrecision};
use crate::decoder::decode_loop::Decoder;
use crate::decoder::format_detector::FormatDetector;
use crate::error::{PlaybackError, Result};
use crate::traits::{
    AudioSource, CodecSession, DecodedFrame, Packet, PacketRead, PacketSource, Receive,
    SampleFormat, SampleLayout, StreamDescriptor, Submit, TimeBase,
};
use bytes::Bytes;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder as CodecDecoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::{Error as SymphoniaError, SeekErrorKind};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, error, info, instrument, warn};

/// Consecutive undecodable packets tolerated before giving up.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Decoder over a symphonia container and codec.
pub type SymphoniaDecoder = Decoder<SymphoniaPacketSource, SymphoniaCodecSession>;

// ============================================================================
// Packet Source
// ============================================================================

/// Demuxer half: owns the format reader (and through it the media source).
pub struct SymphoniaPacketSource {
    reader: Box<dyn FormatReader>,
    seek_mode: SeekMode,
}

impl SymphoniaPacketSource {
    fn new(reader: Box<dyn FormatReader>, precision: SeekPrecision) -> Self {
        let seek_mode = match precision {
            SeekPrecision::Accurate => SeekMode::Accurate,
            SeekPrecision::Coarse => SeekMode::Coarse,
        };
        Self { reader, seek_mode }
    }
}

impl PacketSource for SymphoniaPacketSource {
    fn next_packet(&mut self) -> Result<PacketRead> {
        let packet = match self.reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(PacketRead::EndOfStream);
            }
            Err(SymphoniaError::ResetRequired) => {
                warn!("Track list changed mid-stream");
                return Err(PlaybackError::DecodingError(
                    "Track list changed, reset required".to_string(),
                ));
            }
            Err(e) => {
                error!("Failed to read packet: {}", e);
                return Err(PlaybackError::DecodingError(format!(
                    "Failed to read packet: {}",
                    e
                )));
            }
        };

        // Metadata revisions arrive with packets; only the latest is kept.
        while !self.reader.metadata().is_latest() {
            self.reader.metadata().pop();
        }

        Ok(PacketRead::Packet(Packet {
            stream_index: packet.track_id(),
            ts: packet.ts,
            dur: packet.dur,
            data: Bytes::from(packet.data),
        }))
    }

    fn seek(&mut self, stream_index: u32, ts: u64) -> Result<u64> {
        let seeked = self
            .reader
            .seek(
                self.seek_mode,
                SeekTo::TimeStamp {
                    ts,
                    track_id: stream_index,
                },
            )
            .map_err(|e| match e {
                SymphoniaError::SeekError(SeekErrorKind::Unseekable)
                | SymphoniaError::SeekError(SeekErrorKind::ForwardOnly) => {
                    warn!("Source is not seekable: {}", e);
                    PlaybackError::SeekNotSupported
                }
                other => {
                    error!("Seek failed: {}", other);
                    PlaybackError::DecodingError(format!("Seek failed: {}", other))
                }
            })?;

        debug!(
            required = seeked.required_ts,
            actual = seeked.actual_ts,
            "Container repositioned"
        );
        Ok(seeked.actual_ts)
    }
}

// ============================================================================
// Codec Session
// ============================================================================

/// Codec half: one symphonia decoder and a single-slot output queue.
pub struct SymphoniaCodecSession {
    decoder: Box<dyn CodecDecoder>,
    queued: Option<DecodedFrame>,
    native_format: Option<SampleFormat>,
    draining: bool,
    consecutive_errors: usize,
}

impl SymphoniaCodecSession {
    fn new(decoder: Box<dyn CodecDecoder>) -> Self {
        Self {
            decoder,
            queued: None,
            native_format: None,
            draining: false,
            consecutive_errors: 0,
        }
    }

    /// Count a skipped packet, failing once too many arrive in a row.
    fn skip_packet(&mut self, reason: &str, err: &dyn std::fmt::Display) -> Result<()> {
        self.consecutive_errors += 1;
        warn!(
            "Skipping packet with {} (attempt {}/{}): {}",
            reason, self.consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
        );

        if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
            error!("Too many consecutive decode errors, giving up");
            return Err(PlaybackError::DecoderError(format!(
                "Decoder failure after {} failed packets: {}",
                MAX_CONSECUTIVE_ERRORS, err
            )));
        }
        Ok(())
    }
}

impl CodecSession for SymphoniaCodecSession {
    fn submit(&mut self, packet: &Packet) -> Result<Submit> {
        if self.queued.is_some() {
            return Ok(Submit::Busy);
        }

        let encoded = symphonia::core::formats::Packet::new_from_boxed_slice(
            packet.stream_index,
            packet.ts,
            packet.dur,
            Box::from(&packet.data[..]),
        );

        let decoded = self
            .decoder
            .decode(&encoded)
            .map(|buffer| frame_from_buffer(&buffer));

        match decoded {
            Ok(converted) => {
                self.consecutive_errors = 0;
                let (format, frame) = converted?;
                self.native_format = Some(format);
                self.queued = Some(frame.with_timing(packet.ts, packet.dur));
            }
            Err(SymphoniaError::DecodeError(err)) => self.skip_packet("decode error", &err)?,
            Err(SymphoniaError::IoError(err)) => self.skip_packet("I/O error", &err)?,
            Err(e) => {
                error!("Fatal decode error: {}", e);
                return Err(PlaybackError::DecoderError(format!(
                    "Failed to decode packet: {}",
                    e
                )));
            }
        }

        Ok(Submit::Accepted)
    }

    fn submit_drain_signal(&mut self) -> Result<()> {
        self.draining = true;
        Ok(())
    }

    fn receive(&mut self) -> Result<Receive> {
        Ok(match self.queued.take() {
            Some(frame) => Receive::Frame(frame),
            None if self.draining => Receive::Ended,
            None => Receive::NeedMoreInput,
        })
    }

    fn flush(&mut self) {
        self.decoder.reset();
        self.queued = None;
        self.draining = false;
        self.consecutive_errors = 0;
    }
}

// ============================================================================
// Sample Layout Conversion
// ============================================================================

/// Copy a symphonia buffer into a planar frame of native-endian samples.
fn frame_from_buffer(decoded: &AudioBufferRef<'_>) -> Result<(SampleFormat, DecodedFrame)> {
    match decoded {
        AudioBufferRef::U8(buf) => planar(SampleFormat::U8, &**buf, |s, out| out.push(s)),
        AudioBufferRef::U16(buf) => planar(SampleFormat::U16, &**buf, |s, out| {
            out.extend_from_slice(&s.to_ne_bytes())
        }),
        AudioBufferRef::U24(buf) => planar(SampleFormat::U24, &**buf, |s, out| {
            out.extend_from_slice(packed_24(s.inner().to_ne_bytes()).as_slice())
        }),
        AudioBufferRef::U32(buf) => planar(SampleFormat::U32, &**buf, |s, out| {
            out.extend_from_slice(&s.to_ne_bytes())
        }),
        AudioBufferRef::S8(buf) => planar(SampleFormat::I8, &**buf, |s, out| {
            out.extend_from_slice(&s.to_ne_bytes())
        }),
        AudioBufferRef::S16(buf) => planar(SampleFormat::I16, &**buf, |s, out| {
            out.extend_from_slice(&s.to_ne_bytes())
        }),
        AudioBufferRef::S24(buf) => planar(SampleFormat::I24, &**buf, |s, out| {
            out.extend_from_slice(packed_24(s.inner().to_ne_bytes()).as_slice())
        }),
        AudioBufferRef::S32(buf) => planar(SampleFormat::I32, &**buf, |s, out| {
            out.extend_from_slice(&s.to_ne_bytes())
        }),
        AudioBufferRef::F32(buf) => planar(SampleFormat::F32, &**buf, |s, out| {
            out.extend_from_slice(&s.to_ne_bytes())
        }),
        AudioBufferRef::F64(buf) => planar(SampleFormat::F64, &**buf, |s, out| {
            out.extend_from_slice(&s.to_ne_bytes())
        }),
    }
}

fn planar<S: Sample>(
    format: SampleFormat,
    buf: &AudioBuffer<S>,
    write: impl Fn(S, &mut Vec<u8>),
) -> Result<(SampleFormat, DecodedFrame)> {
    let size = format.byte_size();
    let planes = (0..buf.spec().channels.count())
        .map(|channel| {
            let mut plane = Vec::with_capacity(buf.frames() * size);
            for &sample in buf.chan(channel) {
                write(sample, &mut plane);
            }
            Bytes::from(plane)
        })
        .collect();

    DecodedFrame::planar(buf.frames(), size, planes).map(|frame| (format, frame))
}

/// The three significant bytes of a 24-bit sample held in 32 bits.
fn packed_24(bytes: [u8; 4]) -> [u8; 3] {
    if cfg!(target_endian = "little") {
        [bytes[0], bytes[1], bytes[2]]
    } else {
        [bytes[1], bytes[2], bytes[3]]
    }
}

// ============================================================================
// Opening
// ============================================================================

impl Decoder<SymphoniaPacketSource, SymphoniaCodecSession> {
    /// Probe `source`, select its first audio track and prime the codec.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Source cannot be opened
    /// - Format is not recognized
    /// - No supported audio tracks found
    /// - Codec is not supported or produces no audio
    #[instrument(skip(source, config), fields(source = %source.describe()))]
    pub fn open(source: AudioSource, config: &DecoderConfig) -> Result<Self> {
        info!("Opening symphonia decoder");

        let (media_source, hint) = open_media_source(source)?;

        let format_options = FormatOptions {
            enable_gapless: config.enable_gapless,
            ..Default::default()
        };
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                media_source,
                &format_options,
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Format probe failed: {}", e);
                PlaybackError::InvalidFormat(format!("Failed to probe format: {}", e))
            })?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                error!("No supported audio tracks found");
                PlaybackError::FormatNotDecodable("No supported audio tracks".to_string())
            })?;
        let track_id = track.id;
        let params = track.codec_params.clone();

        let codec = FormatDetector::detect_codec(params.codec);
        FormatDetector::validate_codec_support(&codec)?;
        debug!(track_id, codec = ?codec, "Selected audio track");

        let sample_rate = params
            .sample_rate
            .ok_or_else(|| PlaybackError::InvalidFormat("Missing sample rate".to_string()))?;
        let time_base = params
            .time_base
            .map(|tb| TimeBase::new(tb.numer, tb.denom))
            .unwrap_or_else(|| TimeBase::per_sample(sample_rate));
        let duration = params.n_frames.map(|frames| {
            time_base.ticks_of(TimeBase::per_sample(sample_rate).duration_of(frames))
        });

        let codec_decoder = symphonia::default::get_codecs()
            .make(
                &params,
                &DecoderOptions {
                    verify: config.verify,
                },
            )
            .map_err(|e| {
                error!("Failed to create decoder: {}", e);
                PlaybackError::DecoderError(format!("Failed to create codec decoder: {}", e))
            })?;
        let codec_name = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map(|descriptor| descriptor.short_name.to_string());

        let mut source = SymphoniaPacketSource::new(reader, config.seek_mode);
        let mut session = SymphoniaCodecSession::new(codec_decoder);
        let (channel_count, sample_format) = prime(&mut source, &mut session, track_id)?;

        let stream = StreamDescriptor {
            stream_index: track_id,
            channel_count,
            sample_rate,
            sample_format,
            layout: SampleLayout::Planar,
            time_base,
            duration,
            codec: codec_name,
        };
        info!(
            channels = channel_count,
            sample_rate,
            format = %sample_format,
            duration = ?stream.total_duration(),
            "Decoder initialized"
        );

        Decoder::new(source, session, stream)
    }
}

/// Decode packets of `track_id` until the session holds its first frame.
fn prime(
    source: &mut SymphoniaPacketSource,
    session: &mut SymphoniaCodecSession,
    track_id: u32,
) -> Result<(u32, SampleFormat)> {
    loop {
        match source.next_packet()? {
            PacketRead::EndOfStream => {
                error!("Stream ended before any audio was decoded");
                return Err(PlaybackError::FormatNotDecodable(
                    "Stream contains no decodable audio".to_string(),
                ));
            }
            PacketRead::Packet(packet) if packet.stream_index != track_id => continue,
            PacketRead::Packet(packet) => {
                session.submit(&packet)?;
                if let (Some(frame), Some(format)) = (&session.queued, session.native_format) {
                    return Ok((frame.channels() as u32, format));
                }
            }
        }
    }
}

fn open_media_source(source: AudioSource) -> Result<(MediaSourceStream, Hint)> {
    match source {
        AudioSource::LocalFile { path } => open_local_file(&path),
        AudioSource::CachedChunk { data, codec_hint } => {
            let hint = FormatDetector::hint_from_codec(codec_hint.as_ref());
            let media_source = Box::new(Cursor::new(data)) as Box<dyn MediaSource>;
            Ok((MediaSourceStream::new(media_source, Default::default()), hint))
        }
    }
}

fn open_local_file(path: &Path) -> Result<(MediaSourceStream, Hint)> {
    let file = std::fs::File::open(path).map_err(|e| {
        error!("Failed to open file: {}", e);
        PlaybackError::SourceError(format!("Failed to open file: {}", e))
    })?;

    let hint = FormatDetector::hint_from_path(path);
    let media_source = Box::new(file) as Box<dyn MediaSource>;
    Ok((MediaSourceStream::new(media_source, Default::default()), hint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::AudioCodec;

    #[test]
    fn test_truncated_buffer_fails_to_open() {
        let source = AudioSource::CachedChunk {
            data: Bytes::from_static(&[0xFF, 0xFB, 0x90, 0x00]),
            codec_hint: Some(AudioCodec::Mp3),
        };

        assert!(SymphoniaDecoder::open(source, &DecoderConfig::default()).is_err());
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let source = AudioSource::LocalFile {
            path: "/nonexistent/dir/track.flac".into(),
        };

        assert!(matches!(
            SymphoniaDecoder::open(source, &DecoderConfig::default()),
            Err(PlaybackError::SourceError(_))
        ));
    }

    #[test]
    fn test_packed_24_keeps_low_bytes() {
        let value: i32 = 0x00_12_34_56;
        let packed = packed_24(value.to_ne_bytes());
        let mut widened = [0u8; 4];
        if cfg!(target_endian = "little") {
            widened[..3].copy_from_slice(&packed);
        } else {
            widened[1..].copy_from_slice(&packed);
        }
        assert_eq!(i32::from_ne_bytes(widened), value);
    }
}
