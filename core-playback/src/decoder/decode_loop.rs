//! # Decode Loop
//!
//! [`Decoder`] pulls packets from a [`PacketSource`], feeds a
//! [`CodecSession`] and copies decoded frames into caller buffers until the
//! buffer is full or the stream is exhausted.
//!
//! ## State
//!
//! Two independent pieces of state survive between `read` calls:
//!
//! - the input side ([`InputState`]): reading new packets, holding a packet
//!   the session refused, draining after end of stream, or exhausted;
//! - the output side: at most one partially consumed frame and the offset to
//!   resume it from.
//!
//! Both can be set at once: a refused packet stays queued for resend while
//! the frame that filled the caller buffer waits for the next call.

use crate::decoder::negotiator;
use crate::decoder::position::{self, SeekTarget};
use crate::decoder::sample_extractor;
use crate::error::{PlaybackError, Result};
use crate::traits::{
    AudioDecoder, CodecSession, DecodedFrame, DeviceConfig, Packet, PacketRead, PacketSource,
    Receive, SampleLayout, StreamDescriptor, Submit, Timestamp,
};
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

/// Input side of the decode loop.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputState {
    /// Pull the next packet from the source.
    Reading,
    /// The session refused this packet; resubmit it before reading another.
    AwaitingResend(Packet),
    /// End of stream was reached and the drain signal was sent.
    Draining,
    /// The session delivered its last frame.
    Exhausted,
}

/// A frame that did not fit into the previous caller buffer.
#[derive(Debug)]
struct PendingFrame {
    frame: DecodedFrame,
    offset: usize,
}

/// Why a drain pass stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainStop {
    NeedMoreInput,
    Ended,
    Full,
}

#[derive(Debug, Clone, Copy)]
struct Drained {
    stop: DrainStop,
    received: usize,
}

/// Caller buffer with a fill cursor.
struct Output<'a> {
    buf: &'a mut [u8],
    filled: usize,
    group: usize,
}

impl<'a> Output<'a> {
    fn new(buf: &'a mut [u8], group: usize) -> Self {
        Self {
            buf,
            filled: 0,
            group,
        }
    }

    /// At least one whole sample group still fits.
    fn has_room(&self) -> bool {
        self.buf.len() - self.filled >= self.group
    }

    fn unfilled(&mut self) -> &mut [u8] {
        &mut self.buf[self.filled..]
    }

    fn advance(&mut self, written: usize) {
        self.filled += written;
    }
}

/// Decoder over one packet source and one codec session.
///
/// Synchronous and single-owner; see [`AudioDecoder`] for the operations.
pub struct Decoder<S, C> {
    source: S,
    session: C,
    stream: StreamDescriptor,
    config: Option<DeviceConfig>,
    input: InputState,
    pending: Option<PendingFrame>,
    /// Presentation position in stream ticks.
    cursor: u64,
}

impl<S: PacketSource, C: CodecSession> Decoder<S, C> {
    /// Assemble a decoder from its collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::FormatNotDecodable`] when the stream has no
    /// channels.
    pub fn new(source: S, session: C, stream: StreamDescriptor) -> Result<Self> {
        if stream.channel_count == 0 {
            return Err(PlaybackError::FormatNotDecodable(
                "Audio stream has no channels".to_string(),
            ));
        }

        Ok(Self {
            source,
            session,
            stream,
            config: None,
            input: InputState::Reading,
            pending: None,
            cursor: 0,
        })
    }

    /// Returns `true` once every frame of the stream has been delivered.
    pub fn is_exhausted(&self) -> bool {
        self.input == InputState::Exhausted && self.pending.is_none()
    }

    /// Copy a frame (or its remainder) into `out`, keeping any leftover.
    fn consume(
        &mut self,
        frame: DecodedFrame,
        offset: usize,
        config: &DeviceConfig,
        out: &mut Output<'_>,
    ) -> Result<()> {
        if frame.channels() != config.channel_count as usize
            || frame.sample_size() != config.sample_format.byte_size()
        {
            return Err(PlaybackError::DecodingError(format!(
                "Decoded frame has {} channels of {}-byte samples, configured for {} of {}",
                frame.channels(),
                frame.sample_size(),
                config.channel_count,
                config.sample_format.byte_size()
            )));
        }

        let extracted = match sample_extractor::extract(&frame, offset, out.unfilled()) {
            Ok(extracted) => extracted,
            Err(e) => {
                self.pending = Some(PendingFrame { frame, offset });
                return Err(e);
            }
        };
        out.advance(extracted.written);

        let consumed = extracted.resume.unwrap_or_else(|| frame.byte_len());
        self.cursor = position::cursor_within(&frame, consumed);

        if let Some(offset) = extracted.resume {
            self.pending = Some(PendingFrame { frame, offset });
        }
        Ok(())
    }

    /// Receive frames until the session wants input, ends, or `out` is full.
    fn drain_frames(&mut self, config: &DeviceConfig, out: &mut Output<'_>) -> Result<Drained> {
        let mut received = 0;
        loop {
            if !out.has_room() {
                return Ok(Drained {
                    stop: DrainStop::Full,
                    received,
                });
            }

            match self.session.receive()? {
                Receive::Frame(frame) => {
                    received += 1;
                    trace!(ts = frame.ts(), samples = frame.sample_count(), "Received frame");
                    self.consume(frame, 0, config, out)?;
                }
                Receive::NeedMoreInput => {
                    return Ok(Drained {
                        stop: DrainStop::NeedMoreInput,
                        received,
                    })
                }
                Receive::Ended => {
                    return Ok(Drained {
                        stop: DrainStop::Ended,
                        received,
                    })
                }
            }
        }
    }

    /// Submit one packet, then drain whatever the session has ready.
    fn submit(
        &mut self,
        packet: Packet,
        config: &DeviceConfig,
        out: &mut Output<'_>,
    ) -> Result<()> {
        let status = self.session.submit(&packet)?;
        let drained = self.drain_frames(config, out)?;

        match status {
            Submit::Accepted => {
                if drained.stop == DrainStop::Ended {
                    self.input = InputState::Exhausted;
                }
            }
            Submit::Busy => {
                if drained.received == 0 && drained.stop != DrainStop::Full {
                    warn!(ts = packet.ts, "Codec refused input without producing output");
                    return Err(PlaybackError::DecoderError(
                        "Codec refused input without producing output".to_string(),
                    ));
                }
                trace!(ts = packet.ts, "Packet queued for resend");
                self.input = InputState::AwaitingResend(packet);
            }
        }
        Ok(())
    }

    /// Decode until `out` is full or the stream is exhausted.
    fn fill(&mut self, config: &DeviceConfig, out: &mut Output<'_>) -> Result<()> {
        if let Some(PendingFrame { frame, offset }) = self.pending.take() {
            self.consume(frame, offset, config, out)?;
        }

        while out.has_room() {
            match std::mem::replace(&mut self.input, InputState::Reading) {
                InputState::Exhausted => {
                    self.input = InputState::Exhausted;
                    break;
                }
                InputState::Draining => {
                    let drained = self.drain_frames(config, out)?;
                    self.input = match drained.stop {
                        DrainStop::Full => InputState::Draining,
                        DrainStop::Ended | DrainStop::NeedMoreInput => {
                            debug!(cursor = self.cursor, "Decoder drained");
                            InputState::Exhausted
                        }
                    };
                }
                InputState::AwaitingResend(packet) => {
                    self.submit(packet, config, out)?;
                }
                InputState::Reading => match self.source.next_packet()? {
                    PacketRead::EndOfStream => {
                        debug!("End of stream, draining codec");
                        self.session.submit_drain_signal()?;
                        self.input = InputState::Draining;
                    }
                    PacketRead::Packet(packet)
                        if packet.stream_index != self.stream.stream_index =>
                    {
                        trace!(stream = packet.stream_index, "Skipping packet of another stream");
                    }
                    PacketRead::Packet(packet) => {
                        self.submit(packet, config, out)?;
                    }
                },
            }
        }
        Ok(())
    }

    /// Drop every piece of in-flight decode state.
    fn reset_decode_state(&mut self, input: InputState) {
        self.session.flush();
        self.pending = None;
        self.input = input;
    }
}

impl<S: PacketSource, C: CodecSession> AudioDecoder for Decoder<S, C> {
    fn stream(&self) -> &StreamDescriptor {
        &self.stream
    }

    fn preferred_config(&self) -> DeviceConfig {
        self.stream.preferred_config()
    }

    fn set_config(&mut self, requested: &DeviceConfig) -> Result<()> {
        let accepted = negotiator::negotiate(&self.stream, requested)?;
        self.config = Some(accepted);
        Ok(())
    }

    fn device_config(&self) -> Option<DeviceConfig> {
        self.config
    }

    #[instrument(skip(self, buf), fields(len = buf.len()), level = "trace")]
    fn read_partial(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        let Some(config) = self.config else {
            return (0, Err(PlaybackError::NotConfigured));
        };
        let group = config.sample_group_width();

        let planar = self.stream.layout == SampleLayout::Planar;
        if planar && buf.len() >= group && buf.len() % group != 0 {
            return (
                0,
                Err(PlaybackError::BufferGranularity {
                    len: buf.len(),
                    group,
                }),
            );
        }

        let mut out = Output::new(buf, group);
        let result = self.fill(&config, &mut out);
        if let Err(e) = &result {
            warn!(written = out.filled, "Read stopped early: {}", e);
        }
        (out.filled, result)
    }

    #[instrument(skip(self))]
    fn seek(&mut self, position: Duration) -> Result<Timestamp> {
        let target =
            position::absolute_target(self.stream.time_base, self.stream.duration, position)?;

        match target {
            SeekTarget::End(total) => {
                self.reset_decode_state(InputState::Exhausted);
                self.cursor = total;
            }
            SeekTarget::Ticks(ticks) => {
                let actual = self.source.seek(self.stream.stream_index, ticks)?;
                self.reset_decode_state(InputState::Reading);
                self.cursor = actual;
            }
        }

        debug!(requested = ?position, cursor = self.cursor, "Seek completed");
        Ok(self.timestamp())
    }

    fn seek_by(&mut self, delta: Duration, forward: bool) -> Result<Timestamp> {
        let now = self.timestamp();
        let total = self.stream.duration.map(|_| now.total);
        let target = position::relative_target(now.current, total, delta, forward);
        self.seek(target)
    }

    fn timestamp(&self) -> Timestamp {
        Timestamp::new(
            self.stream.time_base.duration_of(self.cursor),
            self.stream.total_duration(),
        )
    }
}
