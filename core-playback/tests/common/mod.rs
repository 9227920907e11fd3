//! Scripted collaborators shared by the integration tests.

#![allow(dead_code)]

use bytes::Bytes;
use core_playback::{
    AudioDecoder, CodecSession, DecodedFrame, Decoder, DeviceConfig, Packet, PacketRead,
    PacketSource, Receive, Result, SampleFormat, SampleLayout, StreamDescriptor, Submit,
    TimeBase,
};
use std::collections::VecDeque;

pub const RATE: u32 = 1000;

/// Plays back a fixed list of packets; seeks land on the packet at or before
/// the target.
pub struct ScriptedSource {
    packets: Vec<Packet>,
    next: usize,
}

impl ScriptedSource {
    pub fn new(packets: Vec<Packet>) -> Self {
        Self { packets, next: 0 }
    }
}

impl PacketSource for ScriptedSource {
    fn next_packet(&mut self) -> Result<PacketRead> {
        let read = match self.packets.get(self.next) {
            Some(packet) => PacketRead::Packet(packet.clone()),
            None => PacketRead::EndOfStream,
        };
        self.next += 1;
        Ok(read)
    }

    fn seek(&mut self, stream_index: u32, ts: u64) -> Result<u64> {
        let landing = self
            .packets
            .iter()
            .enumerate()
            .filter(|(_, p)| p.stream_index == stream_index && p.ts <= ts)
            .last()
            .map(|(idx, p)| (idx, p.ts))
            .unwrap_or((0, 0));
        self.next = landing.0;
        Ok(landing.1)
    }
}

/// "Decodes" packets whose payload is already interleaved PCM, holding up to
/// `capacity` frames before refusing input.
pub struct PcmSession {
    layout: SampleLayout,
    channels: usize,
    sample_size: usize,
    capacity: usize,
    queue: VecDeque<DecodedFrame>,
    draining: bool,
}

impl PcmSession {
    pub fn new(layout: SampleLayout, channels: usize, sample_size: usize, capacity: usize) -> Self {
        Self {
            layout,
            channels,
            sample_size,
            capacity,
            queue: VecDeque::new(),
            draining: false,
        }
    }

    fn frame(&self, packet: &Packet) -> Result<DecodedFrame> {
        let group = self.channels * self.sample_size;
        let samples = packet.data.len() / group;

        let frame = match self.layout {
            SampleLayout::Interleaved => DecodedFrame::interleaved(
                self.channels,
                samples,
                self.sample_size,
                packet.data.clone(),
            )?,
            SampleLayout::Planar => {
                let planes = (0..self.channels)
                    .map(|channel| {
                        let plane: Vec<u8> = packet
                            .data
                            .chunks_exact(group)
                            .flat_map(|g| {
                                g[channel * self.sample_size..(channel + 1) * self.sample_size]
                                    .to_vec()
                            })
                            .collect();
                        Bytes::from(plane)
                    })
                    .collect();
                DecodedFrame::planar(samples, self.sample_size, planes)?
            }
        };
        Ok(frame.with_timing(packet.ts, packet.dur))
    }
}

impl CodecSession for PcmSession {
    fn submit(&mut self, packet: &Packet) -> Result<Submit> {
        if self.queue.len() >= self.capacity {
            return Ok(Submit::Busy);
        }
        let frame = self.frame(packet)?;
        self.queue.push_back(frame);
        Ok(Submit::Accepted)
    }

    fn submit_drain_signal(&mut self) -> Result<()> {
        self.draining = true;
        Ok(())
    }

    fn receive(&mut self) -> Result<Receive> {
        Ok(match self.queue.pop_front() {
            Some(frame) => Receive::Frame(frame),
            None if self.draining => Receive::Ended,
            None => Receive::NeedMoreInput,
        })
    }

    fn flush(&mut self) {
        self.queue.clear();
        self.draining = false;
    }
}

/// Shape of a synthetic stream.
#[derive(Debug, Clone, Copy)]
pub struct Shape {
    pub layout: SampleLayout,
    pub channels: u32,
    pub format: SampleFormat,
    pub samples_per_packet: usize,
    pub packets: usize,
    pub capacity: usize,
}

impl Shape {
    pub fn group(&self) -> usize {
        self.channels as usize * self.format.byte_size()
    }

    pub fn total_samples(&self) -> u64 {
        (self.samples_per_packet * self.packets) as u64
    }

    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            stream_index: 0,
            channel_count: self.channels,
            sample_rate: RATE,
            sample_format: self.format,
            layout: self.layout,
            time_base: TimeBase::per_sample(RATE),
            duration: Some(self.total_samples()),
            codec: Some("pcm".to_string()),
        }
    }

    pub fn config(&self) -> DeviceConfig {
        DeviceConfig::new(self.channels, RATE, self.format)
    }

    /// Packets of the selected stream, with a packet of another stream
    /// after every third one. Returns the packets and the expected output.
    pub fn script(&self) -> (Vec<Packet>, Vec<u8>) {
        let packet_len = self.samples_per_packet * self.group();
        let expected: Vec<u8> = (0..packet_len * self.packets)
            .map(|i| (i * 7 + i / 251) as u8)
            .collect();

        let mut packets = Vec::new();
        for (idx, data) in expected.chunks(packet_len).enumerate() {
            let ts = (idx * self.samples_per_packet) as u64;
            packets.push(Packet::new(
                0,
                ts,
                self.samples_per_packet as u64,
                data.to_vec(),
            ));
            if idx % 3 == 2 {
                packets.push(Packet::new(9, ts, 1, vec![0xEE; 5]));
            }
        }
        (packets, expected)
    }

    pub fn decoder(&self) -> (Decoder<ScriptedSource, PcmSession>, Vec<u8>) {
        let (packets, expected) = self.script();
        let session = PcmSession::new(
            self.layout,
            self.channels as usize,
            self.format.byte_size(),
            self.capacity,
        );
        let mut decoder = Decoder::new(ScriptedSource::new(packets), session, self.descriptor())
            .expect("valid stream");
        decoder.set_config(&self.config()).expect("native config");
        (decoder, expected)
    }
}

pub fn planar_stereo_i16() -> Shape {
    Shape {
        layout: SampleLayout::Planar,
        channels: 2,
        format: SampleFormat::I16,
        samples_per_packet: 100,
        packets: 10,
        capacity: 1,
    }
}

pub fn interleaved_stereo_f32() -> Shape {
    Shape {
        layout: SampleLayout::Interleaved,
        channels: 2,
        format: SampleFormat::F32,
        samples_per_packet: 37,
        packets: 6,
        capacity: 2,
    }
}

/// Read with a repeating list of buffer sizes until end of stream.
pub fn read_in_chunks<D: AudioDecoder>(decoder: &mut D, sizes: &[usize]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut zero_reads = 0;
    for &size in sizes.iter().cycle() {
        let mut buf = vec![0u8; size];
        let n = decoder.read(&mut buf).expect("read");
        assert!(n <= size);
        out.extend_from_slice(&buf[..n]);
        if n == 0 {
            zero_reads += 1;
            if zero_reads > sizes.len() {
                break;
            }
        } else {
            zero_reads = 0;
        }
    }
    out
}
