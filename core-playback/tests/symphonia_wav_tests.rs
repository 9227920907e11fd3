//! End-to-end decoding of an in-memory PCM WAV through symphonia.

#![cfg(feature = "decoder-wav")]

use bytes::Bytes;
use core_playback::{
    AudioCodec, AudioDecoder, AudioSource, DecoderConfig, DeviceConfig, PlaybackError,
    SampleFormat, SymphoniaDecoder,
};
use std::time::Duration;

const RATE: u32 = 44100;
const CHANNELS: u16 = 2;

/// `frames` of 16-bit stereo: returns the file and its raw sample data.
fn wav_file(frames: usize) -> (Bytes, Vec<u8>) {
    let mut data = Vec::with_capacity(frames * 4);
    for i in 0..frames {
        let left = ((i as f32 * 0.05).sin() * 12000.0) as i16;
        let right = (i as i16).wrapping_mul(31);
        data.extend_from_slice(&left.to_le_bytes());
        data.extend_from_slice(&right.to_le_bytes());
    }

    let block_align = CHANNELS * 2;
    let mut file = Vec::with_capacity(44 + data.len());
    file.extend_from_slice(b"RIFF");
    file.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    file.extend_from_slice(b"WAVE");
    file.extend_from_slice(b"fmt ");
    file.extend_from_slice(&16u32.to_le_bytes());
    file.extend_from_slice(&1u16.to_le_bytes()); // PCM
    file.extend_from_slice(&CHANNELS.to_le_bytes());
    file.extend_from_slice(&RATE.to_le_bytes());
    file.extend_from_slice(&(RATE * block_align as u32).to_le_bytes());
    file.extend_from_slice(&block_align.to_le_bytes());
    file.extend_from_slice(&16u16.to_le_bytes());
    file.extend_from_slice(b"data");
    file.extend_from_slice(&(data.len() as u32).to_le_bytes());
    file.extend_from_slice(&data);

    (Bytes::from(file), data)
}

fn open(file: Bytes) -> SymphoniaDecoder {
    let source = AudioSource::CachedChunk {
        data: file,
        codec_hint: Some(AudioCodec::Wav),
    };
    SymphoniaDecoder::open(source, &DecoderConfig::default()).expect("wav opens")
}

/// Decoded bytes as 16-bit samples, whatever width the PCM codec chose.
fn samples(bytes: &[u8], format: SampleFormat) -> Vec<i16> {
    match format {
        SampleFormat::I16 => bytes
            .chunks_exact(2)
            .map(|b| i16::from_ne_bytes([b[0], b[1]]))
            .collect(),
        SampleFormat::I32 => bytes
            .chunks_exact(4)
            .map(|b| (i32::from_ne_bytes([b[0], b[1], b[2], b[3]]) >> 16) as i16)
            .collect(),
        other => panic!("unexpected PCM format {}", other),
    }
}

fn source_samples(data: &[u8]) -> Vec<i16> {
    data.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

fn read_all(decoder: &mut SymphoniaDecoder, chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = vec![0u8; chunk];
    loop {
        let n = decoder.read(&mut buf).unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn test_stream_descriptor_from_wav() {
    let (file, _) = wav_file(RATE as usize);
    let decoder = open(file);

    let config = decoder.preferred_config();
    assert_eq!(config.channel_count, 2);
    assert_eq!(config.sample_rate, RATE);
    assert!(matches!(
        config.sample_format,
        SampleFormat::I16 | SampleFormat::I32
    ));
    assert_eq!(decoder.timestamp().total, Duration::from_secs(1));
    assert_eq!(decoder.timestamp().current, Duration::ZERO);
}

#[test]
fn test_decoded_samples_match_source() {
    let (file, data) = wav_file(RATE as usize);
    let mut decoder = open(file);
    let config = decoder.preferred_config();
    decoder.set_config(&config).unwrap();

    let out = read_all(&mut decoder, config.sample_group_width() * 1024);
    let decoded = samples(&out, config.sample_format);
    let expected = source_samples(&data);
    assert_eq!(decoded.len(), expected.len());
    assert!(decoded == expected, "decoded samples differ from the source");
}

#[test]
fn test_chunking_does_not_change_output() {
    let (file, _) = wav_file(10_000);

    let mut whole = open(file.clone());
    whole.set_config(&whole.preferred_config()).unwrap();
    let reference = read_all(&mut whole, 1 << 20);

    let mut chunked = open(file);
    chunked.set_config(&chunked.preferred_config()).unwrap();
    let group = chunked.preferred_config().sample_group_width();
    assert_eq!(read_all(&mut chunked, group * 37), reference);
}

#[test]
fn test_mismatched_config_is_rejected() {
    let (file, _) = wav_file(4410);
    let mut decoder = open(file);

    let err = decoder
        .set_config(&DeviceConfig::new(1, 48000, SampleFormat::F32))
        .unwrap_err();
    match err {
        PlaybackError::ConfigurationUnsupported(ref u) => {
            assert_eq!(u.rechannel, Some(1));
            assert_eq!(u.resample, Some(48000));
            assert_eq!(u.reformat, Some(SampleFormat::F32));
        }
        other => panic!("unexpected error: {}", other),
    }

    let mut buf = [0u8; 64];
    assert!(matches!(
        decoder.read(&mut buf),
        Err(PlaybackError::NotConfigured)
    ));
}

#[test]
fn test_planar_granularity_is_enforced() {
    let (file, _) = wav_file(4410);
    let mut decoder = open(file);
    decoder.set_config(&decoder.preferred_config()).unwrap();

    let group = decoder.preferred_config().sample_group_width();
    let mut short = vec![0u8; group - 1];
    assert_eq!(decoder.read(&mut short).unwrap(), 0);

    let mut odd = vec![0u8; group * 2 + 2];
    assert!(matches!(
        decoder.read(&mut odd),
        Err(PlaybackError::BufferGranularity { .. })
    ));
}

#[test]
fn test_seek_resumes_from_reported_position() {
    let (file, data) = wav_file(RATE as usize);
    let mut decoder = open(file);
    let config = decoder.preferred_config();
    decoder.set_config(&config).unwrap();

    let target = Duration::from_millis(500);
    let ts = decoder.seek(target).unwrap();
    assert!(ts.current <= target);
    assert!(target - ts.current <= Duration::from_millis(100));

    let landed_frames = (ts.current.as_secs_f64() * RATE as f64).round() as usize;
    let out = read_all(&mut decoder, config.sample_group_width() * 512);
    let expected = source_samples(&data);
    assert!(
        samples(&out, config.sample_format) == expected[landed_frames * CHANNELS as usize..],
        "samples after seek differ"
    );
}

#[test]
fn test_seek_by_clamps_and_reports_end() {
    let (file, _) = wav_file(RATE as usize);
    let mut decoder = open(file);
    decoder.set_config(&decoder.preferred_config()).unwrap();

    let ts = decoder.seek_by(Duration::from_secs(30), true).unwrap();
    assert_eq!(ts.current, ts.total);

    let mut buf = [0u8; 256];
    assert_eq!(decoder.read(&mut buf).unwrap(), 0);

    let ts = decoder.seek_by(Duration::from_secs(30), false).unwrap();
    assert_eq!(ts.current, Duration::ZERO);
}

#[test]
fn test_garbage_input_fails_to_open() {
    let source = AudioSource::CachedChunk {
        data: Bytes::from_static(b"definitely not audio"),
        codec_hint: None,
    };
    assert!(SymphoniaDecoder::open(source, &DecoderConfig::default()).is_err());
}
