//! # Decode a File
//!
//! Opens an audio file, accepts its native configuration and decodes it to
//! the end, reporting how much audio came out.
//!
//! Run with: `cargo run --example decode_file --package core-playback -- <path>`

use core_playback::{AudioDecoder, AudioSource, DecoderConfig, SymphoniaDecoder};
use core_runtime::logging::{init_logging, LoggingConfig};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::from_env())?;

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: decode_file <path>")?;
    let source = AudioSource::LocalFile { path: path.into() };
    let mut decoder = SymphoniaDecoder::open(source, &DecoderConfig::default())?;

    let config = decoder.preferred_config();
    println!(
        "{} channels, {} Hz, {} ({})",
        config.channel_count,
        config.sample_rate,
        config.sample_format,
        decoder.stream().codec.as_deref().unwrap_or("unknown codec"),
    );
    decoder.set_config(&config)?;

    let group = config.sample_group_width();
    let mut buf = vec![0u8; group * 4096];
    let mut frames = 0usize;
    loop {
        let n = decoder.read(&mut buf)?;
        if n == 0 {
            break;
        }
        frames += n / group;
    }

    let ts = decoder.timestamp();
    println!(
        "decoded {} sample frames ({:.3}s of {:.3}s)",
        frames,
        ts.current.as_secs_f64(),
        ts.total.as_secs_f64()
    );

    let middle = decoder.seek(ts.total / 2)?;
    println!("seek to middle landed at {:?}", middle.current);
    let back = decoder.seek_by(Duration::from_secs(1), false)?;
    println!("one second back: {:?}", back.current);

    Ok(())
}
