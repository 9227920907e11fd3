//! # Configuration Negotiator
//!
//! Accepts a device configuration only when it matches the stream exactly.

use crate::error::{PlaybackError, Result, UnsupportedConfig};
use crate::traits::{DeviceConfig, StreamDescriptor};
use tracing::{debug, warn};

/// Compare `requested` with the native stream properties.
///
/// Every dimension is checked before failing, so the error lists all of them.
/// On success the returned configuration is the one the extractor uses; its
/// sample width is the native width.
pub fn negotiate(stream: &StreamDescriptor, requested: &DeviceConfig) -> Result<DeviceConfig> {
    let mut unsupported = UnsupportedConfig::default();

    if requested.sample_rate != stream.sample_rate {
        unsupported.resample = Some(requested.sample_rate);
    }
    if requested.channel_count != stream.channel_count {
        unsupported.rechannel = Some(requested.channel_count);
    }
    if requested.sample_format != stream.sample_format {
        unsupported.reformat = Some(requested.sample_format);
    }

    if !unsupported.is_empty() {
        warn!(
            requested = ?requested,
            native = ?stream.preferred_config(),
            "Rejected device configuration"
        );
        return Err(PlaybackError::ConfigurationUnsupported(unsupported));
    }

    debug!(config = ?requested, "Device configuration accepted");
    Ok(stream.preferred_config())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{SampleFormat, SampleLayout, TimeBase};

    fn stream() -> StreamDescriptor {
        StreamDescriptor {
            stream_index: 0,
            channel_count: 2,
            sample_rate: 44100,
            sample_format: SampleFormat::I16,
            layout: SampleLayout::Planar,
            time_base: TimeBase::per_sample(44100),
            duration: None,
            codec: None,
        }
    }

    #[test]
    fn test_exact_match_is_accepted() {
        let requested = DeviceConfig::new(2, 44100, SampleFormat::I16);
        assert_eq!(negotiate(&stream(), &requested).unwrap(), requested);
    }

    #[test]
    fn test_rechannel_is_rejected() {
        let requested = DeviceConfig::new(1, 44100, SampleFormat::I16);
        match negotiate(&stream(), &requested) {
            Err(PlaybackError::ConfigurationUnsupported(u)) => {
                assert_eq!(u.rechannel, Some(1));
                assert_eq!(u.resample, None);
                assert_eq!(u.reformat, None);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_resample_is_rejected() {
        let requested = DeviceConfig::new(2, 48000, SampleFormat::I16);
        let err = negotiate(&stream(), &requested).unwrap_err();
        assert!(err.to_string().contains("Resampling is not supported"));
        assert!(!err.to_string().contains("Rechanneling"));
    }

    #[test]
    fn test_every_mismatch_is_reported() {
        let requested = DeviceConfig::new(6, 96000, SampleFormat::F32);
        match negotiate(&stream(), &requested) {
            Err(PlaybackError::ConfigurationUnsupported(u)) => {
                assert_eq!(u.resample, Some(96000));
                assert_eq!(u.rechannel, Some(6));
                assert_eq!(u.reformat, Some(SampleFormat::F32));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
