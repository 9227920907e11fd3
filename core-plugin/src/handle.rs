//! Host-facing decoder handle.
//!
//! Every operation completes without returning an error: failures are pushed
//! onto a bounded queue and the host pops them, newest first, after each call.

use crate::error::{PluginError, QueuedError};
use core_playback::{
    AudioDecoder, AudioSource, DecoderConfig, DeviceConfig, PlaybackError, SampleFormat,
    SymphoniaDecoder, Timestamp, UnsupportedConfig,
};
use core_runtime::logging::{init_logging, LoggingConfig};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Once;
use std::time::Duration;
use tracing::{debug, warn};

/// Oldest entries are dropped once this many failures are waiting.
pub const MAX_QUEUED_ERRORS: usize = 1000;

static LOGGING: Once = Once::new();

/// Install the plugin's subscriber the first time a handle is opened, if
/// `DECODER_LOG` asks for one.
///
/// A host that already installed its own subscriber keeps it.
fn ensure_logging() {
    LOGGING.call_once(|| {
        let Some(config) = LoggingConfig::from_env_if_set() else {
            return;
        };
        if let Err(e) = init_logging(config) {
            debug!("Plugin logging not installed: {}", e);
        }
    });
}

/// One open track plus the failures the host has not yet collected.
pub struct PluginHandle {
    decoder: Option<Box<dyn AudioDecoder>>,
    errors: VecDeque<QueuedError>,
}

impl PluginHandle {
    /// Open a local file with default decoder options.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let source = AudioSource::LocalFile {
            path: path.as_ref().to_path_buf(),
        };
        Self::open_source(source, &DecoderConfig::default())
    }

    /// Open any source. A failure leaves an uninitialized handle with the
    /// reason queued.
    pub fn open_source(source: AudioSource, config: &DecoderConfig) -> Self {
        ensure_logging();
        let description = source.describe();

        match SymphoniaDecoder::open(source, config) {
            Ok(decoder) => Self::from_decoder(Box::new(decoder)),
            Err(e) => {
                warn!(source = %description, "Failed to open decoder: {}", e);
                Self::failed(e.into())
            }
        }
    }

    /// Wrap an already opened decoder.
    pub fn from_decoder(decoder: Box<dyn AudioDecoder>) -> Self {
        Self {
            decoder: Some(decoder),
            errors: VecDeque::new(),
        }
    }

    /// An uninitialized handle carrying `err`.
    pub fn failed(err: PluginError) -> Self {
        let mut handle = Self::uninitialized();
        handle.push_error(err);
        handle
    }

    fn uninitialized() -> Self {
        Self {
            decoder: None,
            errors: VecDeque::new(),
        }
    }

    /// Returns `true` if the decoder opened successfully.
    pub fn is_initialized(&self) -> bool {
        self.decoder.is_some()
    }

    pub fn set_config(&mut self, config: &DeviceConfig) {
        let result = match self.decoder.as_mut() {
            Some(decoder) => decoder.set_config(config).map_err(PluginError::from),
            None => Err(PluginError::NotInitialized("set config")),
        };
        self.record(result);
    }

    /// Fill `buf` with samples of the declared `format` and return how many
    /// samples (not bytes) were written.
    ///
    /// Samples copied before a failure are still counted; the failure is
    /// queued.
    pub fn read(&mut self, buf: &mut [u8], format: SampleFormat) -> usize {
        let (samples, result) = match self.decoder.as_mut() {
            Some(decoder) => read_as(decoder.as_mut(), buf, format),
            None => (0, Err(PluginError::NotInitialized("read"))),
        };
        self.record(result);
        samples
    }

    /// The configuration the stream plays without conversion, if open.
    pub fn preferred_config(&self) -> Option<DeviceConfig> {
        self.decoder.as_ref().map(|d| d.preferred_config())
    }

    pub fn seek(&mut self, position: Duration) -> Timestamp {
        let result = match self.decoder.as_mut() {
            Some(decoder) => decoder.seek(position).map_err(PluginError::from),
            None => Err(PluginError::NotInitialized("seek")),
        };
        self.record(result).unwrap_or_else(|| self.get_time())
    }

    pub fn seek_by(&mut self, delta: Duration, forward: bool) -> Timestamp {
        let result = match self.decoder.as_mut() {
            Some(decoder) => decoder.seek_by(delta, forward).map_err(PluginError::from),
            None => Err(PluginError::NotInitialized("seek")),
        };
        self.record(result).unwrap_or_else(|| self.get_time())
    }

    /// Current position; zero for an uninitialized handle.
    pub fn get_time(&self) -> Timestamp {
        self.decoder
            .as_ref()
            .map(|d| d.timestamp())
            .unwrap_or_default()
    }

    /// Take the most recent failure.
    pub fn pop_error(&mut self) -> Option<QueuedError> {
        self.errors.pop_back()
    }

    pub fn pending_errors(&self) -> usize {
        self.errors.len()
    }

    pub fn push_error(&mut self, err: PluginError) {
        debug!(severity = ?err.severity(), "Queueing plugin error: {}", err);
        if self.errors.len() >= MAX_QUEUED_ERRORS {
            self.errors.pop_front();
        }
        self.errors.push_back(err.into());
    }

    fn record<T>(&mut self, result: Result<T, PluginError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.push_error(e);
                None
            }
        }
    }
}

fn read_as(
    decoder: &mut dyn AudioDecoder,
    buf: &mut [u8],
    format: SampleFormat,
) -> (usize, Result<(), PluginError>) {
    let native = decoder.preferred_config().sample_format;
    if format != native {
        let refused = PlaybackError::ConfigurationUnsupported(UnsupportedConfig {
            reformat: Some(format),
            ..Default::default()
        });
        return (0, Err(refused.into()));
    }
    let (written, result) = decoder.read_partial(buf);
    (written / format.byte_size(), result.map_err(PluginError::from))
}
