//! # Plugin Error Types
//!
//! Failures queued on a [`PluginHandle`](crate::PluginHandle) for the host to
//! drain.

use core_playback::PlaybackError;
use thiserror::Error;

/// How the host should react to a queued failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// The operation failed but the handle remains usable.
    Recoverable,
    /// The handle cannot continue playback.
    Fatal,
}

#[derive(Error, Debug)]
pub enum PluginError {
    /// An operation ran on a handle whose decoder failed to open.
    #[error("Cannot {0}: Decoder not initialized.")]
    NotInitialized(&'static str),

    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// The host passed a sample format code outside the known set.
    #[error("Unknown sample format code {0}")]
    UnknownSampleFormat(i32),

    /// The host passed a null pointer where data was required.
    #[error("Null {0} pointer")]
    NullPointer(&'static str),

    /// A panic was caught at the plugin boundary.
    #[error("Plugin panicked: {0}")]
    Panic(String),
}

impl PluginError {
    /// Only a refused seek is recoverable: the position stays where it was.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PluginError::Playback(
                PlaybackError::SeekNotSupported | PlaybackError::SeekOutOfBounds(_),
            ) => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Fatal,
        }
    }
}

/// A failure waiting in the handle's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedError {
    pub message: String,
    pub severity: ErrorSeverity,
}

impl From<PluginError> for QueuedError {
    fn from(err: PluginError) -> Self {
        Self {
            severity: err.severity(),
            message: err.to_string(),
        }
    }
}
