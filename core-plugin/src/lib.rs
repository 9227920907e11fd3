//! # Decoder Plugin
//!
//! Host boundary for the decoding core: a [`PluginHandle`] that turns every
//! failure into a queued message, and (with the `ffi` feature) the C exports
//! a host player resolves from the shared library.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use core_plugin::PluginHandle;
//!
//! let mut handle = PluginHandle::open("/music/track.flac");
//! if let Some(config) = handle.preferred_config() {
//!     handle.set_config(&config);
//!     let mut buf = vec![0u8; config.sample_group_width() * 1024];
//!     let samples = handle.read(&mut buf, config.sample_format);
//!     println!("decoded {} samples", samples);
//! }
//! while let Some(err) = handle.pop_error() {
//!     eprintln!("{:?}: {}", err.severity, err.message);
//! }
//! ```

pub mod error;
mod handle;

#[cfg(feature = "ffi")]
pub mod ffi;

pub use error::{ErrorSeverity, PluginError, QueuedError};
pub use handle::{PluginHandle, MAX_QUEUED_ERRORS};
