//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the decoder core:
//! - Logging and tracing infrastructure
//! - The runtime error type
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other workspace crates depend
//! on. It establishes the logging conventions (targets, levels, output formats)
//! used throughout the system, whether the decoder is linked directly or loaded
//! as a host plugin.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
