//! # C ABI
//!
//! Symbols a host player loads from the shared library. Handles cross the
//! boundary as opaque pointers created by [`uamp_decoder_open`] and released
//! by [`uamp_decoder_free`].
//!
//! Panics never unwind into the host: each export catches them and queues a
//! fatal error on the handle instead.

#![allow(non_upper_case_globals)]

use crate::error::{ErrorSeverity, PluginError, QueuedError};
use crate::handle::PluginHandle;
use core_playback::{DeviceConfig, SampleFormat, Timestamp};
use std::any::Any;
use std::ffi::{c_char, c_void};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use std::time::Duration;

/// ABI revision shared by both plugin descriptors.
pub const PLUGIN_VERSION: u32 = 0x00_001_000;

const PLUGIN_NAME: &[u8] = b"core-decoders\0";

// ============================================================================
// Wire Types
// ============================================================================

/// Sample format code: signed integers are negative bit widths, unsigned ones
/// positive bit widths, floats their bit width times 100.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CSampleFormat(pub i32);

impl CSampleFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const I8: Self = Self(-8);
    pub const I16: Self = Self(-16);
    pub const I24: Self = Self(-24);
    pub const I32: Self = Self(-32);
    pub const I64: Self = Self(-64);
    pub const U8: Self = Self(8);
    pub const U16: Self = Self(16);
    pub const U32: Self = Self(32);
    pub const U64: Self = Self(64);
    pub const F32: Self = Self(3200);
    pub const F64: Self = Self(6400);

    pub fn to_sample_format(self) -> Option<SampleFormat> {
        Some(match self {
            Self::I8 => SampleFormat::I8,
            Self::I16 => SampleFormat::I16,
            Self::I24 => SampleFormat::I24,
            Self::I32 => SampleFormat::I32,
            Self::I64 => SampleFormat::I64,
            Self::U8 => SampleFormat::U8,
            Self::U16 => SampleFormat::U16,
            Self::U32 => SampleFormat::U32,
            Self::U64 => SampleFormat::U64,
            Self::F32 => SampleFormat::F32,
            Self::F64 => SampleFormat::F64,
            _ => return None,
        })
    }
}

impl From<SampleFormat> for CSampleFormat {
    fn from(format: SampleFormat) -> Self {
        match format {
            SampleFormat::I8 => Self::I8,
            SampleFormat::I16 => Self::I16,
            SampleFormat::I24 => Self::I24,
            SampleFormat::I32 => Self::I32,
            SampleFormat::I64 => Self::I64,
            SampleFormat::U8 => Self::U8,
            SampleFormat::U16 => Self::U16,
            SampleFormat::U32 => Self::U32,
            SampleFormat::U64 => Self::U64,
            SampleFormat::F32 => Self::F32,
            SampleFormat::F64 => Self::F64,
            // no wire code for unsigned 24-bit
            SampleFormat::U24 => Self::UNKNOWN,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CDeviceConfig {
    pub channel_count: u32,
    pub sample_rate: u32,
    pub sample_format: CSampleFormat,
}

impl From<DeviceConfig> for CDeviceConfig {
    fn from(config: DeviceConfig) -> Self {
        Self {
            channel_count: config.channel_count,
            sample_rate: config.sample_rate,
            sample_format: config.sample_format.into(),
        }
    }
}

impl CDeviceConfig {
    fn empty() -> Self {
        Self {
            channel_count: 0,
            sample_rate: 0,
            sample_format: CSampleFormat::UNKNOWN,
        }
    }

    fn to_device_config(self) -> Result<DeviceConfig, PluginError> {
        let format = self
            .sample_format
            .to_sample_format()
            .ok_or(PluginError::UnknownSampleFormat(self.sample_format.0))?;
        Ok(DeviceConfig::new(self.channel_count, self.sample_rate, format))
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CDuration {
    pub secs: u64,
    pub nanos: u32,
}

impl From<Duration> for CDuration {
    fn from(d: Duration) -> Self {
        Self {
            secs: d.as_secs(),
            nanos: d.subsec_nanos(),
        }
    }
}

impl From<CDuration> for Duration {
    fn from(d: CDuration) -> Self {
        Duration::from_secs(d.secs).saturating_add(Duration::from_nanos(u64::from(d.nanos)))
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CTimestamp {
    pub current: CDuration,
    pub total: CDuration,
}

impl From<Timestamp> for CTimestamp {
    fn from(ts: Timestamp) -> Self {
        Self {
            current: ts.current.into(),
            total: ts.total.into(),
        }
    }
}

/// Owned byte string; the host must call `free` with `data` and `len`.
#[repr(C)]
#[derive(Debug)]
pub struct CString {
    pub data: *const c_char,
    pub len: usize,
    pub free: unsafe extern "C" fn(*const c_char, usize),
}

impl CString {
    fn null() -> Self {
        Self {
            data: ptr::null(),
            len: 0,
            free: uamp_unique_error_free_string,
        }
    }

    fn from_string(s: String) -> Self {
        let bytes = s.into_bytes().into_boxed_slice();
        let len = bytes.len();
        Self {
            data: Box::into_raw(bytes) as *const c_char,
            len,
            free: uamp_unique_error_free_string,
        }
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CErrorType(pub i32);

impl CErrorType {
    pub const NO_ERROR: Self = Self(0);
    pub const RECOVERABLE: Self = Self(1);
    pub const FATAL: Self = Self(2);
}

#[repr(C)]
#[derive(Debug)]
pub struct CError {
    pub msg: CString,
    pub typ: CErrorType,
}

impl CError {
    fn none() -> Self {
        Self {
            msg: CString::null(),
            typ: CErrorType::NO_ERROR,
        }
    }
}

impl From<QueuedError> for CError {
    fn from(err: QueuedError) -> Self {
        let typ = match err.severity {
            ErrorSeverity::Recoverable => CErrorType::RECOVERABLE,
            ErrorSeverity::Fatal => CErrorType::FATAL,
        };
        Self {
            msg: CString::from_string(err.message),
            typ,
        }
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginType(pub i32);

impl PluginType {
    pub const DECODER: Self = Self(1);
}

/// Generic plugin descriptor. `name` is NUL terminated.
#[repr(C)]
#[derive(Debug)]
pub struct PluginConfig {
    pub version: u32,
    pub name: *const c_char,
    pub typ: PluginType,
}

// `name` points at a static string.
unsafe impl Sync for PluginConfig {}

pub mod decoder_flags {
    pub const NONE: u32 = 0;
    pub const VOLUME: u32 = 0x1;
    pub const CONFIG: u32 = 0x2;
    pub const SEEK: u32 = 0x4;
    pub const SEEK_BY: u32 = 0x8;
    pub const GET_TIME: u32 = 0x10;
}

/// Which optional decoder exports this library provides.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderPluginConfig {
    pub version: u32,
    pub flags: u32,
}

#[no_mangle]
pub static uamp_plugin_config: PluginConfig = PluginConfig {
    version: PLUGIN_VERSION,
    name: PLUGIN_NAME.as_ptr() as *const c_char,
    typ: PluginType::DECODER,
};

#[no_mangle]
pub static uamp_plugin_decoder_config: DecoderPluginConfig = DecoderPluginConfig {
    version: PLUGIN_VERSION,
    flags: decoder_flags::CONFIG
        | decoder_flags::SEEK
        | decoder_flags::SEEK_BY
        | decoder_flags::GET_TIME,
};

// ============================================================================
// Boundary Helpers
// ============================================================================

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run `op` on the handle behind `decoder`, turning a panic into a queued
/// fatal error. Null handles yield `fallback`.
///
/// # Safety
///
/// `decoder` must be null or a live pointer from [`uamp_decoder_open`].
unsafe fn with_handle<T>(
    decoder: *mut c_void,
    fallback: T,
    op: impl FnOnce(&mut PluginHandle) -> T,
) -> T {
    let Some(handle) = (decoder as *mut PluginHandle).as_mut() else {
        return fallback;
    };
    match panic::catch_unwind(AssertUnwindSafe(|| op(&mut *handle))) {
        Ok(value) => value,
        Err(payload) => {
            handle.push_error(PluginError::Panic(panic_message(payload)));
            fallback
        }
    }
}

fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
    }
    #[cfg(not(unix))]
    {
        PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
    }
}

// ============================================================================
// Exports
// ============================================================================

/// Open the file at `path` (`len` bytes, not NUL terminated).
///
/// Always returns a handle; on failure the reason is queued on it.
///
/// # Safety
///
/// `path` must point to `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_open(path: *const c_char, len: usize) -> *mut c_void {
    let handle = if path.is_null() {
        PluginHandle::failed(PluginError::NullPointer("path"))
    } else {
        let path = path_from_bytes(std::slice::from_raw_parts(path as *const u8, len));
        panic::catch_unwind(|| PluginHandle::open(&path)).unwrap_or_else(|payload| {
            PluginHandle::failed(PluginError::Panic(panic_message(payload)))
        })
    };
    Box::into_raw(Box::new(handle)) as *mut c_void
}

/// # Safety
///
/// `decoder` must be null or a pointer from [`uamp_decoder_open`] that has
/// not been freed.
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_free(decoder: *mut c_void) {
    if !decoder.is_null() {
        drop(Box::from_raw(decoder as *mut PluginHandle));
    }
}

/// # Safety
///
/// `decoder` as for [`uamp_decoder_free`]; `config` must be null or valid.
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_set_config(
    decoder: *mut c_void,
    config: *const CDeviceConfig,
) {
    with_handle(decoder, (), |handle| {
        let requested = match config.as_ref() {
            Some(c) => c.to_device_config(),
            None => Err(PluginError::NullPointer("device config")),
        };
        match requested {
            Ok(requested) => handle.set_config(&requested),
            Err(e) => handle.push_error(e),
        }
    })
}

/// Fill `buf` with up to `count` samples of `format`; returns the number of
/// samples written.
///
/// # Safety
///
/// `decoder` as for [`uamp_decoder_free`]; `buf` must hold `count` samples
/// of `format`.
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_read(
    decoder: *mut c_void,
    buf: *mut c_void,
    count: usize,
    format: CSampleFormat,
) -> usize {
    with_handle(decoder, 0, |handle| {
        let Some(sample_format) = format.to_sample_format() else {
            handle.push_error(PluginError::UnknownSampleFormat(format.0));
            return 0;
        };
        let len = count.saturating_mul(sample_format.byte_size());
        let dest: &mut [u8] = if len == 0 {
            &mut []
        } else if buf.is_null() {
            handle.push_error(PluginError::NullPointer("sample buffer"));
            return 0;
        } else {
            std::slice::from_raw_parts_mut(buf as *mut u8, len)
        };
        handle.read(dest, sample_format)
    })
}

/// Native configuration of the stream; all zero if the handle failed to open.
///
/// # Safety
///
/// As for [`uamp_decoder_free`].
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_preferred_config(decoder: *mut c_void) -> CDeviceConfig {
    with_handle(decoder, CDeviceConfig::empty(), |handle| {
        handle
            .preferred_config()
            .map(CDeviceConfig::from)
            .unwrap_or_else(CDeviceConfig::empty)
    })
}

/// # Safety
///
/// As for [`uamp_decoder_free`].
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_seek(
    decoder: *mut c_void,
    position: CDuration,
) -> CTimestamp {
    with_handle(decoder, CTimestamp::default(), |handle| {
        handle.seek(position.into()).into()
    })
}

/// # Safety
///
/// As for [`uamp_decoder_free`].
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_seek_by(
    decoder: *mut c_void,
    delta: CDuration,
    forward: bool,
) -> CTimestamp {
    with_handle(decoder, CTimestamp::default(), |handle| {
        handle.seek_by(delta.into(), forward).into()
    })
}

/// # Safety
///
/// As for [`uamp_decoder_free`].
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_get_time(decoder: *const c_void) -> CTimestamp {
    let Some(handle) = (decoder as *const PluginHandle).as_ref() else {
        return CTimestamp::default();
    };
    panic::catch_unwind(AssertUnwindSafe(|| handle.get_time()))
        .map(CTimestamp::from)
        .unwrap_or_default()
}

/// Pop the most recent queued error; `NO_ERROR` with a null message when the
/// queue is empty.
///
/// # Safety
///
/// As for [`uamp_decoder_free`].
#[no_mangle]
pub unsafe extern "C" fn uamp_decoder_err(decoder: *mut c_void) -> CError {
    with_handle(decoder, CError::none(), |handle| {
        handle.pop_error().map(CError::from).unwrap_or_else(CError::none)
    })
}

/// Release a message returned by [`uamp_decoder_err`].
///
/// # Safety
///
/// `data` and `len` must come from the same [`CString`], freed once.
#[no_mangle]
pub unsafe extern "C" fn uamp_unique_error_free_string(data: *const c_char, len: usize) {
    if !data.is_null() {
        let slice = ptr::slice_from_raw_parts_mut(data as *mut u8, len);
        drop(Box::from_raw(slice));
    }
}
