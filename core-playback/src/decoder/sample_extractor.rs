//! # Sample Extractor
//!
//! Copies decoded frames into caller buffers as interleaved bytes.
//!
//! A frame may be larger than the destination, so extraction is resumable:
//! the caller keeps the frame together with a byte offset into the frame's
//! interleaved output space and passes both back on the next call.
//!
//! - **Interleaved frames** are copied verbatim, rounded down to whole sample
//!   groups.
//! - **Planar frames** are interleaved on the fly, one sample from every
//!   channel per group. The destination length must then be a whole number of
//!   groups; anything else is a buffer granularity violation.
//!
//! Sample width is never changed here. The width a frame carries is the width
//! written.

use crate::error::{PlaybackError, Result};
use crate::traits::{DecodedFrame, SampleLayout};

/// Outcome of one extraction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted {
    /// Bytes written to the destination.
    pub written: usize,
    /// Offset to resume from, or `None` once the frame is fully consumed.
    pub resume: Option<usize>,
}

/// Copy as much of `frame` as fits into `dest`, starting at `resume`.
///
/// `resume` is an offset in the interleaved output byte space of the frame
/// and must be a multiple of the frame's sample-group width.
///
/// A destination shorter than one sample group is not an error: nothing is
/// copied and the resume offset is handed back unchanged.
///
/// # Errors
///
/// Returns [`PlaybackError::BufferGranularity`] when the frame is planar and
/// `dest` holds at least one group but is not a whole multiple of it.
pub fn extract(frame: &DecodedFrame, resume: usize, dest: &mut [u8]) -> Result<Extracted> {
    let frame_len = frame.byte_len();
    if resume >= frame_len {
        return Ok(Extracted {
            written: 0,
            resume: None,
        });
    }

    let group = frame.group_width();
    if dest.len() < group {
        return Ok(Extracted {
            written: 0,
            resume: Some(resume),
        });
    }

    let remaining = frame_len - resume;
    let len = match frame.layout() {
        SampleLayout::Interleaved => {
            let len = dest.len().min(remaining);
            let len = len - len % group;
            dest[..len].copy_from_slice(&frame.plane(0)[resume..resume + len]);
            len
        }
        SampleLayout::Planar => {
            if dest.len() % group != 0 {
                return Err(PlaybackError::BufferGranularity {
                    len: dest.len(),
                    group,
                });
            }
            let len = dest.len().min(remaining);
            interleave_planes(frame, resume / group, &mut dest[..len]);
            len
        }
    };

    let next = resume + len;
    Ok(Extracted {
        written: len,
        resume: (next < frame_len).then_some(next),
    })
}

/// Interleave whole sample groups starting at per-channel sample `first`.
fn interleave_planes(frame: &DecodedFrame, first: usize, dest: &mut [u8]) {
    let size = frame.sample_size();

    for (i, group) in dest.chunks_exact_mut(frame.group_width()).enumerate() {
        let src = (first + i) * size;
        for (channel, slot) in group.chunks_exact_mut(size).enumerate() {
            slot.copy_from_slice(&frame.plane(channel)[src..src + size]);
        }
    }
}
