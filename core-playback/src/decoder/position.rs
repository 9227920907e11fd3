//! Seek target and cursor arithmetic in stream ticks.

use crate::error::{PlaybackError, Result};
use crate::traits::{DecodedFrame, TimeBase};
use std::time::Duration;

/// Resolved absolute seek target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeekTarget {
    /// Reposition the source at this tick.
    Ticks(u64),
    /// The target is exactly the end of a stream of known length.
    End(u64),
}

/// Convert an absolute position to ticks, bounded by the known duration.
pub(crate) fn absolute_target(
    time_base: TimeBase,
    duration: Option<u64>,
    position: Duration,
) -> Result<SeekTarget> {
    let ticks = time_base.ticks_of(position);
    match duration {
        Some(total) if ticks > total => Err(PlaybackError::SeekOutOfBounds(position)),
        Some(total) if ticks == total => Ok(SeekTarget::End(total)),
        _ => Ok(SeekTarget::Ticks(ticks)),
    }
}

/// Apply a signed offset to `current`, clamped into `[0, total]`.
///
/// With an unknown total only the lower bound applies.
pub(crate) fn relative_target(
    current: Duration,
    total: Option<Duration>,
    delta: Duration,
    forward: bool,
) -> Duration {
    if forward {
        let target = current.saturating_add(delta);
        match total {
            Some(total) => target.min(total),
            None => target,
        }
    } else {
        current.saturating_sub(delta)
    }
}

/// Cursor while `consumed` of the frame's output bytes have been delivered.
pub(crate) fn cursor_within(frame: &DecodedFrame, consumed: usize) -> u64 {
    let len = frame.byte_len();
    if len == 0 {
        return frame.ts();
    }
    let advanced = frame.dur() as u128 * consumed as u128 / len as u128;
    frame.ts().saturating_add(advanced as u64)
}
