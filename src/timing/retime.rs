use std::ops::RangeInclusive;

use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// Smallest per-frame delay produced by retiming, in milliseconds.
pub const MIN_FRAME_DELAY_MS: u32 = 10;

/// Rescale the delays in `range` so they sum to `target_total_ms`.
///
/// Each frame becomes `max(10, round(delay * ratio))`. A correction pass then nudges frames by
/// 1ms, front to back, until the range sums to the target exactly. Frames never drop below the
/// 10ms floor, so a target under `10 * len` ends at the floor instead. Frames outside `range` are
/// returned unchanged.
pub fn retime_range(
    delays: &[u32],
    range: RangeInclusive<usize>,
    target_total_ms: u64,
) -> AnimstreamResult<Vec<u32>> {
    let (start, end) = (*range.start(), *range.end());
    if start > end || end >= delays.len() {
        return Err(AnimstreamError::validation(format!(
            "retime range {start}..={end} out of bounds for {} frames",
            delays.len()
        )));
    }

    let mut out = delays.to_vec();
    let slice = &mut out[start..=end];
    let len = slice.len() as u64;
    let current: u64 = slice.iter().map(|&d| u64::from(d)).sum();

    if current == 0 {
        let each = clamp_delay(target_total_ms / len);
        slice.fill(each);
    } else {
        let ratio = target_total_ms as f64 / current as f64;
        for d in slice.iter_mut() {
            *d = clamp_delay((f64::from(*d) * ratio).round() as u64);
        }
    }

    distribute_remainder(slice, target_total_ms);
    Ok(out)
}

fn clamp_delay(ms: u64) -> u32 {
    ms.clamp(u64::from(MIN_FRAME_DELAY_MS), u64::from(u32::MAX)) as u32
}

fn distribute_remainder(slice: &mut [u32], target: u64) {
    let sum: u64 = slice.iter().map(|&d| u64::from(d)).sum();
    let mut diff = target as i128 - sum as i128;
    while diff != 0 {
        let mut changed = false;
        for d in slice.iter_mut() {
            if diff == 0 {
                break;
            }
            if diff > 0 && *d < u32::MAX {
                *d += 1;
                diff -= 1;
                changed = true;
            } else if diff < 0 && *d > MIN_FRAME_DELAY_MS {
                *d -= 1;
                diff += 1;
                changed = true;
            }
        }
        if !changed {
            tracing::debug!(residual = diff as i64, "retime target unreachable at delay floor");
            break;
        }
    }
}

/// Set every delay in `range` to `delay_ms` (clamped to the floor).
pub fn set_uniform_delay(
    delays: &[u32],
    range: RangeInclusive<usize>,
    delay_ms: u32,
) -> AnimstreamResult<Vec<u32>> {
    let (start, end) = (*range.start(), *range.end());
    if start > end || end >= delays.len() {
        return Err(AnimstreamError::validation(format!(
            "delay range {start}..={end} out of bounds for {} frames",
            delays.len()
        )));
    }
    let mut out = delays.to_vec();
    out[start..=end].fill(delay_ms.max(MIN_FRAME_DELAY_MS));
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/timing/retime.rs"]
mod tests;
