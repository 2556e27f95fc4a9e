use std::collections::BTreeMap;
use std::path::Path;

use crate::decode::FrameDecoder;
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// A per-frame frame rate (rounded to whole fps) and how many frames have it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FpsMode {
    pub fps: u32,
    pub count: usize,
}

/// Timing summary of an animation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimingStats {
    pub frame_count: usize,
    pub total_duration_ms: u64,
    /// Frames per second over the whole animation; 0 when the total duration is 0.
    pub avg_fps: f64,
    /// Slowest per-frame rate. A zero-delay frame counts as 0 fps.
    pub min_fps: f64,
    pub max_fps: f64,
    /// Up to two most common rounded per-frame rates, most frequent first.
    pub modes: Vec<FpsMode>,
    pub file_size: Option<u64>,
}

impl TimingStats {
    pub fn from_delays(delays_ms: &[u32]) -> Self {
        let total_duration_ms: u64 = delays_ms.iter().map(|&d| u64::from(d)).sum();
        let avg_fps = if total_duration_ms > 0 {
            delays_ms.len() as f64 * 1000.0 / total_duration_ms as f64
        } else {
            0.0
        };

        let per_frame = delays_ms
            .iter()
            .map(|&d| if d > 0 { 1000.0 / f64::from(d) } else { 0.0 });
        let (min_fps, max_fps) = per_frame.fold(None, |acc: Option<(f64, f64)>, fps| {
            Some(match acc {
                None => (fps, fps),
                Some((lo, hi)) => (lo.min(fps), hi.max(fps)),
            })
        })
        .unwrap_or((0.0, 0.0));

        // BTreeMap + stable sort: equal counts keep ascending fps order.
        let mut counts = BTreeMap::<u32, usize>::new();
        for &d in delays_ms.iter().filter(|&&d| d > 0) {
            let fps = (1000.0 / f64::from(d)).round() as u32;
            *counts.entry(fps).or_default() += 1;
        }
        let mut modes: Vec<FpsMode> = counts
            .into_iter()
            .map(|(fps, count)| FpsMode { fps, count })
            .collect();
        modes.sort_by(|a, b| b.count.cmp(&a.count));
        modes.truncate(2);

        Self {
            frame_count: delays_ms.len(),
            total_duration_ms,
            avg_fps,
            min_fps,
            max_fps,
            modes,
            file_size: None,
        }
    }

    pub fn with_file_size(mut self, bytes: u64) -> Self {
        self.file_size = Some(bytes);
        self
    }
}

/// Probe `path` and summarise its timing, including its size on disk.
pub fn probe_stats(decoder: &dyn FrameDecoder, path: &Path) -> AnimstreamResult<TimingStats> {
    let info = decoder.probe(path)?;
    let size = std::fs::metadata(path)
        .map_err(|e| AnimstreamError::io(path, e))?
        .len();
    Ok(TimingStats::from_delays(&info.delays_ms).with_file_size(size))
}

#[cfg(test)]
#[path = "../../tests/unit/timing/stats.rs"]
mod tests;
