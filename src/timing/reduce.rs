use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// Parameters for thinning out fast frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FpsReduction {
    /// Keep one of every `keep_interval` consecutive fast frames. Must be at least 2.
    pub keep_interval: usize,
    /// Frames with a delay below this are "fast" and may be merged.
    pub delay_threshold_ms: u32,
    /// Upper bound for any resulting delay.
    pub max_delay_ms: u32,
}

/// Frames to keep and their new delays, index-aligned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReductionPlan {
    pub kept: Vec<usize>,
    pub delays: Vec<u32>,
}

impl ReductionPlan {
    pub fn dropped(&self, original_len: usize) -> usize {
        original_len.saturating_sub(self.kept.len())
    }

    /// Select the kept items from `frames`.
    pub fn apply<T: Clone>(&self, frames: &[T]) -> Vec<T> {
        self.kept
            .iter()
            .filter_map(|&i| frames.get(i).cloned())
            .collect()
    }
}

/// Plan a frame-rate reduction.
///
/// Slow frames (delay at or above the threshold) are kept as-is, capped at `max_delay_ms`. A run
/// of fast frames keeps its first frame, which absorbs the delays of up to `keep_interval - 1`
/// following fast frames; the merged delay is capped too.
pub fn plan_fps_reduction(delays: &[u32], opts: FpsReduction) -> AnimstreamResult<ReductionPlan> {
    if opts.keep_interval < 2 {
        return Err(AnimstreamError::validation(
            "fps reduction keep_interval must be >= 2",
        ));
    }
    if delays.is_empty() {
        return Err(AnimstreamError::validation(
            "fps reduction needs at least one frame",
        ));
    }

    let mut plan = ReductionPlan::default();
    let mut i = 0;
    while i < delays.len() {
        let delay = delays[i];
        plan.kept.push(i);
        if delay >= opts.delay_threshold_ms {
            plan.delays.push(delay.min(opts.max_delay_ms));
            i += 1;
            continue;
        }

        let mut merged = u64::from(delay);
        let mut run = 1;
        while run < opts.keep_interval
            && let Some(&next) = delays.get(i + run)
            && next < opts.delay_threshold_ms
        {
            merged += u64::from(next);
            run += 1;
        }
        plan.delays
            .push(merged.min(u64::from(opts.max_delay_ms)) as u32);
        i += run;
    }

    tracing::debug!(
        from = delays.len(),
        to = plan.kept.len(),
        keep_interval = opts.keep_interval,
        "fps reduction planned"
    );
    Ok(plan)
}

#[cfg(test)]
#[path = "../../tests/unit/timing/reduce.rs"]
mod tests;
