//! Frame delay editing and timing statistics.

pub mod reduce;
pub mod retime;
pub mod stats;

pub use reduce::{FpsReduction, ReductionPlan, plan_fps_reduction};
pub use retime::{MIN_FRAME_DELAY_MS, retime_range, set_uniform_delay};
pub use stats::{FpsMode, TimingStats, probe_stats};
