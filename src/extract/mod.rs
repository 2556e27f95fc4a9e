//! Background extraction of per-frame artifacts.
//!
//! An [`ExtractionCoordinator`] owns at most one live job. The job decodes its source in
//! fixed-size batches, writing a full-resolution PNG and a size-capped preview PNG per frame under
//! the source's [`ArtifactLayout`](crate::ArtifactLayout). Pause and cancel are checked between
//! batches only.

pub mod artifact;
pub mod coordinator;
pub mod job;
pub mod progress;

pub use coordinator::{ExtractOpts, ExtractionCoordinator};
pub use job::{JobHandle, JobStatus};
pub use progress::{NullSink, ProgressEvent, ProgressSink};
