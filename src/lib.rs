//! Animstream streams the frames of large animated images from disk without blocking on a full
//! decode.
//!
//! The pipeline has four parts:
//!
//! - An [`ExtractionCoordinator`] that decodes a source in the background and writes per-frame
//!   full-resolution and thumbnail artifacts into a working directory
//! - A bounded [`PreloadCache`] that serves player/timeline reads and retries frames that are not
//!   on disk yet
//! - A disk cache ([`disk_cache`]) of binary delay and preview blobs guarded by digest sidecars
//! - A [`VersionManager`] that tracks the frame sets of a session and retargets the pipeline when
//!   the active one changes
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod decode;
pub mod disk_cache;
pub mod extract;
pub mod foundation;
pub mod preload;
pub mod timing;
pub mod workdir;
pub mod workspace;

pub use crate::config::PipelineConfig;
pub use crate::decode::{FrameDecoder, FrameSource, GifFrameDecoder, SourceInfo};
pub use crate::disk_cache::{DiskCacheLoad, MigrationHandle};
pub use crate::extract::{
    ExtractOpts, ExtractionCoordinator, JobHandle, JobStatus, NullSink, ProgressEvent,
    ProgressSink,
};
pub use crate::foundation::core::{ArtifactKind, ArtifactKinds, Progress, RgbaFrame};
pub use crate::foundation::error::{AnimstreamError, AnimstreamResult};
pub use crate::foundation::naming::ArtifactLayout;
pub use crate::preload::{
    DiskFrameLoader, FrameLoader, PreloadCache, PreloadOpts, RetrySweeper, SlotState,
};
pub use crate::timing::TimingStats;
pub use crate::workdir::{cleanup_work_dir, init_work_dir};
pub use crate::workspace::{FrameSet, FrameSetId, Selection, VersionManager};

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
pub(crate) mod test_support;
