//! Bounded in-memory frame cache for player/timeline reads.

pub mod cache;
pub mod loader;
pub mod sweep;

pub use cache::{PreloadCache, PreloadOpts, SlotState};
pub use loader::{DiskFrameLoader, FrameLoader};
pub use sweep::RetrySweeper;
