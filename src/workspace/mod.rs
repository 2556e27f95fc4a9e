//! Frame sets of a session, the active selection, and saved workspace order.

pub mod delay_repo;
pub mod frameset;
pub mod manager;
pub mod order;

pub use delay_repo::DelayRepository;
pub use frameset::{FrameSet, FrameSetId, FrameSlot, Materialization, SlotTable};
pub use manager::{Selection, VersionManager};
pub use order::{ResolvedOrder, WorkspaceOrder, resolve_order};
