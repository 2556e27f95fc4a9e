use std::path::{Path, PathBuf};

use crate::foundation::core::ArtifactKind;
use crate::foundation::error::AnimstreamResult;
use crate::foundation::naming::ArtifactLayout;

/// Session-unique frame-set identifier.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameSetId(pub u64);

impl std::fmt::Display for FrameSetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// One decoded version of the animation: the original or a derived edit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSet {
    pub id: FrameSetId,
    pub display_name: String,
    pub source_path: PathBuf,
    pub frame_count: usize,
    pub total_duration_ms: u64,
    pub file_size_bytes: u64,
    pub delays: Vec<u32>,
    /// Advisory only; it grants no ownership or mutability.
    pub is_original: bool,
}

impl FrameSet {
    pub fn new(
        id: FrameSetId,
        source_path: impl Into<PathBuf>,
        delays: Vec<u32>,
        file_size_bytes: u64,
        is_original: bool,
    ) -> Self {
        let source_path = source_path.into();
        let display_name = display_name_of(&source_path);
        Self {
            id,
            display_name,
            frame_count: delays.len(),
            total_duration_ms: total_ms(&delays),
            source_path,
            file_size_bytes,
            delays,
            is_original,
        }
    }

    /// File name used to persist workspace order.
    pub fn file_name(&self) -> Option<&str> {
        self.source_path.file_name().and_then(|n| n.to_str())
    }

    /// Path and metadata refresh after the source was re-materialized.
    pub fn refresh(&mut self, source_path: impl Into<PathBuf>, delays: Vec<u32>, file_size_bytes: u64) {
        self.source_path = source_path.into();
        self.display_name = display_name_of(&self.source_path);
        self.frame_count = delays.len();
        self.total_duration_ms = total_ms(&delays);
        self.delays = delays;
        self.file_size_bytes = file_size_bytes;
    }

    pub fn layout(&self, work_dir: &Path) -> ArtifactLayout {
        ArtifactLayout::for_source(work_dir, &self.source_path)
    }

    /// Fresh slot table with every frame a placeholder.
    pub fn slots(&self) -> SlotTable {
        SlotTable {
            slots: self
                .delays
                .iter()
                .enumerate()
                .map(|(index, &delay_ms)| FrameSlot {
                    index,
                    delay_ms,
                    state: Materialization::Placeholder,
                })
                .collect(),
        }
    }
}

fn display_name_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn total_ms(delays: &[u32]) -> u64 {
    delays.iter().map(|&d| u64::from(d)).sum()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Materialization {
    /// Timing known, no decoded image on disk yet.
    Placeholder,
    Materialized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSlot {
    pub index: usize,
    pub delay_ms: u32,
    pub state: Materialization,
}

/// Per-frame materialization state of the active frame set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotTable {
    slots: Vec<FrameSlot>,
}

impl SlotTable {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameSlot> {
        self.slots.iter()
    }

    /// Returns `true` if the slot changed state.
    pub fn mark_materialized(&mut self, index: usize) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.state == Materialization::Placeholder => {
                slot.state = Materialization::Materialized;
                true
            }
            _ => false,
        }
    }

    /// Promote every placeholder whose artifact is now on disk. Returns the number promoted.
    pub fn refresh_from_disk(
        &mut self,
        layout: &ArtifactLayout,
        kind: ArtifactKind,
    ) -> AnimstreamResult<usize> {
        let present = layout.present_indices(kind)?;
        Ok(present
            .into_iter()
            .filter(|&i| self.mark_materialized(i))
            .count())
    }

    pub fn materialized_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == Materialization::Materialized)
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.materialized_count() == self.slots.len()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/workspace/frameset.rs"]
mod tests;
