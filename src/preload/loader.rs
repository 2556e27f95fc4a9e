use std::sync::{Arc, PoisonError, RwLock};

use crate::extract::artifact::read_artifact;
use crate::foundation::core::{ArtifactKind, RgbaFrame};
use crate::foundation::error::AnimstreamResult;
use crate::foundation::naming::ArtifactLayout;

/// Loads frame images for a [`PreloadCache`](crate::PreloadCache).
///
/// The cache owns every handle it receives from [`FrameLoader::load`] and gives each one back
/// through [`FrameLoader::release`] exactly once, when it is evicted, replaced, cleared, or arrives
/// after the cache stopped wanting it.
pub trait FrameLoader: Send + Sync + 'static {
    type Handle: Clone + Send + 'static;

    /// `Ok(None)` means the backing artifact is not there yet; the index becomes `Missing` and
    /// is retried by the sweep.
    fn load(&self, index: usize) -> AnimstreamResult<Option<Self::Handle>>;

    fn release(&self, handle: Self::Handle);
}

/// Reads extracted artifacts of one kind from the active source's layout.
#[derive(Debug)]
pub struct DiskFrameLoader {
    kind: ArtifactKind,
    layout: RwLock<Option<ArtifactLayout>>,
}

impl DiskFrameLoader {
    /// A loader with no target; every load reports the frame as not yet available.
    pub fn new(kind: ArtifactKind) -> Self {
        Self {
            kind,
            layout: RwLock::new(None),
        }
    }

    pub fn for_layout(layout: ArtifactLayout, kind: ArtifactKind) -> Self {
        Self {
            kind,
            layout: RwLock::new(Some(layout)),
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Point subsequent loads at another source.
    pub fn retarget(&self, layout: Option<ArtifactLayout>) {
        *self
            .layout
            .write()
            .unwrap_or_else(PoisonError::into_inner) = layout;
    }

    pub fn layout(&self) -> Option<ArtifactLayout> {
        self.layout
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FrameLoader for DiskFrameLoader {
    type Handle = Arc<RgbaFrame>;

    fn load(&self, index: usize) -> AnimstreamResult<Option<Self::Handle>> {
        let Some(layout) = self.layout() else {
            return Ok(None);
        };
        let Some(path) = layout.find_artifact(self.kind, index) else {
            return Ok(None);
        };
        Ok(Some(Arc::new(read_artifact(&path)?)))
    }

    fn release(&self, handle: Self::Handle) {
        drop(handle);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preload/loader.rs"]
mod tests;
