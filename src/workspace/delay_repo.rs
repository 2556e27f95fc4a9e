use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::decode::FrameDecoder;
use crate::disk_cache;
use crate::foundation::error::AnimstreamResult;

/// Session-scoped delay tables keyed by source path.
///
/// Shared by reference (usually behind an `Arc`) between the components that need delay lookups;
/// two sessions never see each other's entries.
#[derive(Debug, Default)]
pub struct DelayRepository {
    tables: RwLock<HashMap<PathBuf, Arc<[u32]>>>,
}

impl DelayRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source: &Path) -> Option<Arc<[u32]>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
    }

    pub fn insert(&self, source: impl Into<PathBuf>, delays: impl Into<Arc<[u32]>>) -> Arc<[u32]> {
        let delays = delays.into();
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(source.into(), Arc::clone(&delays));
        delays
    }

    pub fn remove(&self, source: &Path) -> Option<Arc<[u32]>> {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(source)
    }

    pub fn clear(&self) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delay table for `source`: memory first, then the disk cache, then a decoder probe.
    pub fn resolve(
        &self,
        source: &Path,
        work_dir: &Path,
        decoder: &dyn FrameDecoder,
        verify: bool,
    ) -> AnimstreamResult<Arc<[u32]>> {
        if let Some(hit) = self.get(source) {
            return Ok(hit);
        }
        if let Some(delays) = disk_cache::try_load_deferred(work_dir, source, verify).delays {
            tracing::debug!(source = %source.display(), "delays from disk cache");
            return Ok(self.insert(source, delays));
        }
        let info = decoder.probe(source)?;
        Ok(self.insert(source, info.delays_ms))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/workspace/delay_repo.rs"]
mod tests;
