use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::codec::preview::PreviewBundle;
use crate::config::PipelineConfig;
use crate::disk_cache::{self, MigrationHandle};
use crate::extract::{ExtractOpts, ExtractionCoordinator, JobHandle};
use crate::foundation::core::ArtifactKind;
use crate::foundation::error::{AnimstreamError, AnimstreamResult};
use crate::foundation::naming::ArtifactLayout;
use crate::preload::{DiskFrameLoader, PreloadCache, RetrySweeper};
use crate::workspace::delay_repo::DelayRepository;
use crate::workspace::frameset::{FrameSet, FrameSetId, SlotTable};
use crate::workspace::order::{WorkspaceOrder, list_workspace_files, resolve_order};

const SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Outcome of [`VersionManager::select`].
#[derive(Debug)]
pub struct Selection {
    pub id: FrameSetId,
    /// `None` when the disk cache and the extracted artifacts already cover the frame set.
    pub job: Option<JobHandle>,
    /// Thumbnails from the disk cache, available before any extraction.
    pub preview: Option<PreviewBundle>,
    pub delays: Arc<[u32]>,
    pub migration: Option<MigrationHandle>,
}

impl Selection {
    pub fn from_disk_cache(&self) -> bool {
        self.job.is_none()
    }
}

/// Ordered frame sets of a session and the one that is active.
///
/// Selecting a frame set retargets the whole pipeline: the running extraction is cancelled, the
/// full-frame preload cache is emptied and pointed at the new source, and a new job starts unless
/// the disk cache already has everything.
pub struct VersionManager {
    work_dir: PathBuf,
    frame_sets: Vec<FrameSet>,
    active: Option<FrameSetId>,
    next_id: u64,
    extract: ExtractOpts,
    verify: bool,
    delays: Arc<DelayRepository>,
    coordinator: ExtractionCoordinator,
    _sweeper: RetrySweeper,
    cache: PreloadCache<DiskFrameLoader>,
}

impl VersionManager {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        coordinator: ExtractionCoordinator,
        config: &PipelineConfig,
    ) -> AnimstreamResult<Self> {
        config.validate()?;
        let cache = PreloadCache::new(
            DiskFrameLoader::new(ArtifactKind::FullFrame),
            config.preload.clone(),
        )?;
        let sweeper = RetrySweeper::spawn(&cache, SWEEP_INTERVAL)?;
        Ok(Self {
            work_dir: work_dir.into(),
            frame_sets: Vec::new(),
            active: None,
            next_id: 1,
            extract: config.extract.clone(),
            verify: config.verify_disk_cache,
            delays: Arc::new(DelayRepository::new()),
            coordinator,
            _sweeper: sweeper,
            cache,
        })
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn frame_sets(&self) -> &[FrameSet] {
        &self.frame_sets
    }

    pub fn get(&self, id: FrameSetId) -> Option<&FrameSet> {
        self.frame_sets.iter().find(|s| s.id == id)
    }

    pub fn active(&self) -> Option<&FrameSet> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn active_id(&self) -> Option<FrameSetId> {
        self.active
    }

    pub fn original(&self) -> Option<&FrameSet> {
        self.frame_sets.iter().find(|s| s.is_original)
    }

    pub fn coordinator(&self) -> &ExtractionCoordinator {
        &self.coordinator
    }

    pub fn cache(&self) -> &PreloadCache<DiskFrameLoader> {
        &self.cache
    }

    pub fn delay_repository(&self) -> &Arc<DelayRepository> {
        &self.delays
    }

    /// Slot table of the active frame set with whatever full frames are on disk right now.
    pub fn active_slots(&self) -> AnimstreamResult<Option<SlotTable>> {
        let Some(set) = self.active() else {
            return Ok(None);
        };
        let mut slots = set.slots();
        slots.refresh_from_disk(&set.layout(&self.work_dir), ArtifactKind::FullFrame)?;
        Ok(Some(slots))
    }

    /// Probe `path` and add it as a new frame set. The active selection does not change.
    pub fn open_source(
        &mut self,
        path: impl Into<PathBuf>,
        is_original: bool,
    ) -> AnimstreamResult<FrameSetId> {
        let path = path.into();
        self.check_original(is_original)?;
        let size = std::fs::metadata(&path)
            .map_err(|e| AnimstreamError::io(&path, e))?
            .len();
        let delays = self.delays.resolve(
            &path,
            &self.work_dir,
            self.coordinator.decoder().as_ref(),
            self.verify,
        )?;
        let id = self.allocate_id();
        self.frame_sets
            .push(FrameSet::new(id, path, delays.to_vec(), size, is_original));
        tracing::debug!(%id, "frame set opened");
        Ok(id)
    }

    /// Add a derived frame set without changing the active selection.
    ///
    /// The set receives a fresh session id, which is returned.
    pub fn append(&mut self, mut set: FrameSet) -> AnimstreamResult<FrameSetId> {
        self.check_original(set.is_original)?;
        set.id = self.allocate_id();
        self.delays
            .insert(set.source_path.clone(), set.delays.clone());
        let id = set.id;
        self.frame_sets.push(set);
        Ok(id)
    }

    fn check_original(&self, is_original: bool) -> AnimstreamResult<()> {
        if is_original && let Some(existing) = self.original() {
            return Err(AnimstreamError::validation(format!(
                "workspace already has an original frame set ({})",
                existing.id
            )));
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> FrameSetId {
        let id = FrameSetId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Make `id` the active frame set and retarget the pipeline at it.
    #[tracing::instrument(skip_all, fields(id = %id))]
    pub fn select(&mut self, id: FrameSetId) -> AnimstreamResult<Selection> {
        let set = self
            .get(id)
            .cloned()
            .ok_or_else(|| AnimstreamError::validation(format!("unknown frame set {id}")))?;

        if let Some(prev) = self.coordinator.cancel_current() {
            tracing::debug!(epoch = prev.epoch(), "previous extraction cancelled");
        }
        self.cache.clear();
        let layout = set.layout(&self.work_dir);
        self.cache.loader().retarget(Some(layout.clone()));

        let disk = disk_cache::try_load_deferred(&self.work_dir, &set.source_path, self.verify);
        let delays = match disk.delays {
            Some(d) => self.delays.insert(set.source_path.clone(), d),
            None => self
                .delays
                .get(&set.source_path)
                .unwrap_or_else(|| set.delays.clone().into()),
        };

        let mut migration = None;
        let job = if disk.preview.is_some()
            && self.artifacts_complete(&layout, delays.len())?
        {
            tracing::info!("frame set served from disk cache");
            if disk.legacy_delays {
                migration =
                    disk_cache::migrate_legacy_delays(&self.work_dir, &set.source_path, &delays);
            }
            None
        } else {
            // The job rewrites the delay table in the current layout.
            Some(
                self.coordinator
                    .start(&set.source_path, &self.work_dir, self.extract.clone())?,
            )
        };

        self.active = Some(id);
        self.cache.prefetch_from(0);
        Ok(Selection {
            id,
            job,
            preview: disk.preview,
            delays,
            migration,
        })
    }

    fn artifacts_complete(&self, layout: &ArtifactLayout, total: usize) -> AnimstreamResult<bool> {
        for kind in self.extract.kinds.iter() {
            let present = layout.present_indices(kind)?;
            if !(0..total).all(|i| present.contains(&i)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Write the current order and original designation into `workspace`.
    pub fn persist_order(&self, workspace: &Path) -> AnimstreamResult<()> {
        let order = WorkspaceOrder {
            ordered_names: self
                .frame_sets
                .iter()
                .filter_map(|s| s.file_name().map(str::to_owned))
                .collect(),
            original_name: self
                .original()
                .and_then(|s| s.file_name())
                .map(str::to_owned),
        };
        order.persist(workspace)?;
        tracing::debug!(count = order.ordered_names.len(), "workspace order saved");
        Ok(())
    }

    /// Replace the session with the files of `workspace`, ordered by its saved order.
    ///
    /// An unreadable order file falls back to alphabetical order. Files that fail to probe are
    /// skipped; if the original was one of them, the first restored set becomes the original.
    /// Nothing is selected afterwards.
    pub fn restore_order(&mut self, workspace: &Path) -> AnimstreamResult<Vec<FrameSetId>> {
        self.coordinator.cancel_current();
        self.cache.clear();
        self.delays.clear();
        self.cache.loader().retarget(None);
        self.frame_sets.clear();
        self.active = None;

        let files = list_workspace_files(workspace)?;
        let order = match WorkspaceOrder::load(workspace) {
            Ok(order) => order,
            Err(e @ AnimstreamError::ConfigParse(_)) => {
                tracing::warn!(error = %e, "workspace order unreadable; using alphabetical order");
                None
            }
            Err(e) => return Err(e),
        };
        let resolved = resolve_order(order.as_ref(), &files);

        let mut ids = Vec::with_capacity(resolved.names.len());
        for (i, name) in resolved.names.iter().enumerate() {
            let is_original = resolved.original == Some(i);
            match self.open_source(workspace.join(name), is_original) {
                Ok(id) => ids.push(id),
                Err(e) => tracing::warn!(%name, error = %e, "skipping unreadable workspace file"),
            }
        }
        if self.original().is_none()
            && let Some(first) = self.frame_sets.first_mut()
        {
            tracing::debug!(name = %first.display_name, "original unreadable; using first restored set");
            first.is_original = true;
        }
        tracing::info!(restored = ids.len(), files = files.len(), "workspace restored");
        Ok(ids)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/workspace/manager.rs"]
mod tests;
