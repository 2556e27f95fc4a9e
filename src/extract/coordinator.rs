use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crate::codec::delays::encode_delays;
use crate::codec::preview::{PreviewBundle, PreviewFrame, encode_preview};
use crate::codec::sidecar::{write_atomic_if, write_with_sidecar};
use crate::decode::{FrameDecoder, FrameSource, SourceInfo};
use crate::extract::artifact::{downscale, encode_png, read_artifact};
use crate::extract::job::{Checkpoint, JobHandle, JobStatus};
use crate::extract::progress::{NullSink, ProgressSink};
use crate::foundation::core::{ArtifactKind, ArtifactKinds, RgbaFrame};
use crate::foundation::error::{AnimstreamError, AnimstreamResult};
use crate::foundation::naming::ArtifactLayout;

/// Options controlling one extraction job.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ExtractOpts {
    /// Longest side of a preview thumbnail, in pixels.
    pub max_preview_dim: u32,
    /// Frames decoded between pause/cancel checks.
    pub batch_size: usize,
    /// Auto-pause once when progress reaches this many frames of a larger source.
    pub auto_pause_threshold: Option<usize>,
    pub kinds: ArtifactKinds,
    /// Persist the preview bundle blob once every preview of the source exists.
    pub write_preview_bundle: bool,
}

impl Default for ExtractOpts {
    fn default() -> Self {
        Self {
            max_preview_dim: 120,
            batch_size: 100,
            auto_pause_threshold: Some(1000),
            kinds: ArtifactKinds::default(),
            write_preview_bundle: true,
        }
    }
}

impl ExtractOpts {
    pub fn validate(&self) -> AnimstreamResult<()> {
        if self.batch_size == 0 {
            return Err(AnimstreamError::validation("extract batch_size must be >= 1"));
        }
        if self.max_preview_dim == 0 {
            return Err(AnimstreamError::validation(
                "extract max_preview_dim must be >= 1",
            ));
        }
        if self.kinds.is_empty() {
            return Err(AnimstreamError::validation(
                "extract needs at least one artifact kind",
            ));
        }
        Ok(())
    }
}

struct Running {
    job: JobHandle,
    thread: Option<JoinHandle<()>>,
}

/// Drives background extraction, one job at a time.
///
/// Starting a job cancels the previous one and bumps the coordinator epoch. A superseded job
/// notices the new epoch at its next write or batch boundary and stops without touching disk
/// again.
pub struct ExtractionCoordinator {
    decoder: Arc<dyn FrameDecoder>,
    sink: Arc<dyn ProgressSink>,
    active_epoch: Arc<AtomicU64>,
    current: Mutex<Option<Running>>,
}

impl ExtractionCoordinator {
    pub fn new(decoder: Arc<dyn FrameDecoder>) -> Self {
        Self {
            decoder,
            sink: Arc::new(NullSink),
            active_epoch: Arc::new(AtomicU64::new(0)),
            current: Mutex::new(None),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn decoder(&self) -> &Arc<dyn FrameDecoder> {
        &self.decoder
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Epoch of the most recently started job (0 before any start).
    pub fn active_epoch(&self) -> u64 {
        self.active_epoch.load(Ordering::SeqCst)
    }

    /// Start extracting `source` into `work_dir`, cancelling whatever job was running.
    pub fn start(
        &self,
        source: &Path,
        work_dir: &Path,
        opts: ExtractOpts,
    ) -> AnimstreamResult<JobHandle> {
        opts.validate()?;

        let mut current = self.lock();
        if let Some(prev) = current.take() {
            // Not joined: the old worker may still finish an in-flight batch, but its epoch is
            // stale so any write it attempts is dropped.
            prev.job.cancel();
        }

        let epoch = self.active_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let job = JobHandle::new(
            epoch,
            source.to_path_buf(),
            work_dir.to_path_buf(),
            self.active_epoch.clone(),
            self.sink.clone(),
        );

        let worker = Worker {
            job: job.clone(),
            decoder: self.decoder.clone(),
            layout: ArtifactLayout::for_source(work_dir, source),
            opts,
        };
        let thread = std::thread::Builder::new()
            .name(format!("animstream-extract-{epoch}"))
            .spawn(move || worker.run())
            .map_err(|e| AnimstreamError::job_failed(format!("spawn extraction worker: {e}")))?;

        tracing::info!(epoch, source = %source.display(), "extraction job started");
        *current = Some(Running {
            job: job.clone(),
            thread: Some(thread),
        });
        Ok(job)
    }

    /// Handle of the most recently started job, if any.
    pub fn current(&self) -> Option<JobHandle> {
        self.lock().as_ref().map(|r| r.job.clone())
    }

    /// Cancel the current job. The job stays reachable through [`Self::current`].
    pub fn cancel_current(&self) -> Option<JobHandle> {
        let current = self.lock();
        let job = current.as_ref().map(|r| r.job.clone())?;
        job.cancel();
        Some(job)
    }

    /// Cancel the current job and wait for its worker thread to exit.
    pub fn shutdown(&self) {
        let running = self.lock().take();
        if let Some(mut running) = running {
            running.job.cancel();
            if let Some(thread) = running.thread.take()
                && thread.join().is_err()
            {
                tracing::warn!(epoch = running.job.epoch(), "extraction worker panicked");
            }
        }
    }
}

impl Drop for ExtractionCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    job: JobHandle,
    decoder: Arc<dyn FrameDecoder>,
    layout: ArtifactLayout,
    opts: ExtractOpts,
}

/// Outcome of a write attempt from the worker.
enum Written {
    Ok,
    Stale,
}

enum Batch {
    /// `decoded` frames were produced; the rest were already on disk or failed to decode.
    Done { decoded: usize },
    Stale,
}

impl Worker {
    #[tracing::instrument(name = "extract_job", skip_all, fields(epoch = self.job.epoch()))]
    fn run(self) {
        match self.extract() {
            Ok(()) => {
                if self.job.is_current() {
                    self.job.finish(JobStatus::Completed, None);
                } else {
                    self.job.finish(JobStatus::Cancelled, None);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "extraction job failed");
                self.job.finish(JobStatus::Failed, Some(e.to_string()));
            }
        }
        tracing::debug!(status = ?self.job.status(), "extraction worker exiting");
    }

    fn extract(&self) -> AnimstreamResult<()> {
        let mut source = self.decoder.open(self.job.source())?;
        let info = source.info().clone();
        let total = info.frame_count();

        if let Written::Stale = self.persist_delays(&info)? {
            return Ok(());
        }

        let kinds: Vec<ArtifactKind> = self.opts.kinds.iter().collect();
        for &kind in &kinds {
            let dir = self.layout.kind_dir(kind);
            std::fs::create_dir_all(&dir).map_err(|e| AnimstreamError::io(&dir, e))?;
        }

        let mut pending: Vec<ArtifactKind> = Vec::new();
        for &kind in &kinds {
            let present = self.layout.present_indices(kind)?;
            for &index in &present {
                self.normalize_existing(kind, index);
            }
            if (0..total).all(|i| present.contains(&i)) {
                tracing::debug!(%kind, total, "all artifacts already present");
                self.job.record_progress(kind, total, total);
            } else {
                if !present.is_empty() {
                    tracing::debug!(%kind, present = present.len(), total, "resuming partial output");
                }
                pending.push(kind);
            }
        }

        let mut start = 0;
        let mut produced = 0;
        while start < total && !pending.is_empty() {
            if self.job.checkpoint() == Checkpoint::Stop {
                return Ok(());
            }
            let end = (start + self.opts.batch_size).min(total);
            match self.run_batch(source.as_mut(), &pending, start, end)? {
                Batch::Stale => return Ok(()),
                Batch::Done { decoded } => produced += decoded,
            }
            for &kind in &pending {
                self.job.record_progress(kind, end, total);
            }
            if let Some(threshold) = self.opts.auto_pause_threshold {
                self.job.auto_pause(produced, total, threshold);
            }
            start = end;
        }

        if self.job.checkpoint() == Checkpoint::Stop {
            return Ok(());
        }
        if self.opts.write_preview_bundle && self.opts.kinds.preview {
            self.persist_preview_bundle(&info)?;
        }
        Ok(())
    }

    fn run_batch(
        &self,
        source: &mut dyn FrameSource,
        kinds: &[ArtifactKind],
        start: usize,
        end: usize,
    ) -> AnimstreamResult<Batch> {
        let mut skipped = 0usize;
        let mut missing = 0usize;
        let mut decoded = 0usize;
        for index in start..end {
            let needed: Vec<ArtifactKind> = kinds
                .iter()
                .copied()
                .filter(|&k| !self.normalize_existing(k, index))
                .collect();
            if needed.is_empty() {
                skipped += 1;
                continue;
            }

            let frame = match source.decode_frame(index) {
                Ok(frame) => frame,
                Err(e) => {
                    missing += 1;
                    tracing::warn!(index, error = %e, "frame decode failed; skipping");
                    continue;
                }
            };
            for kind in needed {
                if let Written::Stale = self.write_artifact(kind, index, &frame)? {
                    return Ok(Batch::Stale);
                }
            }
            decoded += 1;
        }
        tracing::debug!(start, end, skipped, missing, decoded, "batch done");
        Ok(Batch::Done { decoded })
    }

    /// `true` if an artifact already exists; padded names are renamed to the bare form.
    fn normalize_existing(&self, kind: ArtifactKind, index: usize) -> bool {
        let Some(found) = self.layout.find_artifact(kind, index) else {
            return false;
        };
        let bare = self.layout.artifact_path(kind, index);
        if found != bare
            && let Err(e) = std::fs::rename(&found, &bare)
        {
            tracing::warn!(from = %found.display(), to = %bare.display(), error = %e, "rename of padded artifact failed");
        }
        true
    }

    fn write_artifact(
        &self,
        kind: ArtifactKind,
        index: usize,
        frame: &RgbaFrame,
    ) -> AnimstreamResult<Written> {
        let bytes = match kind {
            ArtifactKind::FullFrame => encode_png(frame)?,
            ArtifactKind::Preview => encode_png(&downscale(frame, self.opts.max_preview_dim)?)?,
        };
        self.write_if_current(&self.layout.artifact_path(kind, index), &bytes)
    }

    /// The epoch is checked again right before the rename, after the temp file is written.
    fn write_if_current(&self, path: &Path, bytes: &[u8]) -> AnimstreamResult<Written> {
        if self.job.is_current() && write_atomic_if(path, bytes, || self.job.is_current())? {
            return Ok(Written::Ok);
        }
        tracing::debug!(path = %path.display(), "discarding write from stale job");
        Ok(Written::Stale)
    }

    fn persist_delays(&self, info: &SourceInfo) -> AnimstreamResult<Written> {
        if !self.job.is_current() {
            return Ok(Written::Stale);
        }
        write_with_sidecar(
            &self.layout.delay_blob(),
            &self.layout.delay_sidecar(),
            &encode_delays(&info.delays_ms)?,
        )?;
        Ok(Written::Ok)
    }

    fn persist_preview_bundle(&self, info: &SourceInfo) -> AnimstreamResult<()> {
        let present = self.layout.present_indices(ArtifactKind::Preview)?;
        let missing = (0..info.frame_count())
            .filter(|i| !present.contains(i))
            .count();
        if missing > 0 {
            tracing::debug!(missing, "preview bundle not written; previews incomplete");
            return Ok(());
        }

        let mut frames = Vec::with_capacity(info.frame_count());
        for (index, &delay_ms) in info.delays_ms.iter().enumerate() {
            let Some(path) = self.layout.find_artifact(ArtifactKind::Preview, index) else {
                return Ok(());
            };
            let preview = match read_artifact(&path) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(index, error = %e, "unreadable preview; bundle not written");
                    return Ok(());
                }
            };
            frames.push(PreviewFrame {
                delay_ms,
                width: preview.width,
                height: preview.height,
                rgba: preview.data,
            });
        }
        let bundle = PreviewBundle {
            width: info.width,
            height: info.height,
            frames,
        };

        if !self.job.is_current() {
            return Ok(());
        }
        write_with_sidecar(
            &self.layout.preview_blob(),
            &self.layout.preview_sidecar(),
            &encode_preview(&bundle)?,
        )?;
        tracing::debug!(frames = bundle.frame_count(), "preview bundle written");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/extract/coordinator.rs"]
mod tests;
