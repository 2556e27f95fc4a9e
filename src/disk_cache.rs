//! Fast path for previously seen sources.
//!
//! Each artifact blob is trusted only when its sidecar exists and is non-empty; with `verify` the
//! sidecar digest must also match the blob. An untrusted or undecodable artifact is reported as
//! absent and the caller falls back to extraction for it.

use std::path::Path;
use std::thread::JoinHandle;

use crate::codec::delays::{DelayTableFormat, decode_delays_any, encode_delays};
use crate::codec::preview::{PreviewBundle, decode_preview};
use crate::codec::sidecar::{SidecarStatus, sidecar_present, verify_sidecar, write_with_sidecar};
use crate::foundation::error::{AnimstreamError, AnimstreamResult};
use crate::foundation::naming::ArtifactLayout;

/// Result of [`try_load`]. Absent fields must be produced by extraction.
#[derive(Debug, Default)]
pub struct DiskCacheLoad {
    pub preview: Option<PreviewBundle>,
    pub delays: Option<Vec<u32>>,
    /// Present when a legacy delay table is being rewritten in the background.
    pub migration: Option<MigrationHandle>,
    /// The delay table was found in the legacy u16 layout.
    pub legacy_delays: bool,
}

impl DiskCacheLoad {
    pub fn is_cold(&self) -> bool {
        self.preview.is_none() && self.delays.is_none()
    }

    pub fn is_complete(&self) -> bool {
        self.preview.is_some() && self.delays.is_some()
    }
}

/// Background rewrite of a legacy delay table. Dropping it detaches the thread.
#[derive(Debug)]
pub struct MigrationHandle {
    thread: JoinHandle<AnimstreamResult<()>>,
}

impl MigrationHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn wait(self) -> AnimstreamResult<()> {
        self.thread
            .join()
            .map_err(|_| AnimstreamError::job_failed("delay table migration panicked"))?
    }
}

/// Load whatever trusted cache artifacts exist for `source` in `work_dir`.
///
/// A legacy delay table is rewritten in the current layout on a background thread.
pub fn try_load(work_dir: &Path, source: &Path, verify: bool) -> DiskCacheLoad {
    load(work_dir, source, verify, true)
}

/// Like [`try_load`], but never starts a migration; `legacy_delays` reports whether one is due.
///
/// For callers that may rewrite the delay table themselves, e.g. by starting an extraction.
pub fn try_load_deferred(work_dir: &Path, source: &Path, verify: bool) -> DiskCacheLoad {
    load(work_dir, source, verify, false)
}

/// Rewrite `delays` for `source` in the current layout on a background thread.
pub fn migrate_legacy_delays(
    work_dir: &Path,
    source: &Path,
    delays: &[u32],
) -> Option<MigrationHandle> {
    spawn_migration(&ArtifactLayout::for_source(work_dir, source), delays)
}

#[tracing::instrument(skip_all, fields(source = %source.display(), verify = verify))]
fn load(work_dir: &Path, source: &Path, verify: bool, migrate: bool) -> DiskCacheLoad {
    let layout = ArtifactLayout::for_source(work_dir, source);
    let mut out = DiskCacheLoad::default();

    if let Some(bytes) = read_trusted(&layout.delay_blob(), &layout.delay_sidecar(), verify) {
        match decode_delays_any(&bytes) {
            Ok((delays, DelayTableFormat::Current)) => out.delays = Some(delays),
            Ok((delays, DelayTableFormat::LegacyU16)) => {
                out.legacy_delays = true;
                if migrate {
                    out.migration = spawn_migration(&layout, &delays);
                }
                out.delays = Some(delays);
            }
            Err(e) => tracing::warn!(error = %e, "delay table unreadable; ignoring"),
        }
    }

    if let Some(bytes) = read_trusted(&layout.preview_blob(), &layout.preview_sidecar(), verify) {
        match decode_preview(&bytes) {
            Ok(bundle) => match &out.delays {
                Some(d) if d.len() != bundle.frame_count() => tracing::warn!(
                    delays = d.len(),
                    previews = bundle.frame_count(),
                    "preview bundle disagrees with delay table; ignoring"
                ),
                _ => out.preview = Some(bundle),
            },
            Err(e) => tracing::warn!(error = %e, "preview bundle unreadable; ignoring"),
        }
    }

    tracing::debug!(
        delays = out.delays.is_some(),
        preview = out.preview.is_some(),
        "disk cache lookup"
    );
    out
}

/// Read `blob` if its sidecar vouches for it.
fn read_trusted(blob: &Path, sidecar: &Path, verify: bool) -> Option<Vec<u8>> {
    let gate = sidecar_present(sidecar);
    if !gate.is_valid() {
        let reason = AnimstreamError::cache_invalid(format!(
            "{}: sidecar {gate:?}",
            sidecar.display()
        ));
        tracing::debug!(%reason, "cold cache");
        return None;
    }
    let bytes = match std::fs::read(blob) {
        Ok(b) => b,
        Err(e) => {
            tracing::debug!(blob = %blob.display(), error = %e, "cache blob unreadable");
            return None;
        }
    };
    if verify {
        let status = verify_sidecar(sidecar, &bytes);
        if !status.is_valid() {
            tracing::warn!(blob = %blob.display(), ?status, "cache digest check failed");
            return None;
        }
    }
    Some(bytes)
}

fn spawn_migration(layout: &ArtifactLayout, delays: &[u32]) -> Option<MigrationHandle> {
    let blob = layout.delay_blob();
    let sidecar = layout.delay_sidecar();
    let bytes = match encode_delays(delays) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "legacy delay table not migrated");
            return None;
        }
    };
    let spawned = std::thread::Builder::new()
        .name("animstream-migrate".to_owned())
        .spawn(move || {
            let res = write_with_sidecar(&blob, &sidecar, &bytes);
            match &res {
                Ok(()) => tracing::info!(blob = %blob.display(), "legacy delay table migrated"),
                Err(e) => tracing::warn!(error = %e, "legacy delay table migration failed"),
            }
            res
        });
    match spawned {
        Ok(thread) => Some(MigrationHandle { thread }),
        Err(e) => {
            tracing::warn!(error = %e, "could not start delay table migration");
            None
        }
    }
}

/// Trust state of one cache artifact, for reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArtifactStatus {
    pub blob_bytes: Option<u64>,
    pub sidecar: SidecarStatus,
}

impl ArtifactStatus {
    pub fn usable(self) -> bool {
        self.blob_bytes.is_some() && self.sidecar.is_valid()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheStatus {
    pub delays: ArtifactStatus,
    pub preview: ArtifactStatus,
}

/// Report the trust state of both artifacts without decoding them.
pub fn inspect(work_dir: &Path, source: &Path, verify: bool) -> AnimstreamResult<CacheStatus> {
    let layout = ArtifactLayout::for_source(work_dir, source);
    Ok(CacheStatus {
        delays: artifact_status(&layout.delay_blob(), &layout.delay_sidecar(), verify)?,
        preview: artifact_status(&layout.preview_blob(), &layout.preview_sidecar(), verify)?,
    })
}

fn artifact_status(blob: &Path, sidecar: &Path, verify: bool) -> AnimstreamResult<ArtifactStatus> {
    let blob_bytes = match std::fs::metadata(blob) {
        Ok(m) => Some(m.len()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(AnimstreamError::io(blob, e)),
    };
    let sidecar = if verify && blob_bytes.is_some() {
        let bytes = std::fs::read(blob).map_err(|e| AnimstreamError::io(blob, e))?;
        verify_sidecar(sidecar, &bytes)
    } else {
        sidecar_present(sidecar)
    };
    Ok(ArtifactStatus {
        blob_bytes,
        sidecar,
    })
}

#[cfg(test)]
#[path = "../tests/unit/disk_cache.rs"]
mod tests;
