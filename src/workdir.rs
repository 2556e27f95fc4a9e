use std::path::{Path, PathBuf};

use crate::foundation::core::ArtifactKind;
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// Create (or reuse) the per-process working directory under `root`.
///
/// `root` defaults to the system temp directory. An existing directory is kept as-is so a restarted
/// session with the same pid still finds its cache blobs.
pub fn init_work_dir(root: Option<&Path>) -> AnimstreamResult<PathBuf> {
    let root = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
    let dir = root.join(format!("animstream-{}", std::process::id()));
    std::fs::create_dir_all(&dir).map_err(|e| AnimstreamError::io(&dir, e))?;
    tracing::debug!(dir = %dir.display(), "work dir ready");
    Ok(dir)
}

/// What [`cleanup_work_dir`] removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub artifact_dirs: usize,
    pub temp_files: usize,
}

/// Remove extracted frame directories and `_temp*` files, keeping the cache blobs.
pub fn cleanup_work_dir(dir: &Path) -> AnimstreamResult<CleanupReport> {
    let mut report = CleanupReport::default();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
        Err(e) => return Err(AnimstreamError::io(dir, e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| AnimstreamError::io(dir, e))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let file_type = entry.file_type().map_err(|e| AnimstreamError::io(&path, e))?;

        if file_type.is_dir() && is_artifact_dir(name) {
            std::fs::remove_dir_all(&path).map_err(|e| AnimstreamError::io(&path, e))?;
            report.artifact_dirs += 1;
        } else if file_type.is_file() && (name.starts_with("_temp") || name.ends_with(".tmp")) {
            // A vanished temp file is fine.
            if std::fs::remove_file(&path).is_ok() {
                report.temp_files += 1;
            }
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        artifact_dirs = report.artifact_dirs,
        temp_files = report.temp_files,
        "work dir cleaned"
    );
    Ok(report)
}

fn is_artifact_dir(name: &str) -> bool {
    name.starts_with('_')
        && ArtifactKind::ALL
            .iter()
            .any(|k| name.ends_with(&format!("_{}", k.dir_suffix())))
}

#[cfg(test)]
#[path = "../tests/unit/workdir.rs"]
mod tests;
