use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::foundation::core::ArtifactKind;
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// Base name used when a source path has no usable file stem.
const FALLBACK_BASE: &str = "gif";

/// Filesystem-safe transform of a base name.
///
/// Every character outside `[0-9A-Za-z]` becomes `_` followed by its decimal code point, so two
/// distinct names never map to the same safe name.
pub fn safe_base(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('_');
            out.push_str(&(c as u32).to_string());
        }
    }
    out
}

/// Safe base for a source file: the transform applied to its file stem.
pub fn source_safe_base(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(FALLBACK_BASE);
    safe_base(stem)
}

/// Parse the frame index out of `<prefix>.<digits>`, accepting padded and bare numbering.
pub fn parse_artifact_index(file_name: &str, prefix: &str) -> Option<usize> {
    let rest = file_name.strip_prefix(prefix)?.strip_prefix('.')?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Deterministic on-disk layout for one source inside a working directory.
///
/// ```text
/// <workDir>/_<safeBase>_fullframes/frame.<index>
/// <workDir>/_<safeBase>_previews/preview.<index>
/// <workDir>/_<safeBase>_preview.bin   + _<safeBase>_preview.sha256
/// <workDir>/_<safeBase>_delays.bin    + _<safeBase>_delays.sha256
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactLayout {
    work_dir: PathBuf,
    safe_base: String,
}

impl ArtifactLayout {
    pub fn for_source(work_dir: impl Into<PathBuf>, source: &Path) -> Self {
        Self {
            work_dir: work_dir.into(),
            safe_base: source_safe_base(source),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn safe_base(&self) -> &str {
        &self.safe_base
    }

    pub fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.work_dir
            .join(format!("_{}_{}", self.safe_base, kind.dir_suffix()))
    }

    /// Canonical (bare index) artifact path; this is what the coordinator writes.
    pub fn artifact_path(&self, kind: ArtifactKind, index: usize) -> PathBuf {
        self.kind_dir(kind)
            .join(format!("{}.{index}", kind.file_prefix()))
    }

    /// Candidate paths in lookup order: bare first, then the zero-padded conventions.
    pub fn artifact_candidates(&self, kind: ArtifactKind, index: usize) -> Vec<PathBuf> {
        let dir = self.kind_dir(kind);
        let prefix = kind.file_prefix();
        let names = [
            format!("{prefix}.{index}"),
            format!("{prefix}.{index:04}"),
            format!("{prefix}.{index:03}"),
        ];
        let mut seen = BTreeSet::new();
        names
            .into_iter()
            .filter(|n| seen.insert(n.clone()))
            .map(|n| dir.join(n))
            .collect()
    }

    /// First candidate that exists as a non-empty file.
    pub fn find_artifact(&self, kind: ArtifactKind, index: usize) -> Option<PathBuf> {
        self.artifact_candidates(kind, index)
            .into_iter()
            .find(|p| is_non_empty_file(p))
    }

    pub fn has_artifact(&self, kind: ArtifactKind, index: usize) -> bool {
        self.find_artifact(kind, index).is_some()
    }

    /// Indices with at least one artifact on disk, read with a single directory listing.
    pub fn present_indices(&self, kind: ArtifactKind) -> AnimstreamResult<BTreeSet<usize>> {
        let dir = self.kind_dir(kind);
        let mut out = BTreeSet::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(AnimstreamError::io(&dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| AnimstreamError::io(&dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(idx) = parse_artifact_index(name, kind.file_prefix())
                && entry.metadata().map(|m| m.len() > 0).unwrap_or(false)
            {
                out.insert(idx);
            }
        }
        Ok(out)
    }

    pub fn preview_blob(&self) -> PathBuf {
        self.work_dir.join(format!("_{}_preview.bin", self.safe_base))
    }

    pub fn preview_sidecar(&self) -> PathBuf {
        self.work_dir
            .join(format!("_{}_preview.sha256", self.safe_base))
    }

    pub fn delay_blob(&self) -> PathBuf {
        self.work_dir.join(format!("_{}_delays.bin", self.safe_base))
    }

    pub fn delay_sidecar(&self) -> PathBuf {
        self.work_dir
            .join(format!("_{}_delays.sha256", self.safe_base))
    }
}

pub(crate) fn is_non_empty_file(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/naming.rs"]
mod tests;
