use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::Digest as _;

use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// Outcome of inspecting a blob's integrity sidecar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SidecarStatus {
    Missing,
    Empty,
    /// Present but the recorded digest does not match the blob (only reported when verifying).
    Mismatch,
    Valid,
}

impl SidecarStatus {
    pub fn is_valid(self) -> bool {
        self == SidecarStatus::Valid
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Cheap gate: the sidecar exists and is non-empty. Does not read the blob.
pub fn sidecar_present(sidecar: &Path) -> SidecarStatus {
    match std::fs::metadata(sidecar) {
        Ok(m) if m.is_file() && m.len() > 0 => SidecarStatus::Valid,
        Ok(_) => SidecarStatus::Empty,
        Err(_) => SidecarStatus::Missing,
    }
}

/// Full check: presence gate, then digest comparison against `blob`.
pub fn verify_sidecar(sidecar: &Path, blob: &[u8]) -> SidecarStatus {
    let gate = sidecar_present(sidecar);
    if !gate.is_valid() {
        return gate;
    }
    match std::fs::read_to_string(sidecar) {
        Ok(recorded) if recorded.trim().eq_ignore_ascii_case(&sha256_hex(blob)) => {
            SidecarStatus::Valid
        }
        Ok(_) => SidecarStatus::Mismatch,
        Err(_) => SidecarStatus::Missing,
    }
}

/// Write `bytes` to `blob`, then its digest to `sidecar`.
///
/// The sidecar is written last so a crash between the two leaves the blob untrusted. Both files
/// land via a temp file + rename.
pub fn write_with_sidecar(blob: &Path, sidecar: &Path, bytes: &[u8]) -> AnimstreamResult<()> {
    // Drop a stale sidecar first so the old digest never vouches for a half-written blob.
    match std::fs::remove_file(sidecar) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(AnimstreamError::io(sidecar, e)),
    }
    write_atomic(blob, bytes)?;
    write_atomic(sidecar, sha256_hex(bytes).as_bytes())
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> AnimstreamResult<()> {
    write_atomic_if(path, bytes, || true).map(|_| ())
}

/// Write `bytes` to a private temp file, then rename it over `path` if `commit` still agrees.
///
/// Returns `false` (and removes the temp file) when `commit` declines.
pub(crate) fn write_atomic_if(
    path: &Path,
    bytes: &[u8],
    commit: impl FnOnce() -> bool,
) -> AnimstreamResult<bool> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| AnimstreamError::io(parent, e))?;
    }
    let tmp = temp_path(path);
    std::fs::write(&tmp, bytes).map_err(|e| AnimstreamError::io(&tmp, e))?;
    if !commit() {
        std::fs::remove_file(&tmp).map_err(|e| AnimstreamError::io(&tmp, e))?;
        return Ok(false);
    }
    std::fs::rename(&tmp, path).map_err(|e| AnimstreamError::io(path, e))?;
    Ok(true)
}

/// `<path>.<pid>.<n>.tmp`, unique per write so concurrent writers never share a temp file.
fn temp_path(path: &Path) -> PathBuf {
    static NEXT: AtomicU64 = AtomicU64::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.{n}.tmp", std::process::id()));
    PathBuf::from(name)
}

#[cfg(test)]
#[path = "../../tests/unit/codec/sidecar.rs"]
mod tests;
