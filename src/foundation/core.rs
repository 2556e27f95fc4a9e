use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// The two on-disk artifact sequences produced for a source.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Full-resolution frame images.
    FullFrame,
    /// Size-capped preview thumbnails.
    Preview,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::FullFrame, ArtifactKind::Preview];

    /// Directory suffix under the working directory (`_<safeBase>_<suffix>`).
    pub fn dir_suffix(self) -> &'static str {
        match self {
            ArtifactKind::FullFrame => "fullframes",
            ArtifactKind::Preview => "previews",
        }
    }

    /// File name prefix inside the kind directory (`<prefix>.<index>`).
    pub fn file_prefix(self) -> &'static str {
        match self {
            ArtifactKind::FullFrame => "frame",
            ArtifactKind::Preview => "preview",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            ArtifactKind::FullFrame => 0,
            ArtifactKind::Preview => 1,
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_suffix())
    }
}

/// Which artifact kinds a job should produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ArtifactKinds {
    pub full_frame: bool,
    pub preview: bool,
}

impl Default for ArtifactKinds {
    fn default() -> Self {
        Self {
            full_frame: true,
            preview: true,
        }
    }
}

impl ArtifactKinds {
    pub fn contains(self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::FullFrame => self.full_frame,
            ArtifactKind::Preview => self.preview,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = ArtifactKind> {
        ArtifactKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }

    pub fn is_empty(self) -> bool {
        !self.full_frame && !self.preview
    }
}

/// Monotonic `(current, total)` progress for one artifact kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn is_done(self) -> bool {
        self.total > 0 && self.current >= self.total
    }

    /// `true` once frame `index` is covered by the reported progress.
    pub fn covers(self, index: usize) -> bool {
        index < self.current
    }
}

/// Straight-alpha RGBA8 pixels, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RgbaFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> AnimstreamResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(4))
            .ok_or_else(|| AnimstreamError::validation("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(AnimstreamError::validation(format!(
                "frame data size mismatch: got {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

/// Fit `(width, height)` inside a `max_dim` square, preserving aspect ratio.
///
/// Sources already inside the box are returned unchanged; neither side collapses below 1px.
pub fn fit_within(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    if width == 0 || height == 0 || max_dim == 0 {
        return (width.max(1), height.max(1));
    }
    if width <= max_dim && height <= max_dim {
        return (width, height);
    }
    if width >= height {
        let h = (height as f64 / width as f64 * max_dim as f64) as u32;
        (max_dim, h.max(1))
    } else {
        let w = (width as f64 / height as f64 * max_dim as f64) as u32;
        (w.max(1), max_dim)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
