//! Decode boundary.
//!
//! Pixel decoding is delegated to an implementation of [`FrameDecoder`]. The crate ships
//! [`GifFrameDecoder`] on top of the `image` crate; tests and embedders can plug in their own.

mod gif;

use std::path::Path;

use crate::foundation::core::RgbaFrame;
use crate::foundation::error::AnimstreamResult;

pub use gif::GifFrameDecoder;

/// Static facts about an animated source, known before any frame is decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// One entry per frame, in milliseconds.
    pub delays_ms: Vec<u32>,
}

impl SourceInfo {
    pub fn frame_count(&self) -> usize {
        self.delays_ms.len()
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.delays_ms.iter().map(|&d| u64::from(d)).sum()
    }
}

/// Opens animated sources for frame-by-frame decoding.
///
/// Shared across threads; each extraction job opens its own [`FrameSource`] on its worker thread.
pub trait FrameDecoder: Send + Sync {
    fn open(&self, source: &Path) -> AnimstreamResult<Box<dyn FrameSource>>;

    /// Read [`SourceInfo`] without keeping the source open.
    fn probe(&self, source: &Path) -> AnimstreamResult<SourceInfo> {
        Ok(self.open(source)?.info().clone())
    }
}

/// An opened source. Decoding is cheapest in ascending index order.
pub trait FrameSource {
    fn info(&self) -> &SourceInfo;

    /// Decode one fully-composited frame.
    ///
    /// A failure here is a per-frame [`DecodeMiss`](crate::AnimstreamError::DecodeMiss); callers
    /// skip the frame and continue.
    fn decode_frame(&mut self, index: usize) -> AnimstreamResult<RgbaFrame>;
}
