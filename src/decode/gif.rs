use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Delay, ImageDecoder};

use crate::decode::{FrameDecoder, FrameSource, SourceInfo};
use crate::foundation::core::RgbaFrame;
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// GIF decoder backed by the `image` crate.
///
/// Frames come out fully composited onto the logical screen, so every frame has the source's
/// canvas dimensions.
#[derive(Clone, Copy, Debug, Default)]
pub struct GifFrameDecoder;

impl GifFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for GifFrameDecoder {
    fn open(&self, source: &Path) -> AnimstreamResult<Box<dyn FrameSource>> {
        let bytes = std::fs::read(source).map_err(|e| AnimstreamError::io(source, e))?;
        let src = GifSource::scan(Arc::from(bytes))
            .with_context(|| format!("open gif '{}'", source.display()))?;
        Ok(Box::new(src))
    }
}

struct GifSource {
    bytes: Arc<[u8]>,
    info: SourceInfo,
    frames: Option<image::Frames<'static>>,
    next: usize,
}

impl GifSource {
    fn scan(bytes: Arc<[u8]>) -> anyhow::Result<Self> {
        let decoder = GifDecoder::new(Cursor::new(bytes.clone())).context("read gif header")?;
        let (width, height) = decoder.dimensions();

        let mut delays_ms = Vec::new();
        for (i, frame) in decoder.into_frames().enumerate() {
            match frame {
                Ok(frame) => delays_ms.push(delay_to_ms(frame.delay())),
                Err(e) => {
                    // Frames past a broken one are unreachable through this decoder.
                    tracing::warn!(index = i, error = %e, "gif scan stopped at undecodable frame");
                    break;
                }
            }
        }
        if delays_ms.is_empty() {
            anyhow::bail!("gif contains no decodable frames");
        }

        Ok(Self {
            bytes,
            info: SourceInfo {
                width,
                height,
                delays_ms,
            },
            frames: None,
            next: 0,
        })
    }

    fn rewind(&mut self) -> AnimstreamResult<()> {
        let decoder = GifDecoder::new(Cursor::new(self.bytes.clone()))
            .map_err(|e| AnimstreamError::decode(format!("reopen gif: {e}")))?;
        self.frames = Some(decoder.into_frames());
        self.next = 0;
        Ok(())
    }
}

impl FrameSource for GifSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn decode_frame(&mut self, index: usize) -> AnimstreamResult<RgbaFrame> {
        if index >= self.info.frame_count() {
            return Err(AnimstreamError::decode_miss(
                index,
                format!("index out of range (frame count {})", self.info.frame_count()),
            ));
        }
        if self.frames.is_none() || index < self.next {
            self.rewind()?;
        }
        let Some(frames) = self.frames.as_mut() else {
            return Err(AnimstreamError::decode_miss(index, "decoder unavailable"));
        };

        while self.next < index {
            if frames.next().is_none() {
                return Err(AnimstreamError::decode_miss(index, "stream ended early"));
            }
            self.next += 1;
        }

        let frame = frames.next();
        self.next += 1;
        match frame {
            Some(Ok(frame)) => {
                let buf = frame.into_buffer();
                let (width, height) = buf.dimensions();
                RgbaFrame::new(width, height, buf.into_raw())
            }
            Some(Err(e)) => Err(AnimstreamError::decode_miss(index, e.to_string())),
            None => Err(AnimstreamError::decode_miss(index, "stream ended early")),
        }
    }
}

pub(crate) fn delay_to_ms(delay: Delay) -> u32 {
    let (numer, denom) = delay.numer_denom_ms();
    if denom == 0 {
        return 0;
    }
    let (n, d) = (u64::from(numer), u64::from(denom));
    ((n + d / 2) / d).min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
#[path = "../../tests/unit/decode/gif.rs"]
mod tests;
