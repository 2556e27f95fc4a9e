use crate::codec::{ByteReader, len_u32, put_u32};
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// One thumbnail in a [`PreviewBundle`].
///
/// `rgba` is carried verbatim; the codec does not require it to be `width·height·4` bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewFrame {
    pub delay_ms: u32,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// All preview thumbnails of one source, in frame-index order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreviewBundle {
    /// Source canvas width.
    pub width: u32,
    /// Source canvas height.
    pub height: u32,
    pub frames: Vec<PreviewFrame>,
}

impl PreviewBundle {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn delays(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.delay_ms).collect()
    }
}

/// Encode a preview bundle.
///
/// Header `u32 width, u32 height, u32 frameCount`, then per frame
/// `u32 delayMs, u32 frameWidth, u32 frameHeight, u32 byteLength` followed by the raw bytes.
pub fn encode_preview(bundle: &PreviewBundle) -> AnimstreamResult<Vec<u8>> {
    let count = len_u32(bundle.frames.len(), "preview bundle")?;
    let payload: usize = bundle.frames.iter().map(|f| 16 + f.rgba.len()).sum();
    let mut out = Vec::with_capacity(12 + payload);
    put_u32(&mut out, bundle.width);
    put_u32(&mut out, bundle.height);
    put_u32(&mut out, count);
    for f in &bundle.frames {
        put_u32(&mut out, f.delay_ms);
        put_u32(&mut out, f.width);
        put_u32(&mut out, f.height);
        put_u32(&mut out, len_u32(f.rgba.len(), "preview frame")?);
        out.extend_from_slice(&f.rgba);
    }
    Ok(out)
}

/// Decode a preview bundle produced by [`encode_preview`].
pub fn decode_preview(bytes: &[u8]) -> AnimstreamResult<PreviewBundle> {
    let mut r = ByteReader::new(bytes, "preview bundle");
    let width = r.read_u32()?;
    let height = r.read_u32()?;
    let count = r.read_u32()? as usize;

    // Every frame needs at least its 16-byte header; reject absurd counts before allocating.
    if count.saturating_mul(16) > r.remaining() {
        return Err(AnimstreamError::corrupt_cache(format!(
            "preview bundle: {count} frames declared but only {} bytes remain",
            r.remaining()
        )));
    }

    let mut frames = Vec::with_capacity(count);
    for _ in 0..count {
        let delay_ms = r.read_u32()?;
        let fw = r.read_u32()?;
        let fh = r.read_u32()?;
        let len = r.read_u32()? as usize;
        let rgba = r.take(len)?.to_vec();
        frames.push(PreviewFrame {
            delay_ms,
            width: fw,
            height: fh,
            rgba,
        });
    }
    r.finish()?;

    Ok(PreviewBundle {
        width,
        height,
        frames,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/codec/preview.rs"]
mod tests;
