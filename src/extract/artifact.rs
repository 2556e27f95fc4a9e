use std::io::Cursor;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageBuffer, ImageEncoder, Rgba};

use crate::foundation::core::{RgbaFrame, fit_within};
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// Encode a frame as PNG, the on-disk artifact format.
pub fn encode_png(frame: &RgbaFrame) -> AnimstreamResult<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(Cursor::new(&mut out))
        .write_image(
            &frame.data,
            frame.width,
            frame.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|e| AnimstreamError::decode(format!("png encode failed: {e}")))?;
    Ok(out)
}

/// Decode an artifact file. The format is sniffed from content since artifact names carry no
/// extension.
pub fn read_artifact(path: &Path) -> AnimstreamResult<RgbaFrame> {
    let bytes = std::fs::read(path).map_err(|e| AnimstreamError::io(path, e))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| AnimstreamError::decode(format!("decode '{}': {e}", path.display())))?
        .into_rgba8();
    let (width, height) = img.dimensions();
    RgbaFrame::new(width, height, img.into_raw())
}

/// Downscale to fit a `max_dim` box. Frames already inside the box are cloned unchanged.
pub fn downscale(frame: &RgbaFrame, max_dim: u32) -> AnimstreamResult<RgbaFrame> {
    let (w, h) = fit_within(frame.width, frame.height, max_dim);
    if (w, h) == (frame.width, frame.height) {
        return Ok(frame.clone());
    }
    let view = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(frame.width, frame.height, &frame.data)
        .ok_or_else(|| AnimstreamError::validation("frame buffer smaller than its dimensions"))?;
    let out = image::imageops::resize(&view, w, h, FilterType::Triangle);
    RgbaFrame::new(w, h, out.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/extract/artifact.rs"]
mod tests;
