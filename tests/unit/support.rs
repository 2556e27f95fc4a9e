use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, RgbaImage};

use crate::decode::{FrameDecoder, FrameSource, SourceInfo};
use crate::foundation::core::RgbaFrame;
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

pub(crate) fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "animstream_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

/// Encode a small animated GIF. Delays should be multiples of 10ms (GIF stores centiseconds).
pub(crate) fn gif_bytes(width: u32, height: u32, delays_ms: &[u32]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut enc = GifEncoder::new(Cursor::new(&mut buf));
        for (i, &d) in delays_ms.iter().enumerate() {
            let shade = (i * 40 % 256) as u8;
            let img = RgbaImage::from_pixel(width, height, image::Rgba([shade, 255 - shade, 0, 255]));
            enc.encode_frame(Frame::from_parts(
                img,
                0,
                0,
                Delay::from_numer_denom_ms(d, 1),
            ))
            .unwrap();
        }
    }
    buf
}

pub(crate) fn write_gif(path: &Path, width: u32, height: u32, delays_ms: &[u32]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, gif_bytes(width, height, delays_ms)).unwrap();
}

/// Synthetic decoder: solid-colour frames, configurable failures, decode counting.
pub(crate) struct FakeDecoder {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) delays_ms: Vec<u32>,
    pub(crate) failing: BTreeSet<usize>,
    pub(crate) decodes: Arc<AtomicUsize>,
}

impl FakeDecoder {
    pub(crate) fn new(frames: usize, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            delays_ms: vec![100; frames],
            failing: BTreeSet::new(),
            decodes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing(mut self, idx: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(idx);
        self
    }

    pub(crate) fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }
}

struct FakeSource {
    info: SourceInfo,
    failing: BTreeSet<usize>,
    decodes: Arc<AtomicUsize>,
}

impl FrameDecoder for FakeDecoder {
    fn open(&self, _source: &Path) -> AnimstreamResult<Box<dyn FrameSource>> {
        Ok(Box::new(FakeSource {
            info: SourceInfo {
                width: self.width,
                height: self.height,
                delays_ms: self.delays_ms.clone(),
            },
            failing: self.failing.clone(),
            decodes: self.decodes.clone(),
        }))
    }
}

impl FrameSource for FakeSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn decode_frame(&mut self, index: usize) -> AnimstreamResult<RgbaFrame> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&index) {
            return Err(AnimstreamError::decode_miss(index, "synthetic failure"));
        }
        let px = [(index % 256) as u8, 0, 0, 255];
        let data = px
            .iter()
            .copied()
            .cycle()
            .take((self.info.width * self.info.height * 4) as usize)
            .collect();
        RgbaFrame::new(self.info.width, self.info.height, data)
    }
}
