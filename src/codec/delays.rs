use crate::codec::{ByteReader, len_u32, put_u32};
use crate::foundation::error::{AnimstreamError, AnimstreamResult};

/// On-disk delay table layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayTableFormat {
    /// `u32 count` + `count × u32 delayMs`.
    Current,
    /// `u32 count` + `count × u16 delayMs`, written by older builds.
    LegacyU16,
}

/// Encode a delay table: `u32 count` followed by `count × u32 delayMs`.
pub fn encode_delays(delays: &[u32]) -> AnimstreamResult<Vec<u8>> {
    let count = len_u32(delays.len(), "delay table")?;
    let mut out = Vec::with_capacity(4 + delays.len() * 4);
    put_u32(&mut out, count);
    for &d in delays {
        put_u32(&mut out, d);
    }
    Ok(out)
}

/// Decode a current-format delay table.
pub fn decode_delays(bytes: &[u8]) -> AnimstreamResult<Vec<u32>> {
    let mut r = ByteReader::new(bytes, "delay table");
    let count = r.read_u32()? as usize;
    let body = count
        .checked_mul(4)
        .ok_or_else(|| AnimstreamError::corrupt_cache("delay table: count overflows"))?;
    let raw = r.take(body)?;
    r.finish()?;
    Ok(raw
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Decode either layout, reporting which one was found.
///
/// The body length disambiguates: `4·count` bytes is current, `2·count` bytes is legacy. An empty
/// table is always reported as current.
pub fn decode_delays_any(bytes: &[u8]) -> AnimstreamResult<(Vec<u32>, DelayTableFormat)> {
    let mut r = ByteReader::new(bytes, "delay table");
    let count = r.read_u32()? as usize;
    let remaining = r.remaining();

    if count.checked_mul(4) == Some(remaining) {
        return Ok((decode_delays(bytes)?, DelayTableFormat::Current));
    }
    if count.checked_mul(2) == Some(remaining) {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(u32::from(r.read_u16()?));
        }
        r.finish()?;
        return Ok((out, DelayTableFormat::LegacyU16));
    }

    Err(AnimstreamError::corrupt_cache(format!(
        "delay table: {count} entries declared but {remaining} body bytes present"
    )))
}

#[cfg(test)]
#[path = "../../tests/unit/codec/delays.rs"]
mod tests;
