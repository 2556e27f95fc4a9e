use super::*;

fn bundle() -> PreviewBundle {
    PreviewBundle {
        width: 640,
        height: 360,
        frames: vec![
            PreviewFrame {
                delay_ms: 40,
                width: 2,
                height: 1,
                rgba: vec![1, 2, 3, 4, 5, 6, 7, 8],
            },
            PreviewFrame {
                delay_ms: 0,
                width: 0,
                height: 0,
                rgba: vec![],
            },
            PreviewFrame {
                delay_ms: u32::MAX,
                width: 120,
                height: 68,
                rgba: (0..=255u8).cycle().take(120 * 68 * 4).collect(),
            },
        ],
    }
}

#[test]
fn header_layout() {
    let bytes = encode_preview(&bundle()).unwrap();
    assert_eq!(&bytes[0..4], &640u32.to_le_bytes());
    assert_eq!(&bytes[4..8], &360u32.to_le_bytes());
    assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
    // First frame header + payload, no padding.
    assert_eq!(&bytes[12..16], &40u32.to_le_bytes());
    assert_eq!(&bytes[24..28], &8u32.to_le_bytes());
    assert_eq!(&bytes[28..36], &[1, 2, 3, 4, 5, 6, 7, 8]);
}

#[test]
fn round_trip_preserves_dimensions_and_bytes() {
    let b = bundle();
    let decoded = decode_preview(&encode_preview(&b).unwrap()).unwrap();
    assert_eq!(decoded, b);
    assert_eq!(decoded.delays(), vec![40, 0, u32::MAX]);
}

#[test]
fn empty_bundle_round_trips() {
    let b = PreviewBundle {
        width: 1,
        height: 1,
        frames: vec![],
    };
    assert_eq!(decode_preview(&encode_preview(&b).unwrap()).unwrap(), b);
}

#[test]
fn overlong_byte_length_is_corrupt_not_out_of_bounds() {
    let mut bytes = encode_preview(&bundle()).unwrap();
    // Inflate the first frame's byteLength far beyond the buffer.
    bytes[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(
        decode_preview(&bytes),
        Err(AnimstreamError::CorruptCache(_))
    ));
}

#[test]
fn truncated_or_inflated_count_is_corrupt() {
    let bytes = encode_preview(&bundle()).unwrap();
    assert!(matches!(
        decode_preview(&bytes[..bytes.len() - 1]),
        Err(AnimstreamError::CorruptCache(_))
    ));

    let mut inflated = bytes.clone();
    inflated[8..12].copy_from_slice(&1_000_000u32.to_le_bytes());
    assert!(matches!(
        decode_preview(&inflated),
        Err(AnimstreamError::CorruptCache(_))
    ));

    assert!(decode_preview(&[0; 11]).is_err());
}
