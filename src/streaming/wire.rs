//! Frame encoding for the collector.
//!
//! A frame is the rolling window as `N` consecutive 4-byte IEEE-754 floats,
//! oldest sample first. There is no header, length prefix or checksum: the
//! collector knows `N` from its own configuration.

use super::traits::ByteOrder;

/// Encode `samples` into `out`, replacing its contents.
///
/// `out` ends up exactly `4 * samples.len()` bytes long.
pub fn encode_frame(samples: &[f32], order: ByteOrder, out: &mut Vec<u8>) {
    out.clear();
    match order {
        ByteOrder::Native => out.extend_from_slice(bytemuck::cast_slice(samples)),
        ByteOrder::LittleEndian => {
            out.reserve(samples.len() * 4);
            for s in samples {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
        ByteOrder::BigEndian => {
            out.reserve(samples.len() * 4);
            for s in samples {
                out.extend_from_slice(&s.to_be_bytes());
            }
        }
    }
}

/// Decode a frame produced by [`encode_frame`].
///
/// Trailing bytes that do not form a whole float are ignored.
pub fn decode_frame(bytes: &[u8], order: ByteOrder) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| {
            let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
            match order {
                ByteOrder::LittleEndian => f32::from_le_bytes(raw),
                ByteOrder::BigEndian => f32::from_be_bytes(raw),
                ByteOrder::Native => f32::from_ne_bytes(raw),
            }
        })
        .collect()
}
