// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical payload encoding for the demo line and wall objects.
use bytes::Bytes;

const SEGMENT_BYTES: usize = 24;
const WALL_BYTES: usize = SEGMENT_BYTES + 4;

/// Serialises a segment (start, end) into the canonical line payload.
///
/// Layout (little‑endian):
/// - bytes 0..12: start [x, y, z] as 3 × f32
/// - bytes 12..24: end [x, y, z] as 3 × f32
#[inline]
pub fn encode_segment_payload(start: [f32; 3], end: [f32; 3]) -> Bytes {
    let mut buf = Vec::with_capacity(SEGMENT_BYTES);
    push_segment(&mut buf, start, end);
    Bytes::from(buf)
}

/// Deserialises a canonical line payload into (start, end).
pub fn decode_segment_payload(bytes: &Bytes) -> Option<([f32; 3], [f32; 3])> {
    if bytes.len() != SEGMENT_BYTES {
        return None;
    }
    read_segment(bytes)
}

/// Serialises a wall (baseline start, end, height) into its payload.
///
/// The first 24 bytes use the segment layout; bytes 24..28 hold the height.
#[inline]
pub fn encode_wall_payload(start: [f32; 3], end: [f32; 3], height: f32) -> Bytes {
    let mut buf = Vec::with_capacity(WALL_BYTES);
    push_segment(&mut buf, start, end);
    buf.extend_from_slice(&height.to_le_bytes());
    Bytes::from(buf)
}

/// Deserialises a wall payload into (start, end, height).
pub fn decode_wall_payload(bytes: &Bytes) -> Option<([f32; 3], [f32; 3], f32)> {
    if bytes.len() != WALL_BYTES {
        return None;
    }
    let (start, end) = read_segment(&bytes[..SEGMENT_BYTES])?;
    let height = f32::from_le_bytes(bytes[SEGMENT_BYTES..].try_into().ok()?);
    Some((start, end, height))
}

fn push_segment(buf: &mut Vec<u8>, start: [f32; 3], end: [f32; 3]) {
    for value in start.into_iter().chain(end) {
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

fn read_segment(bytes: &[u8]) -> Option<([f32; 3], [f32; 3])> {
    let mut floats = [0f32; 6];
    for (index, chunk) in bytes.chunks_exact(4).enumerate() {
        *floats.get_mut(index)? = f32::from_le_bytes(chunk.try_into().ok()?);
    }
    Some((
        [floats[0], floats[1], floats[2]],
        [floats[3], floats[4], floats[5]],
    ))
}
