//! Test utilities for building synthetic wire traffic
//!
//! These helpers produce headers and payloads in the exact wire format the
//! device emits, so tests and benches can drive the sequencer, decoders and
//! sessions without a sensor attached.

#![cfg(any(test, feature = "benchmark"))]

use bytes::Bytes;
use std::io::Cursor;

use crate::types::{DepthStreamInfo, FRAME_HEADER_TYPE, FrameHeader, StreamInfo, StreamMessage};

/// Default depth scale used by synthetic headers (1 raw unit = 1 mm).
pub const TEST_SCALE_M: f64 = 0.001;

/// Header with identical depth and color resolution, raw BGR color.
pub fn frame_header(timestamp: f64, width: u32, height: u32) -> FrameHeader {
    frame_header_with_format(timestamp, width, height, "bgr8")
}

/// Header with identical depth and color resolution and the given color format.
pub fn frame_header_with_format(
    timestamp: f64,
    width: u32,
    height: u32,
    format: &str,
) -> FrameHeader {
    let color = StreamInfo { width, height, format: format.to_string() };
    FrameHeader {
        kind: FRAME_HEADER_TYPE.to_string(),
        timestamp,
        depth: DepthStreamInfo {
            stream: StreamInfo { width, height, format: "z16".to_string() },
            scale_m: TEST_SCALE_M,
        },
        left_rgb: color.clone(),
        right_rgb: color,
    }
}

/// Serialized header text as sent on the wire.
pub fn header_json(timestamp: f64, width: u32, height: u32) -> String {
    header_to_json(&frame_header(timestamp, width, height))
}

pub fn header_to_json(header: &FrameHeader) -> String {
    serde_json::to_string(header).unwrap_or_default()
}

/// One-byte payload tagged with `mark`, for tracking payload identity.
pub fn marked_payload(mark: u8) -> Bytes {
    Bytes::from(vec![mark])
}

/// Little-endian 16-bit depth samples.
pub fn depth_payload(samples: &[u16]) -> Bytes {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect::<Vec<u8>>().into()
}

/// Depth payload where every sample equals `value`.
pub fn uniform_depth(width: u32, height: u32, value: u16) -> Bytes {
    depth_payload(&vec![value; width as usize * height as usize])
}

/// Depth payload built from a per-pixel function of `(x, y)`.
pub fn depth_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u16) -> Bytes {
    let samples: Vec<u16> =
        (0..height).flat_map(|y| (0..width).map(move |x| (x, y))).map(|(x, y)| f(x, y)).collect();
    depth_payload(&samples)
}

/// Packed BGR payload filled with one color.
pub fn bgr_payload(width: u32, height: u32, bgr: [u8; 3]) -> Bytes {
    let len = width as usize * height as usize * 3;
    bgr.iter().copied().cycle().take(len).collect::<Vec<u8>>().into()
}

/// PNG-encoded payload filled with one RGB color.
pub fn png_payload(width: u32, height: u32, rgb: [u8; 3]) -> Bytes {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
    let mut out = Cursor::new(Vec::new());
    if image.write_to(&mut out, image::ImageFormat::Png).is_err() {
        return Bytes::new();
    }
    out.into_inner().into()
}

/// The four wire messages of one cycle, in order.
pub fn cycle_messages(
    header: &FrameHeader,
    left: Bytes,
    right: Bytes,
    depth: Bytes,
) -> Vec<StreamMessage> {
    vec![
        StreamMessage::Text(header_to_json(header)),
        StreamMessage::Binary(left),
        StreamMessage::Binary(right),
        StreamMessage::Binary(depth),
    ]
}

/// A cycle with uniform BGR color and uniform depth.
pub fn uniform_cycle(
    timestamp: f64,
    width: u32,
    height: u32,
    bgr: [u8; 3],
    depth: u16,
) -> Vec<StreamMessage> {
    cycle_messages(
        &frame_header(timestamp, width, height),
        bgr_payload(width, height, bgr),
        bgr_payload(width, height, [0, 0, 0]),
        uniform_depth(width, height, depth),
    )
}
