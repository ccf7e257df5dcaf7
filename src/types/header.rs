//! Frame header types announced by the device before each cycle

use serde::{Deserialize, Serialize};

use crate::{Result, StreamError};

/// Control message type carried by every frame header.
pub const FRAME_HEADER_TYPE: &str = "frame";

/// Dimensions and encoding of one image stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Encoding name (e.g. `jpeg`, `bgr8`, `z16`)
    #[serde(default)]
    pub format: String,
}

impl StreamInfo {
    /// Number of pixels announced for this stream.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether the stream announces a non-empty image.
    pub fn has_area(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Depth stream description with its raw-unit to metre scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthStreamInfo {
    #[serde(flatten)]
    pub stream: StreamInfo,
    /// Metres per raw depth unit
    pub scale_m: f64,
}

impl std::ops::Deref for DepthStreamInfo {
    type Target = StreamInfo;

    fn deref(&self) -> &StreamInfo {
        &self.stream
    }
}

/// Text control message describing the next cycle's three payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameHeader {
    #[serde(rename = "type")]
    pub kind: String,
    /// Capture timestamp in milliseconds
    pub timestamp: f64,
    pub depth: DepthStreamInfo,
    pub left_rgb: StreamInfo,
    pub right_rgb: StreamInfo,
}

impl FrameHeader {
    /// Parse a header from the text of a wire message.
    ///
    /// Non-JSON input yields [`StreamError::HeaderParse`]; well-formed JSON that
    /// is not a `frame` control message yields [`StreamError::Framing`].
    pub fn parse(text: &str) -> Result<Self> {
        let header: FrameHeader = serde_json::from_str(text)?;
        if header.kind != FRAME_HEADER_TYPE {
            return Err(StreamError::framing(format!(
                "unsupported control message type '{}'",
                header.kind
            )));
        }
        Ok(header)
    }

    /// Depth sensor resolution as `(width, height)`.
    pub fn depth_resolution(&self) -> (u32, u32) {
        (self.depth.width, self.depth.height)
    }

    /// Color sensor resolution as `(width, height)`.
    pub fn color_resolution(&self) -> (u32, u32) {
        (self.left_rgb.width, self.left_rgb.height)
    }
}
