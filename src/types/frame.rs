//! Rendered frame types published to the host UI

use std::sync::Arc;

use super::{PixelBuffer, ViewMode};

/// Square region in pixel coordinates, `x`/`y` inclusive, `width`/`height` in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Center-distance reading taken from the depth probe square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthProbe {
    /// Mean of the valid raw samples inside the probe
    pub average_raw: f64,
    /// `average_raw * scale_m`
    pub distance_m: f64,
    /// Number of valid samples averaged
    pub valid_samples: usize,
    /// Probe square in output pixel coordinates
    pub region: Region,
}

/// The output of one decode, as it appears on the surface.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    /// Decoder that produced the buffer
    pub mode: ViewMode,
    /// Header timestamp of the cycle the frame came from
    pub timestamp: f64,
    /// Displayed pixels (zero-copy via Arc)
    pub buffer: Arc<PixelBuffer>,
    /// Center-distance reading; depth frames only
    pub probe: Option<DepthProbe>,
}

impl RenderedFrame {
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }
}
