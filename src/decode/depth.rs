//! Depth decoder: raw 16-bit samples to contrast-enhanced grayscale.
//!
//! The rendering is tuned for short-range indoor scenes:
//!
//! 1. Range-find over valid samples (`0` and `65535` mean "no return" and render black).
//! 2. Clamp the range to the operational window `[50, 4000]` raw units.
//! 3. Widen ranges narrower than 2000 units to a 3000-unit window around their midpoint.
//! 4. Trim 20% off each side for extra contrast.
//! 5. Normalize, apply a 0.4 gamma, invert so near is bright, scale to 0..=255
//!    and boost by 1.5x.
//! 6. Average the valid samples in a 40x40 square at the image center into a
//!    distance probe and paint that square red.
//!
//! Output resolution always equals the sensor resolution.

use tracing::trace;

use super::{CycleDecoder, Decoded};
use crate::sequencer::Cycle;
use crate::types::{DepthProbe, DepthStreamInfo, OPAQUE, PixelBuffer, Region, ViewMode};
use crate::{Result, StreamError};

/// Raw value for "no return" at the near end.
pub const INVALID_LOW: u16 = 0;
/// Raw value for "no return" at the far end / saturation.
pub const INVALID_HIGH: u16 = u16::MAX;

/// Nearest raw depth considered for contrast.
pub const DEPTH_FLOOR: f64 = 50.0;
/// Farthest raw depth considered for contrast.
pub const DEPTH_CEILING: f64 = 4000.0;
/// Ranges narrower than this are widened.
pub const MIN_SPAN: f64 = 2000.0;
/// Width of a widened window.
pub const WIDENED_SPAN: f64 = 3000.0;
/// Fraction trimmed from each side of the window.
pub const CONTRAST_TRIM: f64 = 0.2;
pub const GAMMA: f64 = 0.4;
pub const BRIGHTNESS_BOOST: f64 = 1.5;
/// Side of the center probe square in pixels.
pub const PROBE_SIZE: u32 = 40;

const BLACK: [u8; 4] = [0, 0, 0, OPAQUE];
const PROBE_COLOR: [u8; 4] = [255, 0, 0, OPAQUE];

#[inline]
pub fn is_valid(raw: u16) -> bool {
    raw != INVALID_LOW && raw != INVALID_HIGH
}

/// Raw-unit interval mapped onto the grayscale ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastWindow {
    pub min: f64,
    pub max: f64,
}

impl ContrastWindow {
    /// Build the window from the observed valid range `[min_val, max_val]`.
    pub fn from_range(min_val: u16, max_val: u16) -> Self {
        let mut lo = DEPTH_FLOOR.max(min_val as f64);
        let mut hi = DEPTH_CEILING.min(max_val as f64);

        if hi - lo < MIN_SPAN {
            let mid = (lo + hi) / 2.0;
            lo = DEPTH_FLOOR.max(mid - WIDENED_SPAN / 2.0);
            hi = DEPTH_CEILING.min(mid + WIDENED_SPAN / 2.0);
        }

        // Every valid sample lies beyond the ceiling; no window fits.
        if hi <= lo {
            lo = DEPTH_FLOOR;
            hi = DEPTH_CEILING;
        }

        let trim = (hi - lo) * CONTRAST_TRIM;
        Self { min: lo + trim, max: hi - trim }
    }

    /// Grayscale level for a valid raw sample.
    #[inline]
    pub fn shade(&self, raw: u16) -> u8 {
        let span = (self.max - self.min).max(f64::EPSILON);
        let normalized = ((raw as f64 - self.min) / span).clamp(0.0, 1.0);
        let level = (1.0 - normalized.powf(GAMMA)) * 255.0;
        (level * BRIGHTNESS_BOOST).min(255.0).round() as u8
    }
}

/// Probe square centered in a `width` x `height` image.
pub fn probe_region(width: u32, height: u32) -> Region {
    let w = PROBE_SIZE.min(width);
    let h = PROBE_SIZE.min(height);
    Region {
        x: (width / 2).saturating_sub(w / 2).min(width - w),
        y: (height / 2).saturating_sub(h / 2).min(height - h),
        width: w,
        height: h,
    }
}

/// Decodes depth payloads at sensor resolution.
#[derive(Debug)]
pub struct DepthDecoder {
    output: PixelBuffer,
    samples: Vec<u16>,
    last_window: Option<ContrastWindow>,
}

impl Default for DepthDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthDecoder {
    pub fn new() -> Self {
        Self { output: PixelBuffer::new(0, 0), samples: Vec::new(), last_window: None }
    }

    /// Contrast window used by the last successful decode.
    pub fn last_window(&self) -> Option<ContrastWindow> {
        self.last_window
    }

    /// Decode a little-endian 16-bit payload into grayscale plus the center probe.
    pub fn decode_payload(
        &mut self,
        payload: &[u8],
        info: &DepthStreamInfo,
    ) -> Result<(&PixelBuffer, Option<DepthProbe>)> {
        let (width, height) = (info.width, info.height);
        if width == 0 || height == 0 {
            return Err(StreamError::decode(&info.format, "stream announces an empty image"));
        }

        let count = info.pixel_count();
        let expected = count * 2;
        if payload.len() < expected {
            return Err(StreamError::PayloadSize { what: "depth", expected, actual: payload.len() });
        }

        self.samples.clear();
        let samples = payload[..expected].chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]]));
        self.samples.extend(samples);

        let valid = self.samples.iter().copied().filter(|&s| is_valid(s));
        let range = valid.fold(None, |acc, s| match acc {
            None => Some((s, s)),
            Some((lo, hi)) => Some((s.min(lo), s.max(hi))),
        });
        let window = range.map(|(lo, hi)| ContrastWindow::from_range(lo, hi));

        self.output.ensure_dimensions(width, height);
        for (index, &raw) in self.samples.iter().enumerate() {
            let rgba = match window {
                Some(window) if is_valid(raw) => {
                    let level = window.shade(raw);
                    [level, level, level, OPAQUE]
                }
                _ => BLACK,
            };
            self.output.set_index(index, rgba);
        }

        let probe = self.paint_probe(width, height, info.scale_m);
        self.last_window = window;

        let distance_m = probe.map(|p| p.distance_m);
        trace!(width, height, ?window, distance_m, "Depth frame decoded");
        Ok((&self.output, probe))
    }

    fn paint_probe(&mut self, width: u32, height: u32, scale_m: f64) -> Option<DepthProbe> {
        let region = probe_region(width, height);
        let mut sum = 0u64;
        let mut valid = 0usize;

        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                let raw = self.samples[y as usize * width as usize + x as usize];
                if is_valid(raw) {
                    sum += raw as u64;
                    valid += 1;
                }
                self.output.set_pixel(x, y, PROBE_COLOR);
            }
        }

        (valid > 0).then(|| {
            let average_raw = sum as f64 / valid as f64;
            DepthProbe {
                average_raw,
                distance_m: average_raw * scale_m,
                valid_samples: valid,
                region,
            }
        })
    }
}

impl CycleDecoder for DepthDecoder {
    fn mode(&self) -> ViewMode {
        ViewMode::Depth
    }

    fn decode(&mut self, cycle: &Cycle) -> Result<Decoded<'_>> {
        let (buffer, probe) = self.decode_payload(&cycle.depth, &cycle.header.depth)?;
        Ok(Decoded { buffer, probe, fell_back: false })
    }
}
