//! Color decoder for the left camera payload
//!
//! Two input encodings are supported:
//! - **Compressed**: a self-describing still-image container (JPEG, PNG, ...),
//!   decoded with the `image` crate. A container that fails to decode is
//!   reinterpreted as raw pixels.
//! - **Raw**: packed 3-byte pixels, row-major, no padding. `bgr8` payloads are
//!   reordered to RGB; `rgb8` payloads are copied as-is.
//!
//! Either way the source image is scaled to the display width with
//! nearest-neighbour sampling. Exactly one path produces the output; on error
//! the output buffer is left untouched.

use image::ImageFormat;
use tracing::{trace, warn};

use super::scale::{display_size, scale_nearest};
use super::{CycleDecoder, Decoded};
use crate::config::MIN_DISPLAY_WIDTH;
use crate::sequencer::Cycle;
use crate::types::{OPAQUE, PixelBuffer, StreamInfo, ViewMode};
use crate::{Result, StreamError};

/// How a color payload is laid out, derived from the header's format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorEncoding {
    Compressed(ImageFormat),
    RawBgr,
    RawRgb,
}

impl ColorEncoding {
    /// Classify a format string. Unknown formats are treated as raw BGR.
    pub fn from_format(format: &str) -> Self {
        let format = format.trim().to_ascii_lowercase();
        match format.as_str() {
            "bgr8" | "bgr" | "" => ColorEncoding::RawBgr,
            "rgb8" | "rgb" => ColorEncoding::RawRgb,
            "mjpeg" | "mjpg" | "jpeg" | "jpg" => ColorEncoding::Compressed(ImageFormat::Jpeg),
            other => {
                let ext = other.strip_prefix("image/").unwrap_or(other);
                match ImageFormat::from_extension(ext) {
                    Some(fmt) => ColorEncoding::Compressed(fmt),
                    None => ColorEncoding::RawBgr,
                }
            }
        }
    }
}

/// Which path produced the most recent color output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorPath {
    Compressed,
    Raw,
    /// Container decode failed; raw interpretation succeeded
    RawFallback,
}

/// Decodes left color payloads into display-sized RGBA buffers.
#[derive(Debug)]
pub struct ColorDecoder {
    target_width: u32,
    /// Intermediate at source resolution
    source: PixelBuffer,
    /// Final output at display resolution
    output: PixelBuffer,
    last_path: Option<ColorPath>,
}

impl ColorDecoder {
    /// Create a decoder drawing at `target_width` (floored at [`MIN_DISPLAY_WIDTH`]).
    pub fn new(target_width: u32) -> Self {
        Self {
            target_width: target_width.max(MIN_DISPLAY_WIDTH),
            source: PixelBuffer::new(0, 0),
            output: PixelBuffer::new(0, 0),
            last_path: None,
        }
    }

    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    /// Update the display width, e.g. after the host surface was resized.
    pub fn set_target_width(&mut self, width: u32) {
        self.target_width = width.max(MIN_DISPLAY_WIDTH);
    }

    pub fn last_path(&self) -> Option<ColorPath> {
        self.last_path
    }

    /// Decode `payload` described by `info` into the display buffer.
    pub fn decode_payload(
        &mut self,
        payload: &[u8],
        info: &StreamInfo,
    ) -> Result<(&PixelBuffer, ColorPath)> {
        let path = match ColorEncoding::from_format(&info.format) {
            ColorEncoding::Compressed(format) => match self.decode_compressed(payload, format) {
                Ok(()) => ColorPath::Compressed,
                Err(err) => {
                    warn!(
                        format = %info.format,
                        error = %err,
                        "Compressed color decode failed, trying raw pixels"
                    );
                    self.decode_raw(payload, info, true)?;
                    ColorPath::RawFallback
                }
            },
            ColorEncoding::RawBgr => {
                self.decode_raw(payload, info, true)?;
                ColorPath::Raw
            }
            ColorEncoding::RawRgb => {
                self.decode_raw(payload, info, false)?;
                ColorPath::Raw
            }
        };

        let (w, h) = display_size(self.source.width(), self.source.height(), self.target_width)?;
        self.output.ensure_dimensions(w, h);
        scale_nearest(&self.source, &mut self.output);
        self.last_path = Some(path);

        trace!(?path, source = ?self.source.dimensions(), display = ?(w, h), "Color frame decoded");
        Ok((&self.output, path))
    }

    fn decode_compressed(&mut self, payload: &[u8], format: ImageFormat) -> Result<()> {
        let image = image::load_from_memory_with_format(payload, format)
            .map_err(|e| StreamError::decode(format!("{format:?}"), e.to_string()))?
            .to_rgba8();

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(StreamError::decode(format!("{format:?}"), "image has no pixels"));
        }

        self.source.ensure_dimensions(width, height);
        self.source.as_bytes_mut().copy_from_slice(image.as_raw());
        Ok(())
    }

    fn decode_raw(&mut self, payload: &[u8], info: &StreamInfo, swap_red_blue: bool) -> Result<()> {
        if !info.has_area() {
            return Err(StreamError::decode(&info.format, "stream announces an empty image"));
        }

        let expected = info.pixel_count() * 3;
        if payload.len() < expected {
            return Err(StreamError::PayloadSize { what: "color", expected, actual: payload.len() });
        }

        self.source.ensure_dimensions(info.width, info.height);
        let out = self.source.as_bytes_mut();
        for (px, src) in out.chunks_exact_mut(4).zip(payload[..expected].chunks_exact(3)) {
            if swap_red_blue {
                px.copy_from_slice(&[src[2], src[1], src[0], OPAQUE]);
            } else {
                px.copy_from_slice(&[src[0], src[1], src[2], OPAQUE]);
            }
        }
        Ok(())
    }
}

impl CycleDecoder for ColorDecoder {
    fn mode(&self) -> ViewMode {
        ViewMode::Color
    }

    fn decode(&mut self, cycle: &Cycle) -> Result<Decoded<'_>> {
        let (buffer, path) = self.decode_payload(&cycle.left, &cycle.header.left_rgb)?;
        Ok(Decoded { buffer, probe: None, fell_back: path == ColorPath::RawFallback })
    }
}
