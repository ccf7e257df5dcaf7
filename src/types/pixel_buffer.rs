//! RGBA pixel storage shared by decoders and surfaces

use crate::{Result, StreamError};

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Fully opaque alpha.
pub const OPAQUE: u8 = 255;

/// Row-major RGBA buffer with fixed dimensions.
///
/// Dimensions only change through [`PixelBuffer::ensure_dimensions`], which
/// reallocates when the source resolution differs from the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a transparent black buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, data: vec![0; width as usize * height as usize * CHANNELS] }
    }

    /// Wrap existing RGBA bytes, checking the length against the dimensions.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(StreamError::PayloadSize { what: "rgba", expected, actual: data.len() });
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Resize to `width` x `height` if different, returning whether storage was reallocated.
    pub fn ensure_dimensions(&mut self, width: u32, height: u32) -> bool {
        if self.dimensions() == (width, height) {
            return false;
        }
        *self = Self::new(width, height);
        true
    }

    /// Read a pixel; `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let px = &self.data[offset..offset + CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Write a pixel; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(offset) = self.offset(x, y) {
            self.data[offset..offset + CHANNELS].copy_from_slice(&rgba);
        }
    }

    /// Write a pixel by flat row-major index.
    #[inline]
    pub fn set_index(&mut self, index: usize, rgba: [u8; 4]) {
        let offset = index * CHANNELS;
        self.data[offset..offset + CHANNELS].copy_from_slice(&rgba);
    }

    /// Copy pixels from a buffer of identical dimensions.
    pub fn copy_from(&mut self, other: &PixelBuffer) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(StreamError::PayloadSize {
                what: "surface",
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }
        self.data.copy_from_slice(&other.data);
        Ok(())
    }

    /// Iterate pixels as RGBA quads in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(CHANNELS)
    }

    /// Convert into an [`image::RgbaImage`] for encoding or saving.
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * CHANNELS)
    }
}
