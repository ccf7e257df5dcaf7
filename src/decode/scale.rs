//! Nearest-neighbour scaling
//!
//! Sensor pixels are kept as hard-edged blocks; no smoothing is applied.

use crate::types::{CHANNELS, PixelBuffer};
use crate::{Result, StreamError};

/// Largest display buffer, in pixels, the scaler will allocate.
pub const MAX_DISPLAY_PIXELS: u64 = 4096 * 4096;

/// Display size for a `src_width` x `src_height` image drawn `target_width` wide.
///
/// Aspect ratio is preserved; the height is at least one pixel. Sizes above
/// [`MAX_DISPLAY_PIXELS`] are rejected before anything is allocated.
pub fn display_size(src_width: u32, src_height: u32, target_width: u32) -> Result<(u32, u32)> {
    if src_width == 0 || src_height == 0 {
        return Ok((target_width, 0));
    }
    let height = (src_height as f64 * target_width as f64 / src_width as f64).round() as u32;
    let height = height.max(1);

    if target_width as u64 * height as u64 > MAX_DISPLAY_PIXELS {
        return Err(StreamError::decode(
            "display",
            format!("{target_width}x{height} display exceeds {MAX_DISPLAY_PIXELS} pixels"),
        ));
    }
    Ok((target_width, height))
}

/// Scale `src` into `dst`, whose dimensions define the output size.
pub fn scale_nearest(src: &PixelBuffer, dst: &mut PixelBuffer) {
    let (sw, sh) = src.dimensions();
    let (dw, dh) = dst.dimensions();
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return;
    }

    if (sw, sh) == (dw, dh) {
        dst.as_bytes_mut().copy_from_slice(src.as_bytes());
        return;
    }

    // Column lookup is shared by every row
    let columns: Vec<usize> =
        (0..dw as usize).map(|x| (x * sw as usize / dw as usize).min(sw as usize - 1)).collect();

    let src_bytes = src.as_bytes();
    let row_stride = sw as usize * CHANNELS;
    let out = dst.as_bytes_mut();

    for (y, out_row) in out.chunks_exact_mut(dw as usize * CHANNELS).enumerate() {
        let sy = (y * sh as usize / dh as usize).min(sh as usize - 1);
        let src_row = &src_bytes[sy * row_stride..(sy + 1) * row_stride];
        for (px, &sx) in out_row.chunks_exact_mut(CHANNELS).zip(&columns) {
            px.copy_from_slice(&src_row[sx * CHANNELS..(sx + 1) * CHANNELS]);
        }
    }
}
