//! Decoders that turn a completed cycle into displayable pixels.
//!
//! The [`CycleDecoder`] trait is the seam between the sequencer and the
//! renderer: one implementation per [`ViewMode`]. Decoders own their output
//! buffers and reuse them until the source resolution changes.

pub mod color;
pub mod depth;
pub mod scale;

pub use color::{ColorDecoder, ColorEncoding, ColorPath};
pub use depth::{ContrastWindow, DepthDecoder};

use crate::Result;
use crate::sequencer::Cycle;
use crate::types::{DepthProbe, PixelBuffer, ViewMode};

/// Borrowed result of one decode.
#[derive(Debug)]
pub struct Decoded<'a> {
    pub buffer: &'a PixelBuffer,
    pub probe: Option<DepthProbe>,
    /// The primary path failed and a fallback produced the buffer
    pub fell_back: bool,
}

/// Turns a completed cycle into a pixel buffer.
///
/// On error the decoder must leave its previous output intact so the last
/// good frame stays on screen.
pub trait CycleDecoder {
    /// The view mode this decoder serves.
    fn mode(&self) -> ViewMode;

    fn decode(&mut self, cycle: &Cycle) -> Result<Decoded<'_>>;
}

/// One decoder per view mode.
#[derive(Debug)]
pub struct Decoders {
    pub color: ColorDecoder,
    pub depth: DepthDecoder,
}

impl Decoders {
    pub fn new(display_width: u32) -> Self {
        Self { color: ColorDecoder::new(display_width), depth: DepthDecoder::new() }
    }

    /// Decoder for `mode`.
    pub fn for_mode(&mut self, mode: ViewMode) -> &mut dyn CycleDecoder {
        match mode {
            ViewMode::Color => &mut self.color,
            ViewMode::Depth => &mut self.depth,
        }
    }
}
