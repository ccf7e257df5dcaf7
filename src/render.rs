//! Renderer and compositor
//!
//! A [`Surface`] is whatever the host UI draws into. The [`Compositor`]
//! resizes it only when the decoded buffer's dimensions change and then blits
//! pixels verbatim, without interpolation.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::Result;
use crate::types::PixelBuffer;

/// Pixel sink owned by the host UI.
pub trait Surface {
    /// Resize the drawable area. Called before the first blit and whenever
    /// the source dimensions change.
    fn resize(&mut self, width: u32, height: u32);

    /// Copy `buffer` onto the surface. Dimensions match the last resize.
    fn blit(&mut self, buffer: &PixelBuffer) -> Result<()>;

    /// Shareable view of the current contents, for surfaces that keep one.
    fn snapshot(&self) -> Option<Arc<PixelBuffer>> {
        None
    }
}

/// Sizes a surface to the decoded buffer and blits into it.
#[derive(Debug)]
pub struct Compositor<S> {
    surface: S,
    dimensions: Option<(u32, u32)>,
}

impl<S: Surface> Compositor<S> {
    pub fn new(surface: S) -> Self {
        Self { surface, dimensions: None }
    }

    /// Surface dimensions after the last draw; used by layout.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Draw `buffer`, resizing the surface first if needed. Returns whether a resize happened.
    pub fn present(&mut self, buffer: &PixelBuffer) -> Result<bool> {
        let dims = buffer.dimensions();
        let resized = self.dimensions != Some(dims);
        if resized {
            debug!(from = ?self.dimensions, to = ?dims, "Resizing surface");
            self.surface.resize(dims.0, dims.1);
            self.dimensions = Some(dims);
        }
        self.surface.blit(buffer)?;
        Ok(resized)
    }
}

/// In-memory surface whose contents can be shared with readers.
///
/// Two buffers alternate: blits write into the back buffer, which then
/// becomes the front one handed out by [`Surface::snapshot`]. A reader
/// holding only the newest snapshot never forces an allocation; the back
/// buffer is replaced only while someone still holds an older snapshot.
#[derive(Debug, Clone)]
pub struct FrameSurface {
    front: Arc<PixelBuffer>,
    back: Arc<PixelBuffer>,
}

impl Default for FrameSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSurface {
    pub fn new() -> Self {
        Self::with_dimensions(0, 0)
    }

    fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            front: Arc::new(PixelBuffer::new(width, height)),
            back: Arc::new(PixelBuffer::new(width, height)),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.front.dimensions()
    }
}

impl Surface for FrameSurface {
    fn resize(&mut self, width: u32, height: u32) {
        *self = Self::with_dimensions(width, height);
    }

    fn blit(&mut self, buffer: &PixelBuffer) -> Result<()> {
        match Arc::get_mut(&mut self.back) {
            Some(back) => back.copy_from(buffer)?,
            None => {
                trace!("Back buffer still shared, allocating");
                let (width, height) = self.front.dimensions();
                let mut back = PixelBuffer::new(width, height);
                back.copy_from(buffer)?;
                self.back = Arc::new(back);
            }
        }
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    fn snapshot(&self) -> Option<Arc<PixelBuffer>> {
        Some(Arc::clone(&self.front))
    }
}
