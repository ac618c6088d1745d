//! Rendering seam: the studio draws through `RenderSurface` and the video
//! exporter reads pixels back from it.

pub mod bounds;
pub mod camera;
pub mod mesh;
pub mod raster;

use crate::state::scene::Group;

/// One RGBA8 frame read back from a surface
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub width: u32,
    pub height: u32,
    /// Row-major, top row first, 4 bytes per pixel
    pub pixels: Vec<u8>,
}

impl CapturedFrame {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

/// Something the model can be drawn into and read back from
pub trait RenderSurface {
    /// Pixel dimensions
    fn size(&self) -> (u32, u32);

    /// Draw the group (or just the background when there is none)
    fn render(&mut self, group: Option<&Group>);

    /// Pixels of the most recent render
    fn capture(&self) -> CapturedFrame;
}
