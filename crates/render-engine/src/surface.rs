//! Destination raster surface.
//!
//! A thin wrapper over a premultiplied `tiny_skia::Pixmap`. Resizing to the
//! current size keeps the allocation, so one surface can be reused across a
//! whole export batch.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};
use tiny_skia::Pixmap;

use pixbatch_common::error::{PixbatchError, PixbatchResult};
use pixbatch_model::color::Color;
use pixbatch_model::geometry::CanvasSize;

/// An RGBA raster the compositor paints into.
#[derive(Debug, Clone)]
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    pub fn new(size: CanvasSize) -> PixbatchResult<Self> {
        Ok(Self {
            pixmap: allocate(size)?,
        })
    }

    pub fn size(&self) -> CanvasSize {
        CanvasSize::new(self.pixmap.width(), self.pixmap.height())
    }

    /// Match `size`, reallocating only when the dimensions change.
    /// Contents are unspecified afterwards; callers clear before drawing.
    pub fn resize(&mut self, size: CanvasSize) -> PixbatchResult<()> {
        if self.size() != size {
            self.pixmap = allocate(size)?;
        }
        Ok(())
    }

    /// Reset every pixel to fully transparent.
    pub fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    pub fn fill(&mut self, color: Color) {
        self.pixmap.fill(to_skia_color(color));
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Straight-alpha color at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let c = self.pixmap.pixel(x, y)?.demultiply();
        Some(Color::rgba(c.red(), c.green(), c.blue(), c.alpha()))
    }

    /// Copy out as a straight-alpha image.
    pub fn to_rgba_image(&self) -> PixbatchResult<RgbaImage> {
        let mut data = Vec::with_capacity(self.pixmap.data().len());
        for px in self.pixmap.pixels() {
            let c = px.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }
        RgbaImage::from_raw(self.pixmap.width(), self.pixmap.height(), data)
            .ok_or_else(|| PixbatchError::encode("surface buffer size mismatch"))
    }

    /// Encode the current contents as PNG.
    pub fn encode_png(&self) -> PixbatchResult<Vec<u8>> {
        let image = self.to_rgba_image()?;
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| PixbatchError::encode(e.to_string()))?;
        Ok(bytes)
    }
}

pub(crate) fn to_skia_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a)
}

fn allocate(size: CanvasSize) -> PixbatchResult<Pixmap> {
    Pixmap::new(size.width, size.height).ok_or_else(|| {
        PixbatchError::render(format!(
            "cannot allocate a {}x{} surface",
            size.width, size.height
        ))
    })
}
