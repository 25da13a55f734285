use crate::effects::color_matrix::ColorMatrix;
use crate::foundation::core::IntRect;
use crate::foundation::error::{DrawError, DrawResult};
use crate::foundation::math::unpremul_alpha;

/// Premultiplied RGBA8 pixels covering a device-space rectangle.
///
/// Pixel `(x, y)` in device space lives at row `y - rect.y0`, column `x - rect.x0` of the
/// backing pixmap.
#[derive(Clone, Debug)]
pub struct Surface {
    rect: IntRect,
    pixmap: vello_cpu::Pixmap,
}

impl Surface {
    /// Transparent surface covering `rect`.
    pub fn new(rect: IntRect) -> DrawResult<Self> {
        let (w, h) = dims_u16(rect)?;
        Ok(Self {
            rect,
            pixmap: vello_cpu::Pixmap::new(w, h),
        })
    }

    /// Surface over `rect` initialised from premultiplied RGBA8 bytes.
    pub fn from_premul_rgba8(rect: IntRect, bytes: &[u8]) -> DrawResult<Self> {
        let mut surface = Self::new(rect)?;
        if bytes.len() != surface.data().len() {
            return Err(DrawError::validation(format!(
                "surface expects {} bytes for {}x{}, got {}",
                surface.data().len(),
                rect.width(),
                rect.height(),
                bytes.len()
            )));
        }
        surface.data_mut().copy_from_slice(bytes);
        Ok(surface)
    }

    /// Device-space rectangle covered.
    pub fn rect(&self) -> IntRect {
        self.rect
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.rect.width() as u32
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.rect.height() as u32
    }

    /// Bytes held by the pixel buffer.
    pub fn byte_size(&self) -> usize {
        self.data().len()
    }

    /// Row-major premultiplied RGBA8 bytes.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    /// Mutable row-major premultiplied RGBA8 bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.pixmap.data_as_u8_slice_mut()
    }

    pub(crate) fn pixmap_mut(&mut self) -> &mut vello_cpu::Pixmap {
        &mut self.pixmap
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data_mut().fill(0);
    }

    pub(crate) fn offset_of(&self, x: i32, y: i32) -> Option<usize> {
        if !self.rect.contains_pixel(x, y) {
            return None;
        }
        let col = (x - self.rect.x0) as usize;
        let row = (y - self.rect.y0) as usize;
        Some((row * self.width() as usize + col) * 4)
    }

    /// Premultiplied pixel at device coordinates, `None` outside the surface.
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let i = self.offset_of(x, y)?;
        let d = self.data();
        Some([d[i], d[i + 1], d[i + 2], d[i + 3]])
    }

    /// Overwrite the pixel at device coordinates; ignored outside the surface.
    pub fn set_pixel(&mut self, x: i32, y: i32, px: [u8; 4]) {
        if let Some(i) = self.offset_of(x, y) {
            self.data_mut()[i..i + 4].copy_from_slice(&px);
        }
    }

    /// Byte range of row `y` restricted to columns `[x0, x1)`, in device coordinates.
    pub(crate) fn row_span(&self, y: i32, x0: i32, x1: i32) -> std::ops::Range<usize> {
        let start = self.offset_of(x0, y).unwrap_or(0);
        start..start + ((x1 - x0) as usize) * 4
    }

    /// Copy (replace) the pixels of `src` inside `area` into `self`.
    pub fn copy_from(&mut self, src: &Surface, area: IntRect) {
        let Some(r) = area
            .intersect(self.rect)
            .and_then(|r| r.intersect(src.rect))
        else {
            return;
        };
        for y in r.y0..r.y1 {
            let s = src.row_span(y, r.x0, r.x1);
            let d = self.row_span(y, r.x0, r.x1);
            self.data_mut()[d].copy_from_slice(&src.data()[s]);
        }
    }

    /// Apply a colour matrix to the pixels inside `area`.
    pub fn apply_color_matrix(&mut self, matrix: &ColorMatrix, area: IntRect) {
        let Some(r) = area.intersect(self.rect) else {
            return;
        };
        for y in r.y0..r.y1 {
            let span = self.row_span(y, r.x0, r.x1);
            matrix.apply_in_place(&mut self.data_mut()[span]);
        }
    }

    /// Scale every pixel by a `0..=255` coverage mask with one byte per pixel.
    pub(crate) fn apply_mask(&mut self, mask: &[u8]) {
        for (px, &m) in self.data_mut().chunks_exact_mut(4).zip(mask) {
            if m == 255 {
                continue;
            }
            for c in px.iter_mut() {
                *c = crate::foundation::math::mul_div255_u8(u16::from(*c), u16::from(m));
            }
        }
    }

    /// Mean premultiplied RGBA in `[0, 1]`.
    pub fn average_color(&self) -> [f64; 4] {
        let mut acc = [0u64; 4];
        let mut n = 0u64;
        for px in self.data().chunks_exact(4) {
            for c in 0..4 {
                acc[c] += u64::from(px[c]);
            }
            n += 1;
        }
        if n == 0 {
            return [0.0; 4];
        }
        let scale = 255.0 * n as f64;
        acc.map(|v| v as f64 / scale)
    }

    /// Straight-alpha copy suitable for encoding with the `image` crate.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        let data = self.data();
        let w = self.width();
        image::RgbaImage::from_fn(w, self.height(), |x, y| {
            let i = ((y * w + x) as usize) * 4;
            let a = data[i + 3];
            image::Rgba([
                unpremul_alpha(data[i], a),
                unpremul_alpha(data[i + 1], a),
                unpremul_alpha(data[i + 2], a),
                a,
            ])
        })
    }
}

fn dims_u16(rect: IntRect) -> DrawResult<(u16, u16)> {
    let w: u16 = rect
        .width()
        .try_into()
        .map_err(|_| DrawError::render(format!("surface width {} exceeds u16", rect.width())))?;
    let h: u16 = rect
        .height()
        .try_into()
        .map_err(|_| DrawError::render(format!("surface height {} exceeds u16", rect.height())))?;
    Ok((w, h))
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
