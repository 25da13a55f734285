use crate::foundation::config::Quality;
use crate::foundation::core::{Affine, IntRect};
use crate::render::surface::Surface;

/// Kernel radius (in pixels) for a standard deviation at a given quality.
///
/// `Best` covers three standard deviations; lower qualities truncate the kernel sooner.
pub fn kernel_radius(sigma: f64, quality: Quality) -> u32 {
    if !sigma.is_finite() || sigma <= 0.0 {
        return 0;
    }
    let extent = match quality {
        Quality::Best => 3.0,
        Quality::Better => 2.5,
        Quality::Normal => 2.0,
        Quality::Worse => 1.5,
        Quality::Worst => 1.0,
    };
    (sigma * extent).ceil().min(f64::from(u16::MAX)) as u32
}

/// Per-axis standard deviation in device pixels.
///
/// Each axis is scaled by the length its unit vector gets under `trans`, so a
/// non-uniform scale blurs each direction by its own amount.
pub fn device_std_deviation(std_deviation: (f64, f64), trans: Affine) -> (f64, f64) {
    let [a, b, c, d, _, _] = trans.as_coeffs();
    (
        std_deviation.0.abs() * a.hypot(b),
        std_deviation.1.abs() * c.hypot(d),
    )
}

/// Pixels the blur reaches beyond `area` on each side.
pub fn blur_enlarge(area: IntRect, sigma: (f64, f64), quality: Quality) -> IntRect {
    let rx = kernel_radius(sigma.0, quality).min(i32::MAX as u32) as i32;
    let ry = kernel_radius(sigma.1, quality).min(i32::MAX as u32) as i32;
    IntRect::new(
        area.x0.saturating_sub(rx),
        area.y0.saturating_sub(ry),
        area.x1.saturating_add(rx),
        area.y1.saturating_add(ry),
    )
    .unwrap_or(area)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Integer taps of a sampled, truncated Gaussian.
#[derive(Debug)]
struct Kernel {
    taps: Vec<u32>,
    total: u64,
}

impl Kernel {
    /// `None` when the blur along this axis would be a no-op.
    fn gaussian(sigma: f64, quality: Quality) -> Option<Self> {
        let radius = kernel_radius(sigma, quality) as i64;
        if radius == 0 {
            return None;
        }
        let denom = 2.0 * sigma * sigma;
        let taps: Vec<u32> = (-radius..=radius)
            .map(|i| {
                let x = i as f64;
                ((-x * x / denom).exp() * 65536.0).round().max(1.0) as u32
            })
            .collect();
        let total = taps.iter().map(|&t| u64::from(t)).sum();
        Some(Self { taps, total })
    }

    fn radius(&self) -> i32 {
        (self.taps.len() / 2) as i32
    }

    /// Convolve one line of pixels, clamping reads at both ends.
    fn apply(&self, line: &[[u8; 4]], out: &mut [[u8; 4]]) {
        let last = line.len() as i32 - 1;
        let r = self.radius();
        for (i, px) in out.iter_mut().enumerate() {
            let mut acc = [0u64; 4];
            for (k, &w) in self.taps.iter().enumerate() {
                let src = line[(i as i32 + k as i32 - r).clamp(0, last) as usize];
                for (a, v) in acc.iter_mut().zip(src) {
                    *a += u64::from(w) * u64::from(v);
                }
            }
            *px = acc.map(|a| ((a + self.total / 2) / self.total).min(255) as u8);
        }
    }
}

/// Gaussian blur of a premultiplied surface with separate horizontal and vertical
/// deviations, in device pixels. Edge pixels are clamped.
pub fn gaussian_blur(src: &Surface, sigma: (f64, f64), quality: Quality) -> Surface {
    let mut out = src.clone();
    if let Some(k) = Kernel::gaussian(sigma.0, quality) {
        convolve(&mut out, &k, Axis::Horizontal);
    }
    if let Some(k) = Kernel::gaussian(sigma.1, quality) {
        convolve(&mut out, &k, Axis::Vertical);
    }
    out
}

fn convolve(surface: &mut Surface, kernel: &Kernel, axis: Axis) {
    let rect = surface.rect();
    let (lines, len) = match axis {
        Axis::Horizontal => (rect.y0..rect.y1, rect.width()),
        Axis::Vertical => (rect.x0..rect.x1, rect.height()),
    };
    let len = len as usize;
    let mut line = vec![[0u8; 4]; len];
    let mut blurred = vec![[0u8; 4]; len];
    let at = |fixed: i32, i: usize| match axis {
        Axis::Horizontal => (rect.x0 + i as i32, fixed),
        Axis::Vertical => (fixed, rect.y0 + i as i32),
    };
    for fixed in lines {
        for (i, px) in line.iter_mut().enumerate() {
            let (x, y) = at(fixed, i);
            *px = surface.pixel(x, y).unwrap_or_default();
        }
        kernel.apply(&line, &mut blurred);
        for (i, &px) in blurred.iter().enumerate() {
            let (x, y) = at(fixed, i);
            surface.set_pixel(x, y, px);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
