use crate::effects::filter::Filter;
use crate::foundation::config::Quality;
use crate::foundation::core::{Affine, BezPath, IntRect, Rect, Rgba8Premul};
use crate::foundation::error::{DrawError, DrawResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::raster::{FillRule, coverage_mask};
use crate::render::surface::Surface;

pub type PremulRgba8 = [u8; 4];

/// Source-over of premultiplied pixels with an extra opacity on the source.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Source-over of equal-length premultiplied RGBA8 buffers.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> DrawResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(DrawError::render(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Composite `src` over `dst` inside `area`.
pub fn over_surface(dst: &mut Surface, src: &Surface, area: IntRect, opacity: f32) {
    let Some(r) = area
        .intersect(dst.rect())
        .and_then(|r| r.intersect(src.rect()))
    else {
        return;
    };
    for y in r.y0..r.y1 {
        let s = src.row_span(y, r.x0, r.x1);
        let d = dst.row_span(y, r.x0, r.x1);
        // Spans have equal length by construction.
        let _ = over_in_place(&mut dst.data_mut()[d], &src.data()[s], opacity);
    }
}

/// Composite a solid colour through a coverage mask laid out over `area`.
pub fn fill_masked(dst: &mut Surface, area: IntRect, mask: &[u8], paint: Rgba8Premul) {
    let Some(r) = area.intersect(dst.rect()) else {
        return;
    };
    let stride = area.width() as usize;
    let paint = paint.to_array();
    for y in r.y0..r.y1 {
        for x in r.x0..r.x1 {
            let m = mask[(y - area.y0) as usize * stride + (x - area.x0) as usize];
            if m == 0 {
                continue;
            }
            let src = paint.map(|c| mul_div255_u8(u16::from(c), u16::from(m)));
            if let Some(px) = dst.pixel(x, y) {
                dst.set_pixel(x, y, over(px, src, 1.0));
            }
        }
    }
}

/// Filter evaluation inputs for a layer.
#[derive(Clone, Copy, Debug)]
pub struct FilterPass<'a> {
    /// Filter to run.
    pub filter: &'a Filter,
    /// Item bounding box in user space.
    pub item_bbox: Option<Rect>,
    /// User-to-device transform of the item.
    pub ctm: Affine,
    /// Filter resolution quality.
    pub quality: Quality,
    /// Blur kernel quality.
    pub blur_quality: Quality,
}

/// Effects applied to an item's pixels before they reach the target.
#[derive(Clone, Copy, Debug)]
pub struct LayerSpec<'a> {
    /// Group opacity in `[0, 1]`.
    pub opacity: f32,
    /// Clip path and its user-to-device transform.
    pub clip: Option<(&'a BezPath, Affine)>,
    /// Filter, when filters render.
    pub filter: Option<FilterPass<'a>>,
    /// Whether the clip mask is antialiased.
    pub antialias: bool,
}

impl LayerSpec<'_> {
    /// No clip, no filter, fully opaque.
    pub fn plain() -> Self {
        Self {
            opacity: 1.0,
            clip: None,
            filter: None,
            antialias: true,
        }
    }

    /// Whether painting needs an intermediate surface.
    pub fn needs_layer(&self) -> bool {
        self.opacity < 1.0 || self.clip.is_some() || self.filter.is_some()
    }
}

/// Paint `draw` into `dst` inside `area`, going through an intermediate layer when `spec`
/// asks for a filter, clip or opacity (applied in that order).
pub fn render_layered<F>(dst: &mut Surface, area: IntRect, spec: &LayerSpec<'_>, draw: F) -> DrawResult<()>
where
    F: FnOnce(&mut Surface, IntRect) -> DrawResult<()>,
{
    if !spec.needs_layer() {
        return draw(dst, area);
    }
    if spec.opacity <= 0.0 {
        return Ok(());
    }

    let layer_rect = match &spec.filter {
        Some(pass) => pass
            .filter
            .area_enlarge(area, pass.filter.primitive_transform(pass.item_bbox, pass.ctm)),
        None => area,
    };
    let mut layer = Surface::new(layer_rect)?;
    draw(&mut layer, layer_rect)?;

    if let Some(pass) = &spec.filter {
        layer = pass.filter.render(
            &layer,
            pass.item_bbox,
            pass.ctm,
            pass.quality,
            pass.blur_quality,
        )?;
    }
    if let Some((clip, ctm)) = spec.clip {
        let mask = coverage_mask(layer_rect, clip, ctm, FillRule::NonZero, spec.antialias)?;
        layer.apply_mask(&mask);
    }
    over_surface(dst, &layer, area, spec.opacity);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
