use std::sync::Arc;

use kurbo::{PathEl, Stroke, StrokeOpts};

use crate::foundation::core::{Affine, BezPath, IntRect, Point, Rect, Rgba8Premul};
use crate::foundation::error::{DrawError, DrawResult};
use crate::render::composite::{fill_masked, over_surface};
use crate::render::surface::Surface;

/// Flattening tolerance used when expanding strokes into fills.
const STROKE_TOLERANCE: f64 = 0.05;

/// Winding rule for fills and hit tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRule {
    /// Non-zero winding.
    #[default]
    NonZero,
    /// Even-odd winding.
    EvenOdd,
}

impl FillRule {
    /// Whether a winding number counts as inside.
    pub fn contains(self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }

    fn to_cpu(self) -> vello_cpu::peniko::Fill {
        match self {
            FillRule::NonZero => vello_cpu::peniko::Fill::NonZero,
            FillRule::EvenOdd => vello_cpu::peniko::Fill::EvenOdd,
        }
    }
}

pub(crate) fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

pub(crate) fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn dims(area: IntRect) -> DrawResult<(u16, u16)> {
    let w = u16::try_from(area.width())
        .map_err(|_| DrawError::render("raster area width exceeds u16"))?;
    let h = u16::try_from(area.height())
        .map_err(|_| DrawError::render("raster area height exceeds u16"))?;
    Ok((w, h))
}

/// Render with a fresh context whose pixel (0, 0) is device pixel `area.min()`.
fn rasterize<F>(area: IntRect, draw: F) -> DrawResult<vello_cpu::Pixmap>
where
    F: FnOnce(&mut vello_cpu::RenderContext, Affine),
{
    let (w, h) = dims(area)?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    let origin = Affine::translate((-f64::from(area.x0), -f64::from(area.y0)));
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
    draw(&mut ctx, origin);
    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);
    Ok(pixmap)
}

/// One coverage byte per pixel of `area`; aliased rendering snaps coverage to 0 or 255.
pub fn coverage_mask(
    area: IntRect,
    path: &BezPath,
    transform: Affine,
    rule: FillRule,
    antialias: bool,
) -> DrawResult<Vec<u8>> {
    let pixmap = rasterize(area, |ctx, origin| {
        ctx.set_transform(affine_to_cpu(origin * transform));
        ctx.set_fill_rule(rule.to_cpu());
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
        ctx.fill_path(&bezpath_to_cpu(path));
    })?;
    Ok(pixmap
        .data_as_u8_slice()
        .chunks_exact(4)
        .map(|px| match (antialias, px[3]) {
            (true, a) => a,
            (false, a) if a >= 128 => 255,
            (false, _) => 0,
        })
        .collect())
}

/// Fill `path` with a straight-alpha colour, limited to `area`.
pub fn fill_path(
    target: &mut Surface,
    area: IntRect,
    path: &BezPath,
    transform: Affine,
    rule: FillRule,
    color: [u8; 4],
    antialias: bool,
) -> DrawResult<()> {
    let Some(area) = area.intersect(target.rect()) else {
        return Ok(());
    };
    if color[3] == 0 {
        return Ok(());
    }
    let mask = coverage_mask(area, path, transform, rule, antialias)?;
    let paint = Rgba8Premul::from_straight_rgba(color[0], color[1], color[2], color[3]);
    fill_masked(target, area, &mask, paint);
    Ok(())
}

/// Outline of `path` stroked with `style` in its own (user) space.
pub fn stroke_outline(path: &BezPath, style: &Stroke) -> BezPath {
    kurbo::stroke(path.iter(), style, &StrokeOpts::default(), STROKE_TOLERANCE)
}

/// Stroke `path` (in user space) with a straight-alpha colour, limited to `area`.
pub fn stroke_path(
    target: &mut Surface,
    area: IntRect,
    path: &BezPath,
    transform: Affine,
    style: &Stroke,
    color: [u8; 4],
    antialias: bool,
) -> DrawResult<()> {
    if style.width <= 0.0 {
        return Ok(());
    }
    let outline = stroke_outline(path, style);
    fill_path(
        target,
        area,
        &outline,
        transform,
        FillRule::NonZero,
        color,
        antialias,
    )
}

/// One-device-pixel stroke of `path`, used by outline rendering.
pub fn hairline(
    target: &mut Surface,
    area: IntRect,
    path: &BezPath,
    transform: Affine,
    color: [u8; 4],
) -> DrawResult<()> {
    let device = transform * path.clone();
    stroke_path(
        target,
        area,
        &device,
        Affine::IDENTITY,
        &Stroke::new(1.0),
        color,
        true,
    )
}

/// Closed rectangle path.
pub fn rect_path(r: Rect) -> BezPath {
    let mut p = BezPath::new();
    p.move_to((r.x0, r.y0));
    p.line_to((r.x1, r.y0));
    p.line_to((r.x1, r.y1));
    p.line_to((r.x0, r.y1));
    p.close_path();
    p
}

/// Build a `vello_cpu` pixmap from premultiplied RGBA8 bytes.
pub(crate) fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> DrawResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| DrawError::validation("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| DrawError::validation("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(DrawError::validation("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        may_have_opacities |= px[3] != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a: px[3],
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

/// Paint an image whose pixel grid is mapped into user space by `placement`.
pub fn draw_image(
    target: &mut Surface,
    area: IntRect,
    pixmap: &Arc<vello_cpu::Pixmap>,
    placement: Affine,
    transform: Affine,
) -> DrawResult<()> {
    let Some(area) = area.intersect(target.rect()) else {
        return Ok(());
    };
    let (w, h) = (f64::from(pixmap.width()), f64::from(pixmap.height()));
    let layer = rasterize(area, |ctx, origin| {
        ctx.set_transform(affine_to_cpu(origin * transform * placement));
        ctx.set_paint(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::clone(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        });
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
    })?;
    let layer = Surface::from_premul_rgba8(area, layer.data_as_u8_slice())?;
    over_surface(target, &layer, area, 1.0);
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
