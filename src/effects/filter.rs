use crate::effects::blur::{blur_enlarge, device_std_deviation, gaussian_blur};
use crate::effects::color_matrix::ColorMatrix;
use crate::effects::lighting::{
    DiffuseLighting, LIGHTING_COMPLEXITY, SpecularLighting, lighting_area_enlarge,
};
use crate::foundation::config::Quality;
use crate::foundation::core::{Affine, IntRect, Rect};
use crate::foundation::error::{DrawError, DrawResult};
use crate::render::surface::Surface;

/// Coordinate system of filter lengths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterUnits {
    /// Values are in the item's user space.
    #[default]
    UserSpaceOnUse,
    /// Values are fractions of the item's bounding box.
    ObjectBoundingBox,
}

/// Region a filter may paint, relative to the filtered item.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterRegion {
    /// Units of `x`, `y`, `width`, `height`.
    pub units: FilterUnits,
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Default for FilterRegion {
    fn default() -> Self {
        Self {
            units: FilterUnits::ObjectBoundingBox,
            x: -0.1,
            y: -0.1,
            width: 1.2,
            height: 1.2,
        }
    }
}

impl FilterRegion {
    /// Region in user space, given the item's user-space bounding box.
    pub fn resolve(&self, item_bbox: Option<Rect>) -> Option<Rect> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        match self.units {
            FilterUnits::UserSpaceOnUse => Some(Rect::new(
                self.x,
                self.y,
                self.x + self.width,
                self.y + self.height,
            )),
            FilterUnits::ObjectBoundingBox => {
                let b = item_bbox?;
                let x0 = b.x0 + self.x * b.width();
                let y0 = b.y0 + self.y * b.height();
                Some(Rect::new(
                    x0,
                    y0,
                    x0 + self.width * b.width(),
                    y0 + self.height * b.height(),
                ))
            }
        }
    }
}

/// Where a primitive takes its input from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterInput {
    /// The rendered item.
    SourceGraphic,
    /// Alpha channel of the rendered item.
    SourceAlpha,
    /// Output of the preceding primitive (the source graphic for the first one).
    #[default]
    Previous,
    /// Output of the primitive at this index; must precede the reader.
    Result(usize),
}

/// Filter operation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveOp {
    /// `feDiffuseLighting`.
    DiffuseLighting(DiffuseLighting),
    /// `feSpecularLighting`.
    SpecularLighting(SpecularLighting),
    /// `feGaussianBlur` with a standard deviation in primitive units.
    GaussianBlur {
        /// Horizontal and vertical standard deviation.
        std_deviation: (f64, f64),
    },
    /// `feColorMatrix`.
    ColorMatrix(ColorMatrix),
}

impl PrimitiveOp {
    /// `feGaussianBlur` with the same deviation on both axes.
    pub fn gaussian_blur(std_deviation: f64) -> Self {
        Self::GaussianBlur {
            std_deviation: (std_deviation, std_deviation),
        }
    }
}

/// One step of a filter chain.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FilterPrimitive {
    /// Input image.
    pub input: FilterInput,
    /// Operation.
    pub op: PrimitiveOp,
}

impl FilterPrimitive {
    /// Primitive reading the previous result.
    pub fn new(op: PrimitiveOp) -> Self {
        Self {
            input: FilterInput::Previous,
            op,
        }
    }

    /// Same primitive with another input.
    pub fn with_input(mut self, input: FilterInput) -> Self {
        self.input = input;
        self
    }

    fn complexity(&self, trans: Affine) -> f64 {
        match &self.op {
            PrimitiveOp::DiffuseLighting(_) | PrimitiveOp::SpecularLighting(_) => {
                LIGHTING_COMPLEXITY
            }
            PrimitiveOp::GaussianBlur { std_deviation } => {
                let (sx, sy) = device_std_deviation(*std_deviation, trans);
                2.0 + (sx.max(sy) / 8.0).min(6.0)
            }
            PrimitiveOp::ColorMatrix(_) => 1.0,
        }
    }

    fn area_enlarge(&self, area: IntRect, trans: Affine) -> IntRect {
        match &self.op {
            PrimitiveOp::DiffuseLighting(_) | PrimitiveOp::SpecularLighting(_) => {
                lighting_area_enlarge(area)
            }
            PrimitiveOp::GaussianBlur { std_deviation } => {
                blur_enlarge(area, device_std_deviation(*std_deviation, trans), Quality::Best)
            }
            PrimitiveOp::ColorMatrix(_) => area,
        }
    }
}

/// Filter effect attached to an item.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Filter {
    /// Painted region.
    pub region: FilterRegion,
    /// Units of primitive lengths and light positions.
    pub primitive_units: FilterUnits,
    /// Chain, evaluated in order; the last result is the filter output.
    pub primitives: Vec<FilterPrimitive>,
}

impl Filter {
    /// Filter with the default region and user-space primitives.
    pub fn new(primitives: Vec<FilterPrimitive>) -> Self {
        Self {
            primitives,
            ..Self::default()
        }
    }

    /// Map from primitive units to device pixels.
    pub fn primitive_transform(&self, item_bbox: Option<Rect>, ctm: Affine) -> Affine {
        match (self.primitive_units, item_bbox) {
            (FilterUnits::ObjectBoundingBox, Some(b)) => {
                ctm * Affine::new([b.width(), 0.0, 0.0, b.height(), b.x0, b.y0])
            }
            _ => ctm,
        }
    }

    /// Rendering cost relative to plain content.
    pub fn complexity(&self, trans: Affine) -> f64 {
        self.primitives.iter().map(|p| p.complexity(trans)).sum()
    }

    /// Source area needed to produce `area` of output.
    pub fn area_enlarge(&self, area: IntRect, trans: Affine) -> IntRect {
        self.primitives
            .iter()
            .fold(area, |acc, p| acc.union(p.area_enlarge(area, trans)))
    }

    /// Device-space region the filter paints.
    pub fn effect_region(&self, item_bbox: Option<Rect>, ctm: Affine) -> Option<IntRect> {
        let user = self.region.resolve(item_bbox)?;
        IntRect::round_out(ctm.transform_rect_bbox(user))
    }

    /// Evaluate the chain over `source`, returning a surface with the same rectangle.
    #[tracing::instrument(level = "trace", skip_all, fields(primitives = self.primitives.len()))]
    pub fn render(
        &self,
        source: &Surface,
        item_bbox: Option<Rect>,
        ctm: Affine,
        filter_quality: Quality,
        blur_quality: Quality,
    ) -> DrawResult<Surface> {
        let factor = match filter_quality {
            Quality::Worst => 4,
            Quality::Worse => 2,
            _ => 1,
        };
        let trans = Affine::scale(1.0 / f64::from(factor))
            * self.primitive_transform(item_bbox, ctm);

        let src = if factor > 1 {
            downsample(source, factor)?
        } else {
            source.clone()
        };

        let mut results: Vec<Surface> = Vec::with_capacity(self.primitives.len());
        let mut source_alpha: Option<Surface> = None;
        for (index, prim) in self.primitives.iter().enumerate() {
            let input = match prim.input {
                FilterInput::SourceGraphic => &src,
                FilterInput::SourceAlpha => &*source_alpha.get_or_insert_with(|| alpha_only(&src)),
                FilterInput::Previous => results.last().unwrap_or(&src),
                FilterInput::Result(i) => results.get(i).ok_or_else(|| {
                    DrawError::validation(format!(
                        "filter primitive {index} reads result {i}, which is not computed yet"
                    ))
                })?,
            };
            let out = match &prim.op {
                PrimitiveOp::DiffuseLighting(p) => p.render(input, trans, 1.0)?,
                PrimitiveOp::SpecularLighting(p) => p.render(input, trans, 1.0)?,
                PrimitiveOp::GaussianBlur { std_deviation } => gaussian_blur(
                    input,
                    device_std_deviation(*std_deviation, trans),
                    blur_quality,
                ),
                PrimitiveOp::ColorMatrix(m) => {
                    let mut out = input.clone();
                    let r = out.rect();
                    out.apply_color_matrix(m, r);
                    out
                }
            };
            results.push(out);
        }

        let mut out = match results.pop() {
            Some(last) if factor > 1 => upsample(&last, source.rect(), factor)?,
            Some(last) => last,
            None => Surface::new(source.rect())?,
        };
        clear_outside(&mut out, self.effect_region(item_bbox, ctm));
        Ok(out)
    }
}

fn alpha_only(src: &Surface) -> Surface {
    let mut out = src.clone();
    for px in out.data_mut().chunks_exact_mut(4) {
        px[0] = 0;
        px[1] = 0;
        px[2] = 0;
    }
    out
}

fn clear_outside(surface: &mut Surface, keep: Option<IntRect>) {
    let rect = surface.rect();
    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            if !keep.is_some_and(|k| k.contains_pixel(x, y)) {
                surface.set_pixel(x, y, [0, 0, 0, 0]);
            }
        }
    }
}

fn downsample(src: &Surface, factor: i32) -> DrawResult<Surface> {
    let r = src.rect();
    let low = IntRect::new(
        r.x0.div_euclid(factor),
        r.y0.div_euclid(factor),
        (r.x1 + factor - 1).div_euclid(factor),
        (r.y1 + factor - 1).div_euclid(factor),
    )
    .ok_or_else(|| DrawError::render("downsampled filter area is empty"))?;
    let mut out = Surface::new(low)?;
    for y in low.y0..low.y1 {
        for x in low.x0..low.x1 {
            let mut acc = [0u32; 4];
            let mut n = 0u32;
            for sy in y * factor..(y + 1) * factor {
                for sx in x * factor..(x + 1) * factor {
                    if let Some(px) = src.pixel(sx, sy) {
                        for c in 0..4 {
                            acc[c] += u32::from(px[c]);
                        }
                        n += 1;
                    }
                }
            }
            if n > 0 {
                out.set_pixel(x, y, acc.map(|v| ((v + n / 2) / n) as u8));
            }
        }
    }
    Ok(out)
}

fn upsample(low: &Surface, rect: IntRect, factor: i32) -> DrawResult<Surface> {
    let mut out = Surface::new(rect)?;
    for y in rect.y0..rect.y1 {
        for x in rect.x0..rect.x1 {
            if let Some(px) = low.pixel(x.div_euclid(factor), y.div_euclid(factor)) {
                out.set_pixel(x, y, px);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/filter.rs"]
mod tests;
