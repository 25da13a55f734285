use std::sync::Arc;

use anyhow::Context;
use bitflags::bitflags;
use kurbo::{Join, Shape, Stroke};

use crate::effects::filter::Filter;
use crate::foundation::core::{Affine, BezPath, IntRect, Point, Rect};
use crate::foundation::error::{DrawError, DrawResult};
use crate::foundation::math::descrim;
use crate::render::cache::SharedCache;
use crate::render::composite::{LayerSpec, render_layered};
use crate::render::raster::{
    FillRule, draw_image, fill_path, hairline, premul_bytes_to_pixmap, rect_path, stroke_path,
};
use crate::render::surface::Surface;

bitflags! {
    /// Parts of an item's state that are up to date; a cleared flag needs recomputing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct StateFlags: u8 {
        /// Bounding boxes.
        const BBOX = 1;
        /// Cache score and cache surface geometry.
        const CACHE = 1 << 1;
        /// Pick geometry.
        const PICK = 1 << 2;
        /// Damage for the new area has been reported.
        const RENDER = 1 << 3;
        /// Every state flag.
        const ALL = Self::BBOX.bits() | Self::CACHE.bits() | Self::PICK.bits() | Self::RENDER.bits();
    }
}

bitflags! {
    /// Modifiers of a pick query.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct PickFlags: u8 {
        /// Ignore visibility and sensitivity.
        const STICKY = 1;
        /// Hit outlines only, ignoring fills.
        const OUTLINE = 1 << 1;
    }
}

bitflags! {
    /// Modifiers of a render pass.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u8 {
        /// Render content live even when a clean cache exists.
        const BYPASS_CACHE = 1;
    }
}

/// Handle of an item inside its [`Drawing`](crate::drawing::Drawing).
///
/// Handles are never reused while the item is alive: a recycled slot carries a new
/// generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "item#{}.{}", self.index, self.generation)
    }
}

/// How an item is attached to the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChildType {
    /// Not attached.
    Orphan,
    /// Root of the drawing.
    Root,
    /// Ordinary child of a group.
    Normal,
}

/// Antialiasing level; every level other than `None` produces smooth coverage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Antialiasing {
    /// Binary coverage.
    None,
    /// Fast antialiasing.
    Fast,
    /// Default antialiasing.
    #[default]
    Good,
    /// Best antialiasing.
    Best,
}

impl Antialiasing {
    /// Whether coverage is smooth.
    pub fn enabled(self) -> bool {
        self != Antialiasing::None
    }
}

/// Stroke paint of a shape.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokePaint {
    /// Straight-alpha RGBA.
    pub color: [u8; 4],
    /// Width, joins, caps and dashes in user units.
    pub style: Stroke,
}

/// Geometry and paint of a shape item.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeData {
    /// Outline in user space.
    pub path: BezPath,
    /// Straight-alpha RGBA fill.
    pub fill: Option<[u8; 4]>,
    /// Fill winding rule.
    pub fill_rule: FillRule,
    /// Optional stroke.
    pub stroke: Option<StrokePaint>,
}

impl ShapeData {
    /// Shape filled with a solid colour.
    pub fn filled(path: BezPath, color: [u8; 4]) -> Self {
        Self {
            path,
            fill: Some(color),
            ..Self::default()
        }
    }

    /// Same shape with a stroke.
    pub fn with_stroke(mut self, color: [u8; 4], style: Stroke) -> Self {
        self.stroke = Some(StrokePaint { color, style });
        self
    }

    /// Distance the stroke reaches past the path, in user units.
    fn stroke_extent(&self) -> f64 {
        let Some(stroke) = &self.stroke else {
            return 0.0;
        };
        let half = stroke.style.width.abs() / 2.0;
        match stroke.style.join {
            Join::Miter => half * stroke.style.miter_limit.max(1.0),
            _ => half,
        }
    }
}

/// Raster image placed into a user-space rectangle.
#[derive(Clone, Debug)]
pub struct ImageData {
    width: u32,
    height: u32,
    rect: Rect,
    pixels: Arc<Vec<u8>>,
    pixmap: Arc<vello_cpu::Pixmap>,
}

impl ImageData {
    /// Image from premultiplied RGBA8 pixels.
    pub fn new(width: u32, height: u32, rgba8_premul: Vec<u8>, rect: Rect) -> DrawResult<Self> {
        if width == 0 || height == 0 {
            return Err(DrawError::validation("image must have non-zero size"));
        }
        let pixmap = premul_bytes_to_pixmap(&rgba8_premul, width, height)?;
        Ok(Self {
            width,
            height,
            rect: rect.abs(),
            pixels: Arc::new(rgba8_premul),
            pixmap: Arc::new(pixmap),
        })
    }

    /// Decode an encoded image (PNG, JPEG, ...) into `rect`.
    pub fn decode(bytes: &[u8], rect: Rect) -> DrawResult<Self> {
        let rgba = image::load_from_memory(bytes)
            .context("decode image from memory")?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        let mut data = rgba.into_raw();
        for px in data.chunks_exact_mut(4) {
            let a = px[3];
            for c in &mut px[..3] {
                *c = crate::foundation::math::premul_alpha(*c, a);
            }
        }
        Self::new(width, height, data, rect)
    }

    /// Pixel size.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Placement in user space.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    fn placement(&self) -> Affine {
        Affine::new([
            self.rect.width() / f64::from(self.width),
            0.0,
            0.0,
            self.rect.height() / f64::from(self.height),
            self.rect.x0,
            self.rect.y0,
        ])
    }

    /// Alpha of the pixel under a user-space point, `None` outside the image.
    pub fn alpha_at(&self, p: Point) -> Option<u8> {
        if !self.rect.contains(p) || self.rect.width() <= 0.0 || self.rect.height() <= 0.0 {
            return None;
        }
        let fx = (p.x - self.rect.x0) / self.rect.width() * f64::from(self.width);
        let fy = (p.y - self.rect.y0) / self.rect.height() * f64::from(self.height);
        let x = (fx.floor() as u32).min(self.width - 1);
        let y = (fy.floor() as u32).min(self.height - 1);
        Some(self.pixels[((y * self.width + x) as usize) * 4 + 3])
    }
}

impl PartialEq for ImageData {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.rect == other.rect
            && self.pixels == other.pixels
    }
}

/// Already-shaped text: glyph outlines positioned in user space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextData {
    /// Glyph outlines.
    pub glyphs: Vec<BezPath>,
    /// Straight-alpha RGBA fill.
    pub color: [u8; 4],
}

/// Paintable content of a leaf item.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// Vector shape.
    Shape(Arc<ShapeData>),
    /// Raster image.
    Image(Arc<ImageData>),
    /// Glyph run.
    Text(Arc<TextData>),
}

impl Content {
    /// Geometric bounds in user space, ignoring stroke width.
    pub fn user_bounds(&self) -> Option<Rect> {
        match self {
            Content::Shape(s) => (!s.path.elements().is_empty()).then(|| s.path.bounding_box()),
            Content::Image(i) => Some(i.rect),
            Content::Text(t) => t
                .glyphs
                .iter()
                .map(|g| g.bounding_box())
                .reduce(|a, b| a.union(b)),
        }
    }

    /// Device-space box of everything the content may paint.
    ///
    /// `min_half_width` is the smallest stroke half-width in device pixels, used for
    /// hairline outlines.
    pub(crate) fn device_bounds(&self, ctm: Affine, min_half_width: f64) -> Option<IntRect> {
        let user = self.user_bounds()?;
        let stroke = match self {
            Content::Shape(s) => s.stroke_extent() * descrim(ctm),
            _ => 0.0,
        };
        let grow = stroke.max(min_half_width);
        IntRect::round_out(ctm.transform_rect_bbox(user).inflate(grow, grow))
    }

    /// Whether the content can produce pixels.
    pub fn is_rasterizable(&self) -> bool {
        match self {
            Content::Shape(s) => s.fill.is_some() || s.stroke.is_some(),
            Content::Image(_) => true,
            Content::Text(t) => !t.glyphs.is_empty(),
        }
    }

    /// Paint into `target`, limited to `area`.
    pub(crate) fn paint(
        &self,
        target: &mut Surface,
        area: IntRect,
        ctm: Affine,
        antialias: bool,
    ) -> DrawResult<()> {
        match self {
            Content::Shape(s) => {
                if let Some(fill) = s.fill {
                    fill_path(target, area, &s.path, ctm, s.fill_rule, fill, antialias)?;
                }
                if let Some(stroke) = &s.stroke {
                    stroke_path(target, area, &s.path, ctm, &stroke.style, stroke.color, antialias)?;
                }
                Ok(())
            }
            Content::Image(i) => draw_image(target, area, &i.pixmap, i.placement(), ctm),
            Content::Text(t) => {
                for glyph in &t.glyphs {
                    fill_path(target, area, glyph, ctm, FillRule::NonZero, t.color, antialias)?;
                }
                Ok(())
            }
        }
    }

    /// Outline geometry in user space: the path, the image frame or the glyph outlines.
    pub(crate) fn outlines(&self) -> Vec<BezPath> {
        match self {
            Content::Shape(s) => vec![s.path.clone()],
            Content::Image(i) => vec![rect_path(i.rect)],
            Content::Text(t) => t.glyphs.clone(),
        }
    }

    /// Paint one-pixel outlines into `target`.
    pub(crate) fn paint_outline(
        &self,
        target: &mut Surface,
        area: IntRect,
        ctm: Affine,
        color: [u8; 4],
    ) -> DrawResult<()> {
        for path in self.outlines() {
            hairline(target, area, &path, ctm, color)?;
        }
        Ok(())
    }
}

/// Everything needed to render a leaf away from its drawing.
#[derive(Clone, Debug)]
pub struct LeafSnapshot {
    pub(crate) content: Content,
    pub(crate) ctm: Affine,
    pub(crate) opacity: f32,
    pub(crate) clip: Option<Arc<BezPath>>,
    pub(crate) antialias: bool,
}

impl LeafSnapshot {
    /// Paint the leaf with its clip and opacity into `target`, limited to `area`.
    pub fn paint(&self, target: &mut Surface, area: IntRect) -> DrawResult<()> {
        let spec = LayerSpec {
            opacity: self.opacity,
            clip: self.clip.as_deref().map(|c| (c, self.ctm)),
            filter: None,
            antialias: self.antialias,
        };
        render_layered(target, area, &spec, |surface, a| {
            self.content.paint(surface, a, self.ctm, self.antialias)
        })
    }
}

/// What an item is.
#[derive(Clone, Debug)]
pub(crate) enum ItemKind {
    Group { pick_children: bool },
    Leaf(Content),
}

/// One node of the drawing tree.
#[derive(Debug)]
pub(crate) struct DrawingItem {
    pub(crate) kind: ItemKind,
    pub(crate) parent: Option<ItemId>,
    pub(crate) children: Vec<ItemId>,
    pub(crate) child_type: ChildType,
    pub(crate) transform: Option<Affine>,
    pub(crate) ctm: Affine,
    pub(crate) bbox: Option<IntRect>,
    pub(crate) drawbox: Option<IntRect>,
    pub(crate) user_bbox: Option<Rect>,
    pub(crate) visible: bool,
    pub(crate) sensitive: bool,
    pub(crate) opacity: f32,
    pub(crate) antialias: Option<Antialiasing>,
    pub(crate) clip: Option<Arc<BezPath>>,
    pub(crate) filter: Option<Arc<Filter>>,
    pub(crate) state: StateFlags,
    pub(crate) propagate_state: StateFlags,
    pub(crate) cached: bool,
    pub(crate) cache_persistent: bool,
    pub(crate) cache: Option<SharedCache>,
}

impl DrawingItem {
    pub(crate) fn new(kind: ItemKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            child_type: ChildType::Orphan,
            transform: None,
            ctm: Affine::IDENTITY,
            bbox: None,
            drawbox: None,
            user_bbox: None,
            visible: true,
            sensitive: true,
            opacity: 1.0,
            antialias: None,
            clip: None,
            filter: None,
            state: StateFlags::empty(),
            propagate_state: StateFlags::empty(),
            cached: false,
            cache_persistent: false,
            cache: None,
        }
    }

    pub(crate) fn content(&self) -> Option<&Content> {
        match &self.kind {
            ItemKind::Leaf(c) => Some(c),
            ItemKind::Group { .. } => None,
        }
    }

    /// Bounding box of the clip path in device space.
    pub(crate) fn clip_box(&self) -> Option<IntRect> {
        let clip = self.clip.as_ref()?;
        IntRect::round_out(self.ctm.transform_rect_bbox(clip.bounding_box()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/drawing/item.rs"]
mod tests;
