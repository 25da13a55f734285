//! Recursive passes over the drawing tree: update, render and pick.

use std::sync::atomic::Ordering;

use kurbo::{ParamCurveNearest, Shape};

use crate::drawing::eviction::CacheRecord;
use crate::drawing::item::{
    Antialiasing, Content, DrawingItem, ItemId, ItemKind, PickFlags, RenderFlags, StateFlags,
};
use crate::drawing::tree::{ColorMode, Drawing};
use crate::foundation::core::{Affine, IntRect, Point, Rect, intersect_opt, union_opt};
use crate::foundation::error::DrawResult;
use crate::foundation::math::{SINGULAR_EPSILON, descrim, is_singular};
use crate::render::cache::{DrawingCache, lock_cache};
use crate::render::composite::{FilterPass, LayerSpec, over_surface, render_layered};
use crate::render::raster::{hairline, rect_path};
use crate::render::surface::Surface;

/// Side of the probe square used to measure how much a filter enlarges its input.
const FILTER_PROBE: i32 = 16;
/// Weight of the clip area in the cache score.
const CLIP_SCORE_WEIGHT: f64 = 0.5;
/// Bytes per cached pixel.
const CACHE_BYTES_PER_PIXEL: u64 = 4;

impl Drawing {
    /// Recompute the stale `flags` of every item intersecting `area`, after resetting
    /// `reset` everywhere.
    ///
    /// `None` is an empty area: nothing is updated. Cache selection runs afterwards when
    /// cache state was requested or reset.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn update(&mut self, area: Option<IntRect>, flags: StateFlags, reset: StateFlags) {
        if area.is_none() {
            return;
        }
        self.update_pass(area, flags, reset);
    }

    /// Like [`Drawing::update`] over an unbounded area.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn update_all(&mut self, flags: StateFlags, reset: StateFlags) {
        self.update_pass(None, flags, reset);
    }

    fn update_pass(&mut self, area: Option<IntRect>, flags: StateFlags, reset: StateFlags) {
        let Some(root) = self.root else {
            return;
        };
        let ctx = self
            .host
            .as_ref()
            .map(|h| h.update_context())
            .unwrap_or_default();
        self.update_item(root, area, ctx.ctm, flags, reset);
        if flags.intersects(StateFlags::CACHE) || reset.intersects(StateFlags::CACHE) {
            self.pick_items_for_caching();
        }
    }

    /// `area` of `None` is unbounded here.
    fn update_item(
        &mut self,
        id: ItemId,
        area: Option<IntRect>,
        parent_ctm: Affine,
        flags: StateFlags,
        reset: StateFlags,
    ) {
        let outline = self.outline();
        let min_half_width = if outline || self.visible_hairlines() {
            0.5
        } else {
            0.0
        };
        let render_filters = self.render_filters();

        let Some(item) = self.item_mut(id) else {
            return;
        };
        if !item.visible {
            item.state = StateFlags::ALL;
            self.candidates.remove(&id);
            return;
        }
        let reset = reset | item.propagate_state;
        item.propagate_state = StateFlags::empty();
        item.state = item.state.difference(reset);
        if item.state.contains(flags) {
            return;
        }
        if item.state.contains(StateFlags::BBOX) {
            if let Some(area) = area {
                let visible = if outline { item.bbox } else { item.drawbox };
                if !visible.is_some_and(|b| b.intersects(area)) {
                    return;
                }
            }
        }

        let old_ctm = item.ctm;
        let ctm = match item.transform {
            Some(t) => parent_ctm * t,
            None => parent_ctm,
        };
        item.ctm = ctm;
        let singular = is_singular(ctm, SINGULAR_EPSILON);

        let leaf_bounds = item.content().map(|content| {
            let bbox = if singular {
                None
            } else {
                content.device_bounds(ctm, min_half_width)
            };
            (bbox, content.user_bounds())
        });
        let (bbox, user_bbox) = match leaf_bounds {
            Some(bounds) => bounds,
            None => {
                let children = item.children.clone();
                for &child in &children {
                    self.update_item(child, area, ctm, flags, reset);
                }
                self.group_bounds(&children, outline)
            }
        };

        let Some(item) = self.item_mut(id) else {
            return;
        };
        item.user_bbox = user_bbox;
        item.bbox = bbox;
        item.drawbox = bbox;
        if render_filters && !singular {
            if let Some(filter) = &item.filter {
                item.drawbox = filter.effect_region(user_bbox, ctm);
            }
        }
        if !outline {
            if let Some(clip_box) = item.clip_box() {
                item.bbox = intersect_opt(item.bbox, Some(clip_box));
                item.drawbox = intersect_opt(item.drawbox, Some(clip_box));
            }
        }

        if flags.contains(StateFlags::CACHE) {
            self.update_cache_state(id, old_ctm);
        }
        if flags.contains(StateFlags::RENDER) {
            let repaint = self
                .item(id)
                .is_some_and(|i| matches!(i.kind, ItemKind::Leaf(_)) || i.filter.is_some());
            if repaint {
                self.mark_for_rendering(id);
            }
        }
        if let Some(item) = self.item_mut(id) {
            item.state |= flags;
        }
    }

    fn group_bounds(&self, children: &[ItemId], outline: bool) -> (Option<IntRect>, Option<Rect>) {
        let mut bbox = None;
        let mut user_bbox: Option<Rect> = None;
        for child in children.iter().filter_map(|&c| self.item(c)) {
            if !child.visible {
                continue;
            }
            bbox = union_opt(bbox, if outline { child.bbox } else { child.drawbox });
            if let Some(ub) = child.user_bbox {
                let ub = child.transform.unwrap_or(Affine::IDENTITY).transform_rect_bbox(ub);
                user_bbox = Some(user_bbox.map_or(ub, |b| b.union(ub)));
            }
        }
        (bbox, user_bbox)
    }

    /// Score and byte cost of caching the item, `None` when it has no cache rect.
    pub(crate) fn cache_score(&self, item: &DrawingItem) -> Option<(f64, usize)> {
        let rect = intersect_opt(item.drawbox, self.cache_limit)?;
        let mut score = rect.area() as f64;
        if self.render_filters() {
            if let Some(filter) = &item.filter {
                let trans = filter.primitive_transform(item.user_bbox, item.ctm);
                score *= filter.complexity(trans);
                if let Some(probe) = IntRect::new(0, 0, FILTER_PROBE, FILTER_PROBE) {
                    let grown = filter.area_enlarge(probe, trans);
                    score *= grown.area() as f64 / probe.area() as f64;
                }
            }
        }
        if let Some(clip_box) = item.clip_box() {
            score += clip_box.area() as f64 * CLIP_SCORE_WEIGHT;
        }
        let cost = rect.area().saturating_mul(CACHE_BYTES_PER_PIXEL);
        Some((score, usize::try_from(cost).unwrap_or(usize::MAX)))
    }

    fn update_cache_state(&mut self, id: ItemId, old_ctm: Affine) {
        let threshold = self.cache_score_threshold();
        let is_root = self.root == Some(id);
        let limit = self.cache_limit;
        let Some(item) = self.item(id) else {
            return;
        };
        let record = self
            .cache_score(item)
            .filter(|_| !is_root)
            .filter(|&(score, _)| item.cache_persistent || score >= threshold)
            .map(|(score, cost)| CacheRecord {
                item: id,
                score,
                cost,
                persistent: item.cache_persistent,
            });
        let cached = item.cached.then(|| item.cache.clone()).flatten();
        let cache_rect = intersect_opt(item.drawbox, limit);
        let ctm_changed = item.ctm != old_ctm;

        match record {
            Some(r) => {
                self.candidates.insert(id, r);
            }
            None => {
                self.candidates.remove(&id);
            }
        }

        let Some(shared) = cached else {
            return;
        };
        let Some(rect) = cache_rect else {
            self.set_cached(id, false);
            return;
        };
        let current = lock_cache(&shared).rect();
        if current != rect {
            match DrawingCache::new(rect) {
                Ok(fresh) => shared.replace(fresh),
                Err(err) => {
                    tracing::warn!(%id, %err, "cache reallocation failed");
                    self.set_cached(id, false);
                }
            }
        } else if ctm_changed {
            shared.invalidate();
        }
    }

    // ---- render -----------------------------------------------------------------------

    /// Paint the drawing into `target`, limited to `area`.
    ///
    /// `antialias` overrides the root's antialiasing for this pass.
    #[tracing::instrument(level = "trace", skip(self, target))]
    pub fn render(
        &self,
        target: &mut Surface,
        area: IntRect,
        flags: RenderFlags,
        antialias: Option<Antialiasing>,
    ) {
        let Some(area) = area.intersect(target.rect()) else {
            return;
        };
        let Some(root) = self.root else {
            return;
        };

        if self.outline() {
            if let Err(err) = self.render_outline(root, target, area, self.outline_color) {
                tracing::warn!(%err, "outline render failed");
            }
            return;
        }

        let root_aa = antialias.unwrap_or_else(|| self.effective_antialias(root));
        if let Err(err) = self.render_item(root, target, area, flags, root_aa) {
            tracing::warn!(%err, "render failed");
        }

        if self.outline_overlay() {
            let overlay = Surface::new(area).and_then(|mut layer| {
                self.render_outline(root, &mut layer, area, self.outline_color)?;
                Ok(layer)
            });
            match overlay {
                Ok(layer) => over_surface(target, &layer, area, self.outline_overlay_opacity),
                Err(err) => tracing::warn!(%err, "outline overlay failed"),
            }
        }

        if self.color_mode() == ColorMode::Grayscale {
            target.apply_color_matrix(&self.grayscale_matrix, area);
        }
    }

    /// `inherited` is the antialiasing of the parent.
    fn render_item(
        &self,
        id: ItemId,
        target: &mut Surface,
        area: IntRect,
        flags: RenderFlags,
        inherited: Antialiasing,
    ) -> DrawResult<()> {
        let Some(item) = self.item(id) else {
            return Ok(());
        };
        if !item.visible || is_singular(item.ctm, SINGULAR_EPSILON) {
            return Ok(());
        }
        let antialias = if self.root == Some(id) {
            inherited
        } else {
            item.antialias.unwrap_or(inherited)
        };
        let Some(carea) = intersect_opt(Some(area), item.drawbox) else {
            return Ok(());
        };

        if item.cached && !flags.contains(RenderFlags::BYPASS_CACHE) {
            if let Some(shared) = &item.cache {
                // A worker filling this cache holds the lock; paint live meanwhile.
                if let Some(mut cache) = shared.try_lock() {
                    if !cache.is_clean() {
                        let rect = cache.rect();
                        let mut fill = Surface::new(rect)?;
                        self.render_layer(item, &mut fill, rect, flags, antialias)?;
                        cache.store(&fill);
                    }
                    if cache.rect().contains_rect(carea) {
                        cache.paint_onto(target, carea);
                        return Ok(());
                    }
                }
            }
        }
        self.render_layer(item, target, carea, flags, antialias)
    }

    fn render_layer(
        &self,
        item: &DrawingItem,
        target: &mut Surface,
        area: IntRect,
        flags: RenderFlags,
        antialias: Antialiasing,
    ) -> DrawResult<()> {
        let filter = item
            .filter
            .as_deref()
            .filter(|_| self.render_filters())
            .map(|filter| FilterPass {
                filter,
                item_bbox: item.user_bbox,
                ctm: item.ctm,
                quality: self.filter_quality(),
                blur_quality: self.blur_quality(),
            });
        let spec = LayerSpec {
            opacity: item.opacity,
            clip: item.clip.as_deref().map(|c| (c, item.ctm)),
            filter,
            antialias: antialias.enabled(),
        };
        render_layered(target, area, &spec, |surface, a| match &item.kind {
            ItemKind::Leaf(content) => content.paint(surface, a, item.ctm, antialias.enabled()),
            ItemKind::Group { .. } => {
                for &child in &item.children {
                    self.render_item(child, surface, a, flags, antialias)?;
                }
                Ok(())
            }
        })
    }

    fn render_outline(
        &self,
        id: ItemId,
        target: &mut Surface,
        area: IntRect,
        color: [u8; 4],
    ) -> DrawResult<()> {
        let Some(item) = self.item(id) else {
            return Ok(());
        };
        if !item.visible || is_singular(item.ctm, SINGULAR_EPSILON) {
            return Ok(());
        }
        if !item.bbox.is_some_and(|b| b.intersects(area)) {
            return Ok(());
        }
        match &item.kind {
            ItemKind::Leaf(content) => content.paint_outline(target, area, item.ctm, color)?,
            ItemKind::Group { .. } => {
                for &child in &item.children {
                    self.render_outline(child, target, area, color)?;
                }
            }
        }
        if let Some(clip) = &item.clip {
            hairline(target, area, clip, item.ctm, color)?;
        }
        Ok(())
    }

    /// Mean premultiplied colour of `area` as rendered now, channels in `[0, 1]`.
    pub fn average_color(&self, area: IntRect) -> [f64; 4] {
        match Surface::new(area) {
            Ok(mut surface) => {
                self.render(&mut surface, area, RenderFlags::empty(), None);
                surface.average_color()
            }
            Err(err) => {
                tracing::warn!(%err, "average_color area too large");
                [0.0; 4]
            }
        }
    }

    // ---- pick -------------------------------------------------------------------------

    /// Topmost item under device point `p`, within `delta` device pixels.
    pub fn pick(&self, p: Point, delta: f64, flags: PickFlags) -> Option<ItemId> {
        let Some(root) = self.root else {
            if !self.no_root_logged.swap(true, Ordering::Relaxed) {
                tracing::warn!("pick on a drawing without a root");
            }
            return None;
        };
        let outline = flags.contains(PickFlags::OUTLINE) || (self.outline() && self.outline_sensitive());
        self.pick_item(root, p, delta.max(0.0), flags, outline)
    }

    fn pick_item(
        &self,
        id: ItemId,
        p: Point,
        delta: f64,
        flags: PickFlags,
        outline: bool,
    ) -> Option<ItemId> {
        let item = self.item(id)?;
        if !flags.contains(PickFlags::STICKY) && !(item.visible && item.sensitive) {
            return None;
        }
        if is_singular(item.ctm, SINGULAR_EPSILON) {
            return None;
        }
        let bounds = if outline { item.bbox } else { item.drawbox }?;
        if !bounds.to_rect().inflate(delta, delta).contains(p) {
            return None;
        }
        if !outline {
            if let Some(clip) = &item.clip {
                let user = item.ctm.inverse() * p;
                if clip.winding(user) == 0 {
                    return None;
                }
            }
        }

        match &item.kind {
            ItemKind::Group { pick_children } => item
                .children
                .iter()
                .rev()
                .find_map(|&c| self.pick_item(c, p, delta, flags, outline))
                .map(|hit| if *pick_children { hit } else { id }),
            ItemKind::Leaf(content) => {
                pick_content(content, item.ctm, p, delta, outline).then_some(id)
            }
        }
    }
}

fn near_outline(path: &kurbo::BezPath, ctm: Affine, p: Point, reach: f64) -> bool {
    let device = ctm * path.clone();
    let reach_sq = reach * reach;
    device
        .segments()
        .any(|seg| seg.nearest(p, 1e-3).distance_sq <= reach_sq)
}

fn pick_content(content: &Content, ctm: Affine, p: Point, delta: f64, outline: bool) -> bool {
    match content {
        Content::Shape(s) => {
            if outline {
                return near_outline(&s.path, ctm, p, delta + 0.5);
            }
            if s.fill.is_some() {
                let device = ctm * s.path.clone();
                if s.fill_rule.contains(device.winding(p)) {
                    return true;
                }
            }
            let half = s
                .stroke
                .as_ref()
                .map_or(0.0, |st| st.style.width.abs() / 2.0 * descrim(ctm));
            (s.stroke.is_some() || delta > 0.0) && near_outline(&s.path, ctm, p, delta + half)
        }
        Content::Image(i) => {
            if outline {
                return near_outline(&rect_path(i.rect()), ctm, p, delta + 0.5);
            }
            i.alpha_at(ctm.inverse() * p).is_some_and(|a| a > 0)
        }
        Content::Text(t) => t.glyphs.iter().any(|g| {
            ctm.transform_rect_bbox(g.bounding_box())
                .inflate(delta, delta)
                .contains(p)
        }),
    }
}
