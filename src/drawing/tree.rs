use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::drawing::eviction::{CacheRecord, pick_items_for_caching};
use crate::drawing::item::{
    Antialiasing, ChildType, Content, DrawingItem, ImageData, ItemId, ItemKind, LeafSnapshot,
    ShapeData, StateFlags, TextData,
};
use crate::effects::color_matrix::ColorMatrix;
use crate::effects::filter::Filter;
use crate::foundation::config::{
    ConfigSource, DrawingConfig, Quality, hardware_concurrency, resolve_thread_count,
};
use crate::foundation::core::{Affine, BezPath, IntRect, intersect_opt};
use crate::foundation::error::{DrawError, DrawResult};
use crate::foundation::math::{SINGULAR_EPSILON, is_singular};
use crate::render::cache::{DrawingCache, SharedCache};
use crate::render::prerender::{PrerenderJob, PrerenderPool};

/// How items are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Full rendering.
    #[default]
    Normal,
    /// One-pixel outlines only.
    Outline,
    /// Full rendering with outlines drawn on top.
    OutlineOverlay,
    /// Full rendering with strokes at least one device pixel wide.
    VisibleHairlines,
}

/// Colour post-processing of a render pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Colours as painted.
    #[default]
    Normal,
    /// Luminance through the grayscale matrix.
    Grayscale,
}

/// Viewport state handed to an update pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateContext {
    /// Document-to-device transform applied above the root.
    pub ctm: Affine,
}

impl Default for UpdateContext {
    fn default() -> Self {
        Self {
            ctm: Affine::IDENTITY,
        }
    }
}

/// Canvas that displays a drawing.
pub trait DrawingHost {
    /// Viewport used by the next update.
    fn update_context(&self) -> UpdateContext {
        UpdateContext::default()
    }

    /// A device area needs repainting.
    fn redraw_area(&self, _area: IntRect) {}

    /// Some item state went stale; an update should be scheduled.
    fn request_update(&self) {}
}

struct Slot {
    generation: u32,
    item: Option<DrawingItem>,
}

/// Retained drawing tree with per-item render caches.
///
/// All tree operations run on one thread; only cache fills are handed to the prerender
/// pool.
pub struct Drawing {
    slots: Vec<Slot>,
    free: Vec<u32>,
    pub(crate) root: Option<ItemId>,

    render_mode: RenderMode,
    color_mode: ColorMode,
    exact: bool,
    outline_sensitive: bool,
    blur_quality: Quality,
    filter_quality: Quality,
    pub(crate) grayscale_matrix: ColorMatrix,
    pub(crate) outline_color: [u8; 4],
    pub(crate) outline_overlay_opacity: f32,

    pub(crate) cache_limit: Option<IntRect>,
    cache_budget: Option<usize>,
    cache_score_threshold: Option<f64>,
    cached_items: BTreeSet<ItemId>,
    pub(crate) candidates: BTreeMap<ItemId, CacheRecord>,

    config: Arc<dyn ConfigSource>,
    pub(crate) host: Option<Box<dyn DrawingHost>>,
    damage: Vec<IntRect>,
    pool: Option<PrerenderPool>,
    pub(crate) no_root_logged: AtomicBool,
}

impl Default for Drawing {
    fn default() -> Self {
        Self::new()
    }
}

impl Drawing {
    /// Empty drawing with default configuration.
    pub fn new() -> Self {
        Self::with_config(DrawingConfig::default())
    }

    /// Empty drawing using `config` for both its knobs and its lazily read values.
    pub fn with_config(config: DrawingConfig) -> Self {
        let mut drawing = Self::with_config_source(Arc::new(config.clone()));
        drawing.blur_quality = config.blur_quality;
        drawing.filter_quality = config.filter_quality;
        drawing.outline_color = config.outline_color;
        drawing.outline_overlay_opacity = config.outline_overlay_opacity.clamp(0.0, 1.0);
        drawing
    }

    /// Empty drawing reading thread count, cache budget and threshold from `source`.
    pub fn with_config_source(source: Arc<dyn ConfigSource>) -> Self {
        let defaults = DrawingConfig::default();
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            render_mode: RenderMode::Normal,
            color_mode: ColorMode::Normal,
            exact: false,
            outline_sensitive: true,
            blur_quality: defaults.blur_quality,
            filter_quality: defaults.filter_quality,
            grayscale_matrix: ColorMatrix::GRAYSCALE,
            outline_color: defaults.outline_color,
            outline_overlay_opacity: defaults.outline_overlay_opacity,
            cache_limit: None,
            cache_budget: None,
            cache_score_threshold: None,
            cached_items: BTreeSet::new(),
            candidates: BTreeMap::new(),
            config: source,
            host: None,
            damage: Vec::new(),
            pool: None,
            no_root_logged: AtomicBool::new(false),
        }
    }

    /// Attach the canvas that provides update contexts and receives redraw requests.
    pub fn set_host(&mut self, host: Option<Box<dyn DrawingHost>>) {
        self.host = host;
    }

    // ---- arena ------------------------------------------------------------------------

    fn alloc(&mut self, item: DrawingItem) -> ItemId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.item = Some(item);
            return ItemId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            item: Some(item),
        });
        ItemId {
            index,
            generation: 0,
        }
    }

    pub(crate) fn item(&self, id: ItemId) -> Option<&DrawingItem> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.item.as_ref())
    }

    pub(crate) fn item_mut(&mut self, id: ItemId) -> Option<&mut DrawingItem> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.item.as_mut())
    }

    fn destroy_subtree(&mut self, id: ItemId) {
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            let Some(slot) = self
                .slots
                .get_mut(cur.index as usize)
                .filter(|s| s.generation == cur.generation)
            else {
                continue;
            };
            if let Some(item) = slot.item.take() {
                stack.extend(item.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(cur.index);
            self.cached_items.remove(&cur);
            self.candidates.remove(&cur);
        }
    }

    // ---- construction -----------------------------------------------------------------

    /// New orphan group.
    pub fn create_group(&mut self) -> ItemId {
        self.alloc(DrawingItem::new(ItemKind::Group {
            pick_children: false,
        }))
    }

    /// New orphan shape.
    pub fn create_shape(&mut self, shape: ShapeData) -> ItemId {
        self.alloc(DrawingItem::new(ItemKind::Leaf(Content::Shape(Arc::new(
            shape,
        )))))
    }

    /// New orphan image.
    pub fn create_image(&mut self, image: ImageData) -> ItemId {
        self.alloc(DrawingItem::new(ItemKind::Leaf(Content::Image(Arc::new(
            image,
        )))))
    }

    /// New orphan text.
    pub fn create_text(&mut self, text: TextData) -> ItemId {
        self.alloc(DrawingItem::new(ItemKind::Leaf(Content::Text(Arc::new(
            text,
        )))))
    }

    /// Install `item` as root, destroying the previous root subtree; `None` clears.
    pub fn set_root(&mut self, item: Option<ItemId>) {
        if let Some(old) = self.root {
            if Some(old) != item {
                self.mark_for_rendering(old);
                self.destroy_subtree(old);
            }
        }
        self.root = None;
        let Some(id) = item else {
            return;
        };
        let Some(it) = self.item_mut(id) else {
            tracing::warn!(%id, "set_root with a stale item handle");
            return;
        };
        debug_assert!(
            matches!(it.child_type, ChildType::Orphan | ChildType::Root),
            "root must not have a parent"
        );
        if it.child_type == ChildType::Normal {
            tracing::warn!(%id, "set_root with an attached item ignored");
            return;
        }
        it.child_type = ChildType::Root;
        self.root = Some(id);
        self.mark_for_update(id, StateFlags::ALL, true);
    }

    /// Current root.
    pub fn root(&self) -> Option<ItemId> {
        self.root
    }

    fn check_insert(&self, parent: ItemId, child: ItemId) -> DrawResult<()> {
        let p = self
            .item(parent)
            .ok_or_else(|| DrawError::validation(format!("{parent} is not alive")))?;
        if !matches!(p.kind, ItemKind::Group { .. }) {
            return Err(DrawError::validation(format!("{parent} is not a group")));
        }
        let c = self
            .item(child)
            .ok_or_else(|| DrawError::validation(format!("{child} is not alive")))?;
        if c.child_type != ChildType::Orphan {
            return Err(DrawError::validation(format!("{child} is already attached")));
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(DrawError::validation(format!(
                "{child} cannot become its own descendant"
            )));
        }
        Ok(())
    }

    fn insert_child(&mut self, parent: ItemId, child: ItemId, front: bool) -> DrawResult<()> {
        self.check_insert(parent, child)?;
        if let Some(c) = self.item_mut(child) {
            c.parent = Some(parent);
            c.child_type = ChildType::Normal;
        }
        if let Some(p) = self.item_mut(parent) {
            if front {
                p.children.insert(0, child);
            } else {
                p.children.push(child);
            }
        }
        self.mark_for_update(parent, StateFlags::ALL, true);
        Ok(())
    }

    /// Attach an orphan as the topmost child of a group.
    pub fn append_child(&mut self, parent: ItemId, child: ItemId) -> DrawResult<()> {
        self.insert_child(parent, child, false)
    }

    /// Attach an orphan as the bottommost child of a group.
    pub fn prepend_child(&mut self, parent: ItemId, child: ItemId) -> DrawResult<()> {
        self.insert_child(parent, child, true)
    }

    /// Detach and destroy an item with its whole subtree.
    pub fn remove_item(&mut self, id: ItemId) {
        let Some(item) = self.item(id) else {
            return;
        };
        let parent = item.parent;
        self.mark_for_rendering(id);
        match parent {
            Some(p) => {
                if let Some(pi) = self.item_mut(p) {
                    pi.children.retain(|&c| c != id);
                }
                self.mark_for_update(p, StateFlags::ALL, false);
            }
            None if self.root == Some(id) => self.root = None,
            None => {}
        }
        self.destroy_subtree(id);
    }

    // ---- accessors --------------------------------------------------------------------

    /// Whether `id` refers to a live item.
    pub fn contains(&self, id: ItemId) -> bool {
        self.item(id).is_some()
    }

    /// Number of live items.
    pub fn item_count(&self) -> usize {
        self.slots.iter().filter(|s| s.item.is_some()).count()
    }

    /// Parent group.
    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.item(id)?.parent
    }

    /// Children, bottom to top.
    pub fn children(&self, id: ItemId) -> &[ItemId] {
        self.item(id).map(|i| i.children.as_slice()).unwrap_or(&[])
    }

    /// Attachment kind.
    pub fn child_type(&self, id: ItemId) -> Option<ChildType> {
        Some(self.item(id)?.child_type)
    }

    /// Device bounding box from the last update.
    pub fn bbox(&self, id: ItemId) -> Option<IntRect> {
        self.item(id)?.bbox
    }

    /// Device area the item may paint (filter region and clip applied).
    pub fn drawbox(&self, id: ItemId) -> Option<IntRect> {
        self.item(id)?.drawbox
    }

    /// User-to-device transform from the last update.
    pub fn ctm(&self, id: ItemId) -> Option<Affine> {
        Some(self.item(id)?.ctm)
    }

    /// Whether the item is flagged cached.
    pub fn is_cached(&self, id: ItemId) -> bool {
        self.item(id).is_some_and(|i| i.cached)
    }

    /// The item's cache surface, if it has one.
    pub fn cache_of(&self, id: ItemId) -> Option<SharedCache> {
        self.item(id)?.cache.clone()
    }

    /// Items currently flagged cached.
    pub fn cached_items(&self) -> &BTreeSet<ItemId> {
        &self.cached_items
    }

    /// Candidates of the last update, best first.
    pub fn candidates(&self) -> Vec<CacheRecord> {
        let mut v: Vec<CacheRecord> = self.candidates.values().copied().collect();
        v.sort();
        v
    }

    /// Drain the device areas reported for repainting since the last call.
    pub fn take_damage(&mut self) -> Vec<IntRect> {
        std::mem::take(&mut self.damage)
    }

    pub(crate) fn ancestors(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        std::iter::successors(self.item(id).and_then(|i| i.parent), move |&p| {
            self.item(p).and_then(|i| i.parent)
        })
    }

    pub(crate) fn effective_antialias(&self, id: ItemId) -> Antialiasing {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|i| self.item(i).and_then(|it| it.antialias))
            .unwrap_or_default()
    }

    // ---- state propagation ------------------------------------------------------------

    /// Clear `flags` on the item and its ancestors; with `propagate` the item's whole
    /// subtree is reset on its next update.
    pub fn mark_for_update(&mut self, id: ItemId, flags: StateFlags, propagate: bool) {
        let mut cur = Some(id);
        let mut propagate = propagate;
        while let Some(c) = cur {
            let Some(item) = self.item_mut(c) else {
                return;
            };
            if propagate {
                item.propagate_state |= flags;
                propagate = false;
            }
            if !item.state.intersects(flags) {
                return;
            }
            item.state = item.state.difference(flags);
            cur = item.parent;
        }
        if let Some(host) = &self.host {
            host.request_update();
        }
    }

    /// Report the item's current area for repainting and dirty every cache that shows it.
    pub fn mark_for_rendering(&mut self, id: ItemId) {
        let outline = self.outline();
        let Some(item) = self.item(id) else {
            return;
        };
        let Some(dirty) = (if outline { item.bbox } else { item.drawbox }) else {
            return;
        };
        for i in std::iter::once(id).chain(self.ancestors(id)) {
            if let Some(cache) = self.item(i).and_then(|it| it.cache.as_ref()) {
                cache.invalidate();
            }
        }
        self.damage.push(dirty);
        if let Some(host) = &self.host {
            host.redraw_area(dirty);
        }
    }

    // ---- item properties --------------------------------------------------------------

    /// Replace the item's transform; identity is stored as `None`.
    pub fn set_transform(&mut self, id: ItemId, transform: Option<Affine>) {
        let transform = transform.filter(|t| *t != Affine::IDENTITY);
        if self.item(id).is_none_or(|i| i.transform == transform) {
            return;
        }
        self.mark_for_rendering(id);
        if let Some(item) = self.item_mut(id) {
            item.transform = transform;
        }
        self.mark_for_update(id, StateFlags::ALL, true);
    }

    /// Show or hide the item.
    pub fn set_visible(&mut self, id: ItemId, visible: bool) {
        if self.item(id).is_none_or(|i| i.visible == visible) {
            return;
        }
        self.mark_for_rendering(id);
        if let Some(item) = self.item_mut(id) {
            item.visible = visible;
        }
        self.mark_for_update(id, StateFlags::ALL, false);
    }

    /// Whether the item (and its subtree) can be picked.
    pub fn set_sensitive(&mut self, id: ItemId, sensitive: bool) {
        if let Some(item) = self.item_mut(id) {
            item.sensitive = sensitive;
        }
    }

    /// Group opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, id: ItemId, opacity: f32) {
        let opacity = if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        if self.item(id).is_none_or(|i| i.opacity == opacity) {
            return;
        }
        if let Some(item) = self.item_mut(id) {
            item.opacity = opacity;
        }
        self.mark_for_rendering(id);
    }

    /// Antialiasing of the item; `None` inherits from the parent.
    pub fn set_antialiasing(&mut self, id: ItemId, antialias: Option<Antialiasing>) {
        if self.item(id).is_none_or(|i| i.antialias == antialias) {
            return;
        }
        if let Some(item) = self.item_mut(id) {
            item.antialias = antialias;
        }
        self.mark_for_rendering(id);
        // Descendants inherit the setting, so their pixels are stale too.
        self.dirty_subtree_caches(id);
    }

    /// Clip path in the item's user space.
    pub fn set_clip(&mut self, id: ItemId, clip: Option<BezPath>) {
        if self.item(id).is_none() {
            return;
        }
        self.mark_for_rendering(id);
        if let Some(item) = self.item_mut(id) {
            item.clip = clip.map(Arc::new);
        }
        self.mark_for_update(id, StateFlags::ALL, true);
    }

    /// Filter effect.
    pub fn set_filter(&mut self, id: ItemId, filter: Option<Filter>) {
        if self.item(id).is_none() {
            return;
        }
        self.mark_for_rendering(id);
        if let Some(item) = self.item_mut(id) {
            item.filter = filter.map(Arc::new);
        }
        self.mark_for_update(id, StateFlags::ALL, true);
    }

    /// Whether picking a group returns the hit child instead of the group.
    pub fn set_pick_children(&mut self, id: ItemId, pick_children: bool) {
        if let Some(DrawingItem {
            kind: ItemKind::Group { pick_children: p },
            ..
        }) = self.item_mut(id)
        {
            *p = pick_children;
        }
    }

    fn set_content(&mut self, id: ItemId, content: Content) {
        if !self
            .item(id)
            .is_some_and(|i| matches!(i.kind, ItemKind::Leaf(_)))
        {
            tracing::warn!(%id, "content can only be replaced on leaf items");
            return;
        }
        self.mark_for_rendering(id);
        if let Some(item) = self.item_mut(id) {
            item.kind = ItemKind::Leaf(content);
        }
        self.mark_for_update(id, StateFlags::ALL, false);
    }

    /// Replace a leaf's content with a shape.
    pub fn set_shape(&mut self, id: ItemId, shape: ShapeData) {
        self.set_content(id, Content::Shape(Arc::new(shape)));
    }

    /// Replace a leaf's content with an image.
    pub fn set_image(&mut self, id: ItemId, image: ImageData) {
        self.set_content(id, Content::Image(Arc::new(image)));
    }

    /// Replace a leaf's content with text.
    pub fn set_text(&mut self, id: ItemId, text: TextData) {
        self.set_content(id, Content::Text(Arc::new(text)));
    }

    /// Persistent items are cached ahead of every scored candidate.
    pub fn set_cache_persistent(&mut self, id: ItemId, persistent: bool) {
        if let Some(item) = self.item_mut(id) {
            item.cache_persistent = persistent;
        }
        self.mark_for_update(id, StateFlags::CACHE, false);
    }

    // ---- modes ------------------------------------------------------------------------

    /// Effective render mode (`Normal` while exact rendering is on).
    pub fn render_mode(&self) -> RenderMode {
        if self.exact {
            RenderMode::Normal
        } else {
            self.render_mode
        }
    }

    /// Effective colour mode (`Normal` in outline mode or while exact).
    pub fn color_mode(&self) -> ColorMode {
        if self.outline() || self.exact {
            ColorMode::Normal
        } else {
            self.color_mode
        }
    }

    /// Whether only outlines are drawn.
    pub fn outline(&self) -> bool {
        self.render_mode() == RenderMode::Outline
    }

    /// Whether strokes are widened to a device pixel.
    pub fn visible_hairlines(&self) -> bool {
        self.render_mode() == RenderMode::VisibleHairlines
    }

    /// Whether outlines are drawn over the normal rendering.
    pub fn outline_overlay(&self) -> bool {
        self.render_mode() == RenderMode::OutlineOverlay
    }

    /// Whether filter effects are evaluated.
    pub fn render_filters(&self) -> bool {
        matches!(
            self.render_mode(),
            RenderMode::Normal | RenderMode::VisibleHairlines | RenderMode::OutlineOverlay
        )
    }

    /// Whether exact rendering is forced.
    pub fn exact(&self) -> bool {
        self.exact
    }

    /// Effective blur quality.
    pub fn blur_quality(&self) -> Quality {
        match (self.render_mode(), self.exact) {
            (RenderMode::Normal, true) => Quality::Best,
            (RenderMode::Normal, false) => self.blur_quality,
            _ => Quality::Worst,
        }
    }

    /// Effective filter quality.
    pub fn filter_quality(&self) -> Quality {
        match (self.render_mode(), self.exact) {
            (RenderMode::Normal, true) => Quality::Best,
            (RenderMode::Normal, false) => self.filter_quality,
            _ => Quality::Worst,
        }
    }

    fn invalidate_everything(&mut self) {
        if let Some(root) = self.root {
            self.mark_for_rendering(root);
            self.mark_for_update(root, StateFlags::ALL, true);
        }
        for id in std::mem::take(&mut self.cached_items) {
            if let Some(item) = self.item_mut(id) {
                item.cached = false;
                item.cache = None;
            }
        }
        self.candidates.clear();
    }

    /// Change the render mode; every cache is dropped.
    pub fn set_render_mode(&mut self, mode: RenderMode) {
        if self.render_mode == mode {
            return;
        }
        self.invalidate_everything();
        self.render_mode = mode;
    }

    /// Change the colour mode.
    pub fn set_color_mode(&mut self, mode: ColorMode) {
        if self.color_mode == mode {
            return;
        }
        self.color_mode = mode;
        if let Some(root) = self.root {
            self.mark_for_rendering(root);
        }
    }

    /// Force normal rendering at best quality.
    pub fn set_exact(&mut self, exact: bool) {
        if self.exact == exact {
            return;
        }
        self.invalidate_everything();
        self.exact = exact;
    }

    /// Configured blur quality.
    pub fn set_blur_quality(&mut self, quality: Quality) {
        if self.blur_quality == quality {
            return;
        }
        self.blur_quality = quality;
        if let Some(root) = self.root {
            self.mark_for_update(root, StateFlags::ALL, true);
            self.dirty_all_caches();
        }
    }

    /// Configured filter quality.
    pub fn set_filter_quality(&mut self, quality: Quality) {
        if self.filter_quality == quality {
            return;
        }
        self.filter_quality = quality;
        if let Some(root) = self.root {
            self.mark_for_update(root, StateFlags::ALL, true);
            self.dirty_all_caches();
        }
    }

    fn dirty_subtree_caches(&self, id: ItemId) {
        for &c in &self.cached_items {
            if c != id && !self.ancestors(c).any(|a| a == id) {
                continue;
            }
            if let Some(cache) = self.item(c).and_then(|i| i.cache.as_ref()) {
                cache.invalidate();
            }
        }
    }

    fn dirty_all_caches(&self) {
        for &id in &self.cached_items {
            if let Some(cache) = self.item(id).and_then(|i| i.cache.as_ref()) {
                cache.invalidate();
            }
        }
    }

    /// Whether picking in outline mode only hits outlines.
    pub fn set_outline_sensitive(&mut self, sensitive: bool) {
        self.outline_sensitive = sensitive;
    }

    pub(crate) fn outline_sensitive(&self) -> bool {
        self.outline_sensitive
    }

    /// Replace the matrix of the grayscale colour mode.
    pub fn set_grayscale_matrix(&mut self, matrix: ColorMatrix) {
        self.grayscale_matrix = matrix;
        if self.color_mode() == ColorMode::Grayscale {
            if let Some(root) = self.root {
                self.mark_for_rendering(root);
            }
        }
    }

    /// Matrix of the grayscale colour mode.
    pub fn grayscale_matrix(&self) -> &ColorMatrix {
        &self.grayscale_matrix
    }

    // ---- cache policy -----------------------------------------------------------------

    /// Device area outside which nothing is cached; `update_existing` re-evaluates every
    /// cached item on the next update.
    pub fn set_cache_limit(&mut self, limit: Option<IntRect>, update_existing: bool) {
        self.cache_limit = limit;
        if update_existing {
            let cached: Vec<ItemId> = self.cached_items.iter().copied().collect();
            for id in cached {
                self.mark_for_update(id, StateFlags::CACHE, false);
            }
        }
    }

    /// Cache area limit.
    pub fn cache_limit(&self) -> Option<IntRect> {
        self.cache_limit
    }

    /// Replace the cache budget and re-run the eviction policy.
    pub fn set_cache_budget(&mut self, bytes: usize) {
        self.cache_budget = Some(bytes);
        self.pick_items_for_caching();
    }

    /// Effective cache budget.
    pub fn cache_budget(&self) -> usize {
        self.cache_budget
            .unwrap_or_else(|| self.config.cache_budget())
    }

    /// Override the minimum score for cache candidates.
    pub fn set_cache_score_threshold(&mut self, threshold: f64) {
        self.cache_score_threshold = Some(threshold);
    }

    /// Effective minimum score for cache candidates.
    pub fn cache_score_threshold(&self) -> f64 {
        self.cache_score_threshold
            .unwrap_or_else(|| self.config.cache_score_threshold())
    }

    /// Allocate or free the item's cache.
    pub(crate) fn set_cached(&mut self, id: ItemId, cached: bool) {
        let limit = self.cache_limit;
        let Some(item) = self.item_mut(id) else {
            return;
        };
        if item.cached == cached {
            return;
        }
        if !cached {
            item.cached = false;
            item.cache = None;
            self.cached_items.remove(&id);
            return;
        }
        let Some(rect) = intersect_opt(item.drawbox, limit) else {
            return;
        };
        match DrawingCache::new(rect) {
            Ok(cache) => {
                item.cache = Some(cache.shared());
                item.cached = true;
                self.cached_items.insert(id);
            }
            Err(err) => tracing::warn!(%id, %err, "cache allocation failed"),
        }
    }

    /// Re-run the eviction policy over the current candidates.
    pub fn pick_items_for_caching(&mut self) {
        let budget = self.cache_budget();
        let selected = pick_items_for_caching(self.candidates.values().copied(), budget);
        let keep: BTreeSet<ItemId> = selected.iter().copied().collect();
        let to_uncache: Vec<ItemId> = self.cached_items.difference(&keep).copied().collect();
        tracing::debug!(
            budget,
            candidates = self.candidates.len(),
            selected = selected.len(),
            uncached = to_uncache.len(),
            "cache selection"
        );
        for id in to_uncache {
            self.set_cached(id, false);
        }
        for id in selected {
            self.set_cached(id, true);
        }
    }

    // ---- prerender --------------------------------------------------------------------

    fn snapshot(&self, id: ItemId, item: &DrawingItem, content: &Content) -> LeafSnapshot {
        LeafSnapshot {
            content: content.clone(),
            ctm: item.ctm,
            opacity: item.opacity,
            clip: item.clip.clone(),
            antialias: self.effective_antialias(id).enabled(),
        }
    }

    /// Hand the stale caches of cached leaves overlapping `area` to the worker pool.
    ///
    /// Returns whether a batch was issued; requests made while a batch is in flight are
    /// dropped.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn prerender(&mut self, area: IntRect) -> bool {
        if self.outline() {
            return false;
        }
        let render_filters = self.render_filters();
        let mut jobs = Vec::new();
        for &id in &self.cached_items {
            let Some(item) = self.item(id) else {
                continue;
            };
            let Some(content) = item.content().filter(|c| c.is_rasterizable()) else {
                continue;
            };
            if !item.visible || is_singular(item.ctm, SINGULAR_EPSILON) {
                continue;
            }
            if !item.drawbox.is_some_and(|d| d.intersects(area)) {
                continue;
            }
            if !item.cached || (render_filters && item.filter.is_some()) {
                continue;
            }
            let Some(cache) = &item.cache else {
                continue;
            };
            jobs.push(PrerenderJob::new(
                self.snapshot(id, item, content),
                Arc::clone(cache),
            ));
        }
        if jobs.is_empty() {
            return false;
        }

        let config = Arc::clone(&self.config);
        let pool = self.pool.get_or_insert_with(|| {
            let n = resolve_thread_count(config.thread_count(), hardware_concurrency());
            tracing::debug!(workers = n, "starting prerender pool");
            PrerenderPool::new(n, config.worker_wait())
        });
        pool.work(jobs, Some(area))
    }

    /// Block until the current prerender batch is done.
    pub fn finish_prerender(&self) {
        if let Some(pool) = &self.pool {
            pool.finish();
        }
    }

    /// Stop and join the prerender workers; a later prerender starts a new pool.
    pub fn stop_prerender(&mut self) {
        if let Some(mut pool) = self.pool.take() {
            pool.stop_threads();
        }
    }

    /// Force the pool back to accepting work.
    pub fn reset_prerender(&self) {
        if let Some(pool) = &self.pool {
            pool.reset();
        }
    }

    /// Worker count of the pool, once it exists.
    pub fn prerender_workers(&self) -> Option<usize> {
        self.pool.as_ref().map(PrerenderPool::num_workers)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/drawing/tree.rs"]
mod tests;
