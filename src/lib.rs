#![forbid(unsafe_code)]

pub mod drawing;
pub mod effects;
pub mod foundation;
pub mod render;

pub use drawing::eviction::{CacheRecord, pick_items_for_caching};
pub use drawing::item::{
    Antialiasing, ChildType, Content, ImageData, ItemId, PickFlags, RenderFlags, ShapeData,
    StateFlags, StrokePaint, TextData,
};
pub use drawing::tree::{ColorMode, Drawing, DrawingHost, RenderMode, UpdateContext};
pub use effects::color_matrix::ColorMatrix;
pub use effects::filter::{Filter, FilterInput, FilterPrimitive, PrimitiveOp};
pub use effects::light::{ColorInterpolation, LightSource};
pub use effects::lighting::{DiffuseLighting, SpecularLighting};
pub use foundation::config::{ConfigSource, DrawingConfig, EnvConfig, Quality, WaitStrategy};
pub use foundation::core::{Affine, BezPath, IntRect, Point, Rect, Rgba8Premul, Vec2};
pub use foundation::error::{DrawError, DrawResult};
pub use render::cache::{CacheCell, DrawingCache, SharedCache};
pub use render::prerender::{PrerenderJob, PrerenderPool};
pub use render::raster::FillRule;
pub use render::surface::Surface;
