pub mod cache;
pub mod composite;
pub mod prerender;
pub mod raster;
pub mod surface;
