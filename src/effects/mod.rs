pub mod blur;
pub mod color_matrix;
pub mod filter;
pub mod light;
pub mod lighting;
