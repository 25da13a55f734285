pub mod eviction;
pub mod item;
mod traverse;
pub mod tree;
