//! Post-processing passes

mod resolve;
mod tonemapping;

pub use resolve::*;
pub use tonemapping::*;
