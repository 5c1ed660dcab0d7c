//! Benchmark objectives grouped by landscape character

pub mod constrained;
pub mod multimodal;
pub mod polynomial;
pub mod unimodal;

pub use constrained::*;
pub use multimodal::*;
pub use polynomial::*;
pub use unimodal::*;
