//! Shared data types.

mod component;
mod evaluation;

pub use component::*;
pub use evaluation::*;
