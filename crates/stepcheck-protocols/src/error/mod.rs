//! Error types for the collaborator boundary.

mod driver;
mod fixer;
mod judge;

pub use driver::*;
pub use fixer::*;
pub use judge::*;
