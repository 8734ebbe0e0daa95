//! # stepcheck Protocols
//!
//! Interface definitions for the collaborators the evaluation loop talks to,
//! plus the result types that flow between them. No implementations live here.
//!
//! ## Core Traits
//!
//! - [`BrowserDriver`] - One live page: navigate, capture, run scripts
//! - [`Judge`] - Vision-model scoring of captured evidence
//! - [`Fixer`] - Regenerates a component's source from feedback

pub mod driver;
pub mod error;
pub mod fixer;
pub mod judge;
pub mod types;

pub use driver::{BrowserDriver, ConsoleMessage, Screenshot};
pub use error::{DriverError, FixerError, JudgeError};
pub use fixer::{FixRequest, Fixer};
pub use judge::{Judge, JudgeRequest};
pub use types::*;
