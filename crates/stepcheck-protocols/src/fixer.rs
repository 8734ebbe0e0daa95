//! Fixer trait definition.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::FixerError;
use crate::types::{ComponentId, ComponentKind};

/// Everything the fixer needs to regenerate one component.
#[derive(Debug, Clone)]
pub struct FixRequest {
    pub component: ComponentId,
    pub kind: ComponentKind,
    /// Assembled fix instructions.
    pub prompt: String,
    pub current_source: String,
    /// Visual evidence of the problems.
    pub screenshots: Vec<PathBuf>,
}

/// Regenerates component source from feedback.
///
/// `Ok(None)` means the fixer ran but produced nothing usable.
#[async_trait]
pub trait Fixer: Send + Sync {
    async fn fix(&self, request: FixRequest) -> Result<Option<String>, FixerError>;
}
