//! Judge trait definition.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::JudgeError;
use crate::types::{ComponentId, ComponentKind, TeachingContext, Verdict};

/// Evidence handed to the judge for one component.
#[derive(Debug, Clone)]
pub struct JudgeRequest {
    pub component: ComponentId,
    pub kind: ComponentKind,
    /// Ordered captures, `initial` first.
    pub screenshots: Vec<PathBuf>,
    /// One line per action performed on the page.
    pub interaction_log: Vec<String>,
    pub context: TeachingContext,
}

/// Vision-capable scorer.
///
/// An unparseable model reply is not an error: implementations return
/// [`Verdict::degraded`]. Errors are reserved for failed calls.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, request: JudgeRequest) -> Result<Verdict, JudgeError>;
}
