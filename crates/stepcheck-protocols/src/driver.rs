//! Browser driver trait definition.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DriverError;

/// A screenshot written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub path: PathBuf,
    pub bytes: usize,
}

/// A console message observed on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// `log`, `warning`, `error`, `exception`, ...
    pub level: String,
    pub text: String,
}

impl ConsoleMessage {
    pub fn is_error(&self) -> bool {
        matches!(self.level.as_str(), "error" | "exception" | "assert")
    }
}

/// A single logical browser session operating on one page at a time.
///
/// Ordinary failures come back as scoped [`DriverError`] variants. A lost
/// session is reported as [`DriverError::SessionLost`]; callers recover by
/// calling [`BrowserDriver::connect`] again.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Connect, or reconnect after the session was lost.
    async fn connect(&self) -> Result<(), DriverError>;

    /// Navigate the page and wait until it has loaded.
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Capture the page as PNG to `path`.
    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<Screenshot, DriverError>;

    /// Evaluate a script and return its value by JSON.
    async fn evaluate_script(&self, script: &str) -> Result<Value, DriverError>;

    /// Wait until `selector` matches an element. Gives up with
    /// [`DriverError::Timeout`] after `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Start recording the page as numbered frames written into `dir`.
    async fn start_recording(&self, dir: &Path) -> Result<(), DriverError>;

    /// Stop recording and return the frames written, oldest first.
    async fn stop_recording(&self) -> Result<Vec<PathBuf>, DriverError>;

    /// Drain console messages captured since the last call.
    async fn console_messages(&self) -> Result<Vec<ConsoleMessage>, DriverError> {
        Ok(Vec::new())
    }

    /// Close the session.
    async fn close(&self) -> Result<(), DriverError>;
}
