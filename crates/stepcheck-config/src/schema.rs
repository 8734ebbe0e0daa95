//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Where modules live, where results go, and where the viewer is served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_modules_dir")]
    pub modules_dir: PathBuf,

    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,

    #[serde(default = "default_viewer_base_url")]
    pub viewer_base_url: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            modules_dir: default_modules_dir(),
            results_dir: default_results_dir(),
            viewer_base_url: default_viewer_base_url(),
        }
    }
}

fn default_modules_dir() -> PathBuf {
    PathBuf::from("modules")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("evaluation_results")
}

fn default_viewer_base_url() -> String {
    "http://localhost:8000".to_string()
}

/// Evaluation queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Evaluations allowed per component, counting the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Evaluation calls per dequeue when the browser session is lost.
    #[serde(default = "default_crash_retries")]
    pub crash_retries: u32,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// Idle wait while only fixes are outstanding.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Backups kept per component source (0 = keep all).
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default = "default_fix_enabled")]
    pub fix_enabled: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            crash_retries: default_crash_retries(),
            reconnect_delay_secs: default_reconnect_delay(),
            poll_interval_ms: default_poll_interval(),
            backup_retention: default_backup_retention(),
            fix_enabled: default_fix_enabled(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_crash_retries() -> u32 {
    2
}

fn default_reconnect_delay() -> u64 {
    2
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_backup_retention() -> usize {
    5
}

fn default_fix_enabled() -> bool {
    true
}

/// Interaction protocol configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,

    /// Wait after each interaction for the UI to react.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Wait after navigation before the first capture.
    #[serde(default = "default_navigation_settle")]
    pub navigation_settle_ms: u64,

    #[serde(default = "default_max_sliders")]
    pub max_sliders: usize,

    #[serde(default = "default_max_inputs")]
    pub max_inputs: usize,

    #[serde(default = "default_max_buttons")]
    pub max_buttons: usize,

    /// Element that must exist before the first capture.
    #[serde(default = "default_ready_selector")]
    pub ready_selector: String,

    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,

    /// Record screencast frames of the interaction phase into the evidence
    /// directory.
    #[serde(default)]
    pub record_interactions: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            pass_threshold: default_pass_threshold(),
            settle_delay_ms: default_settle_delay(),
            navigation_settle_ms: default_navigation_settle(),
            max_sliders: default_max_sliders(),
            max_inputs: default_max_inputs(),
            max_buttons: default_max_buttons(),
            ready_selector: default_ready_selector(),
            ready_timeout_ms: default_ready_timeout(),
            record_interactions: false,
        }
    }
}

fn default_pass_threshold() -> u8 {
    70
}

fn default_settle_delay() -> u64 {
    1000
}

fn default_navigation_settle() -> u64 {
    4000
}

fn default_max_sliders() -> usize {
    3
}

fn default_max_inputs() -> usize {
    3
}

fn default_max_buttons() -> usize {
    2
}

fn default_ready_selector() -> String {
    "body".to_string()
}

fn default_ready_timeout() -> u64 {
    10_000
}

/// Chrome configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_debug_port")]
    pub debug_port: u16,

    #[serde(default)]
    pub headless: bool,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    #[serde(default = "default_screenshot_timeout")]
    pub screenshot_timeout_secs: u64,

    #[serde(default = "default_script_timeout")]
    pub script_timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_dir: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            debug_port: default_debug_port(),
            headless: false,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            navigation_timeout_secs: default_navigation_timeout(),
            screenshot_timeout_secs: default_screenshot_timeout(),
            script_timeout_secs: default_script_timeout(),
            profile_dir: None,
        }
    }
}

fn default_debug_port() -> u16 {
    9222
}

fn default_viewport_width() -> u32 {
    1440
}

fn default_viewport_height() -> u32 {
    900
}

fn default_navigation_timeout() -> u64 {
    60
}

fn default_screenshot_timeout() -> u64 {
    90
}

fn default_script_timeout() -> u64 {
    90
}

/// Vision model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Configured key, falling back to `GEMINI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_provider_timeout() -> u64 {
    300
}
