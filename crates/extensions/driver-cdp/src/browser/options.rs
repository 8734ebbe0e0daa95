//! Launch and timeout options for the CDP browser.

use std::path::PathBuf;
use std::time::Duration;

use stepcheck_config::BrowserConfig;

/// Browser options, resolved from [`BrowserConfig`].
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Chrome debugging port.
    pub debug_port: u16,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Profile directory passed as `--user-data-dir`.
    pub profile_dir: Option<PathBuf>,
    pub headless: bool,
    pub navigation_timeout: Duration,
    pub screenshot_timeout: Duration,
    pub script_timeout: Duration,
    /// Timeout for every other CDP command.
    pub command_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self::from(&BrowserConfig::default())
    }
}

impl From<&BrowserConfig> for BrowserOptions {
    fn from(config: &BrowserConfig) -> Self {
        Self {
            debug_port: config.debug_port,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            profile_dir: config.profile_dir.clone(),
            headless: config.headless,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            screenshot_timeout: Duration::from_secs(config.screenshot_timeout_secs),
            script_timeout: Duration::from_secs(config.script_timeout_secs),
            command_timeout: Duration::from_secs(30),
        }
    }
}

impl BrowserOptions {
    /// Get the profile directory, falling back to `~/.stepcheck/browser-profile`.
    pub fn get_profile_dir(&self) -> PathBuf {
        self.profile_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".stepcheck")
                .join("browser-profile")
        })
    }

    /// Get the CDP endpoint URL.
    pub fn endpoint(&self) -> String {
        format!("http://localhost:{}", self.debug_port)
    }
}
