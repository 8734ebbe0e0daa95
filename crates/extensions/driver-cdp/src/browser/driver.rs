//! CdpBrowser: Chrome management plus the BrowserDriver implementation.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use stepcheck_protocols::{BrowserDriver, ConsoleMessage, DriverError, Screenshot};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::BrowserOptions;
use crate::cdp::{CdpClient, CdpError, PageSession, ScreenshotFormat};

/// A connected browser with the one page the driver works on.
struct Attached {
    client: Arc<CdpClient>,
    page: Arc<PageSession>,
}

/// Chrome driven over CDP, one page at a time.
pub struct CdpBrowser {
    options: BrowserOptions,
    attached: RwLock<Option<Attached>>,
    /// Chrome process handle (if we launched it).
    chrome_process: Mutex<Option<Child>>,
}

impl CdpBrowser {
    pub fn new(options: BrowserOptions) -> Self {
        Self {
            options,
            attached: RwLock::new(None),
            chrome_process: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &BrowserOptions {
        &self.options
    }

    /// Find Chrome executable path.
    pub fn find_chrome() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        let paths: &[&str] = &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
        ];

        #[cfg(target_os = "linux")]
        let paths: &[&str] = &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
        ];

        #[cfg(target_os = "windows")]
        let paths: &[&str] = &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        let paths: &[&str] = &[];

        paths.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Check if Chrome is already running on the debug port.
    async fn is_chrome_running(&self) -> bool {
        let http = match reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
        {
            Ok(http) => http,
            Err(_) => return false,
        };
        CdpClient::version(&http, &self.options.endpoint()).await.is_ok()
    }

    /// Launch Chrome with remote debugging enabled.
    async fn launch_chrome(&self) -> Result<Child, DriverError> {
        let chrome_path = Self::find_chrome().ok_or_else(|| {
            DriverError::Other("Chrome not found. Please install Google Chrome.".to_string())
        })?;
        let profile_dir = self.options.get_profile_dir();

        if let Err(e) = std::fs::create_dir_all(&profile_dir) {
            warn!("Failed to create profile directory: {}", e);
        }

        info!("Launching Chrome with profile at: {}", profile_dir.display());

        let mut cmd = Command::new(&chrome_path);
        cmd.arg(format!("--remote-debugging-port={}", self.options.debug_port))
            .arg(format!("--user-data-dir={}", profile_dir.display()))
            .arg(format!(
                "--window-size={},{}",
                self.options.viewport_width, self.options.viewport_height
            ))
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--metrics-recording-only")
            .kill_on_drop(true)
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        if self.options.headless {
            cmd.arg("--headless=new");
        }

        let child = cmd
            .spawn()
            .map_err(|e| DriverError::Other(format!("Failed to launch Chrome: {}", e)))?;

        info!("Chrome launched with PID: {:?}", child.id());
        Ok(child)
    }

    /// Make sure something answers on the debug port, launching Chrome if not.
    async fn ensure_chrome(&self) -> Result<(), DriverError> {
        if self.is_chrome_running().await {
            debug!("Chrome already running on port {}", self.options.debug_port);
            return Ok(());
        }

        info!("Chrome not running on port {}, launching...", self.options.debug_port);
        let child = self.launch_chrome().await?;
        *self.chrome_process.lock().await = Some(child);

        for _ in 0..30 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            if self.is_chrome_running().await {
                return Ok(());
            }
        }
        Err(DriverError::Other(
            "Failed to launch Chrome: did not start within timeout".to_string(),
        ))
    }

    /// The attached page, if the session is still usable.
    async fn page(&self) -> Result<Arc<PageSession>, DriverError> {
        let attached = self.attached.read().await;
        let attached = attached.as_ref().ok_or(DriverError::NotConnected)?;
        if !attached.page.is_alive() {
            return Err(DriverError::SessionLost("page target closed".to_string()));
        }
        Ok(attached.page.clone())
    }

    async fn attach(&self) -> Result<Attached, CdpError> {
        let client = CdpClient::connect(&self.options.endpoint(), self.options.command_timeout).await?;
        let page = client.new_page().await?;
        page.set_viewport(self.options.viewport_width, self.options.viewport_height)
            .await?;
        Ok(Attached {
            client: Arc::new(client),
            page: Arc::new(page),
        })
    }

    /// Shutdown Chrome if we launched it.
    pub async fn shutdown_chrome(&self) {
        if let Some(mut child) = self.chrome_process.lock().await.take() {
            info!("Shutting down Chrome...");
            let _ = child.kill().await;
        }
    }
}

/// Re-scope a generic CDP failure as a screenshot failure.
pub(super) fn screenshot_error(e: CdpError) -> DriverError {
    match DriverError::from(e) {
        DriverError::Other(msg) => DriverError::Screenshot(msg),
        other => other,
    }
}

#[async_trait]
impl BrowserDriver for CdpBrowser {
    async fn connect(&self) -> Result<(), DriverError> {
        {
            let attached = self.attached.read().await;
            if let Some(attached) = attached.as_ref() {
                if attached.page.is_alive() {
                    return Ok(());
                }
            }
        }

        let mut slot = self.attached.write().await;
        if slot.take().is_some() {
            info!("Reconnecting to browser");
        }

        self.ensure_chrome().await?;
        let attached = self.attach().await?;
        info!(
            endpoint = %self.options.endpoint(),
            browser_ws = attached.client.browser_ws_url(),
            target = attached.page.target_id(),
            "Connected to Chrome"
        );
        *slot = Some(attached);
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let page = self.page().await?;
        let timeout = self.options.navigation_timeout;
        match tokio::time::timeout(timeout, page.navigate(url, timeout)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(DriverError::Timeout(format!("navigation to {}", url))),
        }
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let page = self.page().await?;
        Ok(page.wait_for_selector(selector, timeout).await?)
    }

    async fn start_recording(&self, dir: &Path) -> Result<(), DriverError> {
        let page = self.page().await?;
        Ok(page.start_screencast(dir).await?)
    }

    async fn stop_recording(&self) -> Result<Vec<PathBuf>, DriverError> {
        let page = self.page().await?;
        let frames = page.stop_screencast().await?;
        debug!(frames = frames.len(), "Recording stopped");
        Ok(frames)
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> Result<Screenshot, DriverError> {
        let page = self.page().await?;
        let data = page
            .screenshot(ScreenshotFormat::Png, full_page, self.options.screenshot_timeout)
            .await
            .map_err(screenshot_error)?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| DriverError::Screenshot(format!("invalid image data: {}", e)))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &bytes).await?;

        debug!(path = %path.display(), bytes = bytes.len(), "Screenshot saved");
        Ok(Screenshot {
            path: path.to_path_buf(),
            bytes: bytes.len(),
        })
    }

    async fn evaluate_script(&self, script: &str) -> Result<Value, DriverError> {
        let page = self.page().await?;
        Ok(page
            .evaluate_with_timeout(script, self.options.script_timeout)
            .await?)
    }

    async fn console_messages(&self) -> Result<Vec<ConsoleMessage>, DriverError> {
        let page = self.page().await?;
        Ok(page.drain_console())
    }

    async fn close(&self) -> Result<(), DriverError> {
        if let Some(attached) = self.attached.write().await.take() {
            if let Err(e) = attached.client.close_page(attached.page.target_id()).await {
                debug!("Closing page failed: {}", e);
            }
        }
        self.shutdown_chrome().await;
        info!("Browser connection closed");
        Ok(())
    }
}
