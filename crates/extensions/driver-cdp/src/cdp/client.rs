//! CDP browser client: endpoint discovery and target management.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use super::connection::Connection;
use super::error::CdpError;
use super::protocol::{BrowserVersion, PageInfo};
use super::session::PageSession;

/// CDP client for one browser.
pub struct CdpClient {
    /// HTTP endpoint for discovery.
    http_endpoint: String,
    /// Browser WebSocket URL.
    browser_ws_url: String,
    connection: Arc<Connection>,
    http: reqwest::Client,
    command_timeout: Duration,
}

impl CdpClient {
    /// Connect to Chrome at the given endpoint (e.g. `http://localhost:9222`).
    pub async fn connect(endpoint: &str, command_timeout: Duration) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(command_timeout)
            .build()?;

        let version = Self::version(&http, &http_endpoint).await?;
        debug!("Connected to browser: {}", version.browser);

        let browser_ws_url = version.web_socket_debugger_url;
        url::Url::parse(&browser_ws_url)?;
        let connection = Connection::open(&browser_ws_url).await?;

        Ok(Self {
            http_endpoint,
            browser_ws_url,
            connection,
            http,
            command_timeout,
        })
    }

    /// Fetch `/json/version`; fails when nothing listens on the endpoint.
    pub async fn version(http: &reqwest::Client, endpoint: &str) -> Result<BrowserVersion, CdpError> {
        let version_url = format!("{}/json/version", endpoint);
        debug!("Fetching browser version from {}", version_url);
        http.get(&version_url)
            .send()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))
    }

    /// Get browser WebSocket URL.
    pub fn browser_ws_url(&self) -> &str {
        &self.browser_ws_url
    }

    /// Open a new tab and attach a page session to it.
    pub async fn new_page(&self) -> Result<PageSession, CdpError> {
        // Chrome requires PUT for /json/new
        let create_url = format!("{}/json/new", self.http_endpoint);
        let page_info: PageInfo = self.http.put(&create_url).send().await?.json().await?;
        debug!("Created new page: {}", page_info.id);

        self.attach_page(&page_info.id).await
    }

    /// Attach to an existing page target.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let result = self
            .connection
            .call(
                "Target.attachToTarget",
                Some(json!({
                    "targetId": target_id,
                    "flatten": true
                })),
                None,
                self.command_timeout,
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let events = self.connection.subscribe(&session_id);
        let session = PageSession::new(
            target_id.to_string(),
            session_id,
            self.connection.clone(),
            events,
            self.command_timeout,
        );
        session.enable_domains().await?;
        Ok(session)
    }

    /// Close a page target.
    pub async fn close_page(&self, target_id: &str) -> Result<(), CdpError> {
        self.connection
            .call(
                "Target.closeTarget",
                Some(json!({"targetId": target_id})),
                None,
                self.command_timeout,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
