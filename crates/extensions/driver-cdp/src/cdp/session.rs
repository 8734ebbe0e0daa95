//! CDP page session for a single attached page.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use base64::Engine;
use parking_lot::Mutex;
use serde_json::{Value, json};
use stepcheck_protocols::ConsoleMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::connection::Connection;
use super::error::CdpError;
use super::protocol::{
    CdpResponse, ConsoleApiCalled, ExceptionThrown, LayoutMetrics, ScreencastFrame,
    ScreenshotFormat,
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Frames written while a screencast is running.
#[derive(Debug)]
struct Recording {
    dir: PathBuf,
    frames: Vec<PathBuf>,
}

/// Page events collected by the pump task.
#[derive(Debug, Default)]
struct PageEvents {
    console: Mutex<Vec<ConsoleMessage>>,
    recording: Mutex<Option<Recording>>,
}

impl PageEvents {
    /// Absorb one event. Returns the screencast session to acknowledge, if
    /// the event was a frame.
    async fn handle(&self, event: &CdpResponse) -> Option<i64> {
        trace!(method = ?event.method, "Page event");
        if let Some(message) = console_message(event) {
            self.console.lock().push(message);
            return None;
        }
        if event.method.as_deref() != Some("Page.screencastFrame") {
            return None;
        }

        let frame: ScreencastFrame = serde_json::from_value(event.params.clone()?).ok()?;
        let target = {
            let recording = self.recording.lock();
            recording
                .as_ref()
                .map(|r| r.dir.join(format!("frame_{:05}.jpg", r.frames.len())))
        };
        if let Some(path) = target {
            if let Err(e) = write_frame(&path, &frame.data).await {
                warn!(path = %path.display(), error = %e, "Dropped screencast frame");
            } else if let Some(recording) = self.recording.lock().as_mut() {
                recording.frames.push(path);
            }
        }
        Some(frame.session_id)
    }
}

async fn write_frame(path: &Path, data: &str) -> Result<(), CdpError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CdpError::InvalidResponse(format!("invalid frame data: {}", e)))?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Drain the session's event channel until it closes.
async fn pump_events(
    mut events: mpsc::UnboundedReceiver<CdpResponse>,
    state: Arc<PageEvents>,
    connection: Weak<Connection>,
    session_id: String,
    command_timeout: Duration,
) {
    while let Some(event) = events.recv().await {
        let Some(frame_session) = state.handle(&event).await else {
            continue;
        };
        let Some(connection) = connection.upgrade() else {
            break;
        };
        let ack = connection
            .call(
                "Page.screencastFrameAck",
                Some(json!({"sessionId": frame_session})),
                Some(&session_id),
                command_timeout,
            )
            .await;
        if let Err(e) = ack {
            debug!("Screencast ack failed: {}", e);
        }
    }
}

/// Re-run `check` every `interval` until it reports true. Gives up with
/// [`CdpError::Timeout`] naming `what` once `timeout` has passed. Errors
/// from `check` end the wait early.
pub(crate) async fn wait_until<F, Fut>(
    timeout: Duration,
    interval: Duration,
    what: &str,
    mut check: F,
) -> Result<(), CdpError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, CdpError>>,
{
    let poll = async {
        loop {
            if check().await? {
                return Ok(());
            }
            tokio::time::sleep(interval).await;
        }
    };
    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(CdpError::Timeout(format!("waiting for {}", what))),
    }
}

/// Expression that is true once `selector` matches an element.
pub(crate) fn selector_present_expr(selector: &str) -> Result<String, CdpError> {
    Ok(format!(
        "document.querySelector({}) !== null",
        serde_json::to_string(selector)?
    ))
}

/// A session attached to a single page target.
pub struct PageSession {
    target_id: String,
    session_id: String,
    connection: Arc<Connection>,
    events: Arc<PageEvents>,
    pump: JoinHandle<()>,
    command_timeout: Duration,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        connection: Arc<Connection>,
        events: mpsc::UnboundedReceiver<CdpResponse>,
        command_timeout: Duration,
    ) -> Self {
        let state = Arc::new(PageEvents::default());
        let pump = tokio::spawn(pump_events(
            events,
            state.clone(),
            Arc::downgrade(&connection),
            session_id.clone(),
            command_timeout,
        ));
        Self {
            target_id,
            session_id,
            connection,
            events: state,
            pump,
            command_timeout,
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Whether both the socket and the page target are still usable.
    pub fn is_alive(&self) -> bool {
        !self.connection.is_closed() && !self.connection.is_detached(&self.session_id)
    }

    /// Send a CDP command to this page with the default timeout.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        self.call_with_timeout(method, params, self.command_timeout).await
    }

    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, CdpError> {
        self.connection
            .call(method, params, Some(&self.session_id), timeout)
            .await
    }

    /// Enable the domains whose events the driver consumes.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        self.call("Inspector.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Fix the layout viewport size.
    pub async fn set_viewport(&self, width: u32, height: u32) -> Result<(), CdpError> {
        self.call(
            "Emulation.setDeviceMetricsOverride",
            Some(json!({
                "width": width,
                "height": height,
                "deviceScaleFactor": 1,
                "mobile": false,
            })),
        )
        .await?;
        Ok(())
    }

    /// Navigate to `url` and wait for the document to finish loading.
    pub async fn navigate(&self, url: &str, timeout: Duration) -> Result<String, CdpError> {
        let result = self
            .call_with_timeout("Page.navigate", Some(json!({"url": url})), timeout)
            .await?;

        if let Some(error) = result.get("errorText").and_then(Value::as_str) {
            if !error.is_empty() {
                return Err(CdpError::NavigationFailed(error.to_string()));
            }
        }

        let frame_id = result["frameId"].as_str().unwrap_or("main").to_string();

        self.wait_for_load(timeout).await?;

        debug!("Navigated to {}", url);
        Ok(frame_id)
    }

    /// Poll `document.readyState` until the page is complete.
    pub async fn wait_for_load(&self, timeout: Duration) -> Result<(), CdpError> {
        wait_until(timeout, POLL_INTERVAL, "page load", || async {
            let state = self.evaluate("document.readyState").await?;
            Ok::<_, CdpError>(state.as_str() == Some("complete"))
        })
        .await
    }

    /// Poll until `selector` matches an element.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), CdpError> {
        let expression = selector_present_expr(selector)?;
        wait_until(timeout, POLL_INTERVAL, &format!("selector {}", selector), || async {
            let present = self.evaluate(&expression).await?;
            Ok::<_, CdpError>(present.as_bool() == Some(true))
        })
        .await?;
        debug!("Selector {} present", selector);
        Ok(())
    }

    /// Evaluate a JavaScript expression, awaiting promises, and return its
    /// value by JSON.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        self.evaluate_with_timeout(expression, self.command_timeout).await
    }

    pub async fn evaluate_with_timeout(
        &self,
        expression: &str,
        timeout: Duration,
    ) -> Result<Value, CdpError> {
        let result = self
            .call_with_timeout(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
                timeout,
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["exception"]["description"]
                .as_str()
                .or_else(|| exception["text"].as_str())
                .unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Capture the page. Returns base64 image data.
    pub async fn screenshot(
        &self,
        format: ScreenshotFormat,
        full_page: bool,
        timeout: Duration,
    ) -> Result<String, CdpError> {
        let mut params = json!({
            "format": format,
            "captureBeyondViewport": full_page,
        });

        if full_page {
            let metrics: LayoutMetrics =
                serde_json::from_value(self.call("Page.getLayoutMetrics", None).await?)?;
            if let Some(clip) = metrics.full_page_clip() {
                params["clip"] = serde_json::to_value(clip)?;
            }
        }

        let result = self
            .call_with_timeout("Page.captureScreenshot", Some(params), timeout)
            .await?;

        result["data"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| CdpError::InvalidResponse("Missing screenshot data".to_string()))
    }

    /// Console output and uncaught exceptions received since the last call.
    pub fn drain_console(&self) -> Vec<ConsoleMessage> {
        std::mem::take(&mut *self.events.console.lock())
    }

    /// Start a JPEG screencast; frames are written into `dir` as they arrive.
    pub async fn start_screencast(&self, dir: &Path) -> Result<(), CdpError> {
        tokio::fs::create_dir_all(dir).await?;
        {
            let mut recording = self.events.recording.lock();
            if recording.is_some() {
                return Err(CdpError::Recording("already recording".to_string()));
            }
            *recording = Some(Recording {
                dir: dir.to_path_buf(),
                frames: Vec::new(),
            });
        }

        let started = self
            .call(
                "Page.startScreencast",
                Some(json!({"format": "jpeg", "quality": 80, "everyNthFrame": 1})),
            )
            .await;
        if let Err(e) = started {
            self.events.recording.lock().take();
            return Err(e);
        }
        debug!("Screencast started into {}", dir.display());
        Ok(())
    }

    /// Stop the screencast and return the frames written.
    pub async fn stop_screencast(&self) -> Result<Vec<PathBuf>, CdpError> {
        if self.events.recording.lock().is_none() {
            return Err(CdpError::Recording("no recording in progress".to_string()));
        }
        let stopped = self.call("Page.stopScreencast", None).await;
        let recording = self.events.recording.lock().take();
        stopped?;
        Ok(recording.map(|r| r.frames).unwrap_or_default())
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// Convert a Runtime console or exception event into a console message.
pub(crate) fn console_message(event: &CdpResponse) -> Option<ConsoleMessage> {
    let params = event.params.clone()?;
    match event.method.as_deref()? {
        "Runtime.consoleAPICalled" => {
            let call: ConsoleApiCalled = serde_json::from_value(params).ok()?;
            let text = call
                .args
                .iter()
                .map(|arg| arg.display())
                .collect::<Vec<_>>()
                .join(" ");
            Some(ConsoleMessage {
                level: call.call_type,
                text,
            })
        }
        "Runtime.exceptionThrown" => {
            let thrown: ExceptionThrown = serde_json::from_value(params).ok()?;
            let details = thrown.exception_details;
            let text = details
                .exception
                .as_ref()
                .and_then(|e| e.description.clone())
                .unwrap_or(details.text);
            Some(ConsoleMessage {
                level: "exception".to_string(),
                text,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(value: Value) -> CdpResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_console_api_call() {
        let message = console_message(&event(json!({
            "method": "Runtime.consoleAPICalled",
            "sessionId": "S1",
            "params": {
                "type": "error",
                "args": [
                    {"type": "string", "value": "Failed to draw"},
                    {"type": "number", "value": 3}
                ]
            }
        })))
        .unwrap();
        assert_eq!(message.level, "error");
        assert_eq!(message.text, "Failed to draw 3");
        assert!(message.is_error());
    }

    #[test]
    fn test_uncaught_exception() {
        let message = console_message(&event(json!({
            "method": "Runtime.exceptionThrown",
            "params": {
                "timestamp": 1.0,
                "exceptionDetails": {
                    "exceptionId": 1,
                    "text": "Uncaught",
                    "lineNumber": 12,
                    "columnNumber": 4,
                    "exception": {
                        "type": "object",
                        "subtype": "error",
                        "description": "ReferenceError: slider is not defined"
                    }
                }
            }
        })))
        .unwrap();
        assert_eq!(message.level, "exception");
        assert_eq!(message.text, "ReferenceError: slider is not defined");
        assert!(message.is_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_returns_once_check_passes() {
        let checks = std::cell::Cell::new(0);
        wait_until(Duration::from_secs(5), POLL_INTERVAL, "slider", || {
            checks.set(checks.get() + 1);
            let done = checks.get() >= 3;
            async move { Ok(done) }
        })
        .await
        .unwrap();
        assert_eq!(checks.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_times_out() {
        let err = wait_until(Duration::from_secs(2), POLL_INTERVAL, "selector #chart", || async {
            Ok(false)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CdpError::Timeout(ref what) if what == "waiting for selector #chart"));
        assert!(matches!(
            stepcheck_protocols::DriverError::from(err),
            stepcheck_protocols::DriverError::Timeout(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_stops_on_check_error() {
        let checks = std::cell::Cell::new(0);
        let err = wait_until(Duration::from_secs(5), POLL_INTERVAL, "body", || {
            checks.set(checks.get() + 1);
            async { Err(CdpError::JavaScript("SyntaxError".to_string())) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, CdpError::JavaScript(_)));
        assert_eq!(checks.get(), 1);
    }

    #[test]
    fn test_selector_expression_quotes_selector() {
        assert_eq!(
            selector_present_expr(r#"input[name="x"]"#).unwrap(),
            r#"document.querySelector("input[name=\"x\"]") !== null"#
        );
    }

    fn frame_event(data: &[u8], session_id: i64) -> CdpResponse {
        event(json!({
            "method": "Page.screencastFrame",
            "sessionId": "S1",
            "params": {
                "data": base64::engine::general_purpose::STANDARD.encode(data),
                "metadata": {"offsetTop": 0, "pageScaleFactor": 1},
                "sessionId": session_id
            }
        }))
    }

    #[tokio::test]
    async fn test_console_events_collected() {
        let state = PageEvents::default();
        let ack = state
            .handle(&event(json!({
                "method": "Runtime.consoleAPICalled",
                "params": {"type": "log", "args": [{"type": "string", "value": "ready"}]}
            })))
            .await;
        assert!(ack.is_none());
        assert_eq!(state.console.lock().len(), 1);
        assert_eq!(state.console.lock()[0].text, "ready");
    }

    #[tokio::test]
    async fn test_frames_written_while_recording() {
        let dir = tempfile::tempdir().unwrap();
        let state = PageEvents::default();
        *state.recording.lock() = Some(Recording {
            dir: dir.path().to_path_buf(),
            frames: Vec::new(),
        });

        assert_eq!(state.handle(&frame_event(b"first", 7)).await, Some(7));
        assert_eq!(state.handle(&frame_event(b"second", 8)).await, Some(8));

        let frames = state.recording.lock().take().unwrap().frames;
        assert_eq!(
            frames,
            vec![dir.path().join("frame_00000.jpg"), dir.path().join("frame_00001.jpg")]
        );
        assert_eq!(std::fs::read(&frames[1]).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_frames_acked_but_dropped_when_idle() {
        let state = PageEvents::default();
        assert_eq!(state.handle(&frame_event(b"late", 9)).await, Some(9));
        assert!(state.recording.lock().is_none());
    }

    #[test]
    fn test_other_events_ignored() {
        assert!(console_message(&event(json!({
            "method": "Page.loadEventFired", "params": {"timestamp": 1.0}
        })))
        .is_none());
        assert!(console_message(&event(json!({"id": 4, "result": {}}))).is_none());
    }
}
