//! WebSocket transport shared by the browser client and its page sessions.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use super::error::CdpError;
use super::protocol::{CdpRequest, CdpResponse};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Pending request waiting for response.
struct PendingRequest {
    tx: oneshot::Sender<Result<Value, CdpError>>,
}

/// State the receive loop shares with callers.
#[derive(Default)]
struct Shared {
    pending: Mutex<HashMap<u64, PendingRequest>>,
    /// Event channels by session ID.
    handlers: Mutex<HashMap<String, mpsc::UnboundedSender<CdpResponse>>>,
    /// Sessions whose target detached or crashed.
    detached: Mutex<HashSet<String>>,
    closed: AtomicBool,
}

impl Shared {
    fn dispatch(&self, resp: CdpResponse) {
        if let Some(id) = resp.id {
            let pending = self.pending.lock().remove(&id);
            if let Some(req) = pending {
                let result = match resp.error {
                    Some(error) => Err(CdpError::Protocol {
                        code: error.code,
                        message: error.message,
                    }),
                    None => Ok(resp.result.unwrap_or(Value::Null)),
                };
                let _ = req.tx.send(result);
            }
            return;
        }

        let Some(method) = resp.method.as_deref() else {
            return;
        };
        match method {
            "Target.detachedFromTarget" => {
                let session = resp
                    .params
                    .as_ref()
                    .and_then(|p| p["sessionId"].as_str())
                    .map(str::to_string);
                if let Some(session) = session {
                    self.mark_detached(session);
                }
            }
            "Inspector.targetCrashed" | "Inspector.detached" => {
                if let Some(session) = resp.session_id.clone() {
                    self.mark_detached(session);
                }
            }
            _ => {
                let session = resp.session_id.clone().unwrap_or_default();
                if let Some(tx) = self.handlers.lock().get(&session) {
                    let _ = tx.send(resp);
                }
            }
        }
    }

    fn mark_detached(&self, session: String) {
        warn!(session = %session, "Page target detached");
        self.handlers.lock().remove(&session);
        self.detached.lock().insert(session);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders fails every in-flight call with SessionClosed.
        self.pending.lock().clear();
        self.handlers.lock().clear();
    }
}

/// One WebSocket to the browser endpoint.
///
/// Requests are correlated to responses by id; events are routed to the
/// channel subscribed for their session.
pub struct Connection {
    ws_tx: tokio::sync::Mutex<WsSink>,
    request_id: AtomicU64,
    shared: Arc<Shared>,
    recv_task: tokio::task::JoinHandle<()>,
}

impl Connection {
    /// Open a WebSocket to `ws_url` and start the receive loop.
    pub async fn open(ws_url: &str) -> Result<Arc<Self>, CdpError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let shared = Arc::new(Shared::default());

        let recv_task = {
            let shared = shared.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, &shared).await;
                shared.close();
            })
        };

        debug!("CDP connection open to {}", ws_url);
        Ok(Arc::new(Self {
            ws_tx: tokio::sync::Mutex::new(ws_sink),
            request_id: AtomicU64::new(1),
            shared,
            recv_task,
        }))
    }

    async fn receive_loop(mut ws_source: WsSource, shared: &Shared) {
        while let Some(msg) = ws_source.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    trace!("CDP recv: {}", text);
                    match serde_json::from_str::<CdpResponse>(&text) {
                        Ok(resp) => shared.dispatch(resp),
                        Err(e) => warn!("Failed to parse CDP message: {}", e),
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("WebSocket closed");
                    break;
                }
                Err(e) => {
                    warn!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    }

    /// Send a CDP command and wait up to `timeout` for its response.
    pub async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, CdpError> {
        if self.is_closed() {
            return Err(CdpError::SessionClosed);
        }
        if let Some(session) = session_id {
            if self.is_detached(session) {
                return Err(CdpError::SessionClosed);
            }
        }

        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: session_id.map(|s| s.to_string()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP send: {}", json);

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(id, PendingRequest { tx });

        let sent = {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await
        };
        if let Err(e) = sent {
            self.shared.pending.lock().remove(&id);
            return Err(e.into());
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.shared.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Route events for `session_id` to a new channel.
    pub fn subscribe(&self, session_id: &str) -> mpsc::UnboundedReceiver<CdpResponse> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.handlers.lock().insert(session_id.to_string(), tx);
        rx
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    pub fn is_detached(&self, session_id: &str) -> bool {
        self.shared.detached.lock().contains(session_id)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: Value) -> CdpResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_dispatch_resolves_pending() {
        let shared = Shared::default();
        let (tx, mut rx) = oneshot::channel();
        shared.pending.lock().insert(7, PendingRequest { tx });

        shared.dispatch(response(json!({"id": 7, "result": {"frameId": "F"}})));

        let result = rx.try_recv().unwrap().unwrap();
        assert_eq!(result["frameId"], "F");
        assert!(shared.pending.lock().is_empty());
    }

    #[test]
    fn test_dispatch_protocol_error() {
        let shared = Shared::default();
        let (tx, mut rx) = oneshot::channel();
        shared.pending.lock().insert(1, PendingRequest { tx });

        shared.dispatch(response(json!({
            "id": 1, "error": {"code": -32000, "message": "Cannot navigate to invalid URL"}
        })));

        match rx.try_recv().unwrap() {
            Err(CdpError::Protocol { code, message }) => {
                assert_eq!(code, -32000);
                assert!(message.contains("invalid URL"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_routes_events_by_session() {
        let shared = Shared::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        shared.handlers.lock().insert("S1".to_string(), tx);

        shared.dispatch(response(json!({
            "method": "Runtime.consoleAPICalled", "sessionId": "S1",
            "params": {"type": "error", "args": []}
        })));
        shared.dispatch(response(json!({
            "method": "Runtime.consoleAPICalled", "sessionId": "S2",
            "params": {"type": "log", "args": []}
        })));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.session_id.as_deref(), Some("S1"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_detach_and_crash_mark_session() {
        let shared = Shared::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        shared.handlers.lock().insert("S1".to_string(), tx);

        shared.dispatch(response(json!({
            "method": "Target.detachedFromTarget",
            "params": {"sessionId": "S1", "targetId": "T1"}
        })));
        shared.dispatch(response(json!({
            "method": "Inspector.targetCrashed", "sessionId": "S2", "params": {}
        })));

        let detached = shared.detached.lock();
        assert!(detached.contains("S1"));
        assert!(detached.contains("S2"));
        assert!(shared.handlers.lock().is_empty());
    }

    #[test]
    fn test_close_fails_pending() {
        let shared = Shared::default();
        let (tx, mut rx) = oneshot::channel();
        shared.pending.lock().insert(3, PendingRequest { tx });

        shared.close();

        assert!(shared.closed.load(Ordering::SeqCst));
        assert!(rx.try_recv().is_err());
    }
}
