//! WebSocket transport for the chat stream.
//!
//! One [`WebSocketTransport`] owns at most one live connection. Every
//! `connect` starts a new *generation*: the previous connection is cancelled
//! and the new task only dials once the old one has sent its close frame and
//! seen the server hang up (or [`CLOSE_GRACE`] ran out and it was aborted).
//!
//! ```text
//! connect(cred) ──▶ generation += 1 ──▶ spawn connection task
//!                                          │
//!                    wait for previous task ┤
//!                        dial ws://…?token=… ┤
//!                                          ├─ ok   → Connected (if still current)
//!                                          ├─ text → decode → Frame
//!                                          └─ end  → Disconnected / Failed (if still current)
//! ```
//!
//! All state changes go through [`ConnectionState`] under one lock and check
//! the generation first, so a superseded connection can neither emit events
//! nor flip `connected` back on.

use super::error::StreamError;
use super::protocol;
use futures_util::{SinkExt, StreamExt};
use horo_application::{
    StreamTransport, TransportError, TransportEvent, TransportEventSender,
};
use horo_domain::{Credential, OutboundAction};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};
use url::Url;

/// Query parameter carrying the bearer credential.
const TOKEN_PARAM: &str = "token";

/// How long a cancelled connection may take to finish its close handshake.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

#[derive(Default)]
struct ConnectionState {
    generation: u64,
    connected: bool,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionState {
    /// Cancel the current connection, if any, and start a new generation.
    /// Returns the new generation and the cancelled connection's task.
    fn teardown(&mut self) -> (u64, Option<JoinHandle<()>>) {
        self.generation += 1;
        self.connected = false;
        self.outbound = None;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        (self.generation, self.task.take())
    }
}

struct Shared {
    state: Mutex<ConnectionState>,
    events: TransportEventSender,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Emit `event` only if `generation` is still the current one.
    fn emit(&self, generation: u64, event: TransportEvent) -> bool {
        let state = self.lock();
        if state.generation != generation {
            return false;
        }
        let _ = self.events.send(event);
        true
    }

    fn mark_connected(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        state.connected = true;
        let _ = self.events.send(TransportEvent::Connected);
        true
    }

    fn mark_closed(&self, generation: u64, event: TransportEvent) {
        let mut state = self.lock();
        if state.generation != generation {
            trace!("Superseded connection (generation {}) ended", generation);
            return;
        }
        state.connected = false;
        state.outbound = None;
        state.cancel = None;
        state.task = None;
        let _ = self.events.send(event);
    }
}

/// [`StreamTransport`] over a WebSocket.
pub struct WebSocketTransport {
    endpoint: Url,
    shared: Arc<Shared>,
}

impl WebSocketTransport {
    /// Create a transport for `endpoint` (`ws://` or `wss://`). Events are
    /// delivered on `events`.
    pub fn new(endpoint: &str, events: TransportEventSender) -> Result<Self, StreamError> {
        let endpoint = Url::parse(endpoint)?;
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(StreamError::UnsupportedScheme(endpoint.scheme().to_string()));
        }
        Ok(Self {
            endpoint,
            shared: Arc::new(Shared {
                state: Mutex::new(ConnectionState::default()),
                events,
            }),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The endpoint with `token=<credential>` set, replacing any existing
    /// token parameter.
    fn authenticated_url(&self, credential: &Credential) -> Url {
        let mut url = self.endpoint.clone();
        let retained: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != TOKEN_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(retained)
            .append_pair(TOKEN_PARAM, credential.token());
        url
    }
}

impl StreamTransport for WebSocketTransport {
    fn connect(&self, credential: &Credential) {
        let url = self.authenticated_url(credential);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let mut state = self.shared.lock();
        let (generation, previous) = state.teardown();
        info!(
            "Connecting to {} (generation {})",
            self.endpoint, generation
        );
        let task = tokio::spawn(run_connection(
            Arc::clone(&self.shared),
            generation,
            url.to_string(),
            previous,
            outbound_rx,
            cancel.clone(),
        ));
        state.outbound = Some(outbound_tx);
        state.cancel = Some(cancel);
        state.task = Some(task);
    }

    fn send(&self, action: &OutboundAction) {
        let frame = match protocol::encode(action) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode outbound frame: {}", e);
                return;
            }
        };
        let state = self.shared.lock();
        match (&state.outbound, state.connected) {
            (Some(outbound), true) => {
                trace!("-> {}", frame);
                if outbound.send(Message::Text(frame)).is_err() {
                    warn!("Connection task gone; dropping frame for room {}", action.room_id());
                }
            }
            _ => warn!(
                "Not connected; dropping frame for room {}",
                action.room_id()
            ),
        }
    }

    fn disconnect(&self) {
        let mut state = self.shared.lock();
        if state.task.is_some() || state.connected {
            debug!("Disconnecting (generation {})", state.generation);
        }
        // The cancelled task finishes its close handshake on its own.
        let _ = state.teardown();
    }

    fn is_connected(&self) -> bool {
        self.shared.lock().connected
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        let _ = self.shared.lock().teardown();
    }
}

/// Wait for the previous generation to close, dial, then pump frames both
/// ways until either side ends or the connection is cancelled.
async fn run_connection(
    shared: Arc<Shared>,
    generation: u64,
    url: String,
    previous: Option<JoinHandle<()>>,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
) {
    if let Some(previous) = previous {
        let abort = previous.abort_handle();
        if tokio::time::timeout(CLOSE_GRACE, previous).await.is_err() {
            warn!(
                "Previous connection did not close in time; aborting it (generation {})",
                generation
            );
            abort.abort();
        }
    }

    let dialed = tokio::select! {
        _ = cancel.cancelled() => {
            trace!("Connection cancelled before dialing (generation {})", generation);
            return;
        }
        dialed = connect_async(url.as_str()) => dialed,
    };
    let ws = match dialed {
        Ok((ws, _response)) => ws,
        Err(e) => {
            let error = TransportError::from(StreamError::from(e));
            warn!("Stream connection failed: {}", error);
            shared.mark_closed(generation, TransportEvent::Failed(error));
            return;
        }
    };
    if !shared.mark_connected(generation) {
        return;
    }
    debug!("Stream connected (generation {})", generation);

    let (mut sink, mut stream) = ws.split();
    // `None` means the connection is being closed from this side.
    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => break None,
            out = outbound.recv() => match out {
                Some(message) => {
                    if let Err(e) = sink.send(message).await {
                        break Some(TransportEvent::Failed(StreamError::from(e).into()));
                    }
                }
                None => break None,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    trace!("<- {}", text);
                    if let Some(message) = protocol::decode(&text) {
                        shared.emit(generation, TransportEvent::Frame(message));
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("{} {}", u16::from(f.code), f.reason))
                        .unwrap_or_else(|| "closed by server".to_string());
                    break Some(TransportEvent::Disconnected { reason });
                }
                Some(Ok(Message::Binary(_))) => trace!("Ignoring binary frame"),
                Some(Ok(_)) => {}
                Some(Err(e)) => break Some(TransportEvent::Failed(StreamError::from(e).into())),
                None => break Some(TransportEvent::Disconnected {
                    reason: "stream ended".to_string(),
                }),
            },
        }
    };

    let end = match end {
        Some(event) => event,
        None => {
            let _ = sink.close().await;
            // The socket stays open until the server hangs up.
            let drained = tokio::time::timeout(CLOSE_GRACE, async {
                while let Some(Ok(_)) = stream.next().await {}
            })
            .await;
            if drained.is_err() {
                debug!("Server did not finish the close handshake (generation {})", generation);
            }
            TransportEvent::Disconnected {
                reason: "closed locally".to_string(),
            }
        }
    };

    debug!("Stream ended (generation {}): {:?}", generation, end);
    shared.mark_closed(generation, end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use horo_application::{TransportEventReceiver, transport_channel};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_hdr_async;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    /// What the loopback server observed.
    #[derive(Debug)]
    enum ServerEvent {
        Accepted { query: String },
        Received(String),
        Closed,
    }

    /// Loopback WebSocket server. Greets every client with `greeting` (if
    /// any) and reports what it sees.
    async fn spawn_server(
        greeting: Option<String>,
    ) -> (String, mpsc::UnboundedReceiver<ServerEvent>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let tx = tx.clone();
                let greeting = greeting.clone();
                tokio::spawn(async move {
                    let query_tx = tx.clone();
                    let callback = move |req: &Request, resp: Response| -> std::result::Result<Response, ErrorResponse> {
                        let query = req.uri().query().unwrap_or_default().to_string();
                        let _ = query_tx.send(ServerEvent::Accepted { query });
                        Ok(resp)
                    };
                    let Ok(mut ws) = accept_hdr_async(socket, callback).await else {
                        return;
                    };
                    if let Some(greeting) = greeting {
                        let _ = ws.send(Message::Text(greeting)).await;
                    }
                    while let Some(Ok(message)) = ws.next().await {
                        match message {
                            Message::Text(text) => {
                                let _ = tx.send(ServerEvent::Received(text));
                            }
                            Message::Close(_) => break,
                            _ => {}
                        }
                    }
                    let _ = tx.send(ServerEvent::Closed);
                });
            }
        });

        (format!("ws://{addr}/ws/chat"), rx)
    }

    async fn next_event(events: &mut TransportEventReceiver) -> TransportEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for transport event")
            .expect("event channel closed")
    }

    async fn next_server_event(events: &mut mpsc::UnboundedReceiver<ServerEvent>) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for server event")
            .expect("server channel closed")
    }

    #[test]
    fn test_rejects_non_websocket_scheme() {
        let (tx, _rx) = transport_channel();
        assert!(matches!(
            WebSocketTransport::new("http://localhost/ws/chat", tx),
            Err(StreamError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_token_replaces_existing_param() {
        let (tx, _rx) = transport_channel();
        let transport = WebSocketTransport::new("wss://chat.example/ws/chat?token=old&v=2", tx).unwrap();
        let url = transport.authenticated_url(&Credential::new("new token"));
        assert_eq!(url.as_str(), "wss://chat.example/ws/chat?v=2&token=new+token");
    }

    #[tokio::test]
    async fn test_connect_receive_and_send() {
        let greeting = r#"{"type":"text","messageId":"m1","roomId":"r1","senderId":"u2","content":"hi","createdAt":"2024-01-01T00:00:00Z"}"#;
        let (url, mut server) = spawn_server(Some(greeting.to_string())).await;
        let (tx, mut events) = transport_channel();
        let transport = WebSocketTransport::new(&url, tx).unwrap();

        assert!(!transport.is_connected());
        transport.connect(&Credential::new("secret"));

        match next_server_event(&mut server).await {
            ServerEvent::Accepted { query } => assert_eq!(query, "token=secret"),
            other => panic!("unexpected server event: {other:?}"),
        }
        assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
        assert!(transport.is_connected());

        match next_event(&mut events).await {
            TransportEvent::Frame(message) => assert_eq!(message.message_id().as_str(), "m1"),
            other => panic!("unexpected event: {other:?}"),
        }

        transport.send(&OutboundAction::join_room("r1"));
        match next_server_event(&mut server).await {
            ServerEvent::Received(text) => {
                assert_eq!(text, r#"{"action":"join_room","roomId":"r1"}"#)
            }
            other => panic!("unexpected server event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let (url, _server) = spawn_server(Some("not json".to_string())).await;
        let (tx, mut events) = transport_channel();
        let transport = WebSocketTransport::new(&url, tx).unwrap();

        transport.connect(&Credential::new("t"));
        assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
        let nothing = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(nothing.is_err(), "malformed frame should not surface");
        assert!(transport.is_connected());
    }

    #[tokio::test]
    async fn test_connection_refused_reports_failure() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (tx, mut events) = transport_channel();
        let transport = WebSocketTransport::new(&format!("ws://{addr}/ws/chat"), tx).unwrap();
        transport.connect(&Credential::new("t"));

        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Failed(TransportError::ConnectionError(_))
        ));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_reconnect_supersedes_previous_connection() {
        let (url, mut server) = spawn_server(None).await;
        let (tx, mut events) = transport_channel();
        let transport = WebSocketTransport::new(&url, tx).unwrap();

        transport.connect(&Credential::new("a"));
        assert_eq!(next_event(&mut events).await, TransportEvent::Connected);

        transport.connect(&Credential::new("b"));
        assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
        assert!(transport.is_connected());

        // The first connection is closed before the second one is dialed.
        let mut seen = Vec::new();
        while seen.len() < 3 {
            match next_server_event(&mut server).await {
                ServerEvent::Accepted { query } => seen.push(query),
                ServerEvent::Closed => seen.push("closed".to_string()),
                ServerEvent::Received(_) => {}
            }
        }
        assert_eq!(seen, vec!["token=a", "closed", "token=b"]);

        // The first connection's close never surfaces as an event.
        let nothing = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent_and_silent() {
        let (url, _server) = spawn_server(None).await;
        let (tx, mut events) = transport_channel();
        let transport = WebSocketTransport::new(&url, tx).unwrap();

        transport.connect(&Credential::new("t"));
        assert_eq!(next_event(&mut events).await, TransportEvent::Connected);

        transport.disconnect();
        transport.disconnect();
        assert!(!transport.is_connected());

        // Sending while disconnected is a no-op.
        transport.send(&OutboundAction::join_room("r1"));
        let nothing = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_server_close_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((socket, _)) = listener.accept().await
                && let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await
            {
                let _ = ws.close(None).await;
            }
        });

        let (tx, mut events) = transport_channel();
        let transport = WebSocketTransport::new(&format!("ws://{addr}/ws/chat"), tx).unwrap();
        transport.connect(&Credential::new("t"));

        assert_eq!(next_event(&mut events).await, TransportEvent::Connected);
        assert!(matches!(
            next_event(&mut events).await,
            TransportEvent::Disconnected { .. } | TransportEvent::Failed(_)
        ));
        assert!(!transport.is_connected());
    }
}
