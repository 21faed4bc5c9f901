//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use futures::{SinkExt, StreamExt};
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tower::ServiceExt;

use callhub_api::app::build_app;
use callhub_api::state::AppState;
use callhub_core::config::AppConfig;

/// How long a client waits for an expected event.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Test application driven in-process through `oneshot`
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Shared state, for inspecting the engine
    pub state: AppState,
}

impl TestApp {
    /// Create a test application with default configuration
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application with the given configuration
    pub fn with_config(config: AppConfig) -> Self {
        let state = AppState::new(config);
        let router = build_app(state.clone());
        Self { router, state }
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        let mut req = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let req = req.body(Body::empty()).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: http::HeaderMap,
    /// Parsed JSON body
    pub body: Value,
}

/// A real server on an ephemeral port
pub struct LiveServer {
    /// Bound address
    pub addr: SocketAddr,
    /// Shared state, for inspecting the engine
    pub state: AppState,
    task: JoinHandle<()>,
}

impl LiveServer {
    /// Start a server with default configuration
    pub async fn start() -> Self {
        Self::start_with(AppConfig::default()).await
    }

    /// Start a server with the given configuration
    pub async fn start_with(config: AppConfig) -> Self {
        let state = AppState::new(config);
        state.realtime.spawn_background();
        let app = build_app(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("local addr");

        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server");
        });

        Self { addr, state, task }
    }

    /// WebSocket URL, with an optional token
    pub fn ws_url(&self, token: Option<&str>) -> String {
        match token {
            Some(t) => format!("ws://{}/ws?token={}", self.addr, t),
            None => format!("ws://{}/ws", self.addr),
        }
    }

    /// Open a WebSocket client
    pub async fn connect(&self, token: Option<&str>) -> WsClient {
        let (stream, _) = connect_async(self.ws_url(token))
            .await
            .expect("WebSocket connect");
        WsClient { stream }
    }
}

impl Drop for LiveServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A signaling client speaking the JSON event protocol
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send one event
    pub async fn emit(&mut self, event: &str, data: Value) {
        let frame = json!({ "event": event, "data": data }).to_string();
        self.send_raw(&frame).await;
    }

    /// Send a raw text frame
    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send frame");
    }

    /// Announce and wait until this client's snapshot shows the id
    pub async fn announce(&mut self, user_id: i64, username: &str) {
        self.emit(
            "userConnected",
            json!({ "userId": user_id, "username": username }),
        )
        .await;
        let key = user_id.to_string();
        self.wait_for_snapshot(|s| s.get(&key).and_then(Value::as_str) == Some(username))
            .await;
    }

    /// Next event of any kind, or `None` on timeout or close
    pub async fn next_event(&mut self, wait: Duration) -> Option<Value> {
        loop {
            let frame = tokio::time::timeout(wait, self.stream.next()).await.ok()??;
            match frame.ok()? {
                Message::Text(text) => {
                    return Some(serde_json::from_str(text.as_str()).expect("JSON frame"));
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Wait for the next event named `event`, skipping others
    pub async fn recv_event(&mut self, event: &str) -> Value {
        loop {
            let msg = self
                .next_event(RECV_TIMEOUT)
                .await
                .unwrap_or_else(|| panic!("timed out waiting for {event}"));
            if msg["event"] == event {
                return msg["data"].clone();
            }
        }
    }

    /// Wait for a presence snapshot that satisfies `pred`
    pub async fn wait_for_snapshot(&mut self, pred: impl Fn(&serde_json::Map<String, Value>) -> bool) -> Value {
        loop {
            let data = self.recv_event("updateOnlineUsers").await;
            if let Some(map) = data.as_object() {
                if pred(map) {
                    return data;
                }
            }
        }
    }

    /// Assert that no call event arrives within `wait`
    pub async fn expect_no_call_events(&mut self, wait: Duration) {
        while let Some(msg) = self.next_event(wait).await {
            assert_eq!(
                msg["event"], "updateOnlineUsers",
                "unexpected event: {msg}"
            );
        }
    }

    /// Keep reading (so protocol pings get answered) without sending any
    /// event for `span`. Returns whether the socket was still open at the end.
    pub async fn idle_for(&mut self, span: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + span;
        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return true,
                Ok(Some(Ok(Message::Close(_)))) | Ok(Some(Err(_))) | Ok(None) => return false,
                Ok(Some(Ok(_))) => {}
            }
        }
    }

    /// Close the socket
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
