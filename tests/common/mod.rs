#![allow(dead_code)]

use axum::body::Body;
use futures_util::{SinkExt, StreamExt};
use http::{Method, Request, StatusCode};
use meetserver::config::GatewayConfig;
use meetserver::db;
use meetserver::routes;
use meetserver::state::AppState;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

/// How long a test waits for an expected frame before failing.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Test server that owns an in-memory SQLite pool and full AppState.
/// Each instance is isolated, so tests can run in parallel.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::with_gateway(GatewayConfig::default()).await
    }

    pub async fn with_gateway(gateway: GatewayConfig) -> Self {
        let pool = db::create_pool("sqlite::memory:")
            .await
            .expect("failed to create test pool");
        Self {
            state: AppState::new(pool, gateway, vec![]),
        }
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    /// Binds a TCP listener on port 0, spawns the server, and returns `host:port`.
    pub async fn spawn(&self) -> String {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("127.0.0.1:{}", addr.port())
    }

    /// Register a user through the API and log in. Returns the token.
    pub async fn register_and_login(&self, username: &str) -> String {
        let register = json_request(
            Method::POST,
            "/api/v1/users/register",
            &serde_json::json!({
                "name": format!("{username} Test"),
                "username": username,
                "password": "correct horse battery"
            }),
        );
        let response = self.router().oneshot(register).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let login = json_request(
            Method::POST,
            "/api/v1/users/login",
            &serde_json::json!({
                "username": username,
                "password": "correct horse battery"
            }),
        );
        let response = self.router().oneshot(login).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = parse_body(response).await;
        body["token"].as_str().unwrap().to_string()
    }
}

// ---------------------------------------------------------------------------
// Request builder helpers
// ---------------------------------------------------------------------------

/// Build a request with a JSON body.
pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Build a GET request with no body.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Parse a response body into a `serde_json::Value`.
pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Gateway client
// ---------------------------------------------------------------------------

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A gateway client that has already received HELLO.
pub struct TestClient {
    pub ws: WsStream,
    pub connection_id: String,
    pub label: String,
    pub heartbeat_interval: u64,
}

impl TestClient {
    pub async fn connect(addr: &str, label: Option<&str>) -> Self {
        let url = match label {
            Some(label) => format!("ws://{addr}/ws?label={label}"),
            None => format!("ws://{addr}/ws"),
        };
        let (mut ws, _) = connect_async(url).await.unwrap();
        let hello = next_json(&mut ws).await;
        assert_eq!(hello["op"], 5, "expected HELLO, got {hello}");
        Self {
            ws,
            connection_id: hello["data"]["connection_id"].as_str().unwrap().to_string(),
            label: hello["data"]["label"].as_str().unwrap().to_string(),
            heartbeat_interval: hello["data"]["heartbeat_interval"].as_u64().unwrap(),
        }
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.ws.send(Message::Text(text.into())).await.unwrap();
    }

    pub async fn send_event(&mut self, event_type: &str, data: serde_json::Value) {
        let frame = serde_json::json!({ "op": 0, "type": event_type, "data": data });
        self.send_raw(&frame.to_string()).await;
    }

    pub async fn heartbeat(&mut self) {
        self.send_raw(r#"{"op":1}"#).await;
    }

    pub async fn join(&mut self, room: &str) {
        self.send_event("join", serde_json::json!({ "room": room })).await;
    }

    pub async fn chat(&mut self, text: &str) {
        self.send_event("chat-message", serde_json::json!({ "text": text }))
            .await;
    }

    /// Next dispatch frame, skipping heartbeat acks.
    pub async fn next_event(&mut self) -> serde_json::Value {
        loop {
            let frame = next_json(&mut self.ws).await;
            if frame["op"] == 0 {
                return frame;
            }
        }
    }

    /// Next dispatch frame of the given type, which must be the next one.
    pub async fn expect_event(&mut self, event_type: &str) -> serde_json::Value {
        let frame = self.next_event().await;
        assert_eq!(frame["type"], event_type, "unexpected frame {frame}");
        frame["data"].clone()
    }

    /// Like `next_event`, but keeps heartbeating so the server does not time
    /// this client out while it waits.
    pub async fn next_event_heartbeating(&mut self, every: Duration) -> serde_json::Value {
        let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => panic!("timed out waiting for event"),
                _ = tokio::time::sleep(every) => self.heartbeat().await,
                msg = self.ws.next() => {
                    let frame = to_json(msg);
                    if frame["op"] == 0 {
                        return frame;
                    }
                }
            }
        }
    }

    /// Assert that no dispatch frame arrives within `wait`.
    pub async fn expect_silence(&mut self, wait: Duration) {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            match tokio::time::timeout_at(deadline, self.ws.next()).await {
                Err(_) => return,
                Ok(msg) => {
                    let frame = to_json(msg);
                    assert_ne!(frame["op"], 0, "expected silence, got {frame}");
                }
            }
        }
    }

    pub async fn close(mut self) {
        self.ws.close(None).await.unwrap();
    }
}

fn to_json(msg: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>) -> serde_json::Value {
    let msg = msg.expect("stream ended").expect("websocket error");
    let text = msg.into_text().unwrap();
    serde_json::from_str(&text).unwrap()
}

async fn next_json(ws: &mut WsStream) -> serde_json::Value {
    let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
        .await
        .expect("timed out waiting for frame");
    to_json(msg)
}
