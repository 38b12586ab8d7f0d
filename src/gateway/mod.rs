pub mod dispatcher;
pub mod events;
pub mod heartbeat;
pub mod session;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;

use crate::rooms::{default_label, sanitize_label, ConnectionId};
use crate::state::AppState;
use events::{close_code, ClientFrame};

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub label: Option<String>,
}

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    ws.max_message_size(state.gateway.max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state, params))
}

/// Write one frame. Returns `false` when the write fails or has not finished
/// within `limit`; a client that stops reading must not stall its task.
async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    msg: Message,
    limit: Duration,
) -> bool {
    match tokio::time::timeout(limit, sink.send(msg)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!("gateway write failed: {e}");
            false
        }
        Err(_) => {
            tracing::debug!("gateway write timed out after {limit:?}");
            false
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, params: ConnectParams) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let write_limit = state.gateway.heartbeat_timeout;

    let connection_id = ConnectionId::generate();
    let label = params
        .label
        .as_deref()
        .and_then(sanitize_label)
        .unwrap_or_else(|| default_label(&connection_id));

    if let Err(e) = state.relay.register(connection_id.clone(), label.clone()) {
        tracing::error!("rejecting gateway connection: {e}");
        let close = CloseFrame {
            code: close_code::REGISTRATION_FAILED,
            reason: Utf8Bytes::from_static("registration failed"),
        };
        send_frame(&mut ws_sink, Message::Close(Some(close)), write_limit).await;
        return;
    }

    let mut outbox = state
        .dispatcher
        .register(connection_id.clone(), state.gateway.outbound_buffer);
    tracing::debug!(connection = %connection_id, label = %label, "gateway connection opened");

    let hello = events::hello(&connection_id, &label, state.gateway.heartbeat_interval);
    let mut open = send_frame(&mut ws_sink, Message::Text(hello.into()), write_limit).await;

    let mut seq: u64 = 0;
    let mut last_seen = tokio::time::Instant::now();
    let mut heartbeat_check = tokio::time::interval(state.gateway.heartbeat_interval);

    while open {
        tokio::select! {
            // Relay events queued for this connection
            Some(event) = outbox.recv() => {
                seq += 1;
                let frame = match events::encode_dispatch(seq, &event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!("failed to encode {} event: {e}", event.kind());
                        continue;
                    }
                };
                open = send_frame(&mut ws_sink, Message::Text(frame.into()), write_limit).await;
            }
            // Heartbeat check
            _ = heartbeat_check.tick() => {
                if last_seen.elapsed() > state.gateway.heartbeat_timeout {
                    tracing::debug!(connection = %connection_id, "heartbeat timed out");
                    let close = CloseFrame {
                        code: close_code::SESSION_TIMED_OUT,
                        reason: Utf8Bytes::from_static("heartbeat timed out"),
                    };
                    send_frame(&mut ws_sink, Message::Close(Some(close)), write_limit).await;
                    open = false;
                }
            }
            // Incoming frames
            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        last_seen = tokio::time::Instant::now();
                        match events::decode(text.as_str()) {
                            Ok(ClientFrame::Heartbeat) => {
                                let ack = events::heartbeat_ack();
                                open = send_frame(&mut ws_sink, Message::Text(ack.into()), write_limit).await;
                            }
                            Ok(ClientFrame::Event(inbound)) => {
                                let deliveries = state.relay.handle(&connection_id, inbound);
                                state.dispatcher.deliver(deliveries);
                            }
                            Err(e) => {
                                tracing::debug!(connection = %connection_id, "dropping client frame: {e}");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => open = false,
                    Some(Err(e)) => {
                        tracing::debug!(connection = %connection_id, "gateway read error: {e}");
                        open = false;
                    }
                    Some(Ok(_)) => last_seen = tokio::time::Instant::now(),
                }
            }
        }
    }

    // Runs once per connection regardless of why the loop ended.
    let deliveries = state.relay.disconnect(&connection_id);
    state.dispatcher.remove(&connection_id);
    let report = state.dispatcher.deliver(deliveries);
    tracing::debug!(
        connection = %connection_id,
        notified = report.delivered,
        "gateway connection closed"
    );
}
