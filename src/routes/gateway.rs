use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// Where and how to connect to the signaling gateway, plus live counts.
pub async fn get_gateway(State(state): State<AppState>) -> Json<serde_json::Value> {
    let stats = state.relay.stats();
    Json(serde_json::json!({
        "data": {
            "url": "/ws",
            "heartbeat_interval": state.gateway.heartbeat_interval.as_millis() as u64,
            "max_room_members": state.gateway.max_room_members,
            "rooms": stats.rooms,
            "connections": stats.connections
        }
    }))
}
