use std::str::FromStr;
use std::time::Duration;

use crate::gateway::heartbeat::{HEARTBEAT_INTERVAL, HEARTBEAT_TIMEOUT};

/// Per-connection outbox capacity, in events.
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;
/// Largest WebSocket frame accepted; voice notes arrive as base64 text.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub heartbeat_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub outbound_buffer: usize,
    pub max_message_bytes: usize,
    /// `None` means rooms are unbounded.
    pub max_room_members: Option<usize>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: HEARTBEAT_INTERVAL,
            heartbeat_timeout: HEARTBEAT_TIMEOUT,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            max_room_members: None,
        }
    }
}

pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Origins allowed by CORS. Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub gateway: GatewayConfig,
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Like `env_parse`, but zero counts as unset.
fn env_positive(key: &str) -> Option<u64> {
    env_parse::<u64>(key).filter(|v| *v > 0)
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = GatewayConfig::default();

        let gateway = GatewayConfig {
            heartbeat_interval: env_positive("MEET_HEARTBEAT_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_interval),
            heartbeat_timeout: env_positive("MEET_HEARTBEAT_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.heartbeat_timeout),
            outbound_buffer: env_positive("MEET_OUTBOUND_BUFFER")
                .map(|v| v as usize)
                .unwrap_or(defaults.outbound_buffer),
            max_message_bytes: env_positive("MEET_MAX_MESSAGE_BYTES")
                .map(|v| v as usize)
                .unwrap_or(defaults.max_message_bytes),
            max_room_members: env_positive("MEET_MAX_ROOM_MEMBERS").map(|v| v as usize),
        };

        let allowed_origins = std::env::var("MEET_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            port: env_parse("PORT").unwrap_or(8000),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:meet.db?mode=rwc".to_string()),
            allowed_origins,
            gateway,
        }
    }
}
