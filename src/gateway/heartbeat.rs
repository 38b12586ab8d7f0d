use std::time::Duration;

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(45);
pub const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);
