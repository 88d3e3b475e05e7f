use polycall_bridge::{BridgeError, TopologyParseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("topology: {0}")]
    Topology(#[from] TopologyParseError),
    #[error("bridge setup failed: {0}")]
    Bridge(#[from] BridgeError),
    #[error("invalid storm configuration: {0}")]
    InvalidConfig(&'static str),
}
