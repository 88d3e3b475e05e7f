//! Environment configuration.
//!
//! - `POLYCALL_TRACE` selects which transition outcomes produce trace records:
//!   `off` (default), `failures`, or `all`.
//! - `POLYCALL_TOPOLOGY` optionally carries a topology in text form, e.g.
//!   `python->go, go<->nodejs`.
//!
//! The layer count is fixed at build time by [`crate::LAYER_MAX`].

use std::sync::OnceLock;

use crate::topology::{TopologyMatrix, TopologyParseError};
use crate::trace::TraceOutcome;

/// Environment variable selecting the trace mode.
pub const TRACE_ENV: &str = "POLYCALL_TRACE";
/// Environment variable carrying a topology in text form.
pub const TOPOLOGY_ENV: &str = "POLYCALL_TOPOLOGY";

/// Which transition outcomes are traced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceMode {
    /// No trace records.
    #[default]
    Off,
    /// Only failed transitions.
    Failures,
    /// Every transition attempt.
    All,
}

impl TraceMode {
    /// Parse from string (case-insensitive). Unknown values disable tracing.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "failures" | "errors" | "fail" => Self::Failures,
            "all" | "1" | "on" | "full" | "verbose" => Self::All,
            _ => Self::Off,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Failures => "failures",
            Self::All => "all",
        }
    }

    /// Returns true if `outcome` should produce a trace record.
    #[must_use]
    pub const fn records(self, outcome: TraceOutcome) -> bool {
        match self {
            Self::Off => false,
            Self::Failures => !matches!(outcome, TraceOutcome::Completed),
            Self::All => true,
        }
    }
}

fn mode_from_env() -> TraceMode {
    std::env::var(TRACE_ENV)
        .map(|v| TraceMode::from_str_loose(&v))
        .unwrap_or_default()
}

/// Configured trace mode (reads the environment once, cached thereafter).
///
/// Callers racing the first read block until it is published, so every
/// caller in the process observes the same mode.
#[must_use]
pub fn trace_mode() -> TraceMode {
    static MODE: OnceLock<TraceMode> = OnceLock::new();
    *MODE.get_or_init(mode_from_env)
}

/// Topology described by `POLYCALL_TOPOLOGY`, if set.
pub fn topology_from_env() -> Result<Option<TopologyMatrix>, TopologyParseError> {
    match std::env::var(TOPOLOGY_ENV) {
        Ok(raw) => raw.parse().map(Some),
        Err(_) => Ok(None),
    }
}
