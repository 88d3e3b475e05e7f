//! Bridge error taxonomy.
//!
//! Every failure is local to one call and leaves the registry and adapters
//! reusable. `code()` keeps the integer contract of the C surface (`-1` for
//! everything except adapter-supplied codes); `kind()` exposes the phase that
//! failed for callers that need to tell them apart.

use serde::Serialize;
use thiserror::Error;

use crate::layer::{Layer, ThreadKey};

/// Generic failure code of the integer contract.
pub const FAILURE: i32 = -1;

/// Errors produced by bridge operations and adapter hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("layer id {0} is out of range")]
    InvalidLayer(usize),
    #[error("adapter for {adapter} cannot occupy the {slot} slot")]
    LayerMismatch { slot: Layer, adapter: Layer },
    #[error("no adapter installed for {0}")]
    MissingAdapter(Layer),
    #[error("topology forbids {from} -> {to}")]
    TopologyViolation { from: Layer, to: Layer },
    #[error("{layer} adapter is bound to thread {owner}, entered from {caller}")]
    ThreadAffinity {
        layer: Layer,
        owner: ThreadKey,
        caller: ThreadKey,
    },
    #[error("{layer} runtime unavailable: {reason}")]
    RuntimeUnavailable { layer: Layer, reason: String },
    #[error("{layer} adapter hook failed with code {code}")]
    AdapterFailure { layer: Layer, code: i32 },
}

/// Result alias used across the bridge.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Coarse classification of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidArgument,
    MissingAdapter,
    TopologyViolation,
    RuntimeViolation,
    AdapterFailure,
}

impl BridgeError {
    /// Integer code for the C contract. Always non-zero.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::AdapterFailure { code, .. } if *code != 0 => *code,
            _ => FAILURE,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidLayer(_) | Self::LayerMismatch { .. } => ErrorKind::InvalidArgument,
            Self::MissingAdapter(_) => ErrorKind::MissingAdapter,
            Self::TopologyViolation { .. } => ErrorKind::TopologyViolation,
            Self::ThreadAffinity { .. } | Self::RuntimeUnavailable { .. } => {
                ErrorKind::RuntimeViolation
            }
            Self::AdapterFailure { .. } => ErrorKind::AdapterFailure,
        }
    }

    /// Shorthand for a runtime-unavailable error.
    #[must_use]
    pub fn runtime(layer: Layer, reason: impl Into<String>) -> Self {
        Self::RuntimeUnavailable {
            layer,
            reason: reason.into(),
        }
    }
}

/// Collapse a result into the `0 / nonzero` integer contract.
#[must_use]
pub fn status_code<T>(result: &BridgeResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => err.code(),
    }
}
