//! # polycall-bridge
//!
//! Transition core of the polycall multi-runtime bridge.
//!
//! ```text
//! caller -> orchestrator -> registry (read lock, two acquired handles)
//!        -> source exit_layer -> destination enter_layer
//!           -> execute_transition (adapter veto, topology verdict, entry body)
//! ```
//!
//! Adapters for concrete runtimes live in `polycall-adapters`; the C surface
//! lives in `polycall-abi`.

#![deny(unsafe_code)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod layer;
pub mod orchestrator;
pub mod registry;
pub mod topology;
pub mod trace;

pub use adapter::{Adapter, AdapterBase, AdapterHandle, Transition};
pub use config::{TraceMode, topology_from_env, trace_mode};
pub use error::{BridgeError, BridgeResult, ErrorKind, FAILURE, status_code};
pub use layer::{LAYER_MAX, Layer, ThreadKey};
pub use orchestrator::{AdapterOrchestrator, StatsSnapshot, orchestrate_transition};
pub use registry::AdapterRegistry;
pub use topology::{TopologyManager, TopologyMatrix, TopologyParseError};
pub use trace::{JsonlTraceSink, MemoryTraceSink, TraceEvent, TraceOutcome, TraceSink};
