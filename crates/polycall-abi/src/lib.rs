// All extern "C" exports take raw pointers from C callers and null-check
// them; per-function safety docs would repeat the same contract.
#![allow(clippy::missing_safety_doc)]
//! # polycall-abi
//!
//! extern "C" boundary for the polycall bridge.
//!
//! ```text
//! C caller -> ABI entry (this crate) -> null/range checks -> polycall-bridge
//! ```
//!
//! Every entry point reports failure as `-1` (or a null pointer) and never
//! unwinds across the boundary. Topologies and adapters are reference-counted
//! objects handed out as raw `Arc` pointers; a registry is an owned object
//! freed with `polycall_registry_destroy`.
//!
//! Python and Node.js adapters created here bind to process-wide emulated
//! runtimes. Embedders with a live interpreter use the Rust API directly.

pub mod adapter_abi;
pub mod registry_abi;
pub mod runtimes;
pub mod topology_abi;

mod util;

pub use registry_abi::PolycallRegistry;
