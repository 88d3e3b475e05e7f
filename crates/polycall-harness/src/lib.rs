//! Tooling for exercising the polycall bridge.
//!
//! This crate provides:
//! - Storm runs: many threads driving random transitions over a fully
//!   installed bridge, with a JSON report and an optional JSONL trace log.
//! - Topology inspection: parse the text form and list the permitted edges.

#![forbid(unsafe_code)]

pub mod error;
pub mod report;
pub mod storm;

pub use error::HarnessError;
pub use report::{StormReport, TopologyReport, TraceDigest};
pub use storm::{StormConfig, StormRun, run_storm};
