//! Machine-readable outputs of harness runs.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use polycall_bridge::{ErrorKind, Layer, StatsSnapshot, TopologyMatrix};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Summary of one storm run.
#[derive(Debug, Clone, Serialize)]
pub struct StormReport {
    pub threads: usize,
    pub iterations: usize,
    pub seed: u64,
    /// Topology in text form.
    pub topology: String,
    pub trace_mode: &'static str,
    pub stats: StatsSnapshot,
    pub failures_by_kind: BTreeMap<ErrorKind, u64>,
    /// Interpreter-lock acquisitions never released; nonzero is a leak.
    pub python_lock_outstanding: u64,
    pub node_open_scopes: usize,
    pub node_wakeups: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceDigest>,
}

impl StormReport {
    /// Transitions that ended in an error.
    #[must_use]
    pub fn failures(&self) -> u64 {
        self.failures_by_kind.values().sum()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Integrity record of a JSONL trace log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceDigest {
    pub events: usize,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl TraceDigest {
    #[must_use]
    pub fn of(log: &[u8]) -> Self {
        Self {
            events: log.iter().filter(|&&b| b == b'\n').count(),
            sha256: sha256_hex(log),
            path: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: Layer,
    pub to: Layer,
}

/// Parsed topology: canonical rule text plus the permitted edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyReport {
    pub rules: String,
    pub edges: Vec<Edge>,
}

impl TopologyReport {
    #[must_use]
    pub fn of(matrix: &TopologyMatrix) -> Self {
        Self {
            rules: matrix.to_string(),
            edges: matrix
                .edges()
                .into_iter()
                .map(|(from, to)| Edge { from, to })
                .collect(),
        }
    }
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    hex_lower(&Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn digest_counts_lines() {
        let digest = TraceDigest::of(b"{\"a\":1}\n{\"a\":2}\n");
        assert_eq!(digest.events, 2);
        assert_eq!(digest.sha256.len(), 64);
        assert!(digest.path.is_none());
    }

    #[test]
    fn topology_report_lists_edges() {
        let matrix: TopologyMatrix = "python->go, go<->nodejs".parse().unwrap();
        let report = TopologyReport::of(&matrix);
        assert_eq!(report.edges.len(), 3);
        assert!(report.edges.contains(&Edge {
            from: Layer::Python,
            to: Layer::Go
        }));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["edges"][0]["from"], "python");
    }
}
