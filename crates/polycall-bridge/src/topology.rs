//! Transition legality authority.
//!
//! The topology manager is the only component that may grant a transition.
//! Its verdict for a `(from, to)` pair is deterministic between mutations.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

use crate::error::{BridgeError, BridgeResult};
use crate::layer::{LAYER_MAX, Layer};

/// Source of truth for which layer transitions are legal.
pub trait TopologyManager: Send + Sync {
    /// Returns true if control may move from `from` to `to`.
    fn permits(&self, from: Layer, to: Layer) -> bool;

    /// `Ok` for a legal transition, `TopologyViolation` otherwise.
    fn validate_transition(&self, from: Layer, to: Layer) -> BridgeResult<()> {
        if self.permits(from, to) {
            Ok(())
        } else {
            Err(BridgeError::TopologyViolation { from, to })
        }
    }
}

impl<F> TopologyManager for F
where
    F: Fn(Layer, Layer) -> bool + Send + Sync,
{
    fn permits(&self, from: Layer, to: Layer) -> bool {
        self(from, to)
    }
}

/// Errors from the topology text form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyParseError {
    #[error("unknown layer `{0}`")]
    UnknownLayer(String),
    #[error("malformed rule `{0}` (expected `a->b` or `a<->b`)")]
    MalformedRule(String),
}

/// Adjacency matrix over layers, one atomic bitmask row per source layer.
#[derive(Debug, Default)]
pub struct TopologyMatrix {
    rows: [AtomicU8; LAYER_MAX],
}

impl TopologyMatrix {
    /// Matrix that denies every transition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Matrix that permits every pair, including same-layer re-entry.
    #[must_use]
    pub fn fully_connected() -> Self {
        let full = Layer::ALL.iter().fold(0_u8, |acc, layer| acc | layer.bit());
        Self {
            rows: std::array::from_fn(|_| AtomicU8::new(full)),
        }
    }

    pub fn allow(&self, from: Layer, to: Layer) -> &Self {
        self.rows[from.index()].fetch_or(to.bit(), Ordering::AcqRel);
        self
    }

    pub fn deny(&self, from: Layer, to: Layer) -> &Self {
        self.rows[from.index()].fetch_and(!to.bit(), Ordering::AcqRel);
        self
    }

    pub fn allow_bidirectional(&self, a: Layer, b: Layer) -> &Self {
        self.allow(a, b).allow(b, a)
    }

    /// Every permitted `(from, to)` pair in slot order.
    #[must_use]
    pub fn edges(&self) -> Vec<(Layer, Layer)> {
        let mut out = Vec::new();
        for from in Layer::ALL {
            let row = self.rows[from.index()].load(Ordering::Acquire);
            for to in Layer::ALL {
                if row & to.bit() != 0 {
                    out.push((from, to));
                }
            }
        }
        out
    }

    fn apply_rule(&self, rule: &str) -> Result<(), TopologyParseError> {
        match rule.to_ascii_lowercase().as_str() {
            "all" | "*" => {
                for from in Layer::ALL {
                    for to in Layer::ALL {
                        self.allow(from, to);
                    }
                }
                return Ok(());
            }
            "none" => return Ok(()),
            _ => {}
        }

        let (lhs, rhs, both) = if let Some((l, r)) = rule.split_once("<->") {
            (l, r, true)
        } else if let Some((l, r)) = rule.split_once("->") {
            (l, r, false)
        } else {
            return Err(TopologyParseError::MalformedRule(rule.to_string()));
        };

        let from = parse_layer(lhs)?;
        let to = parse_layer(rhs)?;
        if both {
            self.allow_bidirectional(from, to);
        } else {
            self.allow(from, to);
        }
        Ok(())
    }
}

fn parse_layer(raw: &str) -> Result<Layer, TopologyParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TopologyParseError::MalformedRule(raw.to_string()));
    }
    Layer::from_str_loose(trimmed).ok_or_else(|| TopologyParseError::UnknownLayer(trimmed.into()))
}

impl TopologyManager for TopologyMatrix {
    fn permits(&self, from: Layer, to: Layer) -> bool {
        self.rows[from.index()].load(Ordering::Acquire) & to.bit() != 0
    }
}

impl FromStr for TopologyMatrix {
    type Err = TopologyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let matrix = Self::new();
        for rule in s.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            matrix.apply_rule(rule)?;
        }
        Ok(matrix)
    }
}

impl fmt::Display for TopologyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edges = self.edges();
        if edges.is_empty() {
            return f.write_str("none");
        }
        let rendered: Vec<String> = edges
            .iter()
            .map(|(from, to)| format!("{from}->{to}"))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}
