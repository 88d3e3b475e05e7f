//! Layer identifiers and caller thread identity.

use std::cell::Cell;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Number of layer slots known to the bridge.
pub const LAYER_MAX: usize = 4;

/// One participating language runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Layer {
    Python = 0,
    Go = 1,
    NodeJs = 2,
    /// Reserved core/native layer.
    Native = 3,
}

impl Layer {
    /// Every layer in slot order.
    pub const ALL: [Layer; LAYER_MAX] = [Layer::Python, Layer::Go, Layer::NodeJs, Layer::Native];

    /// Slot index of this layer.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolve a raw slot index. Out-of-range ids are rejected.
    pub fn from_index(index: usize) -> Result<Self, BridgeError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(BridgeError::InvalidLayer(index))
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::Go => "go",
            Self::NodeJs => "nodejs",
            Self::Native => "native",
        }
    }

    /// Parse a layer name (case-insensitive, common aliases accepted).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "go" | "golang" => Some(Self::Go),
            "nodejs" | "node" | "js" => Some(Self::NodeJs),
            "native" | "core" | "c" => Some(Self::Native),
            _ => None,
        }
    }

    /// Single-bit mask used by topology rows.
    #[must_use]
    pub(crate) const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| format!("unknown layer `{}`", s.trim()))
    }
}

static NEXT_THREAD_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static SELF_KEY: Cell<u64> = const { Cell::new(0) };
}

/// Identity of the thread driving a transition.
///
/// Keys are caller-supplied; `current()` hands out a stable per-thread key for
/// callers that do not track their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadKey(u64);

impl ThreadKey {
    /// Wrap an externally managed thread id.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Key of the calling OS thread, assigned on first use.
    #[must_use]
    pub fn current() -> Self {
        SELF_KEY.with(|slot| {
            let existing = slot.get();
            if existing != 0 {
                return Self(existing);
            }
            let fresh = NEXT_THREAD_KEY.fetch_add(1, Ordering::Relaxed);
            slot.set(fresh);
            Self(fresh)
        })
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
