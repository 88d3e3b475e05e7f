//! Structured transition trace records.
//!
//! One JSONL line per traced transition attempt. Emission is gated by
//! [`crate::config::TraceMode`].

use std::io::Write;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, ErrorKind};
use crate::layer::{Layer, ThreadKey};

/// Where a transition attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    Completed,
    MissingAdapter,
    ExitFailed,
    TopologyRejected,
    EnterFailed,
}

/// One transition attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub timestamp: String,
    pub thread: ThreadKey,
    pub from: Layer,
    pub to: Layer,
    pub outcome: TraceOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

impl TraceEvent {
    #[must_use]
    pub fn new(thread: ThreadKey, from: Layer, to: Layer, outcome: TraceOutcome) -> Self {
        Self {
            timestamp: now_utc(),
            thread,
            from,
            to,
            outcome,
            error: None,
            code: None,
        }
    }

    /// Attach the failure that ended the attempt.
    #[must_use]
    pub fn with_error(mut self, err: &BridgeError) -> Self {
        self.error = Some(err.to_string());
        self.code = Some(err.code());
        self
    }

    /// Serialize as a single JSONL line (without trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl TraceOutcome {
    /// Outcome for an error raised while entering the destination.
    #[must_use]
    pub const fn for_enter_error(err: &BridgeError) -> Self {
        match err.kind() {
            ErrorKind::TopologyViolation => Self::TopologyRejected,
            _ => Self::EnterFailed,
        }
    }
}

/// Destination for trace events.
pub trait TraceSink: Send + Sync {
    fn record(&self, event: &TraceEvent);
}

/// Writes events as JSONL lines.
pub struct JsonlTraceSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlTraceSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> W {
        let mut writer = self.writer.into_inner();
        let _ = writer.flush();
        writer
    }
}

impl<W: Write + Send> TraceSink for JsonlTraceSink<W> {
    fn record(&self, event: &TraceEvent) {
        let Ok(line) = event.to_jsonl() else {
            return;
        };
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "{line}");
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct MemoryTraceSink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemoryTraceSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl TraceSink for MemoryTraceSink {
    fn record(&self, event: &TraceEvent) {
        self.events.lock().push(event.clone());
    }
}

fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let (year, month, day) = civil_from_days((secs / 86_400) as i64);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        duration.subsec_millis(),
    )
}

// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
