//! Two-phase transition protocol.
//!
//! A transition exits the source layer and then enters the destination. If the
//! source refuses to exit, the destination is never entered. Both adapters are
//! held by acquired handles for the whole call.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::adapter::{AdapterHandle, Transition};
use crate::config::{self, TraceMode};
use crate::error::{BridgeError, BridgeResult};
use crate::layer::{Layer, ThreadKey};
use crate::registry::AdapterRegistry;
use crate::trace::{TraceEvent, TraceOutcome, TraceSink};

/// Move control from `from` to `to` on behalf of `thread`.
///
/// Synchronous; concurrency discipline lives inside each adapter's
/// `enter_layer` / `exit_layer`.
pub fn orchestrate_transition(
    registry: &AdapterRegistry,
    thread: ThreadKey,
    from: Layer,
    to: Layer,
) -> BridgeResult<()> {
    run_transition(registry, Transition::new(thread, from, to))
        .map(drop)
        .map_err(|failure| failure.error)
}

struct Failure {
    outcome: TraceOutcome,
    error: BridgeError,
    endpoints: (Option<AdapterHandle>, Option<AdapterHandle>),
}

fn run_transition(registry: &AdapterRegistry, transition: Transition) -> Result<Endpoints, Failure> {
    let (source, destination) = registry.get_pair(transition.from, transition.to);
    let (source, destination) = match (source, destination) {
        (Some(s), Some(d)) => (s, d),
        (s, d) => {
            let missing = if s.is_none() {
                transition.from
            } else {
                transition.to
            };
            return Err(Failure {
                outcome: TraceOutcome::MissingAdapter,
                error: BridgeError::MissingAdapter(missing),
                endpoints: (s, d),
            });
        }
    };

    if let Err(error) = source.exit(&transition) {
        return Err(Failure {
            outcome: TraceOutcome::ExitFailed,
            error,
            endpoints: (Some(source), Some(destination)),
        });
    }

    match destination.enter(&transition) {
        Ok(()) => Ok(Endpoints {
            source,
            destination,
        }),
        Err(error) => Err(Failure {
            outcome: TraceOutcome::for_enter_error(&error),
            error,
            endpoints: (Some(source), Some(destination)),
        }),
    }
}

struct Endpoints {
    source: AdapterHandle,
    destination: AdapterHandle,
}

/// Relaxed counters over orchestrated transitions.
#[derive(Debug, Default)]
pub struct TransitionStats {
    pub attempted: AtomicU64,
    pub completed: AtomicU64,
    pub missing_adapter: AtomicU64,
    pub exit_failures: AtomicU64,
    pub topology_rejections: AtomicU64,
    pub enter_failures: AtomicU64,
}

/// Point-in-time copy of [`TransitionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub attempted: u64,
    pub completed: u64,
    pub missing_adapter: u64,
    pub exit_failures: u64,
    pub topology_rejections: u64,
    pub enter_failures: u64,
}

impl TransitionStats {
    fn record(&self, outcome: TraceOutcome) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            TraceOutcome::Completed => &self.completed,
            TraceOutcome::MissingAdapter => &self.missing_adapter,
            TraceOutcome::ExitFailed => &self.exit_failures,
            TraceOutcome::TopologyRejected => &self.topology_rejections,
            TraceOutcome::EnterFailed => &self.enter_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            attempted: self.attempted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            missing_adapter: self.missing_adapter.load(Ordering::Relaxed),
            exit_failures: self.exit_failures.load(Ordering::Relaxed),
            topology_rejections: self.topology_rejections.load(Ordering::Relaxed),
            enter_failures: self.enter_failures.load(Ordering::Relaxed),
        }
    }
}

/// Public transition entry point over a shared registry.
pub struct AdapterOrchestrator {
    registry: Arc<AdapterRegistry>,
    stats: TransitionStats,
    trace_mode: Option<TraceMode>,
    sink: Option<Arc<dyn TraceSink>>,
}

impl AdapterOrchestrator {
    #[must_use]
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            stats: TransitionStats::default(),
            trace_mode: None,
            sink: None,
        }
    }

    /// Override the environment-configured trace mode.
    #[must_use]
    pub fn with_trace_mode(mut self, mode: TraceMode) -> Self {
        self.trace_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn trace_mode(&self) -> TraceMode {
        self.trace_mode.unwrap_or_else(config::trace_mode)
    }

    /// Run one transition, recording stats and trace events.
    pub fn transition(&self, thread: ThreadKey, from: Layer, to: Layer) -> BridgeResult<()> {
        let transition = Transition::new(thread, from, to);
        let mode = self.trace_mode();
        match run_transition(&self.registry, transition) {
            Ok(endpoints) => {
                self.finish(
                    mode,
                    &transition,
                    TraceOutcome::Completed,
                    None,
                    [Some(&endpoints.source), Some(&endpoints.destination)],
                );
                Ok(())
            }
            Err(failure) => {
                let (source, destination) = &failure.endpoints;
                self.finish(
                    mode,
                    &transition,
                    failure.outcome,
                    Some(&failure.error),
                    [source.as_ref(), destination.as_ref()],
                );
                Err(failure.error)
            }
        }
    }

    fn finish(
        &self,
        mode: TraceMode,
        transition: &Transition,
        outcome: TraceOutcome,
        error: Option<&BridgeError>,
        endpoints: [Option<&AdapterHandle>; 2],
    ) {
        self.stats.record(outcome);
        if !mode.records(outcome) {
            return;
        }
        let mut event = TraceEvent::new(transition.thread, transition.from, transition.to, outcome);
        if let Some(err) = error {
            event = event.with_error(err);
        }
        for adapter in endpoints.into_iter().flatten() {
            adapter.emit_trace(&event);
        }
        if let Some(sink) = &self.sink {
            sink.record(&event);
        }
    }

    /// Dry-run legality check through the source adapter. No hooks run.
    pub fn check(&self, from: Layer, to: Layer) -> BridgeResult<()> {
        let (source, destination) = self.registry.get_pair(from, to);
        let source = source.ok_or(BridgeError::MissingAdapter(from))?;
        if destination.is_none() {
            return Err(BridgeError::MissingAdapter(to));
        }
        source.validate_outbound(to)
    }
}
