//! Transition storms.
//!
//! Every layer gets an adapter backed by the in-process emulated runtimes.
//! Each worker walks the layer graph from `native`: it picks a random
//! destination, transitions from where it currently is, and moves only on
//! success. Workers always finish with a transition back to `native`, so the
//! interpreter lock is never held once the storm returns.
//!
//! Worker keys are explicit and the Go adapter is owned by worker 0; every
//! other worker's Go entries are affinity violations by construction.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use polycall_adapters::{
    EmulatedAsyncHandle, EmulatedInterpreter, EmulatedNodeEnv, create_go_adapter_for,
    create_native_adapter, create_nodejs_adapter, create_python_adapter,
};
use polycall_bridge::{
    AdapterOrchestrator, AdapterRegistry, ErrorKind, JsonlTraceSink, LAYER_MAX, Layer, ThreadKey,
    TopologyManager, TopologyMatrix, TraceMode,
};

use crate::error::HarnessError;
use crate::report::{StormReport, TraceDigest};

/// Worker `i` drives transitions as `ThreadKey(WORKER_KEY_BASE + i)`.
pub const WORKER_KEY_BASE: u64 = 1 << 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StormConfig {
    pub threads: usize,
    pub iterations: usize,
    pub seed: u64,
    /// Topology in text form (`all`, `python->go, go<->nodejs`, ...).
    pub topology: String,
    pub trace_mode: TraceMode,
}

impl Default for StormConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            iterations: 1000,
            seed: 0xDEAD_BEEF,
            topology: "all".to_string(),
            trace_mode: TraceMode::Off,
        }
    }
}

/// Report plus the raw JSONL trace (empty when tracing is off).
#[derive(Debug)]
pub struct StormRun {
    pub report: StormReport,
    pub trace_log: Vec<u8>,
}

struct Runtimes {
    interpreter: Arc<EmulatedInterpreter>,
    node_env: Arc<EmulatedNodeEnv>,
    node_async: Arc<EmulatedAsyncHandle>,
}

fn install(
    manager: &Arc<dyn TopologyManager>,
    go_owner: ThreadKey,
) -> Result<(AdapterRegistry, Runtimes), HarnessError> {
    let runtimes = Runtimes {
        interpreter: Arc::new(EmulatedInterpreter::new()),
        node_env: Arc::new(EmulatedNodeEnv::new()),
        node_async: Arc::new(EmulatedAsyncHandle::new()),
    };
    let registry = AdapterRegistry::new(Arc::clone(manager));
    registry.register(
        Layer::Python,
        create_python_adapter(Arc::clone(manager), runtimes.interpreter.clone())?,
    )?;
    registry.register(Layer::Go, create_go_adapter_for(Arc::clone(manager), go_owner)?)?;
    registry.register(
        Layer::NodeJs,
        create_nodejs_adapter(
            Arc::clone(manager),
            runtimes.node_env.clone(),
            Some(runtimes.node_async.clone()),
        )?,
    )?;
    registry.register(Layer::Native, create_native_adapter(Arc::clone(manager))?)?;
    Ok((registry, runtimes))
}

/// Run a storm described by `config`.
pub fn run_storm(config: &StormConfig) -> Result<StormRun, HarnessError> {
    if config.threads == 0 {
        return Err(HarnessError::InvalidConfig("threads must be at least 1"));
    }
    let matrix: TopologyMatrix = config.topology.parse()?;
    let topology = matrix.to_string();
    let manager: Arc<dyn TopologyManager> = Arc::new(matrix);
    let (registry, runtimes) = install(&manager, ThreadKey::from_raw(WORKER_KEY_BASE))?;

    let sink = Arc::new(JsonlTraceSink::new(Vec::new()));
    let orchestrator = AdapterOrchestrator::new(Arc::new(registry))
        .with_trace_mode(config.trace_mode)
        .with_sink(sink.clone());

    let failures_by_kind = thread::scope(|scope| {
        let workers: Vec<_> = (0..config.threads)
            .map(|index| {
                let orchestrator = &orchestrator;
                scope.spawn(move || worker(orchestrator, config, index))
            })
            .collect();
        let mut merged: BTreeMap<ErrorKind, u64> = BTreeMap::new();
        for handle in workers {
            // A panicking worker is a harness bug; surface it as-is.
            let local = match handle.join() {
                Ok(local) => local,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            for (kind, count) in local {
                *merged.entry(kind).or_default() += count;
            }
        }
        merged
    });

    let stats = orchestrator.stats();
    // Read before teardown; adapter cleanup would release a leaked lock.
    let python_lock_outstanding = runtimes.interpreter.outstanding();
    drop(orchestrator);
    let trace_log = Arc::try_unwrap(sink)
        .map(JsonlTraceSink::into_inner)
        .unwrap_or_default();
    let trace = (config.trace_mode != TraceMode::Off).then(|| TraceDigest::of(&trace_log));

    let report = StormReport {
        threads: config.threads,
        iterations: config.iterations,
        seed: config.seed,
        topology,
        trace_mode: config.trace_mode.as_str(),
        stats,
        failures_by_kind,
        python_lock_outstanding,
        node_open_scopes: runtimes.node_env.open_scopes(),
        node_wakeups: runtimes.node_async.sends(),
        trace,
    };
    Ok(StormRun { report, trace_log })
}

fn worker(
    orchestrator: &AdapterOrchestrator,
    config: &StormConfig,
    index: usize,
) -> BTreeMap<ErrorKind, u64> {
    let key = ThreadKey::from_raw(WORKER_KEY_BASE + index as u64);
    let mut rng = config.seed ^ (index as u64).wrapping_mul(0xA076_1D64_78BD_642F);
    let mut failures = BTreeMap::new();
    let mut at = Layer::Native;

    let step = |from: Layer, to: Layer, failures: &mut BTreeMap<ErrorKind, u64>| {
        match orchestrator.transition(key, from, to) {
            Ok(()) => to,
            Err(err) => {
                *failures.entry(err.kind()).or_insert(0) += 1;
                from
            }
        }
    };

    for _ in 0..config.iterations {
        let to = Layer::ALL[(splitmix64_next(&mut rng) % LAYER_MAX as u64) as usize];
        at = step(at, to, &mut failures);
    }
    if at != Layer::Native {
        step(at, Layer::Native, &mut failures);
    }
    failures
}

fn splitmix64_next(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
