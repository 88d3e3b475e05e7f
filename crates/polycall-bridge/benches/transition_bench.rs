use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use polycall_bridge::{
    Adapter, AdapterHandle, AdapterOrchestrator, AdapterRegistry, Layer, ThreadKey,
    TopologyManager, TopologyMatrix, TraceMode, orchestrate_transition,
};

struct Passthrough;

impl Adapter for Passthrough {
    fn language(&self) -> &'static str {
        "passthrough"
    }
}

fn installed_registry() -> Arc<AdapterRegistry> {
    let manager: Arc<dyn TopologyManager> = Arc::new(TopologyMatrix::fully_connected());
    let registry = Arc::new(AdapterRegistry::new(Arc::clone(&manager)));
    for layer in Layer::ALL {
        let handle = AdapterHandle::new(layer, Arc::clone(&manager), Box::new(Passthrough))
            .expect("passthrough init");
        registry.register(layer, handle).expect("slot matches layer");
    }
    registry
}

fn benchmark_transition_paths(c: &mut Criterion) {
    let registry = installed_registry();
    let orchestrator =
        AdapterOrchestrator::new(Arc::clone(&registry)).with_trace_mode(TraceMode::Off);
    let thread = ThreadKey::current();
    let mut group = c.benchmark_group("transition_paths");

    for (from, to) in [(Layer::Python, Layer::Go), (Layer::NodeJs, Layer::Native)] {
        let label = format!("{from}->{to}");
        group.bench_with_input(BenchmarkId::new("bare", &label), &(from, to), |b, &(f, t)| {
            b.iter(|| orchestrate_transition(&registry, thread, black_box(f), black_box(t)));
        });
        group.bench_with_input(
            BenchmarkId::new("orchestrator", &label),
            &(from, to),
            |b, &(f, t)| {
                b.iter(|| orchestrator.transition(thread, black_box(f), black_box(t)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_transition_paths);
criterion_main!(benches);
