//! End-to-end storm runs over the emulated runtimes.

use polycall_bridge::{ErrorKind, TraceMode};
use polycall_harness::report::sha256_hex;
use polycall_harness::{StormConfig, run_storm};

#[test]
fn concurrent_storm_leaks_no_runtime_state() {
    let config = StormConfig {
        threads: 4,
        iterations: 500,
        ..StormConfig::default()
    };
    let run = run_storm(&config).unwrap();
    let report = &run.report;

    assert_eq!(report.python_lock_outstanding, 0);
    assert_eq!(report.node_open_scopes, 0);
    assert_eq!(
        report.stats.completed + report.failures(),
        report.stats.attempted
    );
    assert!(report.stats.attempted >= 4 * 500);
    // Only worker 0 owns the Go adapter.
    assert!(report.failures_by_kind.get(&ErrorKind::RuntimeViolation).copied().unwrap_or(0) > 0);
    assert!(!report.failures_by_kind.contains_key(&ErrorKind::MissingAdapter));
    assert!(report.node_wakeups > 0);
}

#[test]
fn traced_storm_digest_matches_log() {
    let config = StormConfig {
        threads: 2,
        iterations: 100,
        seed: 7,
        topology: "python<->go, go<->native, native<->nodejs".to_string(),
        trace_mode: TraceMode::All,
    };
    let run = run_storm(&config).unwrap();
    let digest = run.report.trace.clone().unwrap();

    assert_eq!(digest.sha256, sha256_hex(&run.trace_log));
    assert_eq!(digest.events as u64, run.report.stats.attempted);

    let text = String::from_utf8(run.trace_log).unwrap();
    for line in text.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value["outcome"].is_string());
        assert!(value["timestamp"].is_string());
    }
}

#[test]
fn failures_mode_traces_only_failures() {
    let config = StormConfig {
        threads: 1,
        iterations: 200,
        topology: "python->go".to_string(),
        trace_mode: TraceMode::Failures,
        ..StormConfig::default()
    };
    let run = run_storm(&config).unwrap();
    let report = &run.report;
    let digest = report.trace.as_ref().unwrap();
    assert_eq!(digest.events as u64, report.failures());
    assert_eq!(
        report.failures_by_kind.get(&ErrorKind::TopologyViolation).copied(),
        Some(report.failures())
    );
}

#[test]
fn report_serializes_kinds_as_snake_case() {
    let config = StormConfig {
        threads: 1,
        iterations: 20,
        topology: "none".to_string(),
        ..StormConfig::default()
    };
    let run = run_storm(&config).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&run.report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["failures_by_kind"]["topology_violation"], 20);
    assert_eq!(json["trace_mode"], "off");
    assert_eq!(json["topology"], "none");
    assert!(json.get("trace").is_none());
}
