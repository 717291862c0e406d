//! Replication Scenario Tests
//!
//! End-to-end runs of the verification engine against the in-memory
//! directory backend:
//! - one result node per supplier, in topology order
//! - a supplier's status covers its own write and delete only
//! - leftover canary entries: 0 proceed, 1 is removed, 2+ stop the run
//! - forced updates only for consumers with an agreement
//! - a failed re-enable is reported apart from a failed disable

use serde_json::Value;

use ds_repltest::directory::attributes;
use ds_repltest::directory::memory::{LinkMode, MemoryDirectory, OpKind};
use ds_repltest::observability::{Logger, MemorySink, Severity};
use ds_repltest::topology::{ConsumerSpec, Protocol, SupplierSpec, TestEntry, Topology};
use ds_repltest::verify::{Orchestrator, RunReport, VerifyError, VerifyResult};
use ds_repltest::watchdog::Timings;

const BASE: &str = "dc=example,dc=com";
const CANARY: &str = "uid=repltest,dc=example,dc=com";
const AGREEMENT: &str = "cn=to-c1,cn=replica,cn=dc\\3Dexample\\2Cdc\\3Dcom,cn=mapping tree,cn=config";

fn entry() -> TestEntry {
    TestEntry::new(attributes([
        ("uid", vec!["repltest"]),
        ("cn", vec!["Replication Test"]),
        ("objectClass", vec!["top", "account"]),
    ]))
    .unwrap()
}

fn supplier(host: &str) -> SupplierSpec {
    SupplierSpec::new(Protocol::Ldap, host, 389).with_bind("cn=Directory Manager", "secret")
}

fn run(dir: &MemoryDirectory, topology: &Topology) -> VerifyResult<RunReport> {
    let entry = entry();
    let logger = Logger::discard();
    Orchestrator::new(dir, topology, &entry, Timings::immediate(), &logger).run()
}

// =============================================================================
// Single Supplier Tests
// =============================================================================

/// A lone supplier with no consumers passes and leaves nothing behind.
#[test]
fn test_single_supplier_without_consumers() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    let topology = Topology::new().with_supplier("main", BASE, supplier("s1")).unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(report.success);
    let outcome = report.results.supplier("main", BASE, "s1").unwrap();
    assert_eq!(outcome.status, Some(true));
    assert!(outcome.replica.is_empty());
    assert!(!dir.contains("s1", CANARY));
    assert_eq!(dir.count_ops("s1", OpKind::Add), 1);
    assert_eq!(dir.count_ops("s1", OpKind::Delete), 1);
    assert_eq!(dir.count_ops("s1", OpKind::Unbind), 1);
}

/// An unreachable supplier fails without touching its consumers.
#[test]
fn test_unreachable_supplier() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.add_host("c1");
    dir.set_unreachable("s1");
    let topology = Topology::new()
        .with_supplier(
            "main",
            BASE,
            supplier("s1").with_consumer(ConsumerSpec::in_sync("c1")),
        )
        .unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(!report.success);
    let outcome = report.results.supplier("main", BASE, "s1").unwrap();
    assert_eq!(outcome.status, Some(false));
    assert!(outcome.replica.is_empty());
    assert!(!dir.touched("c1"));
}

fn run_logged(dir: &MemoryDirectory, topology: &Topology) -> (RunReport, Vec<Value>) {
    let entry = entry();
    let sink = MemorySink::new();
    let logger = Logger::new(Severity::Info).with_sink(sink.clone());
    let report = Orchestrator::new(dir, topology, &entry, Timings::immediate(), &logger)
        .run()
        .unwrap();
    (report, sink.records())
}

fn scheduled_directory() -> (MemoryDirectory, Topology) {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.add_host("c1");
    dir.add_agreement("s1", "c1", AGREEMENT, LinkMode::OnEnable);
    let topology = Topology::new()
        .with_supplier(
            "main",
            BASE,
            supplier("s1").with_consumer(ConsumerSpec::scheduled("c1", AGREEMENT)),
        )
        .unwrap();
    (dir, topology)
}

fn left_disabled(records: &[Value]) -> Vec<&Value> {
    records
        .iter()
        .filter(|r| r["event"] == "REPLICA_AGREEMENT_LEFT_DISABLED")
        .collect()
}

fn agreement_state(dir: &MemoryDirectory) -> Vec<String> {
    dir.entry("s1", AGREEMENT).unwrap()["nsds5ReplicaEnabled"].clone()
}

// =============================================================================
// Consumer Tests
// =============================================================================

/// A consumer that never receives the entry fails; cleanup still runs.
#[test]
fn test_consumer_missing_entry() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.add_host("c1");
    let topology = Topology::new()
        .with_supplier(
            "main",
            BASE,
            supplier("s1").with_consumer(ConsumerSpec::in_sync("c1")),
        )
        .unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(!report.success);
    let outcome = report.results.supplier("main", BASE, "s1").unwrap();
    assert_eq!(outcome.status, Some(true));
    assert_eq!(outcome.replica.get("c1"), Some(&false));
    assert_eq!(dir.count_ops("s1", OpKind::Delete), 1);
    assert!(!dir.contains("s1", CANARY));
}

/// In-sync consumers get no agreement modifications.
#[test]
fn test_in_sync_consumer_needs_no_toggle() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.add_host("c1");
    dir.link_immediate("s1", "c1");
    let topology = Topology::new()
        .with_supplier(
            "main",
            BASE,
            supplier("s1").with_consumer(ConsumerSpec::in_sync("c1")),
        )
        .unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(report.success);
    assert_eq!(dir.count_ops("s1", OpKind::Modify), 0);
    assert!(!dir.contains("c1", CANARY));
}

/// A scheduled agreement is flipped off and on to push the write, then
/// again to push the delete.
#[test]
fn test_scheduled_consumer_toggled() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.add_host("c1");
    dir.add_agreement("s1", "c1", AGREEMENT, LinkMode::OnEnable);
    let topology = Topology::new()
        .with_supplier(
            "main",
            BASE,
            supplier("s1").with_consumer(ConsumerSpec::scheduled("c1", AGREEMENT)),
        )
        .unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(report.success);
    assert_eq!(
        report.results.supplier("main", BASE, "s1").unwrap().replica.get("c1"),
        Some(&true)
    );
    // write push + delete push, two modifications each
    assert_eq!(dir.count_ops("s1", OpKind::Modify), 4);
    assert!(!dir.contains("c1", CANARY));
}

/// A failed toggle marks the consumer failed without a consumer search.
#[test]
fn test_toggle_failure_fails_consumer() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.add_host("c1");
    dir.add_agreement("s1", "c1", AGREEMENT, LinkMode::OnEnable);
    dir.fail_nth("s1", OpKind::Modify, 1);
    let topology = Topology::new()
        .with_supplier(
            "main",
            BASE,
            supplier("s1").with_consumer(ConsumerSpec::scheduled("c1", AGREEMENT)),
        )
        .unwrap();

    let report = run(&dir, &topology).unwrap();

    let outcome = report.results.supplier("main", BASE, "s1").unwrap();
    assert_eq!(outcome.status, Some(true));
    assert_eq!(outcome.replica.get("c1"), Some(&false));
    assert_eq!(dir.count_ops("c1", OpKind::Search), 0);
}

// =============================================================================
// Garbage Invariant Tests
// =============================================================================

/// One leftover canary is deleted before the write.
#[test]
fn test_single_leftover_removed() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.insert_entry("s1", CANARY, attributes([("uid", ["repltest"])]));
    let topology = Topology::new().with_supplier("main", BASE, supplier("s1")).unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(report.success);
    assert_eq!(dir.count_ops("s1", OpKind::Delete), 2);
}

/// Two or more leftovers stop the run; later suppliers are never visited.
#[test]
fn test_multiple_leftovers_abort_run() {
    let dir = MemoryDirectory::new();
    for host in ["s1", "s2", "s3"] {
        dir.add_host(host);
    }
    dir.override_search_count("s2", CANARY, 2);
    let topology = Topology::new()
        .with_supplier("main", BASE, supplier("s1"))
        .unwrap()
        .with_supplier("main", BASE, supplier("s2"))
        .unwrap()
        .with_supplier("main", BASE, supplier("s3"))
        .unwrap();

    let err = run(&dir, &topology).unwrap_err();

    assert_eq!(err.exit_code(), 255);
    let VerifyError::GarbageInvariant { supplier, found, .. } = &err;
    assert_eq!(supplier, "s2");
    assert_eq!(*found, 2);

    let partial = err.partial_results();
    assert_eq!(partial.supplier("main", BASE, "s1").unwrap().status, Some(true));
    assert!(partial.supplier("main", BASE, "s3").is_none());
    assert!(!dir.touched("s3"));
    assert_eq!(dir.count_ops("s2", OpKind::Add), 0);
}

/// A failing garbage search counts as no leftover.
#[test]
fn test_garbage_search_failure_proceeds() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.fail_nth("s1", OpKind::Search, 1);
    let topology = Topology::new().with_supplier("main", BASE, supplier("s1")).unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(report.success);
    assert_eq!(dir.count_ops("s1", OpKind::Add), 1);
}

// =============================================================================
// Aggregation Tests
// =============================================================================

/// Results keep topology order across instances and suppliers.
#[test]
fn test_result_tree_order_and_aggregation() {
    let dir = MemoryDirectory::new();
    for host in ["b", "a", "c1"] {
        dir.add_host(host);
    }
    dir.link_immediate("b", "c1");
    let topology = Topology::new()
        .with_supplier(
            "zeta",
            BASE,
            supplier("b").with_consumer(ConsumerSpec::in_sync("c1")),
        )
        .unwrap()
        .with_supplier("alpha", "o=other", supplier("a"))
        .unwrap();

    let report = run(&dir, &topology).unwrap();

    let order: Vec<(&str, &str)> = report
        .results
        .iter()
        .map(|(instance, _, supplier, _)| (instance, supplier))
        .collect();
    assert_eq!(order, vec![("zeta", "b"), ("alpha", "a")]);
    assert!(report.success);
    assert_eq!(report.results.len(), 2);
}

/// Action records carry the unit context.
#[test]
fn test_actions_logged_with_context() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    let topology = Topology::new().with_supplier("main", BASE, supplier("s1")).unwrap();
    let sink = MemorySink::new();
    let logger = Logger::new(Severity::Info).with_sink(sink.clone());
    let entry = entry();

    Orchestrator::new(&dir, &topology, &entry, Timings::immediate(), &logger)
        .run()
        .unwrap();

    let records = sink.records();
    let write = records
        .iter()
        .find(|r| r["action"] == "write")
        .expect("write action logged");
    assert_eq!(write["instance"], "main");
    assert_eq!(write["baseDN"], BASE);
    assert_eq!(write["host"], "s1");
    assert_eq!(write["status"], "success");
    assert!(records.iter().any(|r| r["event"] == "REPLTEST_RUN_COMPLETE"));
}

/// A failed delete fails the supplier but keeps its consumer results.
#[test]
fn test_supplier_delete_failure_recorded_independently() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.add_host("c1");
    dir.link_immediate("s1", "c1");
    dir.fail("s1", OpKind::Delete);
    let topology = Topology::new()
        .with_supplier(
            "main",
            BASE,
            supplier("s1").with_consumer(ConsumerSpec::in_sync("c1")),
        )
        .unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(!report.success);
    let outcome = report.results.supplier("main", BASE, "s1").unwrap();
    assert_eq!(outcome.status, Some(false));
    assert_eq!(outcome.replica.get("c1"), Some(&true));
    assert!(dir.contains("s1", CANARY));
}

/// A consumer whose search errors is failed; the supplier still passes.
#[test]
fn test_consumer_search_error_fails_consumer() {
    let dir = MemoryDirectory::new();
    dir.add_host("s1");
    dir.add_host("c1");
    dir.link_immediate("s1", "c1");
    dir.fail("c1", OpKind::Search);
    let topology = Topology::new()
        .with_supplier(
            "main",
            BASE,
            supplier("s1").with_consumer(ConsumerSpec::in_sync("c1")),
        )
        .unwrap();

    let report = run(&dir, &topology).unwrap();

    assert!(!report.success);
    let outcome = report.results.supplier("main", BASE, "s1").unwrap();
    assert_eq!(outcome.status, Some(true));
    assert_eq!(outcome.replica.get("c1"), Some(&false));
}

// =============================================================================
// Agreement State Tests
// =============================================================================

/// A failed disable and a failed re-enable leave different records;
/// only the second warns that the agreement stayed off.
#[test]
fn test_disable_and_enable_failures_reported_apart() {
    let validate = |records: &[Value]| -> Value {
        records
            .iter()
            .find(|r| r["action"] == "validate" && r["consumer"] == "c1")
            .cloned()
            .expect("validate record for c1")
    };

    let (dir, topology) = scheduled_directory();
    dir.fail_nth("s1", OpKind::Modify, 1);
    let (report, disable_records) = run_logged(&dir, &topology);
    assert!(!report.success);
    assert_eq!(agreement_state(&dir), vec!["on".to_string()]);

    let (dir, topology) = scheduled_directory();
    dir.fail_nth("s1", OpKind::Modify, 2);
    let (report, enable_records) = run_logged(&dir, &topology);
    assert!(!report.success);

    let on_disable = validate(&disable_records);
    let on_enable = validate(&enable_records);
    assert_eq!(on_disable["phase"], "disable");
    assert_eq!(on_enable["phase"], "enable");
    assert_ne!(on_disable, on_enable);

    assert!(left_disabled(&disable_records).is_empty());
    let warnings = left_disabled(&enable_records);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0]["agreement"], AGREEMENT);
    assert_eq!(warnings[0]["consumer"], "c1");
}

/// A failed toggle after the delete leaves the results alone.
#[test]
fn test_post_delete_toggle_failure_keeps_results() {
    for nth in [3, 4] {
        let (dir, topology) = scheduled_directory();
        dir.fail_nth("s1", OpKind::Modify, nth);

        let (report, records) = run_logged(&dir, &topology);

        assert!(report.success);
        let outcome = report.results.supplier("main", BASE, "s1").unwrap();
        assert_eq!(outcome.status, Some(true));
        assert_eq!(outcome.replica.get("c1"), Some(&true));
        // only a failed re-enable strands the agreement
        assert_eq!(left_disabled(&records).len(), usize::from(nth == 4));
    }
}

/// An agreement that is already off is never switched on.
#[test]
fn test_switched_off_agreement_stays_off() {
    let (dir, topology) = scheduled_directory();
    let mut agreement = dir.entry("s1", AGREEMENT).unwrap();
    agreement.insert("nsds5ReplicaEnabled".to_string(), vec!["off".to_string()]);
    dir.insert_entry("s1", AGREEMENT, agreement);

    let (report, records) = run_logged(&dir, &topology);

    assert_eq!(dir.count_ops("s1", OpKind::Modify), 0);
    assert_eq!(agreement_state(&dir), vec!["off".to_string()]);
    // nothing pushes the write, so the consumer fails
    let outcome = report.results.supplier("main", BASE, "s1").unwrap();
    assert_eq!(outcome.replica.get("c1"), Some(&false));
    assert_eq!(
        records
            .iter()
            .filter(|r| r["event"] == "REPLICA_AGREEMENT_DISABLED")
            .count(),
        2
    );
}
