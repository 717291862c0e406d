//! Verification orchestrator
//!
//! Walks the topology one supplier at a time. For each unit:
//!
//! 1. connect to the supplier
//! 2. garbage check: 0 entries proceed, 1 is deleted first, 2+ abort the run
//! 3. write the canary
//! 4. settle wait
//! 5. per consumer: forced update, then connect and look for the canary
//! 6. delete the canary from the supplier
//! 7. forced update per consumer again to push the deletion (best effort)
//! 8. disconnect and settle wait
//!
//! Nothing here runs concurrently and no step is retried.

use std::thread;

use super::errors::{VerifyError, VerifyResult};
use super::result::{ResultTree, RunReport, SupplierOutcome};
use super::state::UnitState;
use crate::directory::{
    add, connect, delete, disconnect, search, Connection, Directory, DirectoryError,
    SearchScope, ANY_OBJECT_FILTER,
};
use crate::observability::{Event, LogContext, Logger, Severity};
use crate::propagation::{force_update, ToggleError};
use crate::topology::{ConsumerSpec, TestEntry, Topology, Unit};
use crate::watchdog::Timings;

/// Drives one verification run
pub struct Orchestrator<'a, D: Directory + ?Sized> {
    directory: &'a D,
    topology: &'a Topology,
    entry: &'a TestEntry,
    timings: Timings,
    logger: &'a Logger,
}

impl<'a, D: Directory + ?Sized> Orchestrator<'a, D> {
    pub fn new(
        directory: &'a D,
        topology: &'a Topology,
        entry: &'a TestEntry,
        timings: Timings,
        logger: &'a Logger,
    ) -> Self {
        Self {
            directory,
            topology,
            entry,
            timings,
            logger,
        }
    }

    /// Visit every unit and return the completed report
    ///
    /// Fails only on the garbage invariant; the error carries the results
    /// of the units visited so far.
    pub fn run(&self) -> VerifyResult<RunReport> {
        let suppliers = self.topology.supplier_count().to_string();
        let consumers = self.topology.consumer_count().to_string();
        self.logger.info(
            Event::RunStart,
            &[("suppliers", suppliers.as_str()), ("consumers", consumers.as_str())],
        );

        let mut results = ResultTree::new();
        for unit in self.topology.units() {
            if let Err(err) = self.run_unit(&unit, &mut results) {
                self.logger.fatal(
                    Event::RunAborted,
                    &[
                        ("instance", unit.instance),
                        ("baseDN", unit.base_dn),
                        ("supplier", unit.supplier.host.as_str()),
                        ("error", err.to_string().as_str()),
                    ],
                );
                return Err(err);
            }
        }

        let report = RunReport::new(results);
        self.logger.info(
            Event::RunComplete,
            &[("success", if report.success { "true" } else { "false" })],
        );
        Ok(report)
    }

    fn run_unit(&self, unit: &Unit<'_>, results: &mut ResultTree) -> VerifyResult<()> {
        let mut run = UnitRun::new(self, unit);
        self.logger.info(
            Event::UnitBegin,
            &[
                ("instance", unit.instance),
                ("baseDN", unit.base_dn),
                ("supplier", unit.supplier.host.as_str()),
            ],
        );
        let outcome = run.execute();
        let node = results.supplier_mut(unit.instance, unit.base_dn, &unit.supplier.host);
        *node = run.outcome;

        match outcome {
            Ok(()) => {
                let status = if node.is_success() { "success" } else { "fail" };
                self.logger.info(
                    Event::UnitComplete,
                    &[
                        ("instance", unit.instance),
                        ("baseDN", unit.base_dn),
                        ("supplier", unit.supplier.host.as_str()),
                        ("status", status),
                    ],
                );
                Ok(())
            }
            Err(found) => Err(VerifyError::GarbageInvariant {
                instance: unit.instance.to_string(),
                base_dn: unit.base_dn.to_string(),
                supplier: unit.supplier.host.clone(),
                found,
                partial: results.clone(),
            }),
        }
    }
}

/// Working state of one unit
struct UnitRun<'r, 'a, D: Directory + ?Sized> {
    orchestrator: &'r Orchestrator<'a, D>,
    unit: &'r Unit<'r>,
    dn: String,
    ctx: LogContext,
    state: UnitState,
    outcome: SupplierOutcome,
}

impl<'r, 'a, D: Directory + ?Sized> UnitRun<'r, 'a, D> {
    fn new(orchestrator: &'r Orchestrator<'a, D>, unit: &'r Unit<'r>) -> Self {
        Self {
            orchestrator,
            unit,
            dn: orchestrator.entry.dn_for(unit.base_dn),
            ctx: LogContext::unit(unit.instance, unit.base_dn),
            state: UnitState::Idle,
            outcome: SupplierOutcome::default(),
        }
    }

    fn logger(&self) -> &'a Logger {
        self.orchestrator.logger
    }

    fn timings(&self) -> &Timings {
        &self.orchestrator.timings
    }

    fn supplier_host(&self) -> &'r str {
        &self.unit.supplier.host
    }

    fn enter(&mut self, next: UnitState) {
        if !self.state.can_advance_to(next) {
            return;
        }
        self.ctx.log(
            self.logger(),
            Severity::Trace,
            Event::UnitState,
            &[
                ("supplier", self.supplier_host()),
                ("from", self.state.name()),
                ("to", next.name()),
            ],
        );
        self.state = next;
    }

    fn settle(&self) {
        let wait = self.timings().settle_wait;
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }

    /// Run steps 1 to 8; `Err` carries the garbage count that aborts the run
    fn execute(&mut self) -> Result<(), usize> {
        let logger = self.logger();
        let supplier = self.unit.supplier;
        let host_ctx = self.ctx.with("host", self.supplier_host());
        let validate_ctx = self.ctx.with("supplier", self.supplier_host());

        // 1. connect
        let mut conn = match connect(
            self.orchestrator.directory,
            &supplier.uri(),
            &supplier.bind_dn,
            &supplier.bind_pw,
            self.timings().network_timeout,
            logger,
            &host_ctx,
        ) {
            Ok(conn) => {
                logger.action(&host_ctx, "connect").success();
                conn
            }
            Err(err) => {
                logger.action(&host_ctx, "connect").cause(&err).fail();
                logger.action(&validate_ctx, "validate").detail("Can't connect").fatal();
                self.outcome.status = Some(false);
                self.enter(UnitState::Done);
                return Ok(());
            }
        };
        self.enter(UnitState::Connected);

        // 2. garbage check
        if let Err(found) = self.garbage_check(&mut conn, &host_ctx) {
            disconnect(conn, logger, &host_ctx);
            return Err(found);
        }
        self.enter(UnitState::GarbageChecked);

        // 3. write
        let written = match add(&mut conn, &self.dn, self.orchestrator.entry.attributes(), logger, &host_ctx) {
            Ok(()) => {
                logger.action(&host_ctx, "write").success();
                self.enter(UnitState::Written);
                true
            }
            Err(err) => {
                logger.action(&host_ctx, "write").cause(&err).fail();
                logger
                    .action(&validate_ctx, "validate")
                    .detail("Can't add to the supplier")
                    .fatal();
                self.outcome.status = Some(false);
                false
            }
        };

        if written {
            // 4. settle
            self.enter(UnitState::SettleWait);
            self.settle();

            // 5. consumers
            self.enter(UnitState::ConsumerLoop);
            for consumer in &supplier.consumers {
                let replicated = self.verify_consumer(&mut conn, consumer);
                self.outcome.replica.insert(consumer.host.clone(), replicated);
            }
        }

        // 6. cleanup
        let deleted = self.cleanup(&mut conn, &host_ctx, &validate_ctx, written);
        self.outcome.status = Some(written && deleted);
        self.enter(UnitState::CleanedUp);

        // 7. push the deletion
        for consumer in &supplier.consumers {
            let ctx = validate_ctx.with("consumer", consumer.host.as_str());
            if let Err(err) = force_update(
                &mut conn,
                consumer.agreement_dn.as_deref(),
                self.timings().update_settle_wait,
                logger,
                &ctx,
            ) {
                warn_if_left_disabled(logger, &ctx, &err);
            }
        }

        // 8. disconnect and let the deletion settle
        disconnect(conn, logger, &host_ctx);
        self.enter(UnitState::Disconnected);
        self.settle();
        self.enter(UnitState::Done);
        Ok(())
    }

    fn garbage_check(&self, conn: &mut Connection, host_ctx: &LogContext) -> Result<(), usize> {
        let logger = self.logger();
        let found = match search(conn, &self.dn, SearchScope::Base, ANY_OBJECT_FILTER, logger, host_ctx) {
            Ok(found) => {
                logger
                    .action(host_ctx, "garbage search")
                    .detail(format!("{} entries found", found))
                    .success();
                found
            }
            Err(err) => {
                logger.action(host_ctx, "garbage search").cause(&err).fail();
                0
            }
        };

        match found {
            0 => Ok(()),
            1 => {
                match delete(conn, &self.dn, logger, host_ctx) {
                    Ok(()) => logger.action(host_ctx, "garbage").success(),
                    Err(DirectoryError::NoSuchObject { .. }) => logger
                        .action(host_ctx, "garbage")
                        .detail("No such object")
                        .success(),
                    Err(err) => logger.action(host_ctx, "garbage").cause(&err).fail(),
                }
                Ok(())
            }
            n => {
                logger
                    .action(host_ctx, "garbage")
                    .detail(format!("{} entries found. Expected 1.", n))
                    .fatal();
                Err(n)
            }
        }
    }

    /// Forced update, then look for the canary on the consumer
    fn verify_consumer(&self, supplier_conn: &mut Connection, consumer: &ConsumerSpec) -> bool {
        let logger = self.logger();
        let supplier = self.unit.supplier;
        let validate_ctx = self
            .ctx
            .with("supplier", self.supplier_host())
            .with("consumer", consumer.host.as_str());
        let host_ctx = self.ctx.with("host", consumer.host.as_str());

        if let Err(err) = force_update(
            supplier_conn,
            consumer.agreement_dn.as_deref(),
            self.timings().update_settle_wait,
            logger,
            &validate_ctx,
        ) {
            logger.action(&validate_ctx, "validate").cause(&err).fatal();
            warn_if_left_disabled(logger, &validate_ctx, &err);
            return false;
        }

        let mut conn = match connect(
            self.orchestrator.directory,
            &supplier.uri_for(&consumer.host),
            &supplier.bind_dn,
            &supplier.bind_pw,
            self.timings().network_timeout,
            logger,
            &host_ctx,
        ) {
            Ok(conn) => {
                logger.action(&host_ctx, "connect").success();
                conn
            }
            Err(err) => {
                logger.action(&host_ctx, "connect").cause(&err).fail();
                logger.action(&validate_ctx, "validate").detail("Can't connect").fatal();
                return false;
            }
        };

        let replicated = match search(&mut conn, &self.dn, SearchScope::Base, ANY_OBJECT_FILTER, logger, &host_ctx) {
            Ok(found) => {
                logger.action(&host_ctx, "search").success();
                if found == 1 {
                    logger.action(&validate_ctx, "validate").success();
                    true
                } else {
                    logger
                        .action(&validate_ctx, "validate")
                        .detail(format!("{} entries found. Expected 1", found))
                        .fail();
                    false
                }
            }
            Err(err) => {
                logger.action(&host_ctx, "search").cause(&err).fail();
                false
            }
        };

        disconnect(conn, logger, &host_ctx);
        replicated
    }

    /// Delete the canary; true when the delete succeeded
    fn cleanup(
        &self,
        conn: &mut Connection,
        host_ctx: &LogContext,
        validate_ctx: &LogContext,
        written: bool,
    ) -> bool {
        let logger = self.logger();
        match delete(conn, &self.dn, logger, host_ctx) {
            Ok(()) => {
                logger.action(host_ctx, "delete").success();
                if written {
                    logger.action(validate_ctx, "validate").success();
                }
                true
            }
            Err(err @ DirectoryError::NoSuchObject { .. }) => {
                logger.action(host_ctx, "delete").cause(&err).fail();
                if written {
                    logger
                        .action(validate_ctx, "validate")
                        .detail("Can't delete. Deleted already? Unexpected.")
                        .fatal();
                }
                false
            }
            Err(err) => {
                logger.action(host_ctx, "delete").cause(&err).fail();
                logger
                    .action(validate_ctx, "validate")
                    .detail("Can't delete")
                    .fatal();
                false
            }
        }
    }
}

/// An agreement switched off but not back on needs an operator
fn warn_if_left_disabled(logger: &Logger, ctx: &LogContext, err: &ToggleError) {
    if err.left_disabled() {
        ctx.log(
            logger,
            Severity::Warn,
            Event::AgreementLeftDisabled,
            &[
                ("agreement", err.agreement_dn.as_str()),
                ("detail", "Agreement left off; re-enable it by hand"),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::attributes;
    use crate::directory::memory::{MemoryDirectory, OpKind};
    use crate::topology::{Protocol, SupplierSpec};

    fn entry() -> TestEntry {
        TestEntry::new(attributes([
            ("uid", vec!["repltest"]),
            ("objectClass", vec!["top", "account"]),
        ]))
        .unwrap()
    }

    #[test]
    fn test_single_supplier_no_consumers() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        let topology = Topology::new()
            .with_supplier("main", "o=t", SupplierSpec::new(Protocol::Ldap, "s1", 389))
            .unwrap();
        let entry = entry();
        let logger = Logger::discard();

        let report = Orchestrator::new(&dir, &topology, &entry, Timings::immediate(), &logger)
            .run()
            .unwrap();

        assert!(report.success);
        let outcome = report.results.supplier("main", "o=t", "s1").unwrap();
        assert_eq!(outcome.status, Some(true));
        assert!(outcome.replica.is_empty());
        assert!(!dir.contains("s1", "uid=repltest,o=t"));
    }

    #[test]
    fn test_garbage_entry_is_removed_first() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        dir.insert_entry("s1", "uid=repltest,o=t", attributes([("uid", ["repltest"])]));
        let topology = Topology::new()
            .with_supplier("main", "o=t", SupplierSpec::new(Protocol::Ldap, "s1", 389))
            .unwrap();
        let entry = entry();
        let logger = Logger::discard();

        let report = Orchestrator::new(&dir, &topology, &entry, Timings::immediate(), &logger)
            .run()
            .unwrap();

        assert!(report.success);
        // garbage delete + cleanup delete
        assert_eq!(dir.count_ops("s1", OpKind::Delete), 2);
        assert_eq!(dir.count_ops("s1", OpKind::Add), 1);
    }

    #[test]
    fn test_write_failure_skips_consumers_but_cleans_up() {
        let dir = MemoryDirectory::new();
        dir.add_host("s1");
        dir.add_host("c1");
        dir.fail("s1", OpKind::Add);
        let topology = Topology::new()
            .with_supplier(
                "main",
                "o=t",
                SupplierSpec::new(Protocol::Ldap, "s1", 389)
                    .with_consumer(ConsumerSpec::in_sync("c1")),
            )
            .unwrap();
        let entry = entry();
        let logger = Logger::discard();

        let report = Orchestrator::new(&dir, &topology, &entry, Timings::immediate(), &logger)
            .run()
            .unwrap();

        let outcome = report.results.supplier("main", "o=t", "s1").unwrap();
        assert_eq!(outcome.status, Some(false));
        assert!(outcome.replica.is_empty());
        assert!(!dir.touched("c1"));
        assert_eq!(dir.count_ops("s1", OpKind::Delete), 1);
        assert!(!report.success);
    }
}
