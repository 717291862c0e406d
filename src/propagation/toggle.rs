//! Forced replication update
//!
//! Directory Server only pushes to a scheduled consumer inside its window.
//! Turning the agreement off and back on makes the supplier open a session
//! at once and send everything pending. An agreement already switched off
//! is left alone.

use std::thread;
use std::time::Duration;

use super::errors::{ToggleError, TogglePhase, ToggleResult};
use crate::directory::{attributes, modify, search, Connection, SearchScope};
use crate::observability::{Event, LogContext, Logger, Severity};

/// Enablement attribute of a replication agreement
pub const REPLICA_ENABLED_ATTR: &str = "nsds5ReplicaEnabled";

/// Flip `agreement_dn` off then on, then wait `update_settle`
///
/// Does nothing when `agreement_dn` is `None`, or when the agreement is
/// currently `off`. The wait only follows a successful re-enable.
pub fn force_update(
    conn: &mut Connection,
    agreement_dn: Option<&str>,
    update_settle: Duration,
    logger: &Logger,
    ctx: &LogContext,
) -> ToggleResult<()> {
    let agreement_dn = match agreement_dn {
        Some(dn) => dn,
        None => return Ok(()),
    };
    let ctx = ctx.with("agreement", agreement_dn);

    if is_switched_off(conn, agreement_dn, logger, &ctx)? {
        ctx.log(
            logger,
            Severity::Warn,
            Event::AgreementDisabled,
            &[("detail", "Agreement is off; forced update skipped")],
        );
        return Ok(());
    }

    flip(conn, agreement_dn, TogglePhase::Disable, logger, &ctx)?;
    flip(conn, agreement_dn, TogglePhase::Enable, logger, &ctx)?;

    if !update_settle.is_zero() {
        thread::sleep(update_settle);
    }
    Ok(())
}

fn is_switched_off(
    conn: &mut Connection,
    agreement_dn: &str,
    logger: &Logger,
    ctx: &LogContext,
) -> ToggleResult<bool> {
    let filter = format!("({}=off)", REPLICA_ENABLED_ATTR);
    match search(conn, agreement_dn, SearchScope::Base, &filter, logger, ctx) {
        Ok(found) => Ok(found == 1),
        Err(err) => {
            let err = ToggleError::new(TogglePhase::Check, agreement_dn, err);
            logger.action(ctx, TogglePhase::Check.action()).cause(&err).fail();
            Err(err)
        }
    }
}

fn flip(
    conn: &mut Connection,
    agreement_dn: &str,
    phase: TogglePhase,
    logger: &Logger,
    ctx: &LogContext,
) -> ToggleResult<()> {
    let (from, to) = match phase {
        TogglePhase::Disable => ("on", "off"),
        TogglePhase::Enable | TogglePhase::Check => ("off", "on"),
    };
    let before = attributes([(REPLICA_ENABLED_ATTR, [from])]);
    let after = attributes([(REPLICA_ENABLED_ATTR, [to])]);

    match modify(conn, agreement_dn, &before, &after, logger, ctx) {
        Ok(()) => {
            logger.action(ctx, phase.action()).success();
            Ok(())
        }
        Err(err) => {
            let err = ToggleError::new(phase, agreement_dn, err);
            logger.action(ctx, phase.action()).cause(&err).fail();
            Err(err)
        }
    }
}
