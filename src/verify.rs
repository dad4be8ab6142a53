//! Poll-until-expected-state verification with debouncing.
//!
//! Cloud control-plane transitions are eventually observable and
//! occasionally flap, so a single matching read is not proof: the policy
//! requires `min_consistent_observations` consecutive matches before
//! accepting a state. Transient status errors reset the streak and are
//! retried on the next tick; permanent errors abort the wait.

use std::thread;
use std::time::Instant;

use crate::audit::log::{AuditLog, EventKind, LogEntry, Severity};
use crate::controller::ResourceController;
use crate::core::errors::Result;
use crate::model::resource::ResourceState;
use crate::model::step::VerificationSpec;

/// Result of one verification wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The subject held the target state for the required streak.
    Verified(ResourceState),
    /// The wait ceiling passed first; carries the last successful read.
    TimedOut(Option<ResourceState>),
}

/// Debounced polling verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationPolicy;

impl VerificationPolicy {
    /// Poll `spec.subject` until it holds `spec.target` for
    /// `spec.min_consistent_observations` consecutive reads, or until
    /// the wait ceiling passes.
    ///
    /// The effective ceiling is the earlier of `spec.max_wait` and
    /// `run_deadline`, so a hung provider cannot hold the drill past its
    /// overall budget. The first poll happens immediately.
    ///
    /// # Errors
    ///
    /// Returns the underlying error when a status read fails with a
    /// permanent (non-transient) classification.
    pub fn await_state(
        self,
        controller: &dyn ResourceController,
        spec: &VerificationSpec,
        run_deadline: Instant,
        audit: &mut AuditLog,
    ) -> Result<VerificationOutcome> {
        let wait_deadline = (Instant::now() + spec.max_wait).min(run_deadline);
        let mut consecutive: u32 = 0;
        let mut last_observed: Option<ResourceState> = None;

        loop {
            match controller.status(&spec.subject) {
                Ok(state) => {
                    last_observed = Some(state);
                    if state == spec.target {
                        consecutive += 1;
                    } else {
                        consecutive = 0;
                    }
                    audit.append(
                        LogEntry::new(
                            EventKind::VerifyPoll,
                            Severity::Info,
                            format!(
                                "observed {state}, want {} ({consecutive}/{} consistent)",
                                spec.target, spec.min_consistent_observations
                            ),
                        )
                        .resource(&spec.subject)
                        .state(state),
                    );
                    if consecutive >= spec.min_consistent_observations {
                        return Ok(VerificationOutcome::Verified(state));
                    }
                }
                Err(err) if err.is_transient() => {
                    // Flaky read: not fatal to the wait, but it breaks
                    // the consistency streak.
                    consecutive = 0;
                    audit.append(
                        LogEntry::new(
                            EventKind::VerifyTransientError,
                            Severity::Warning,
                            format!("transient status error, retrying next tick: {err}"),
                        )
                        .resource(&spec.subject)
                        .error_code(err.code()),
                    );
                }
                Err(err) => return Err(err),
            }

            let now = Instant::now();
            if now >= wait_deadline {
                return Ok(VerificationOutcome::TimedOut(last_observed));
            }
            thread::sleep(spec.poll_interval.min(wait_deadline - now));
        }
    }
}
