//! Executes one (action, verification) pair against a controller.
//!
//! The executor owns the only code path allowed to invoke mutating
//! controller operations. Transient action errors are retried with
//! capped exponential backoff; permanent errors short-circuit. Every
//! entry, retry, and exit is appended to the audit log before the
//! executor returns, so the log is a complete causal record of the step
//! regardless of outcome.

use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::audit::log::{AuditLog, EventKind, LogEntry, Severity};
use crate::controller::ResourceController;
use crate::core::errors::FdhError;
use crate::model::step::{ActionKind, OutcomeKind, Step, StepError, StepOutcome};
use crate::verify::{VerificationOutcome, VerificationPolicy};

/// Bounded exponential backoff applied to transient action errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Backoff base; retry n sleeps `base_delay * 2^(n-1)`, capped.
    pub base_delay: Duration,
    /// Ceiling on a single backoff sleep.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff sleep before retry number `retry` (1-based).
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let shift = retry.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1_u32 << shift)
            .min(self.max_delay)
    }
}

/// Runs single steps: action, retry, verification, audit.
pub struct StepExecutor<'a> {
    controller: &'a dyn ResourceController,
    retry: RetryPolicy,
    policy: VerificationPolicy,
}

impl<'a> StepExecutor<'a> {
    /// Executor over `controller` with the given retry policy.
    #[must_use]
    pub fn new(controller: &'a dyn ResourceController, retry: RetryPolicy) -> Self {
        Self {
            controller,
            retry,
            policy: VerificationPolicy,
        }
    }

    /// Execute one step to a [`StepOutcome`].
    ///
    /// Never returns an error: every failure mode is folded into the
    /// outcome record so the orchestrator can continue-and-record.
    pub fn execute(&self, step: &Step, run_deadline: Instant, audit: &mut AuditLog) -> StepOutcome {
        let started_at = Utc::now();
        audit.append(
            LogEntry::new(
                EventKind::StepStart,
                Severity::Info,
                format!("{} {}", step.action.label(), step.target),
            )
            .step(&step.id)
            .resource(&step.target),
        );

        let (action_result, attempts) = self.invoke_with_retry(step, run_deadline, audit);

        let outcome = match action_result {
            Err(err) => StepOutcome {
                step_id: step.id.clone(),
                action: step.action,
                target: step.target.clone(),
                started_at,
                ended_at: Utc::now(),
                final_state: None,
                kind: OutcomeKind::ActionError,
                attempts,
                error: Some(StepError::capture(&err)),
            },
            Ok(()) => match &step.verify {
                None => StepOutcome {
                    step_id: step.id.clone(),
                    action: step.action,
                    target: step.target.clone(),
                    started_at,
                    ended_at: Utc::now(),
                    final_state: None,
                    kind: OutcomeKind::Verified,
                    attempts,
                    error: None,
                },
                Some(spec) => {
                    let verification =
                        self.policy
                            .await_state(self.controller, spec, run_deadline, audit);
                    let (kind, final_state, error) = match verification {
                        Ok(VerificationOutcome::Verified(state)) => {
                            (OutcomeKind::Verified, Some(state), None)
                        }
                        Ok(VerificationOutcome::TimedOut(last)) => {
                            (OutcomeKind::TimedOut, last, None)
                        }
                        Err(err) => (
                            OutcomeKind::VerificationFailed,
                            None,
                            Some(StepError::capture(&err)),
                        ),
                    };
                    StepOutcome {
                        step_id: step.id.clone(),
                        action: step.action,
                        target: step.target.clone(),
                        started_at,
                        ended_at: Utc::now(),
                        final_state,
                        kind,
                        attempts,
                        error,
                    }
                }
            },
        };

        let severity = match outcome.kind {
            OutcomeKind::Verified => Severity::Info,
            OutcomeKind::TimedOut | OutcomeKind::VerificationFailed => Severity::Warning,
            OutcomeKind::ActionError => Severity::Critical,
        };
        audit.append(
            LogEntry::new(
                EventKind::StepComplete,
                severity,
                format!("{} -> {:?}", step.id, outcome.kind),
            )
            .step(&step.id)
            .resource(&step.target)
            .outcome(&outcome),
        );
        outcome
    }

    /// Invoke the step's action, retrying transient failures with
    /// backoff. Returns the terminal result and the attempt count.
    /// Backoff sleeps never run past the drill deadline; once the
    /// deadline would be crossed the last transient error is surfaced
    /// as-is (exhaustion).
    fn invoke_with_retry(
        &self,
        step: &Step,
        run_deadline: Instant,
        audit: &mut AuditLog,
    ) -> (Result<(), FdhError>, u32) {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let result = match step.action {
                ActionKind::Stop => self.controller.stop(&step.target),
                ActionKind::Start => self.controller.start(&step.target),
            };
            match result {
                Ok(()) => return (Ok(()), attempts),
                Err(err) if err.is_transient() && attempts <= self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempts);
                    if Instant::now() + delay >= run_deadline {
                        return (Err(err), attempts);
                    }
                    audit.append(
                        LogEntry::new(
                            EventKind::ActionRetry,
                            Severity::Warning,
                            format!(
                                "transient {} failure, retrying in {delay:?}: {err}",
                                step.action.label()
                            ),
                        )
                        .step(&step.id)
                        .resource(&step.target)
                        .attempt(attempts)
                        .error_code(err.code()),
                    );
                    thread::sleep(delay);
                }
                Err(err) => return (Err(err), attempts),
            }
        }
    }
}
