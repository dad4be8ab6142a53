//! Runs a failover scenario end-to-end and produces the TestRun.
//!
//! Execution is strictly sequential: each verification is logically
//! contingent on the previous action having reached the real
//! infrastructure, so there is nothing to parallelize without making
//! the drill's pass/fail semantics ambiguous.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::audit::archive::{LogArchive, archive_object_name};
use crate::audit::log::{AuditLog, EventKind, LogEntry, Severity};
use crate::controller::ResourceController;
use crate::executor::{RetryPolicy, StepExecutor};
use crate::model::resource::ResourceRef;
use crate::model::run::{CompletionKind, RunResult, TestRun};
use crate::model::scenario::FailoverScenario;
use crate::model::step::{ActionKind, OutcomeKind, Step};

/// Drives a scenario's steps through the executor, aggregates outcomes,
/// and finalizes the run with a single durable audit flush.
pub struct Orchestrator<'a> {
    controller: &'a dyn ResourceController,
    archive: &'a dyn LogArchive,
    retry: RetryPolicy,
    /// Ceiling on total drill duration.
    run_budget: Duration,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator over the given controller and archive.
    #[must_use]
    pub fn new(
        controller: &'a dyn ResourceController,
        archive: &'a dyn LogArchive,
        retry: RetryPolicy,
        run_budget: Duration,
    ) -> Self {
        Self {
            controller,
            archive,
            retry,
            run_budget,
        }
    }

    /// Run the scenario to a finalized [`TestRun`].
    ///
    /// Continue-and-record: a step that fails verification does not stop
    /// the drill — the self-restoring scenario guarantees a later start
    /// for anything stopped, and a partial drill report helps nobody.
    /// The two exceptions:
    ///
    /// - a permanent action error on a restorative `Start` aborts the
    ///   run outright, because restoration can no longer be promised;
    /// - once the drill budget is exhausted, forward steps are skipped
    ///   and only restorative starts for still-stopped resources run
    ///   (best-effort cleanup).
    pub fn run(
        &self,
        scenario: &FailoverScenario,
        config_hash: &str,
        audit: &mut AuditLog,
    ) -> TestRun {
        let mut run = TestRun::begin(scenario.id.clone(), config_hash);
        let deadline = Instant::now() + self.run_budget;
        let executor = StepExecutor::new(self.controller, self.retry);

        audit.append(LogEntry::new(
            EventKind::DrillStart,
            Severity::Info,
            format!("failover drill '{}' started ({} steps)", scenario.id, scenario.len()),
        ));

        // Resources stopped and not yet restarted.
        let mut outstanding: HashSet<ResourceRef> = HashSet::new();
        let mut aborted = false;
        let mut deadline_hit = false;

        for step in scenario.steps() {
            if aborted {
                break;
            }

            if !deadline_hit && Instant::now() >= deadline {
                deadline_hit = true;
                audit.append(LogEntry::new(
                    EventKind::DeadlineExceeded,
                    Severity::Critical,
                    "drill budget exhausted; skipping forward steps, running restorative cleanup",
                ));
            }

            if deadline_hit && !is_restorative(step, &outstanding) {
                audit.append(
                    LogEntry::new(
                        EventKind::StepSkipped,
                        Severity::Warning,
                        format!("skipped after deadline: {}", step.id),
                    )
                    .step(&step.id)
                    .resource(&step.target),
                );
                continue;
            }

            let outcome = executor.execute(step, deadline, audit);

            let action_succeeded = outcome.kind != OutcomeKind::ActionError;
            match step.action {
                ActionKind::Stop if action_succeeded => {
                    outstanding.insert(step.target.clone());
                }
                ActionKind::Start if action_succeeded => {
                    outstanding.remove(&step.target);
                }
                _ => {}
            }

            // The only run-aborting condition: restoration itself failed
            // permanently. Transient exhaustion is not in this class.
            if step.action == ActionKind::Start
                && outcome.kind == OutcomeKind::ActionError
                && outcome.error.as_ref().is_some_and(|e| !e.transient)
            {
                aborted = true;
                audit.append(
                    LogEntry::new(
                        EventKind::RunAborted,
                        Severity::Critical,
                        format!(
                            "permanent error restoring {}; halting drill, manual remediation required",
                            step.target
                        ),
                    )
                    .step(&step.id)
                    .resource(&step.target),
                );
            }

            run.record(outcome);
        }

        let completion = if aborted {
            CompletionKind::Aborted
        } else if deadline_hit {
            CompletionKind::DeadlineExceeded
        } else {
            CompletionKind::Completed
        };
        run.finalize(completion);

        audit.append(LogEntry::new(
            EventKind::DrillComplete,
            if aborted { Severity::Critical } else { Severity::Info },
            format!(
                "drill '{}' finished: {:?} ({completion:?})",
                scenario.id,
                run.result.unwrap_or(RunResult::Failed),
            ),
        ));

        self.flush_audit(&mut run, audit);
        run
    }

    /// Flush the audit log to the archive exactly once. A failed flush
    /// degrades the run's archive status but never its verdict, which
    /// is already finalized.
    fn flush_audit(&self, run: &mut TestRun, audit: &mut AuditLog) {
        let name = archive_object_name(run.started_at);
        match audit.flush(self.archive, &name) {
            Ok(()) => {
                run.set_archive_ref(name.clone());
                audit.append(LogEntry::new(
                    EventKind::ArchiveUploaded,
                    Severity::Info,
                    format!("audit log archived as {name}"),
                ));
            }
            Err(err) => {
                run.mark_archive_degraded();
                audit.append(
                    LogEntry::new(
                        EventKind::ArchiveError,
                        Severity::Critical,
                        format!("audit archive failed, drill verdict unaffected: {err}"),
                    )
                    .error_code(err.code()),
                );
            }
        }
    }
}

/// After the deadline, only starts for still-stopped resources run.
fn is_restorative(step: &Step, outstanding: &HashSet<ResourceRef>) -> bool {
    step.action == ActionKind::Start && outstanding.contains(&step.target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::archive::FsArchive;
    use crate::controller::sim::SimulatedSitePair;
    use crate::model::resource::ResourceState;
    use crate::model::scenario::{DrillResources, VerifyDefaults};
    use crate::model::step::VerificationSpec;

    fn resources() -> DrillResources {
        DrillResources {
            compute_primary: ResourceRef::compute("rg-1", "primary-webapp"),
            compute_secondary: ResourceRef::compute("rg-2", "secondary-webapp"),
            data_primary: ResourceRef::data_member("rg-1", "primary-sql"),
            data_secondary: ResourceRef::data_member("rg-2", "secondary-sql"),
            replication_group: ResourceRef::data_member("rg-1", "failover-group"),
        }
    }

    fn fast_defaults() -> VerifyDefaults {
        VerifyDefaults {
            max_wait: Duration::from_millis(100),
            poll_interval: Duration::from_millis(1),
            min_consistent_observations: 2,
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn healthy_pair_passes_standard_drill() {
        let r = resources();
        let sim = SimulatedSitePair::new(r.clone());
        let dir = tempfile::tempdir().unwrap();
        let archive = FsArchive::new(dir.path());
        let orchestrator =
            Orchestrator::new(&sim, &archive, fast_retry(), Duration::from_secs(30));
        let scenario = FailoverScenario::standard_pair_drill("weekly-dr", &r, &fast_defaults());
        let mut audit = AuditLog::in_memory("weekly-dr");

        let run = orchestrator.run(&scenario, "cfg", &mut audit);

        assert_eq!(run.result, Some(crate::model::run::RunResult::Passed));
        assert_eq!(run.completion, Some(CompletionKind::Completed));
        assert_eq!(run.outcomes.len(), 8);
        assert!(run.outcomes.iter().all(|o| o.kind == OutcomeKind::Verified));
        assert!(run.archive_ref.is_some());
        assert!(!run.archive_degraded);
    }

    #[test]
    fn drill_report_is_archived_as_jsonl() {
        let r = resources();
        let sim = SimulatedSitePair::new(r.clone());
        let dir = tempfile::tempdir().unwrap();
        let archive = FsArchive::new(dir.path());
        let orchestrator =
            Orchestrator::new(&sim, &archive, fast_retry(), Duration::from_secs(30));
        let scenario = FailoverScenario::standard_pair_drill("weekly-dr", &r, &fast_defaults());
        let mut audit = AuditLog::in_memory("weekly-dr");

        let run = orchestrator.run(&scenario, "cfg", &mut audit);
        let name = run.archive_ref.unwrap();
        let raw = std::fs::read_to_string(archive.object_path(&name)).unwrap();
        assert!(raw.lines().count() >= 10);
        for line in raw.lines() {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn verification_timeout_does_not_stop_restoration() {
        let r = resources();
        let sim = SimulatedSitePair::new(r.clone());
        let dir = tempfile::tempdir().unwrap();
        let archive = FsArchive::new(dir.path());
        let orchestrator =
            Orchestrator::new(&sim, &archive, fast_retry(), Duration::from_secs(30));

        // Impossible verification: the secondary will never be Stopped.
        let steps = vec![
            Step::stop(
                "compute-failover",
                r.compute_primary.clone(),
                VerificationSpec {
                    subject: r.compute_secondary.clone(),
                    target: ResourceState::Stopped,
                    max_wait: Duration::from_millis(20),
                    poll_interval: Duration::from_millis(1),
                    min_consistent_observations: 1,
                },
            ),
            Step::start("compute-restore-primary", r.compute_primary.clone()),
        ];
        let scenario = FailoverScenario::new("impossible", steps).unwrap();
        let mut audit = AuditLog::in_memory("impossible");

        let run = orchestrator.run(&scenario, "cfg", &mut audit);

        assert_eq!(run.result, Some(crate::model::run::RunResult::Failed));
        assert_eq!(run.completion, Some(CompletionKind::Completed));
        assert_eq!(run.outcomes[0].kind, OutcomeKind::TimedOut);
        assert_eq!(run.outcomes[1].kind, OutcomeKind::Verified);
        // The primary was restored despite the failed verification.
        assert_eq!(
            sim.status(&r.compute_primary).unwrap(),
            ResourceState::Running
        );
    }
}
