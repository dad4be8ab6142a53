//! The TestRun aggregate: one drill's identity, outcomes, and verdict.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::step::StepOutcome;

/// Overall drill verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunResult {
    /// Every step verified and the scenario ran to completion.
    Passed,
    /// At least one step did not verify, or the run did not complete.
    Failed,
}

/// How the drill reached its end.
///
/// Operations responds differently to each: a completed-but-failed drill
/// needs process review; an aborted drill needs immediate manual
/// remediation because restoration is not guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
    /// Every scheduled step ran, including all restorative starts.
    Completed,
    /// A permanent error on a restorative start halted the run;
    /// resources may remain stopped.
    Aborted,
    /// The drill-level deadline fired; forward steps were skipped but
    /// restorative cleanup was still attempted.
    DeadlineExceeded,
}

/// One drill execution from start to finalization.
///
/// Mutated only by appending outcomes while in progress; frozen once
/// [`TestRun::finalize`] computes the verdict. Archive fields are set
/// after finalization because the flush happens last and its failure
/// must not change the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRun {
    /// Scenario this run executed.
    pub scenario_id: String,
    /// Stable hash of the effective configuration.
    pub config_hash: String,
    /// UTC start of the drill.
    pub started_at: DateTime<Utc>,
    /// UTC end, set at finalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Per-step outcomes in execution order.
    pub outcomes: Vec<StepOutcome>,
    /// Verdict, set at finalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RunResult>,
    /// How the run ended, set at finalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionKind>,
    /// Name of the archived audit log, if the flush succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_ref: Option<String>,
    /// Set when the archive flush failed; verdict is unaffected.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub archive_degraded: bool,
}

impl TestRun {
    /// Open a run for the given scenario.
    #[must_use]
    pub fn begin(scenario_id: impl Into<String>, config_hash: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            config_hash: config_hash.into(),
            started_at: Utc::now(),
            ended_at: None,
            outcomes: Vec::new(),
            result: None,
            completion: None,
            archive_ref: None,
            archive_degraded: false,
        }
    }

    /// Append a completed step's outcome. Callable only before
    /// finalization; later calls are ignored (the run is frozen).
    pub fn record(&mut self, outcome: StepOutcome) {
        if self.result.is_none() {
            self.outcomes.push(outcome);
        }
    }

    /// Compute the verdict and freeze the run.
    ///
    /// Passed requires both a `Completed` run and every outcome
    /// `Verified`; anything else is a failure.
    pub fn finalize(&mut self, completion: CompletionKind) {
        if self.result.is_some() {
            return;
        }
        let all_verified = self.outcomes.iter().all(StepOutcome::is_verified);
        let result = if completion == CompletionKind::Completed && all_verified {
            RunResult::Passed
        } else {
            RunResult::Failed
        };
        self.ended_at = Some(Utc::now());
        self.completion = Some(completion);
        self.result = Some(result);
    }

    /// Whether [`TestRun::finalize`] has run.
    #[must_use]
    pub const fn is_finalized(&self) -> bool {
        self.result.is_some()
    }

    /// Record the archive object name after a successful flush.
    pub fn set_archive_ref(&mut self, name: impl Into<String>) {
        self.archive_ref = Some(name.into());
    }

    /// Mark the run's archive as degraded after a failed flush.
    pub fn mark_archive_degraded(&mut self) {
        self.archive_degraded = true;
    }
}
