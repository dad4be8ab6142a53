//! Steps, verification specs, and per-step outcome records.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::FdhError;
use crate::model::resource::{ResourceRef, ResourceState};

/// The drill action a step performs against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Stop,
    Start,
}

impl ActionKind {
    /// Label used in audit messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
        }
    }
}

/// Expected-state check applied after a step's action.
///
/// The `subject` may differ from the acted-on resource: stopping the
/// primary is verified by observing the *secondary*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSpec {
    /// Resource whose status is polled.
    pub subject: ResourceRef,
    /// State the subject must reach.
    pub target: ResourceState,
    /// Ceiling on total wait time.
    pub max_wait: Duration,
    /// Sleep between status polls.
    pub poll_interval: Duration,
    /// Consecutive matching reads required before accepting the state.
    /// Debounces flaky reads on a resource mid-transition.
    pub min_consistent_observations: u32,
}

/// One atomic drill action, optionally followed by a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Stable human-readable label, unique within a scenario.
    pub id: String,
    /// Resource the action is applied to.
    pub target: ResourceRef,
    /// Stop or start.
    pub action: ActionKind,
    /// Post-action check; `None` means the step is verified by the
    /// action succeeding (restorative starts need no downstream check).
    pub verify: Option<VerificationSpec>,
}

impl Step {
    /// A stop step with a verification against `spec.subject`.
    #[must_use]
    pub fn stop(id: impl Into<String>, target: ResourceRef, verify: VerificationSpec) -> Self {
        Self {
            id: id.into(),
            target,
            action: ActionKind::Stop,
            verify: Some(verify),
        }
    }

    /// A restorative start step with no downstream check.
    #[must_use]
    pub fn start(id: impl Into<String>, target: ResourceRef) -> Self {
        Self {
            id: id.into(),
            target,
            action: ActionKind::Start,
            verify: None,
        }
    }
}

/// How a step concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// Action succeeded and the verification (if any) confirmed the
    /// expected state.
    Verified,
    /// A permanent status error surfaced during verification.
    VerificationFailed,
    /// The subject never reached the expected state within `max_wait`.
    TimedOut,
    /// The action itself failed (permanent error, or transient retries
    /// exhausted).
    ActionError,
}

/// Error details captured in a [`StepOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    /// Stable `FDH-xxxx` code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Whether the error was classified transient at the time.
    pub transient: bool,
}

impl StepError {
    /// Capture an [`FdhError`] for the record.
    #[must_use]
    pub fn capture(err: &FdhError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            transient: err.is_transient(),
        }
    }
}

/// Immutable record of one executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Step label this outcome belongs to.
    pub step_id: String,
    /// Action performed.
    pub action: ActionKind,
    /// Resource the action was applied to.
    pub target: ResourceRef,
    /// UTC start of the step.
    pub started_at: DateTime<Utc>,
    /// UTC end of the step.
    pub ended_at: DateTime<Utc>,
    /// Last state observed for the verification subject, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_state: Option<ResourceState>,
    /// How the step concluded.
    pub kind: OutcomeKind,
    /// Total action invocations, including retries.
    pub attempts: u32,
    /// Captured error, present for `ActionError` and `VerificationFailed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepError>,
}

impl StepOutcome {
    /// Whether the step counts toward a passing drill.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        matches!(self.kind, OutcomeKind::Verified)
    }
}
