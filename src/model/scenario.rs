//! Ordered drill scenarios and the self-restoring invariant.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{FdhError, Result};
use crate::model::resource::{ReplicationRole, ResourceRef, ResourceState};
use crate::model::step::{ActionKind, Step, VerificationSpec};

/// Default verification timings applied to every built step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyDefaults {
    /// Ceiling on each verification wait.
    pub max_wait: Duration,
    /// Sleep between status polls.
    pub poll_interval: Duration,
    /// Consecutive matching reads required.
    pub min_consistent_observations: u32,
}

/// The four resources a standard paired drill exercises, plus the
/// replication group the data-tier role is observed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillResources {
    pub compute_primary: ResourceRef,
    pub compute_secondary: ResourceRef,
    pub data_primary: ResourceRef,
    pub data_secondary: ResourceRef,
    /// Failover group queried for the current replication role.
    pub replication_group: ResourceRef,
}

/// An ordered sequence of steps forming one complete drill.
///
/// Invariant: every `Stop` on a resource is followed, later in the
/// sequence, by a `Start` on that same resource, so the scenario is
/// self-restoring regardless of verification outcomes. Construction
/// through [`FailoverScenario::new`] enforces this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverScenario {
    /// Scenario identity carried into the run report and archive name.
    pub id: String,
    steps: Vec<Step>,
}

impl FailoverScenario {
    /// Build a scenario, rejecting sequences that violate the
    /// self-restoring invariant.
    pub fn new(id: impl Into<String>, steps: Vec<Step>) -> Result<Self> {
        let id = id.into();
        validate_self_restoring(&id, &steps)?;
        Ok(Self { id, steps })
    }

    /// Steps in declared execution order.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Number of steps in the drill.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the scenario has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The standard four-phase paired drill: fail the compute tier over
    /// and back, then the data tier over and back. Each stop is verified
    /// against the peer (or the replication group's role) and followed by
    /// a restorative start.
    #[must_use]
    pub fn standard_pair_drill(
        id: impl Into<String>,
        resources: &DrillResources,
        defaults: &VerifyDefaults,
    ) -> Self {
        let verify = |subject: &ResourceRef, target: ResourceState| VerificationSpec {
            subject: subject.clone(),
            target,
            max_wait: defaults.max_wait,
            poll_interval: defaults.poll_interval,
            min_consistent_observations: defaults.min_consistent_observations,
        };

        let steps = vec![
            Step::stop(
                "compute-failover",
                resources.compute_primary.clone(),
                verify(&resources.compute_secondary, ResourceState::Running),
            ),
            Step::start("compute-restore-primary", resources.compute_primary.clone()),
            Step::stop(
                "compute-failback",
                resources.compute_secondary.clone(),
                verify(&resources.compute_primary, ResourceState::Running),
            ),
            Step::start(
                "compute-restore-secondary",
                resources.compute_secondary.clone(),
            ),
            Step::stop(
                "data-failover",
                resources.data_primary.clone(),
                verify(
                    &resources.replication_group,
                    ResourceState::Role(ReplicationRole::Secondary),
                ),
            ),
            Step::start("data-restore-primary", resources.data_primary.clone()),
            Step::stop(
                "data-failback",
                resources.data_secondary.clone(),
                verify(
                    &resources.replication_group,
                    ResourceState::Role(ReplicationRole::Primary),
                ),
            ),
            Step::start("data-restore-secondary", resources.data_secondary.clone()),
        ];

        // The fixed sequence above restores every stopped resource.
        Self { id: id.into(), steps }
    }
}

/// Check that every stopped resource has a later restorative start.
fn validate_self_restoring(id: &str, steps: &[Step]) -> Result<()> {
    let mut outstanding: HashSet<&ResourceRef> = HashSet::new();
    for step in steps {
        match step.action {
            ActionKind::Stop => {
                outstanding.insert(&step.target);
            }
            ActionKind::Start => {
                outstanding.remove(&step.target);
            }
        }
    }
    if outstanding.is_empty() {
        return Ok(());
    }
    let mut names: Vec<String> = outstanding.iter().map(ToString::to_string).collect();
    names.sort();
    Err(FdhError::ScenarioInvariant {
        scenario: id.to_string(),
        details: format!("no restorative start for: {}", names.join(", ")),
    })
}
