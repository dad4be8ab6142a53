//! Deterministic in-memory site pair for rehearsals and end-to-end tests.
//!
//! Models two compute instances and a two-member replication group whose
//! observable role follows whichever member is up. Optionally reports
//! `Transitioning` for a fixed number of status reads after each action,
//! which exercises the consecutive-observation debounce without any real
//! provider behind it.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::controller::ResourceController;
use crate::core::errors::{FdhError, Result};
use crate::model::resource::{ReplicationRole, ResourceRef, ResourceState};
use crate::model::scenario::DrillResources;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberState {
    Up,
    Down,
}

#[derive(Debug)]
struct SiteState {
    members: HashMap<ResourceRef, MemberState>,
    /// Remaining status reads that report `Transitioning`, per resource.
    settling: HashMap<ResourceRef, u32>,
    ops: Vec<String>,
}

/// Simulated primary/secondary pair. Single-threaded, interior-mutable
/// so it satisfies the `&self` controller contract.
#[derive(Debug)]
pub struct SimulatedSitePair {
    resources: DrillResources,
    transition_polls: u32,
    state: RefCell<SiteState>,
}

impl SimulatedSitePair {
    /// Healthy pair with instantly-settling transitions.
    #[must_use]
    pub fn new(resources: DrillResources) -> Self {
        Self::with_transition_polls(resources, 0)
    }

    /// Pair whose members report `Transitioning` for `transition_polls`
    /// status reads after each stop/start before settling.
    #[must_use]
    pub fn with_transition_polls(resources: DrillResources, transition_polls: u32) -> Self {
        let mut members = HashMap::new();
        members.insert(resources.compute_primary.clone(), MemberState::Up);
        members.insert(resources.compute_secondary.clone(), MemberState::Up);
        members.insert(resources.data_primary.clone(), MemberState::Up);
        members.insert(resources.data_secondary.clone(), MemberState::Up);
        Self {
            resources,
            transition_polls,
            state: RefCell::new(SiteState {
                members,
                settling: HashMap::new(),
                ops: Vec::new(),
            }),
        }
    }

    /// Recorded operations as `"<op> <scope>/<name>"` strings, in call order.
    #[must_use]
    pub fn ops(&self) -> Vec<String> {
        self.state.borrow().ops.clone()
    }

    fn apply(&self, target: &ResourceRef, op: &str, next: MemberState) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(format!("{op} {target}"));
        if !state.members.contains_key(target) {
            return Err(FdhError::ResourceNotFound {
                resource: target.to_string(),
            });
        }
        state.members.insert(target.clone(), next);
        if self.transition_polls > 0 {
            state.settling.insert(target.clone(), self.transition_polls);
        }
        Ok(())
    }

    /// Role currently observable on the replication group: held by the
    /// primary while it is up, by the secondary while only it is up.
    fn group_role(members: &HashMap<ResourceRef, MemberState>, resources: &DrillResources) -> ReplicationRole {
        let up = |r: &ResourceRef| members.get(r) == Some(&MemberState::Up);
        if up(&resources.data_primary) {
            ReplicationRole::Primary
        } else if up(&resources.data_secondary) {
            ReplicationRole::Secondary
        } else {
            ReplicationRole::Unknown
        }
    }
}

impl ResourceController for SimulatedSitePair {
    fn stop(&self, target: &ResourceRef) -> Result<()> {
        self.apply(target, "stop", MemberState::Down)
    }

    fn start(&self, target: &ResourceRef) -> Result<()> {
        self.apply(target, "start", MemberState::Up)
    }

    fn status(&self, target: &ResourceRef) -> Result<ResourceState> {
        let mut state = self.state.borrow_mut();
        state.ops.push(format!("status {target}"));

        if *target == self.resources.replication_group {
            let role = Self::group_role(&state.members, &self.resources);
            return Ok(ResourceState::Role(role));
        }

        let Some(member) = state.members.get(target).copied() else {
            return Err(FdhError::ResourceNotFound {
                resource: target.to_string(),
            });
        };

        if let Some(remaining) = state.settling.get_mut(target) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(ResourceState::Transitioning);
            }
            state.settling.remove(target);
        }

        Ok(match member {
            MemberState::Up => ResourceState::Running,
            MemberState::Down => ResourceState::Stopped,
        })
    }
}
