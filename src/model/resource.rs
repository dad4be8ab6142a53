//! Identities and observed states for controllable resources.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of managed resource a [`ResourceRef`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A compute instance (web app, VM, service plan member).
    Compute,
    /// A member of a data-tier replication group.
    DataReplicationMember,
}

/// Identifies one controllable resource. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource group / scope the resource lives in.
    pub scope: String,
    /// Provider-side resource name.
    pub name: String,
    /// Resource kind, selects the controller family.
    pub kind: ResourceKind,
}

impl ResourceRef {
    /// Build a compute resource reference.
    #[must_use]
    pub fn compute(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
            kind: ResourceKind::Compute,
        }
    }

    /// Build a data-replication-member resource reference.
    #[must_use]
    pub fn data_member(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
            kind: ResourceKind::DataReplicationMember,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

/// Replication role of a data-tier member, as observed on the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationRole {
    Primary,
    Secondary,
    Unknown,
}

/// Point-in-time observed state of a resource.
///
/// Compute resources report a run state; replication groups report the
/// role currently held by the queried member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Running,
    Stopped,
    Transitioning,
    Unknown,
    Role(ReplicationRole),
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Transitioning => write!(f, "transitioning"),
            Self::Unknown => write!(f, "unknown"),
            Self::Role(ReplicationRole::Primary) => write!(f, "role:primary"),
            Self::Role(ReplicationRole::Secondary) => write!(f, "role:secondary"),
            Self::Role(ReplicationRole::Unknown) => write!(f, "role:unknown"),
        }
    }
}
