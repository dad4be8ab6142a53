//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use failover_drill_helper::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{FdhError, Result};

// Model
pub use crate::model::resource::{ReplicationRole, ResourceKind, ResourceRef, ResourceState};
pub use crate::model::run::{CompletionKind, RunResult, TestRun};
pub use crate::model::scenario::{DrillResources, FailoverScenario, VerifyDefaults};
pub use crate::model::step::{ActionKind, OutcomeKind, Step, StepOutcome, VerificationSpec};

// Orchestration
pub use crate::controller::ResourceController;
pub use crate::controller::sim::SimulatedSitePair;
pub use crate::executor::{RetryPolicy, StepExecutor};
pub use crate::orchestrator::Orchestrator;
pub use crate::verify::{VerificationOutcome, VerificationPolicy};

// Audit
pub use crate::audit::archive::{FsArchive, LogArchive};
pub use crate::audit::log::{AuditLog, EventKind, LogEntry, Severity};
