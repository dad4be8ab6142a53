#![forbid(unsafe_code)]

//! Failover Drill Helper (fdh) — disaster-recovery drill orchestrator.
//!
//! Drives a primary/secondary pair of managed services (a compute tier
//! and a data tier) through controlled stop/verify/restore cycles,
//! verifies that the peer takes over, restores the original topology,
//! and archives an append-only audit trail of the exercise.
//!
//! The orchestration core is strictly sequential: later verifications
//! depend on earlier actions having reached the real infrastructure.
//! Transient control-plane failures are retried with backoff; every
//! stopped resource is restored even when a verification fails; only a
//! permanent failure of a restorative start aborts a drill.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use failover_drill_helper::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use failover_drill_helper::core::config::Config;
//! use failover_drill_helper::orchestrator::Orchestrator;
//! ```

pub mod prelude;

pub mod audit;
pub mod controller;
pub mod core;
pub mod executor;
pub mod model;
pub mod orchestrator;
#[cfg(feature = "cli")]
pub mod report;
pub mod verify;
