//! Capability seam over the cloud control plane.
//!
//! Concrete adapters (compute-control API, failover-group API) live
//! outside the core; orchestration code sees only this trait and the
//! transient/permanent classification carried by [`FdhError`].
//!
//! [`FdhError`]: crate::core::errors::FdhError

pub mod sim;

use crate::core::errors::Result;
use crate::model::resource::{ResourceRef, ResourceState};

/// Uniform stop/start/status operations over one controllable resource.
///
/// `stop` and `start` are requests: the provider applies them
/// asynchronously, so success does not imply the transition finished.
/// `status` is a single point-in-time read. All three report failures
/// as `FDH-2xxx` control-plane errors whose `is_transient()` drives the
/// caller's retry policy.
pub trait ResourceController {
    /// Request a transition toward `Stopped`/disabled.
    fn stop(&self, target: &ResourceRef) -> Result<()>;
    /// Request a transition toward `Running`/enabled.
    fn start(&self, target: &ResourceRef) -> Result<()>;
    /// Read the current observable state.
    fn status(&self, target: &ResourceRef) -> Result<ResourceState>;
}
