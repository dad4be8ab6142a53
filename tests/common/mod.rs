//! Shared test harness: a scripted controller with per-operation fault
//! injection and a full call recording.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use failover_drill_helper::core::errors::{FdhError, Result};
use failover_drill_helper::model::resource::{ResourceRef, ResourceState};
use failover_drill_helper::model::step::ActionKind;
use failover_drill_helper::controller::ResourceController;

/// Injected failure plan for one (operation, resource) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail with a transient error this many times, then succeed.
    Transient(u32),
    /// Fail permanently on every call.
    Permanent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Op {
    Stop,
    Start,
    Status,
}

impl Op {
    const fn label(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Status => "status",
        }
    }
}

struct Inner {
    /// Whether each known resource is currently up.
    up: HashMap<ResourceRef, bool>,
    faults: HashMap<(Op, ResourceRef), Fault>,
    calls: Vec<String>,
}

/// Controller whose resources honestly track stop/start, with scripted
/// fault injection layered on top. Single-threaded like the core.
pub struct ScriptedController {
    inner: RefCell<Inner>,
}

impl ScriptedController {
    /// All listed resources start out up.
    pub fn new(resources: &[ResourceRef]) -> Self {
        Self {
            inner: RefCell::new(Inner {
                up: resources.iter().map(|r| (r.clone(), true)).collect(),
                faults: HashMap::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Inject a fault plan for an action on a resource.
    pub fn fail_action(&self, action: ActionKind, target: &ResourceRef, fault: Fault) {
        let op = match action {
            ActionKind::Stop => Op::Stop,
            ActionKind::Start => Op::Start,
        };
        self.inner
            .borrow_mut()
            .faults
            .insert((op, target.clone()), fault);
    }

    /// Inject a fault plan for status reads of a resource.
    pub fn fail_status(&self, target: &ResourceRef, fault: Fault) {
        self.inner
            .borrow_mut()
            .faults
            .insert((Op::Status, target.clone()), fault);
    }

    /// Every call in order, as `"<op> <scope>/<name>"`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.borrow().calls.clone()
    }

    /// Calls of one kind, in order.
    pub fn calls_of(&self, op_label: &str) -> Vec<String> {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| c.starts_with(op_label))
            .cloned()
            .collect()
    }

    /// Whether the resource is currently up.
    pub fn is_up(&self, target: &ResourceRef) -> bool {
        self.inner.borrow().up.get(target) == Some(&true)
    }

    fn check_fault(&self, op: Op, target: &ResourceRef) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        match inner.faults.get_mut(&(op, target.clone())) {
            Some(Fault::Permanent) => Err(FdhError::AuthDenied {
                resource: target.to_string(),
            }),
            Some(Fault::Transient(left)) if *left > 0 => {
                *left -= 1;
                Err(FdhError::ControlTimeout {
                    resource: target.to_string(),
                    details: format!("injected transient {} failure", op.label()),
                })
            }
            _ => Ok(()),
        }
    }

    fn record(&self, op: Op, target: &ResourceRef) {
        self.inner
            .borrow_mut()
            .calls
            .push(format!("{} {target}", op.label()));
    }

    fn apply(&self, op: Op, target: &ResourceRef, up: bool) -> Result<()> {
        self.record(op, target);
        self.check_fault(op, target)?;
        let mut inner = self.inner.borrow_mut();
        if !inner.up.contains_key(target) {
            return Err(FdhError::ResourceNotFound {
                resource: target.to_string(),
            });
        }
        inner.up.insert(target.clone(), up);
        Ok(())
    }
}

impl ResourceController for ScriptedController {
    fn stop(&self, target: &ResourceRef) -> Result<()> {
        self.apply(Op::Stop, target, false)
    }

    fn start(&self, target: &ResourceRef) -> Result<()> {
        self.apply(Op::Start, target, true)
    }

    fn status(&self, target: &ResourceRef) -> Result<ResourceState> {
        self.record(Op::Status, target);
        self.check_fault(Op::Status, target)?;
        let inner = self.inner.borrow();
        match inner.up.get(target) {
            Some(true) => Ok(ResourceState::Running),
            Some(false) => Ok(ResourceState::Stopped),
            None => Err(FdhError::ResourceNotFound {
                resource: target.to_string(),
            }),
        }
    }
}
