//! Drill data model: resources, steps, scenarios, and run aggregates.

pub mod resource;
pub mod run;
pub mod scenario;
pub mod step;
