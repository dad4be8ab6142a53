//! Append-only audit trail with an exactly-once durable archive flush.

pub mod archive;
pub mod log;
