//! Domain layer - records, value objects and the pure rules around them.
//!
//! Nothing in here talks to storage. Identity comparison (participant id plus
//! metadata) and the reaction toggle live here so both stores and tests can
//! use them directly.

pub mod conversation;
pub mod foundation;
pub mod message;
