//! bootrelay-api: Shared API types and schemas
//!
//! Contains request/response types and event types used between the daemon
//! and its operator-facing front ends.

pub mod requests;
pub mod responses;
pub mod events;
