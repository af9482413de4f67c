//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - IDs are serialised as hex strings.
//! - Share codes are serialised as zero-padded six-digit strings.

pub mod auth;
pub mod candidate;
pub mod election;
pub mod history;
pub mod id;
pub mod tally;
pub mod vote;
