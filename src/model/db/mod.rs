//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//! - Share codes are stored as plain numbers.

pub mod candidate;
pub mod election;
pub mod vote;
