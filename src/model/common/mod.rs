//! Types shared between the database and API representations.

pub mod election;
pub mod user;
