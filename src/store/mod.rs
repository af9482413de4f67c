//! Persistence behind a single seam.
//!
//! Every method is one atomic step against the backing store. Components
//! compose these steps; they never hold a lock across calls.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    common::{
        election::{ElectionStatus, ShareCode, Visibility},
        user::UserId,
    },
    db::{
        candidate::Candidate,
        election::Election,
        vote::{Vote, VoteTotal},
    },
    mongodb::Id,
};

/// The store as held in managed state and by every component.
pub type SharedStore = Arc<dyn Store>;

/// Outcome of an insert guarded by a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted,
    /// Another record already holds the unique key.
    Conflict,
}

/// Outcome of an atomic vote insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteInsertion {
    Recorded,
    /// The election vanished before the vote could be written.
    ElectionMissing,
    /// The election stopped accepting ballots before the vote could be written.
    NotAccepting,
    /// The voter already has a vote in this election.
    Duplicate,
}

/// Outcome of a conditional election update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Election),
    Missing,
    /// The status no longer matches `ElectionUpdate::expected_status`.
    StatusChanged,
}

/// Field-level changes to one election. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElectionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub banner_url: Option<Option<String>>,
    pub visibility: Option<Visibility>,
    pub status: Option<ElectionStatus>,
    pub deadline: Option<Option<DateTime<Utc>>>,
    /// Set `results_visible` to true. Nothing ever unsets it.
    pub publish_results: bool,
    /// Only apply if the stored status still equals this.
    pub expected_status: Option<ElectionStatus>,
}

impl ElectionUpdate {
    /// Apply the field changes to an in-memory election.
    pub fn apply_to(&self, election: &mut Election) {
        if let Some(title) = &self.title {
            election.title = title.clone();
        }
        if let Some(description) = &self.description {
            election.description = description.clone();
        }
        if let Some(banner_url) = &self.banner_url {
            election.banner_url = banner_url.clone();
        }
        if let Some(visibility) = self.visibility {
            election.visibility = visibility;
        }
        if let Some(status) = self.status {
            election.status = status;
        }
        if let Some(deadline) = self.deadline {
            election.deadline = deadline;
        }
        if self.publish_results {
            election.results_visible = true;
        }
    }
}

#[rocket::async_trait]
pub trait Store: Send + Sync {
    /// A human-readable name of the backend, for logs.
    fn backend(&self) -> &'static str;

    /// Insert an election together with its initial candidates.
    /// Reports [`Insertion::Conflict`] if the share code is taken, in which
    /// case nothing is written.
    async fn insert_election(&self, election: &Election, candidates: &[Candidate])
        -> Result<Insertion>;

    async fn election(&self, id: Id) -> Result<Option<Election>>;

    async fn election_by_code(&self, code: ShareCode) -> Result<Option<Election>>;

    async fn elections_by_owner(&self, owner: &UserId) -> Result<Vec<Election>>;

    /// All elections with public visibility, in no particular order.
    async fn public_elections(&self) -> Result<Vec<Election>>;

    async fn update_election(&self, id: Id, update: &ElectionUpdate) -> Result<UpdateOutcome>;

    /// Delete an election with all its candidates and votes.
    /// Returns false if it did not exist.
    async fn delete_election(&self, id: Id) -> Result<bool>;

    /// Insert candidates for an existing election. Returns false (writing
    /// nothing) if the election does not exist.
    async fn insert_candidates(&self, election_id: Id, candidates: &[Candidate]) -> Result<bool>;

    /// An election's candidates, in display order.
    async fn candidates(&self, election_id: Id) -> Result<Vec<Candidate>>;

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>>;

    /// Insert a vote if the election accepts ballots at `vote.created_at`.
    /// At most one vote per voter and election is ever recorded. A status
    /// change racing with the insertion is decided by the acceptance check.
    async fn insert_vote(&self, vote: &Vote) -> Result<VoteInsertion>;

    /// Vote counts per candidate that has at least one vote.
    async fn vote_totals(&self, election_id: Id) -> Result<Vec<VoteTotal>>;

    /// All votes cast by a voter, in no particular order.
    async fn votes_by_voter(&self, voter: &UserId) -> Result<Vec<Vote>>;
}
