use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rocket::tokio::sync::RwLock;

use crate::error::Result;
use crate::model::{
    common::{
        election::{ShareCode, Visibility},
        user::UserId,
    },
    db::{
        candidate::Candidate,
        election::Election,
        vote::{Vote, VoteTotal},
    },
    mongodb::Id,
};

use super::{ElectionUpdate, Insertion, SharedStore, Store, UpdateOutcome, VoteInsertion};

#[derive(Debug, Default)]
struct Tables {
    elections: HashMap<Id, Election>,
    /// Unique index on `share_code`.
    codes: HashMap<ShareCode, Id>,
    candidates: HashMap<Id, Candidate>,
    votes: HashMap<Id, Vote>,
    /// Unique index on `(election_id, voter_id)`.
    ballots_cast: HashSet<(Id, UserId)>,
}

/// A store held entirely in process memory.
///
/// Each operation runs under a single lock acquisition, which gives it the
/// same atomicity as one MongoDB transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }
}

#[rocket::async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "in-memory"
    }

    async fn insert_election(
        &self,
        election: &Election,
        candidates: &[Candidate],
    ) -> Result<Insertion> {
        let mut tables = self.tables.write().await;
        if tables.codes.contains_key(&election.share_code) {
            return Ok(Insertion::Conflict);
        }
        tables.codes.insert(election.share_code, election.id);
        tables.elections.insert(election.id, election.clone());
        for candidate in candidates {
            tables.candidates.insert(candidate.id, candidate.clone());
        }
        Ok(Insertion::Inserted)
    }

    async fn election(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.tables.read().await.elections.get(&id).cloned())
    }

    async fn election_by_code(&self, code: ShareCode) -> Result<Option<Election>> {
        let tables = self.tables.read().await;
        Ok(tables
            .codes
            .get(&code)
            .and_then(|id| tables.elections.get(id))
            .cloned())
    }

    async fn elections_by_owner(&self, owner: &UserId) -> Result<Vec<Election>> {
        let tables = self.tables.read().await;
        Ok(tables
            .elections
            .values()
            .filter(|election| &election.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn public_elections(&self) -> Result<Vec<Election>> {
        let tables = self.tables.read().await;
        Ok(tables
            .elections
            .values()
            .filter(|election| election.visibility == Visibility::Public)
            .cloned()
            .collect())
    }

    async fn update_election(&self, id: Id, update: &ElectionUpdate) -> Result<UpdateOutcome> {
        let mut tables = self.tables.write().await;
        let election = match tables.elections.get_mut(&id) {
            Some(election) => election,
            None => return Ok(UpdateOutcome::Missing),
        };
        if let Some(expected) = update.expected_status {
            if election.status != expected {
                return Ok(UpdateOutcome::StatusChanged);
            }
        }
        update.apply_to(election);
        Ok(UpdateOutcome::Updated(election.clone()))
    }

    async fn delete_election(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let election = match tables.elections.remove(&id) {
            Some(election) => election,
            None => return Ok(false),
        };
        tables.codes.remove(&election.share_code);
        tables
            .candidates
            .retain(|_, candidate| candidate.election_id != id);
        tables.votes.retain(|_, vote| vote.election_id != id);
        tables
            .ballots_cast
            .retain(|(election_id, _)| *election_id != id);
        Ok(true)
    }

    async fn insert_candidates(&self, election_id: Id, candidates: &[Candidate]) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if !tables.elections.contains_key(&election_id) {
            return Ok(false);
        }
        for candidate in candidates {
            tables.candidates.insert(candidate.id, candidate.clone());
        }
        Ok(true)
    }

    async fn candidates(&self, election_id: Id) -> Result<Vec<Candidate>> {
        let tables = self.tables.read().await;
        let mut candidates: Vec<_> = tables
            .candidates
            .values()
            .filter(|candidate| candidate.election_id == election_id)
            .cloned()
            .collect();
        candidates.sort_by(Candidate::display_order);
        Ok(candidates)
    }

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.tables.read().await.candidates.get(&id).cloned())
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<VoteInsertion> {
        let mut tables = self.tables.write().await;
        match tables.elections.get(&vote.election_id) {
            None => return Ok(VoteInsertion::ElectionMissing),
            Some(election) if !election.accepts_ballots(vote.created_at) => {
                return Ok(VoteInsertion::NotAccepting)
            }
            Some(_) => {}
        }
        if !tables
            .ballots_cast
            .insert((vote.election_id, vote.voter_id.clone()))
        {
            return Ok(VoteInsertion::Duplicate);
        }
        tables.votes.insert(vote.id, vote.clone());
        Ok(VoteInsertion::Recorded)
    }

    async fn vote_totals(&self, election_id: Id) -> Result<Vec<VoteTotal>> {
        let tables = self.tables.read().await;
        let mut totals: HashMap<Id, u64> = HashMap::new();
        for vote in tables.votes.values() {
            if vote.election_id == election_id {
                *totals.entry(vote.candidate_id).or_default() += 1;
            }
        }
        Ok(totals
            .into_iter()
            .map(|(candidate_id, vote_total)| VoteTotal {
                candidate_id,
                vote_total,
            })
            .collect())
    }

    async fn votes_by_voter(&self, voter: &UserId) -> Result<Vec<Vote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .votes
            .values()
            .filter(|vote| &vote.voter_id == voter)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::common::election::ElectionStatus;

    use super::*;

    #[rocket::async_test]
    async fn share_codes_are_unique_while_held() {
        let store = MemoryStore::new();
        let first = Election::example("org", ElectionStatus::Draft);
        let mut second = Election::example("org", ElectionStatus::Draft);
        second.share_code = first.share_code;

        assert_eq!(store.insert_election(&first, &[]).await.unwrap(), Insertion::Inserted);
        assert_eq!(store.insert_election(&second, &[]).await.unwrap(), Insertion::Conflict);
        assert!(store.election(second.id).await.unwrap().is_none());

        // Once the holder is gone the code can be recycled.
        assert!(store.delete_election(first.id).await.unwrap());
        assert_eq!(store.insert_election(&second, &[]).await.unwrap(), Insertion::Inserted);
    }

    #[rocket::async_test]
    async fn delete_cascades() {
        let store = MemoryStore::new();
        let election = Election::example("org", ElectionStatus::Live);
        let candidate = Candidate::example(election.id, "Alice", 1);
        store
            .insert_election(&election, &[candidate.clone()])
            .await
            .unwrap();
        let vote = Vote::new(election.id, candidate.id, UserId::new("v1"));
        assert_eq!(store.insert_vote(&vote).await.unwrap(), VoteInsertion::Recorded);

        assert!(store.delete_election(election.id).await.unwrap());
        assert!(store.candidates(election.id).await.unwrap().is_empty());
        assert!(store.vote_totals(election.id).await.unwrap().is_empty());
        assert!(store
            .votes_by_voter(&UserId::new("v1"))
            .await
            .unwrap()
            .is_empty());
        assert!(!store.delete_election(election.id).await.unwrap());
    }

    #[rocket::async_test]
    async fn guarded_updates_fail_on_status_change() {
        let store = MemoryStore::new();
        let election = Election::example("org", ElectionStatus::Live);
        store.insert_election(&election, &[]).await.unwrap();

        let update = ElectionUpdate {
            status: Some(ElectionStatus::Closed),
            expected_status: Some(ElectionStatus::Paused),
            ..Default::default()
        };
        assert_eq!(
            store.update_election(election.id, &update).await.unwrap(),
            UpdateOutcome::StatusChanged
        );
        assert_eq!(
            store.update_election(Id::new(), &update).await.unwrap(),
            UpdateOutcome::Missing
        );
    }
}
