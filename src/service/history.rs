use std::collections::HashMap;

use chrono::Utc;

use crate::config::Config;
use crate::error::Result;
use crate::model::{
    api::history::{HistoryRecord, Summary},
    common::{election::ElectionStatus, user::UserId},
    db::{candidate::Candidate, election::Election},
    mongodb::Id,
};
use crate::store::SharedStore;

use super::component_guard;

/// A voter's view of the votes they have cast.
#[derive(Clone)]
pub struct HistoryLedger {
    store: SharedStore,
}

component_guard!(HistoryLedger);

impl HistoryLedger {
    pub fn new(store: SharedStore, _config: &Config) -> Self {
        Self { store }
    }

    /// Every vote cast by `voter`, most recent first, joined with the
    /// current state of its election.
    pub async fn votes_for_voter(&self, voter: &UserId) -> Result<Vec<HistoryRecord>> {
        let mut votes = self.store.votes_by_voter(voter).await?;
        votes.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let now = Utc::now();
        let mut elections: HashMap<Id, Option<Election>> = HashMap::new();
        let mut candidates: HashMap<Id, Option<Candidate>> = HashMap::new();
        let mut records = Vec::with_capacity(votes.len());
        for vote in &votes {
            if !elections.contains_key(&vote.election_id) {
                let election = self.store.election(vote.election_id).await?;
                elections.insert(vote.election_id, election);
            }
            if !candidates.contains_key(&vote.candidate_id) {
                let candidate = self.store.candidate(vote.candidate_id).await?;
                candidates.insert(vote.candidate_id, candidate);
            }
            // Both vanish only when the election is being deleted.
            if let (Some(Some(election)), Some(Some(candidate))) = (
                elections.get(&vote.election_id),
                candidates.get(&vote.candidate_id),
            ) {
                records.push(HistoryRecord::new(vote, election, candidate, now));
            }
        }
        Ok(records)
    }

    /// Counters for the home page.
    pub async fn summary(&self, user: &UserId) -> Result<Summary> {
        let owned = self.store.elections_by_owner(user).await?.len();
        let votes = self.store.votes_by_voter(user).await?.len();
        let public_live = self
            .store
            .public_elections()
            .await?
            .iter()
            .filter(|election| election.status == ElectionStatus::Live)
            .count();
        Ok(Summary {
            owned,
            votes,
            public_live,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::model::api::{history::HistoryPhase, id::ApiId};
    use crate::model::common::election::{ShareCode, Visibility};
    use crate::service::{BallotBox, TallyEngine};
    use crate::store::{ElectionUpdate, MemoryStore};

    use super::*;

    async fn live_election(store: &SharedStore, code: u32) -> (Election, Candidate) {
        let mut election = Election::example("org", ElectionStatus::Live);
        election.share_code = ShareCode::try_from(code).unwrap();
        let candidate = Candidate::example(election.id, "Alice", 1);
        store
            .insert_election(&election, &[candidate.clone()])
            .await
            .unwrap();
        (election, candidate)
    }

    #[rocket::async_test]
    async fn history_reports_phase_and_newest_first() {
        let store = MemoryStore::shared();
        let config = Config::example();
        let ballots = BallotBox::new(store.clone(), &config);
        let tally = TallyEngine::new(store.clone(), &config);
        let history = HistoryLedger::new(store.clone(), &config);
        let voter = UserId::new("v1");

        let (first, alice) = live_election(&store, 1).await;
        let (second, other_alice) = live_election(&store, 2).await;
        ballots.cast(first.id, alice.id, &voter).await.unwrap();
        ballots.cast(second.id, other_alice.id, &voter).await.unwrap();

        let records = history.votes_for_voter(&voter).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].election_id, ApiId::from(second.id));
        assert!(records.iter().all(|r| r.is_live && r.phase == HistoryPhase::Live));
        assert_eq!(records[1].candidate_name, "Alice");
        assert_eq!(records[1].election_code, "000001");

        tally
            .publish_results(first.id, &UserId::new("org"))
            .await
            .unwrap();
        let records = history.votes_for_voter(&voter).await.unwrap();
        let first_record = records
            .iter()
            .find(|r| r.election_id == ApiId::from(first.id))
            .unwrap();
        assert_eq!(first_record.phase, HistoryPhase::Published);
        assert!(!first_record.is_live);
    }

    #[rocket::async_test]
    async fn passed_deadline_waits_for_publication() {
        let store = MemoryStore::shared();
        let config = Config::example();
        let ballots = BallotBox::new(store.clone(), &config);
        let history = HistoryLedger::new(store.clone(), &config);
        let voter = UserId::new("v1");

        let (election, alice) = live_election(&store, 7).await;
        ballots.cast(election.id, alice.id, &voter).await.unwrap();
        let expire = ElectionUpdate {
            deadline: Some(Some(Utc::now() - Duration::seconds(1))),
            ..Default::default()
        };
        store.update_election(election.id, &expire).await.unwrap();

        let records = history.votes_for_voter(&voter).await.unwrap();
        assert_eq!(records[0].phase, HistoryPhase::Waiting);
        assert!(!records[0].is_live);
    }

    #[rocket::async_test]
    async fn deleted_elections_leave_no_history() {
        let store = MemoryStore::shared();
        let config = Config::example();
        let ballots = BallotBox::new(store.clone(), &config);
        let history = HistoryLedger::new(store.clone(), &config);
        let voter = UserId::new("v1");

        let (election, alice) = live_election(&store, 3).await;
        ballots.cast(election.id, alice.id, &voter).await.unwrap();
        store.delete_election(election.id).await.unwrap();

        assert!(history.votes_for_voter(&voter).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn summary_counts() {
        let store = MemoryStore::shared();
        let config = Config::example();
        let ballots = BallotBox::new(store.clone(), &config);
        let history = HistoryLedger::new(store.clone(), &config);

        let (live, alice) = live_election(&store, 4).await;
        let mut private = Election::example("org", ElectionStatus::Live);
        private.share_code = ShareCode::try_from(5).unwrap();
        private.visibility = Visibility::Private;
        store.insert_election(&private, &[]).await.unwrap();
        ballots
            .cast(live.id, alice.id, &UserId::new("org"))
            .await
            .unwrap();

        let summary = history.summary(&UserId::new("org")).await.unwrap();
        assert_eq!(
            summary,
            Summary {
                owned: 2,
                votes: 1,
                public_live: 1,
            }
        );
    }
}
