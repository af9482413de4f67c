use chrono::Utc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    common::{election::ElectionStatus, user::UserId},
    db::vote::Vote,
    mongodb::Id,
};
use crate::store::{SharedStore, VoteInsertion};

use super::{component_guard, election};

/// Accepts ballots, at most one per voter per election.
#[derive(Clone)]
pub struct BallotBox {
    store: SharedStore,
}

component_guard!(BallotBox);

impl BallotBox {
    pub fn new(store: SharedStore, _config: &Config) -> Self {
        Self { store }
    }

    /// Record `voter`'s vote for `candidate_id` in `election_id`.
    ///
    /// The uniqueness check and the insert happen in one atomic store
    /// operation, which also re-checks that the election still accepts
    /// ballots.
    pub async fn cast(&self, election_id: Id, candidate_id: Id, voter: &UserId) -> Result<Vote> {
        let election = election(&self.store, election_id).await?;

        let now = Utc::now();
        if !election.accepts_ballots(now) {
            debug!(
                "Voter {voter} tried to vote in election {election_id} with status {}",
                election.status
            );
            return Err(not_accepting(election.status, election.before_deadline(now)));
        }

        match self.store.candidate(candidate_id).await? {
            Some(candidate) if candidate.election_id == election_id => {}
            _ => {
                return Err(Error::Validation(format!(
                    "Candidate {candidate_id} does not stand in election {election_id}"
                )))
            }
        }

        let vote = Vote::new(election_id, candidate_id, voter.clone());
        match self.store.insert_vote(&vote).await? {
            VoteInsertion::Recorded => {
                info!("Recorded vote {} in election {election_id}", vote.id);
                Ok(vote)
            }
            VoteInsertion::Duplicate => {
                warn!("Voter {voter} tried to vote twice in election {election_id}");
                Err(Error::DuplicateVote {
                    election_id,
                    voter_id: voter.clone(),
                })
            }
            VoteInsertion::ElectionMissing => Err(Error::election_not_found(election_id)),
            VoteInsertion::NotAccepting => Err(Error::StateConflict(format!(
                "Election {election_id} stopped accepting votes"
            ))),
        }
    }
}

fn not_accepting(status: ElectionStatus, before_deadline: bool) -> Error {
    let reason = match status {
        ElectionStatus::Closed => "Election is closed".to_string(),
        ElectionStatus::Live if !before_deadline => "Election deadline has passed".to_string(),
        status => format!("Election is {status} and not accepting votes"),
    };
    Error::StateConflict(reason)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rocket::futures::future::join_all;

    use crate::model::{
        common::election::ShareCode,
        db::{candidate::Candidate, election::Election},
    };
    use crate::store::{ElectionUpdate, MemoryStore};

    use super::*;

    /// A live election with candidates Alice and Bob.
    async fn live_election(store: &SharedStore) -> (Election, Candidate, Candidate) {
        let election = Election::example("org", ElectionStatus::Live);
        let alice = Candidate::example(election.id, "Alice", 1);
        let bob = Candidate::example(election.id, "Bob", 2);
        store
            .insert_election(&election, &[alice.clone(), bob.clone()])
            .await
            .unwrap();
        (election, alice, bob)
    }

    fn ballot_box(store: &SharedStore) -> BallotBox {
        BallotBox::new(store.clone(), &Config::example())
    }

    async fn total_votes(store: &SharedStore, election_id: Id) -> u64 {
        store
            .vote_totals(election_id)
            .await
            .unwrap()
            .iter()
            .map(|total| total.vote_total)
            .sum()
    }

    #[rocket::async_test]
    async fn second_vote_is_a_duplicate() {
        let store = MemoryStore::shared();
        let (election, alice, bob) = live_election(&store).await;
        let ballots = ballot_box(&store);
        let voter = UserId::new("voter-1");

        ballots.cast(election.id, alice.id, &voter).await.unwrap();
        for candidate in [alice.id, bob.id] {
            assert!(matches!(
                ballots.cast(election.id, candidate, &voter).await,
                Err(Error::DuplicateVote { .. })
            ));
        }
        assert_eq!(store.votes_by_voter(&voter).await.unwrap().len(), 1);
        assert_eq!(total_votes(&store, election.id).await, 1);
    }

    #[rocket::async_test]
    async fn simultaneous_votes_yield_exactly_one_success() {
        let store = MemoryStore::shared();
        let (election, alice, bob) = live_election(&store).await;
        let voter = UserId::new("voter-1");
        let election_id = election.id;

        let attempts = (0..16).map(|i| {
            let ballots = ballot_box(&store);
            let voter = voter.clone();
            let candidate = if i % 2 == 0 { alice.id } else { bob.id };
            rocket::tokio::spawn(async move { ballots.cast(election_id, candidate, &voter).await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let duplicates = results
            .iter()
            .filter(|r| matches!(r, Err(Error::DuplicateVote { .. })))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(duplicates, results.len() - 1);
        assert_eq!(total_votes(&store, election.id).await, 1);
    }

    #[rocket::async_test]
    async fn simultaneous_votes_from_different_voters_all_count() {
        let store = MemoryStore::shared();
        let (election, alice, bob) = live_election(&store).await;
        let election_id = election.id;

        let attempts = (0..32).map(|i| {
            let ballots = ballot_box(&store);
            let voter = UserId::new(format!("voter-{i}"));
            let candidate = if i % 4 == 0 { bob.id } else { alice.id };
            rocket::tokio::spawn(async move { ballots.cast(election_id, candidate, &voter).await })
        });
        for joined in join_all(attempts).await {
            joined.unwrap().unwrap();
        }

        let mut totals = store.vote_totals(election_id).await.unwrap();
        totals.sort_by_key(|total| total.vote_total);
        let totals: Vec<_> = totals
            .iter()
            .map(|total| (total.candidate_id, total.vote_total))
            .collect();
        assert_eq!(totals, [(bob.id, 8), (alice.id, 24)]);
    }

    #[rocket::async_test]
    async fn preconditions_fail_in_order() {
        let store = MemoryStore::shared();
        let (election, alice, _) = live_election(&store).await;
        let ballots = ballot_box(&store);
        let voter = UserId::new("voter-1");

        // Unknown election beats everything else.
        assert!(matches!(
            ballots.cast(Id::new(), Id::new(), &voter).await,
            Err(Error::NotFound(_))
        ));

        // A candidate from another election is invalid.
        let mut other = Election::example("org", ElectionStatus::Live);
        other.share_code = ShareCode::try_from(654_321).unwrap();
        let other_candidate = Candidate::example(other.id, "Zed", 1);
        store
            .insert_election(&other, &[other_candidate.clone()])
            .await
            .unwrap();
        assert!(matches!(
            ballots.cast(election.id, other_candidate.id, &voter).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            ballots.cast(election.id, Id::new(), &voter).await,
            Err(Error::Validation(_))
        ));

        // Once the voter has voted, closing the election reports the state
        // conflict rather than the duplicate.
        ballots.cast(other.id, other_candidate.id, &voter).await.unwrap();
        let close = ElectionUpdate {
            status: Some(ElectionStatus::Closed),
            ..Default::default()
        };
        store.update_election(other.id, &close).await.unwrap();
        assert!(matches!(
            ballots.cast(other.id, other_candidate.id, &voter).await,
            Err(Error::StateConflict(_))
        ));

        ballots.cast(election.id, alice.id, &voter).await.unwrap();
    }

    #[rocket::async_test]
    async fn closed_elections_refuse_votes_regardless_of_deadline() {
        let store = MemoryStore::shared();
        let mut election = Election::example("org", ElectionStatus::Closed);
        election.deadline = Some(Utc::now() + Duration::days(7));
        let alice = Candidate::example(election.id, "Alice", 1);
        store
            .insert_election(&election, &[alice.clone()])
            .await
            .unwrap();

        let result = ballot_box(&store)
            .cast(election.id, alice.id, &UserId::new("voter-1"))
            .await;
        assert!(matches!(result, Err(Error::StateConflict(_))));
        assert_eq!(total_votes(&store, election.id).await, 0);
    }

    #[rocket::async_test]
    async fn expired_and_paused_elections_refuse_votes() {
        let store = MemoryStore::shared();
        let mut expired = Election::example("org", ElectionStatus::Live);
        expired.deadline = Some(Utc::now() - Duration::seconds(1));
        let mut paused = Election::example("org", ElectionStatus::Paused);
        paused.share_code = ShareCode::try_from(111_111).unwrap();

        let ballots = ballot_box(&store);
        for election in [expired, paused] {
            let candidate = Candidate::example(election.id, "Alice", 1);
            store
                .insert_election(&election, &[candidate.clone()])
                .await
                .unwrap();
            assert!(matches!(
                ballots
                    .cast(election.id, candidate.id, &UserId::new("voter-1"))
                    .await,
                Err(Error::StateConflict(_))
            ));
        }
    }
}
