use std::collections::HashMap;
use std::time::Duration;

use rocket::futures::{stream, Stream};
use rocket::tokio::time::{interval, MissedTickBehavior};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::tally::{LeaderboardEntry, LiveCount},
    common::user::UserId,
    db::{candidate::Candidate, election::Election},
    mongodb::Id,
};
use crate::store::{ElectionUpdate, SharedStore, UpdateOutcome};

use super::{component_guard, election, owned_election, Access};

/// Derives vote counts from the stored votes. Counts are never stored, and
/// nothing here can see who cast a vote.
#[derive(Clone)]
pub struct TallyEngine {
    store: SharedStore,
}

component_guard!(TallyEngine);

impl TallyEngine {
    pub fn new(store: SharedStore, _config: &Config) -> Self {
        Self { store }
    }

    /// Every candidate of the election with its current total, zeros
    /// included, in display order.
    pub async fn live_counts(&self, election_id: Id) -> Result<Vec<LiveCount>> {
        election(&self.store, election_id).await?;
        Ok(self
            .counted_candidates(election_id)
            .await?
            .into_iter()
            .map(|(candidate, vote_total)| LiveCount {
                candidate_id: candidate.id.into(),
                vote_total,
            })
            .collect())
    }

    /// Live counts for the election's owner.
    pub async fn owner_live_counts(&self, election_id: Id, owner: &UserId) -> Result<Vec<LiveCount>> {
        owned_election(&self.store, election_id, owner, Access::View).await?;
        self.live_counts(election_id).await
    }

    /// A stream of live counts, read afresh every `period`. The first read is
    /// immediate. The stream stops after the first failed read, e.g. once the
    /// election is deleted, and all its resources go when it is dropped.
    pub fn live_feed(
        &self,
        election_id: Id,
        period: Duration,
    ) -> impl Stream<Item = Result<Vec<LiveCount>>> + Send + 'static {
        // `interval` panics on a zero period.
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let state = Some((self.clone(), ticker));
        stream::unfold(state, move |state| async move {
            let (engine, mut ticker) = state?;
            ticker.tick().await;
            let counts = engine.live_counts(election_id).await;
            let next = counts.is_ok().then_some((engine, ticker));
            Some((counts, next))
        })
    }

    /// The leaderboard: candidates with display fields, most votes first.
    ///
    /// Until results are published only the owner may look.
    pub async fn published_results(
        &self,
        election_id: Id,
        viewer: &UserId,
    ) -> Result<Vec<LeaderboardEntry>> {
        let election = election(&self.store, election_id).await?;
        if !election.results_visible && !election.is_owned_by(viewer) {
            return Err(Error::StateConflict(format!(
                "Results of election {election_id} have not been published"
            )));
        }
        self.leaderboard(&election).await
    }

    /// Make the results visible to voters. Publishing again is a no-op.
    pub async fn publish_results(&self, election_id: Id, owner: &UserId) -> Result<Election> {
        let current = owned_election(&self.store, election_id, owner, Access::Modify).await?;
        if current.results_visible {
            return Ok(current);
        }
        let update = ElectionUpdate {
            publish_results: true,
            ..Default::default()
        };
        match self.store.update_election(election_id, &update).await? {
            UpdateOutcome::Updated(election) => {
                info!("User {owner} published the results of election {election_id}");
                Ok(election)
            }
            UpdateOutcome::Missing | UpdateOutcome::StatusChanged => {
                Err(Error::election_not_found(election_id))
            }
        }
    }

    async fn leaderboard(&self, election: &Election) -> Result<Vec<LeaderboardEntry>> {
        let mut counted = self.counted_candidates(election.id).await?;
        counted.sort_by(|(a, a_total), (b, b_total)| {
            b_total.cmp(a_total).then_with(|| a.display_order(b))
        });
        Ok(counted
            .into_iter()
            .map(|(candidate, total)| LeaderboardEntry::new(candidate, total))
            .collect())
    }

    /// Candidates in display order, each paired with its vote total.
    async fn counted_candidates(&self, election_id: Id) -> Result<Vec<(Candidate, u64)>> {
        let totals: HashMap<Id, u64> = self
            .store
            .vote_totals(election_id)
            .await?
            .into_iter()
            .map(|total| (total.candidate_id, total.vote_total))
            .collect();
        let candidates = self.store.candidates(election_id).await?;
        Ok(candidates
            .into_iter()
            .map(|candidate| {
                let total = totals.get(&candidate.id).copied().unwrap_or(0);
                (candidate, total)
            })
            .collect())
    }
}
