use chrono::Utc;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        candidate::CandidateSpec,
        election::{ElectionPatch, ElectionSpec},
    },
    common::{election::ElectionStatus, user::UserId},
    db::{
        candidate::Candidate,
        election::{Election, ElectionCore},
    },
    mongodb::Id,
};
use crate::store::{ElectionUpdate, Insertion, SharedStore, UpdateOutcome};

use super::{component_guard, election, owned_election, Access, AccessCodeResolver};

/// Owns election records and their lifecycle.
#[derive(Clone)]
pub struct ElectionRegistry {
    store: SharedStore,
    codes: AccessCodeResolver,
    strict_transitions: bool,
    attempts: u32,
}

component_guard!(ElectionRegistry);

fn trimmed_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::Validation("Election title must not be empty".to_string()));
    }
    Ok(title.to_string())
}

impl ElectionRegistry {
    pub fn new(store: SharedStore, config: &Config) -> Self {
        Self {
            codes: AccessCodeResolver::new(store.clone(), config),
            store,
            strict_transitions: config.strict_transitions(),
            attempts: config.share_code_attempts(),
        }
    }

    /// Create a draft election with a fresh share code, together with any
    /// initial candidates. Candidates with blank names are dropped.
    pub async fn create(&self, owner: &UserId, spec: ElectionSpec) -> Result<Election> {
        let title = trimmed_title(&spec.title)?;
        let now = Utc::now();
        if spec.deadline.map_or(false, |deadline| deadline <= now) {
            return Err(Error::Validation(
                "Election deadline must be in the future".to_string(),
            ));
        }

        let id = Id::new();
        let candidates: Vec<Candidate> = spec
            .candidates
            .into_iter()
            .filter(|candidate| !candidate.is_blank())
            .enumerate()
            .map(|(position, candidate)| candidate.into_candidate(id, position))
            .collect();

        let mut election = Election {
            id,
            election: ElectionCore {
                title,
                description: spec.description,
                owner_id: owner.clone(),
                banner_url: spec.banner_url.filter(|url| !url.is_empty()),
                visibility: spec.visibility,
                status: ElectionStatus::Draft,
                share_code: self.codes.generate_code().await?,
                deadline: spec.deadline,
                results_visible: false,
                created_at: now,
            },
        };

        for _ in 0..self.attempts {
            match self.store.insert_election(&election, &candidates).await? {
                Insertion::Inserted => {
                    info!(
                        "User {owner} created election {id} with code {} and {} candidates",
                        election.share_code,
                        candidates.len()
                    );
                    return Ok(election);
                }
                Insertion::Conflict => {
                    debug!("Share code {} was taken concurrently", election.share_code);
                    election.share_code = self.codes.generate_code().await?;
                }
            }
        }
        error!("Gave up creating election {id} after repeated share code conflicts");
        Err(Error::Storage(
            "could not allocate a unique share code".to_string(),
        ))
    }

    /// Apply an owner's changes to an election.
    ///
    /// A status change only applies if the status has not changed since it
    /// was validated.
    pub async fn update(&self, id: Id, owner: &UserId, patch: ElectionPatch) -> Result<Election> {
        let current = owned_election(&self.store, id, owner, Access::Modify).await?;
        if patch.is_empty() {
            return Err(Error::Validation("Nothing to update".to_string()));
        }

        let mut update = ElectionUpdate {
            title: patch.title.as_deref().map(trimmed_title).transpose()?,
            description: patch.description,
            banner_url: patch.banner_url,
            visibility: patch.visibility,
            deadline: patch.deadline,
            ..Default::default()
        };
        if let Some(next) = patch.status {
            if !current.status.permits_transition(next, self.strict_transitions) {
                warn!(
                    "Rejected status change of election {id} from {} to {next}",
                    current.status
                );
                return Err(Error::StateConflict(format!(
                    "Election cannot move from {} to {next}",
                    current.status
                )));
            }
            update.status = Some(next);
            update.expected_status = Some(current.status);
        }

        match self.store.update_election(id, &update).await? {
            UpdateOutcome::Updated(election) => {
                if election.status != current.status {
                    info!(
                        "Election {id} moved from {} to {}",
                        current.status, election.status
                    );
                }
                Ok(election)
            }
            UpdateOutcome::Missing => Err(Error::election_not_found(id)),
            UpdateOutcome::StatusChanged => Err(Error::StateConflict(format!(
                "Election {id} changed status concurrently, reload and retry"
            ))),
        }
    }

    /// Delete an election along with all of its candidates and votes.
    pub async fn delete(&self, id: Id, owner: &UserId) -> Result<()> {
        owned_election(&self.store, id, owner, Access::Modify).await?;
        if !self.store.delete_election(id).await? {
            return Err(Error::election_not_found(id));
        }
        info!("User {owner} deleted election {id}");
        Ok(())
    }

    pub async fn get(&self, id: Id) -> Result<Election> {
        election(&self.store, id).await
    }

    /// Elections owned by `owner`, newest first.
    pub async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Election>> {
        let mut elections = self.store.elections_by_owner(owner).await?;
        elections.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(elections)
    }

    /// The public gallery: lifecycle order, then newest first.
    pub async fn list_public(&self) -> Result<Vec<Election>> {
        let mut elections = self.store.public_elections().await?;
        elections.sort_by(|a, b| {
            a.status
                .cmp(&b.status)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(elections)
    }

    /// Add candidates to an existing election. Numbers default to positions
    /// after the candidates already present.
    pub async fn create_candidates(
        &self,
        election_id: Id,
        owner: &UserId,
        specs: Vec<CandidateSpec>,
    ) -> Result<Vec<Candidate>> {
        owned_election(&self.store, election_id, owner, Access::Modify).await?;
        if specs.is_empty() {
            return Err(Error::Validation("No candidates given".to_string()));
        }
        if specs.iter().any(CandidateSpec::is_blank) {
            return Err(Error::Validation(
                "Candidate name must not be empty".to_string(),
            ));
        }

        let offset = self.store.candidates(election_id).await?.len();
        let mut candidates: Vec<Candidate> = specs
            .into_iter()
            .enumerate()
            .map(|(position, spec)| spec.into_candidate(election_id, offset + position))
            .collect();
        if !self
            .store
            .insert_candidates(election_id, &candidates)
            .await?
        {
            return Err(Error::election_not_found(election_id));
        }
        info!(
            "User {owner} added {} candidates to election {election_id}",
            candidates.len()
        );
        candidates.sort_by(Candidate::display_order);
        Ok(candidates)
    }

    /// Candidates of an election in display order.
    pub async fn list_candidates(&self, election_id: Id) -> Result<Vec<Candidate>> {
        election(&self.store, election_id).await?;
        self.store.candidates(election_id).await
    }
}
