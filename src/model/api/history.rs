use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::{ElectionStatus, Visibility},
    db::{candidate::Candidate, election::Election, vote::Vote},
};

/// How a past vote's election looks to the voter right now.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryPhase {
    /// The organizer has published results.
    Published,
    /// Unpublished and the deadline (if any) has not passed.
    Live,
    /// Unpublished and past the deadline.
    Waiting,
}

/// One entry of a voter's personal history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub vote_id: ApiId,
    pub voted_at: DateTime<Utc>,
    pub election_id: ApiId,
    pub election_title: String,
    pub election_code: String,
    pub election_status: ElectionStatus,
    pub election_visibility: Visibility,
    pub banner_url: Option<String>,
    pub results_visible: bool,
    pub candidate_id: ApiId,
    pub candidate_name: String,
    pub is_live: bool,
    pub phase: HistoryPhase,
}

impl HistoryRecord {
    /// Join a vote with its election and candidate, as of `now`.
    pub fn new(vote: &Vote, election: &Election, candidate: &Candidate, now: DateTime<Utc>) -> Self {
        let is_live = election.is_live(now);
        let phase = if election.results_visible {
            HistoryPhase::Published
        } else if is_live {
            HistoryPhase::Live
        } else {
            HistoryPhase::Waiting
        };
        Self {
            vote_id: vote.id.into(),
            voted_at: vote.created_at,
            election_id: election.id.into(),
            election_title: election.title.clone(),
            election_code: election.share_code.to_string(),
            election_status: election.status,
            election_visibility: election.visibility,
            banner_url: election.banner_url.clone(),
            results_visible: election.results_visible,
            candidate_id: candidate.id.into(),
            candidate_name: candidate.name.clone(),
            is_live,
            phase,
        }
    }
}

/// Home-page counters for a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Elections this user owns.
    pub owned: usize,
    /// Votes this user has cast.
    pub votes: usize,
    /// Public elections currently live.
    pub public_live: usize,
}
