use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::vote::Vote};

/// A ballot the voter wishes to cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotSpec {
    pub candidate_id: ApiId,
}

/// Acknowledgement of a recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub vote_id: ApiId,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub created_at: DateTime<Utc>,
}

impl From<&Vote> for VoteReceipt {
    fn from(vote: &Vote) -> Self {
        Self {
            vote_id: vote.id.into(),
            election_id: vote.election_id.into(),
            candidate_id: vote.candidate_id.into(),
            created_at: vote.created_at,
        }
    }
}
