use serde::{Deserialize, Serialize};

use crate::model::{api::id::ApiId, db::candidate::Candidate};

/// A live, identity-free vote count for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCount {
    pub candidate_id: ApiId,
    pub vote_total: u64,
}

/// One row of a published leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub candidate_id: ApiId,
    pub candidate_name: String,
    pub number: u32,
    pub slate: Option<String>,
    pub photo_url: Option<String>,
    pub vision: String,
    pub goals: String,
    pub vote_total: u64,
}

impl LeaderboardEntry {
    pub fn new(candidate: Candidate, vote_total: u64) -> Self {
        let core = candidate.candidate;
        Self {
            candidate_id: candidate.id.into(),
            candidate_name: core.name,
            number: core.number,
            slate: core.slate,
            photo_url: core.photo_url,
            vision: core.vision,
            goals: core.goals,
            vote_total,
        }
    }
}
