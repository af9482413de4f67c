use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::user::UserId, mongodb::Id};

/// Core vote data, as stored in the database.
///
/// At most one vote exists per `(election_id, voter_id)`. Votes are never
/// modified; they disappear only when their election is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    /// Foreign key: the election voted in.
    pub election_id: Id,
    /// Foreign key: the chosen candidate, which belongs to `election_id`.
    pub candidate_id: Id,
    pub voter_id: UserId,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Vote {
    /// Create a new vote stamped with the current time.
    pub fn new(election_id: Id, candidate_id: Id, voter_id: UserId) -> Self {
        Self {
            id: Id::new(),
            vote: VoteCore {
                election_id,
                candidate_id,
                voter_id,
                created_at: Utc::now(),
            },
        }
    }
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

/// A per-candidate vote count. Carries no voter information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTotal {
    #[serde(rename = "_id")]
    pub candidate_id: Id,
    pub vote_total: u64,
}
