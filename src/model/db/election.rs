use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        election::{ElectionStatus, ShareCode, Visibility},
        user::UserId,
    },
    mongodb::{optional_chrono_datetime_as_bson_datetime, Id},
};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    pub title: String,
    pub description: String,
    /// The organizer who may mutate this election.
    pub owner_id: UserId,
    /// URL handed to us by the asset store; passed through untouched.
    pub banner_url: Option<String>,
    pub visibility: Visibility,
    pub status: ElectionStatus,
    /// Unique among all existing elections.
    pub share_code: ShareCode,
    /// Ballots are refused at or after this instant.
    #[serde(with = "optional_chrono_datetime_as_bson_datetime")]
    pub deadline: Option<DateTime<Utc>>,
    /// Only ever moves from `false` to `true`.
    pub results_visible: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// Is the deadline (if any) still ahead of `now`?
    pub fn before_deadline(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map_or(true, |deadline| deadline > now)
    }

    /// Does this election accept ballots at time `now`?
    pub fn accepts_ballots(&self, now: DateTime<Utc>) -> bool {
        self.status == ElectionStatus::Live && self.before_deadline(now)
    }

    /// Still open from a voter's point of view: results are unpublished and
    /// the deadline has not passed. Ignores `status`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.results_visible && self.before_deadline(now)
    }
}

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Election {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner_id == user
    }
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn ballots_need_live_status_and_open_deadline() {
        let now = Utc::now();
        let mut election = Election::example("org", ElectionStatus::Live);
        assert!(election.accepts_ballots(now));

        election.deadline = Some(now + Duration::hours(1));
        assert!(election.accepts_ballots(now));

        election.deadline = Some(now);
        assert!(!election.accepts_ballots(now));

        election.deadline = None;
        election.status = ElectionStatus::Paused;
        assert!(!election.accepts_ballots(now));
    }

    #[test]
    fn is_live_ignores_status() {
        let now = Utc::now();
        let mut election = Election::example("org", ElectionStatus::Closed);
        assert!(election.is_live(now));

        election.deadline = Some(now - Duration::minutes(1));
        assert!(!election.is_live(now));

        election.deadline = None;
        election.results_visible = true;
        assert!(!election.is_live(now));
    }
}
