use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::{
        election::{ElectionStatus, Visibility},
        user::UserId,
    },
    db::election::Election,
};

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: ApiId,
    pub title: String,
    pub description: String,
    pub owner_id: UserId,
    pub banner_url: Option<String>,
    pub visibility: Visibility,
    pub status: ElectionStatus,
    /// Zero-padded to six characters.
    pub share_code: String,
    pub deadline: Option<DateTime<Utc>>,
    pub results_visible: bool,
    pub created_at: DateTime<Utc>,
    /// Whether a ballot submitted right now would be accepted.
    pub accepting_ballots: bool,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        let accepting_ballots = election.accepts_ballots(Utc::now());
        let core = election.election;
        Self {
            id: election.id.into(),
            title: core.title,
            description: core.description,
            owner_id: core.owner_id,
            banner_url: core.banner_url,
            visibility: core.visibility,
            status: core.status,
            share_code: core.share_code.to_string(),
            deadline: core.deadline,
            results_visible: core.results_visible,
            created_at: core.created_at,
            accepting_ballots,
        }
    }
}
