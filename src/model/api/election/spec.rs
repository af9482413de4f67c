use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{api::candidate::CandidateSpec, common::election::Visibility};

/// An election specification, as submitted by an organizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    /// Initial candidates. Entries with a blank name are ignored.
    #[serde(default)]
    pub candidates: Vec<CandidateSpec>,
}
