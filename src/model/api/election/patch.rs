use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::election::{ElectionStatus, Visibility};

use super::deserialize_some;

/// A partial update to an election. Absent fields are left untouched.
///
/// `deadline` and `banner_url` distinguish "absent" (`None`) from an explicit
/// `null` (`Some(None)`), which clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub banner_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ElectionStatus>,
    #[serde(
        default,
        deserialize_with = "deserialize_some",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Option<DateTime<Utc>>>,
}

impl ElectionPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn status(status: ElectionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
