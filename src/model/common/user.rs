use std::fmt;

use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

/// An opaque user identifier, as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<UserId> for Bson {
    fn from(id: UserId) -> Self {
        Bson::String(id.0)
    }
}

/// The role claimed for a user by the identity provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Voter,
    Organizer,
}

impl Role {
    /// Does a user with this role satisfy a requirement for `required`?
    /// Organizers are also voters.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Voter => true,
            Role::Organizer => self == Role::Organizer,
        }
    }
}
