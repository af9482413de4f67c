use std::{fmt, str::FromStr};

use mongodb::bson::{to_bson, Bson};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// States in the election lifecycle.
///
/// The declaration order is the lifecycle order, and is also the order used
/// when sorting the public gallery.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    /// Under construction.
    Draft,
    /// Announced but not yet accepting ballots.
    Scheduled,
    /// Accepting ballots (subject to the deadline).
    Live,
    /// Temporarily not accepting ballots.
    Paused,
    /// Finished. Terminal.
    Closed,
}

impl ElectionStatus {
    /// Can an election move from `self` to `next`?
    ///
    /// Nothing ever leaves `Closed`. In lenient mode any other move is allowed.
    /// In strict mode only the lifecycle edges are allowed, plus cancelling a
    /// draft or scheduled election straight to `Closed`.
    pub fn permits_transition(self, next: ElectionStatus, strict: bool) -> bool {
        use ElectionStatus::*;

        if self == next {
            return true;
        }
        if self == Closed {
            return false;
        }
        if !strict {
            return true;
        }
        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Scheduled, Live)
                | (Live, Paused)
                | (Paused, Live)
                | (_, Closed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Paused => "paused",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ElectionStatus> for Bson {
    fn from(status: ElectionStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}

/// Whether an election is listed in the public gallery.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Reachable by share code (or ID) only.
    #[default]
    Private,
    /// Also listed in the public gallery.
    Public,
}

impl From<Visibility> for Bson {
    fn from(visibility: Visibility) -> Self {
        to_bson(&visibility).expect("Serialisation is infallible")
    }
}

/// A six-digit numeric code voters type in to find a private election.
///
/// Stored as a plain number; displayed zero-padded to six characters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareCode(u32);

impl ShareCode {
    pub const MAX: u32 = 999_999;
    pub const DIGITS: usize = 6;

    /// Draw a uniformly random code. Uniqueness is the caller's concern.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self(rng.gen_range(0..=Self::MAX))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ShareCode {
    type Error = InvalidShareCode;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > Self::MAX {
            return Err(InvalidShareCode(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

/// Codes must be exactly six ASCII digits, leading zeros included.
impl FromStr for ShareCode {
    type Err = InvalidShareCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidShareCode(s.to_string()));
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| InvalidShareCode(s.to_string()))
    }
}

impl From<ShareCode> for Bson {
    fn from(code: ShareCode) -> Self {
        Bson::Int64(code.0.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Share codes are exactly {} digits, got '{0}'", ShareCode::DIGITS)]
pub struct InvalidShareCode(pub String);
