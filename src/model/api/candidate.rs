use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    db::candidate::{Candidate, CandidateCore},
    mongodb::Id,
};

/// A candidate specification, as submitted by an organizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    /// Defaults to the candidate's 1-based position in the submitted list.
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub slate: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub goals: String,
    #[serde(default)]
    pub vision: String,
}

impl CandidateSpec {
    /// Is this an unfilled entry that should be skipped?
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// Convert this spec into a candidate of the given election, at the given
    /// 0-based position in the submitted list.
    pub fn into_candidate(self, election_id: Id, position: usize) -> Candidate {
        let fallback_number = u32::try_from(position + 1).unwrap_or(u32::MAX);
        Candidate {
            id: Id::new(),
            candidate: CandidateCore {
                election_id,
                name: self.name.trim().to_string(),
                number: self.number.unwrap_or(fallback_number),
                slate: self.slate,
                photo_url: self.photo_url.filter(|url| !url.is_empty()),
                description: self.description,
                goals: self.goals,
                vision: self.vision,
            },
        }
    }
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub name: String,
    pub number: u32,
    pub slate: Option<String>,
    pub photo_url: Option<String>,
    pub description: String,
    pub goals: String,
    pub vision: String,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        let core = candidate.candidate;
        Self {
            id: candidate.id.into(),
            election_id: core.election_id.into(),
            name: core.name,
            number: core.number,
            slate: core.slate,
            photo_url: core.photo_url,
            description: core.description,
            goals: core.goals,
            vision: core.vision,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_defaults_to_position() {
        let election_id = Id::new();
        let first = CandidateSpec::example("Alice").into_candidate(election_id, 0);
        let third = CandidateSpec::numbered("Carol", 7).into_candidate(election_id, 2);
        assert_eq!(first.number, 1);
        assert_eq!(third.number, 7);
        assert_eq!(first.election_id, election_id);
    }

    #[test]
    fn names_are_trimmed_and_blank_urls_dropped() {
        let spec = CandidateSpec {
            name: "  Dave ".to_string(),
            photo_url: Some(String::new()),
            ..Default::default()
        };
        assert!(!spec.is_blank());
        let candidate = spec.into_candidate(Id::new(), 0);
        assert_eq!(candidate.name, "Dave");
        assert_eq!(candidate.photo_url, None);
        assert!(CandidateSpec::example("   ").is_blank());
    }
}
