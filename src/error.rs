use jsonwebtoken::errors::Error as JwtError;
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::Responder,
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::{common::user::UserId, mongodb::Id};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input. Resubmitting unchanged will fail again.
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// The operation is illegal for the election's current status or deadline.
    #[error("State conflict: {0}")]
    StateConflict(String),
    #[error("Voter {voter_id} has already voted in election {election_id}")]
    DuplicateVote { election_id: Id, voter_id: UserId },
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    /// Transient backing-store failure; the caller may retry with backoff.
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn election_not_found(id: Id) -> Self {
        Self::NotFound(format!("Election {id}"))
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) => Status::BadRequest,
            Self::NotFound(_) => Status::NotFound,
            Self::PermissionDenied(_) => Status::Forbidden,
            Self::StateConflict(_) | Self::DuplicateVote { .. } => Status::Conflict,
            Self::Unauthorized(_) | Self::Jwt(_) => Status::Unauthorized,
            Self::Db(_) | Self::Storage(_) => Status::ServiceUnavailable,
        }
    }

    /// Stable machine-readable name for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::PermissionDenied(_) => "permission_denied",
            Self::StateConflict(_) => "state_conflict",
            Self::DuplicateVote { .. } => "duplicate_vote",
            Self::Unauthorized(_) | Self::Jwt(_) => "unauthorized",
            Self::Db(_) | Self::Storage(_) => "storage_failure",
        }
    }
}

/// JSON body sent alongside any error status.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{self}"),
            _ => debug!("{self}"),
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).respond_to(req)
    }
}
