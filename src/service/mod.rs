//! The election components. Each is a cheap handle over the shared store and
//! can be pulled straight into a route as a request guard.

/// Implement `FromRequest` for a component with a `new(store, config)`
/// constructor.
macro_rules! component_guard {
    ($component:ty) => {
        #[rocket::async_trait]
        impl<'r> rocket::request::FromRequest<'r> for $component {
            type Error = crate::error::Error;

            async fn from_request(
                req: &'r rocket::Request<'_>,
            ) -> rocket::request::Outcome<Self, Self::Error> {
                crate::service::from_managed(req, |store, config| {
                    <$component>::new(store.clone(), config)
                })
            }
        }
    };
}
pub(crate) use component_guard;

mod access_code;
mod ballot_box;
mod history;
mod registry;
mod tally;

pub use access_code::AccessCodeResolver;
pub use ballot_box::BallotBox;
pub use history::HistoryLedger;
pub use registry::ElectionRegistry;
pub use tally::TallyEngine;

use rocket::{http::Status, request::Outcome, Request};

use crate::config::Config;
use crate::error::Error;
use crate::model::{common::user::UserId, db::election::Election, mongodb::Id};
use crate::store::SharedStore;

/// Build a component from managed state, failing the request if the store or
/// config fairings have not run.
fn from_managed<'r, T>(
    req: &'r Request<'_>,
    build: impl FnOnce(&SharedStore, &Config) -> T,
) -> Outcome<T, Error> {
    let rocket = req.rocket();
    match (rocket.state::<SharedStore>(), rocket.state::<Config>()) {
        (Some(store), Some(config)) => Outcome::Success(build(store, config)),
        _ => Outcome::Failure((
            Status::InternalServerError,
            Error::Storage("store or config is not loaded".to_string()),
        )),
    }
}

/// Fetch an election, mapping absence to `NotFound`.
async fn election(store: &SharedStore, id: Id) -> crate::error::Result<Election> {
    store
        .election(id)
        .await?
        .ok_or_else(|| Error::election_not_found(id))
}

/// What an owner-only call does with an election.
#[derive(Debug, Clone, Copy)]
enum Access {
    View,
    Modify,
}

impl Access {
    fn verb(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Modify => "modify",
        }
    }
}

/// Fetch an election that `user` owns.
async fn owned_election(
    store: &SharedStore,
    id: Id,
    user: &UserId,
    access: Access,
) -> crate::error::Result<Election> {
    let election = election(store, id).await?;
    if !election.is_owned_by(user) {
        let verb = access.verb();
        warn!("User {user} tried to {verb} election {id} which they do not own");
        return Err(Error::PermissionDenied(format!(
            "Only the owner may {verb} election {id}"
        )));
    }
    Ok(election)
}
