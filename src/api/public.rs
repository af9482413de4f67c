use rocket::{serde::json::Json, Route};

use crate::error::Result;
use crate::model::{
    api::{
        auth::{AuthToken, Voter},
        candidate::CandidateDescription,
        election::ElectionDescription,
    },
    mongodb::Id,
};
use crate::service::{AccessCodeResolver, ElectionRegistry};

pub fn routes() -> Vec<Route> {
    routes![
        public_elections,
        election_by_code,
        election,
        election_candidates,
    ]
}

/// The public gallery.
#[get("/public/elections")]
async fn public_elections(
    _token: AuthToken<Voter>,
    registry: ElectionRegistry,
) -> Result<Json<Vec<ElectionDescription>>> {
    let elections = registry.list_public().await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[get("/codes/<code>")]
async fn election_by_code(
    _token: AuthToken<Voter>,
    code: &str,
    codes: AccessCodeResolver,
) -> Result<Json<ElectionDescription>> {
    let election = codes.resolve_str(code).await?;
    Ok(Json(election.into()))
}

#[get("/elections/<election_id>")]
async fn election(
    _token: AuthToken<Voter>,
    election_id: Id,
    registry: ElectionRegistry,
) -> Result<Json<ElectionDescription>> {
    Ok(Json(registry.get(election_id).await?.into()))
}

#[get("/elections/<election_id>/candidates")]
async fn election_candidates(
    _token: AuthToken<Voter>,
    election_id: Id,
    registry: ElectionRegistry,
) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = registry.list_candidates(election_id).await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}
