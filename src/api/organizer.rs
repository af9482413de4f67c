use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::{AuthToken, Organizer},
            candidate::{CandidateDescription, CandidateSpec},
            election::{ElectionDescription, ElectionPatch, ElectionSpec},
            tally::LiveCount,
        },
        mongodb::Id,
    },
    service::{ElectionRegistry, TallyEngine},
};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        owned_elections,
        modify_election,
        delete_election,
        add_candidates,
        publish_results,
        live_counts,
    ]
}

#[post("/elections", data = "<spec>", format = "json")]
async fn create_election(
    token: AuthToken<Organizer>,
    spec: Json<ElectionSpec>,
    registry: ElectionRegistry,
) -> Result<Json<ElectionDescription>> {
    let election = registry.create(token.id(), spec.0).await?;
    Ok(Json(election.into()))
}

#[get("/organizer/elections")]
async fn owned_elections(
    token: AuthToken<Organizer>,
    registry: ElectionRegistry,
) -> Result<Json<Vec<ElectionDescription>>> {
    let elections = registry.list_by_owner(token.id()).await?;
    Ok(Json(elections.into_iter().map(Into::into).collect()))
}

#[patch("/elections/<election_id>", data = "<patch>", format = "json")]
async fn modify_election(
    token: AuthToken<Organizer>,
    election_id: Id,
    patch: Json<ElectionPatch>,
    registry: ElectionRegistry,
) -> Result<Json<ElectionDescription>> {
    let election = registry.update(election_id, token.id(), patch.0).await?;
    Ok(Json(election.into()))
}

#[delete("/elections/<election_id>")]
async fn delete_election(
    token: AuthToken<Organizer>,
    election_id: Id,
    registry: ElectionRegistry,
) -> Result<()> {
    registry.delete(election_id, token.id()).await
}

#[post("/elections/<election_id>/candidates", data = "<candidates>", format = "json")]
async fn add_candidates(
    token: AuthToken<Organizer>,
    election_id: Id,
    candidates: Json<Vec<CandidateSpec>>,
    registry: ElectionRegistry,
) -> Result<Json<Vec<CandidateDescription>>> {
    let candidates = registry
        .create_candidates(election_id, token.id(), candidates.0)
        .await?;
    Ok(Json(candidates.into_iter().map(Into::into).collect()))
}

#[post("/elections/<election_id>/publish")]
async fn publish_results(
    token: AuthToken<Organizer>,
    election_id: Id,
    tally: TallyEngine,
) -> Result<Json<ElectionDescription>> {
    let election = tally.publish_results(election_id, token.id()).await?;
    Ok(Json(election.into()))
}

#[get("/elections/<election_id>/counts")]
async fn live_counts(
    token: AuthToken<Organizer>,
    election_id: Id,
    tally: TallyEngine,
) -> Result<Json<Vec<LiveCount>>> {
    let counts = tally.owner_live_counts(election_id, token.id()).await?;
    Ok(Json(counts))
}
