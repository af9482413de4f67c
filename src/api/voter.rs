use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::{AuthToken, Voter},
            history::{HistoryRecord, Summary},
            tally::LeaderboardEntry,
            vote::{BallotSpec, VoteReceipt},
        },
        mongodb::Id,
    },
    service::{BallotBox, HistoryLedger, TallyEngine},
};

pub fn routes() -> Vec<Route> {
    routes![cast_vote, results, my_votes, my_summary]
}

#[post("/elections/<election_id>/votes", data = "<ballot>", format = "json")]
async fn cast_vote(
    token: AuthToken<Voter>,
    election_id: Id,
    ballot: Json<BallotSpec>,
    ballots: BallotBox,
) -> Result<Json<VoteReceipt>> {
    let vote = ballots
        .cast(election_id, ballot.candidate_id.into(), token.id())
        .await?;
    Ok(Json(VoteReceipt::from(&vote)))
}

#[get("/elections/<election_id>/results")]
async fn results(
    token: AuthToken<Voter>,
    election_id: Id,
    tally: TallyEngine,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    let leaderboard = tally.published_results(election_id, token.id()).await?;
    Ok(Json(leaderboard))
}

#[get("/me/votes")]
async fn my_votes(
    token: AuthToken<Voter>,
    history: HistoryLedger,
) -> Result<Json<Vec<HistoryRecord>>> {
    Ok(Json(history.votes_for_voter(token.id()).await?))
}

#[get("/me/summary")]
async fn my_summary(token: AuthToken<Voter>, history: HistoryLedger) -> Result<Json<Summary>> {
    Ok(Json(history.summary(token.id()).await?))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::serde_json,
    };

    use crate::api::testing::{create_election, organizer, voter};
    use crate::model::{
        api::{election::ElectionSpec, history::HistoryPhase, id::ApiId, tally::LiveCount},
        common::election::ElectionStatus,
    };
    use crate::store::SharedStore;

    use super::*;

    async fn vote<'c>(
        client: &'c Client,
        election_id: Id,
        candidate_id: ApiId,
        voter_id: &str,
    ) -> LocalResponse<'c> {
        client
            .post(uri!(cast_vote(election_id)))
            .header(voter(voter_id))
            .header(ContentType::JSON)
            .body(serde_json::to_string(&BallotSpec { candidate_id }).unwrap())
            .dispatch()
            .await
    }

    async fn counts(client: &Client, election_id: Id) -> Vec<LiveCount> {
        let response = client
            .get(format!("/elections/{election_id}/counts"))
            .header(organizer())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        response.into_json().await.unwrap()
    }

    fn with_deadline() -> ElectionSpec {
        ElectionSpec {
            deadline: Some(Utc::now() + Duration::days(1)),
            ..ElectionSpec::example()
        }
    }

    #[backend_test]
    async fn three_voters_two_candidates(client: Client, store: SharedStore) {
        let election = create_election(&client, &with_deadline(), ElectionStatus::Live).await;
        let id: Id = election.id.into();
        let candidates = store.candidates(id).await.unwrap();
        let (alice, bob): (ApiId, ApiId) = (candidates[0].id.into(), candidates[1].id.into());

        for (voter_id, choice) in [("v1", alice), ("v2", alice), ("v3", bob)] {
            let response = vote(&client, id, choice, voter_id).await;
            assert_eq!(Status::Ok, response.status());
            let receipt: VoteReceipt = response.into_json().await.unwrap();
            assert_eq!(receipt.candidate_id, choice);
            assert_eq!(receipt.election_id, election.id);
        }

        let counts = counts(&client, id).await;
        assert_eq!(
            counts,
            vec![
                LiveCount {
                    candidate_id: alice,
                    vote_total: 2
                },
                LiveCount {
                    candidate_id: bob,
                    vote_total: 1
                },
            ]
        );
    }

    #[backend_test]
    async fn second_vote_is_rejected(client: Client, store: SharedStore) {
        let election = create_election(&client, &with_deadline(), ElectionStatus::Live).await;
        let id: Id = election.id.into();
        let candidates = store.candidates(id).await.unwrap();
        let alice: ApiId = candidates[0].id.into();
        let bob: ApiId = candidates[1].id.into();

        assert_eq!(Status::Ok, vote(&client, id, alice, "v1").await.status());
        for choice in [alice, bob] {
            let response = vote(&client, id, choice, "v1").await;
            assert_eq!(Status::Conflict, response.status());
            let body: serde_json::Value = response.into_json().await.unwrap();
            assert_eq!(body["error"], "duplicate_vote");
        }

        let counts = counts(&client, id).await;
        assert_eq!(counts[0].vote_total, 1);
        assert_eq!(counts[1].vote_total, 0);
    }

    #[backend_test]
    async fn publishing_reveals_results(client: Client, store: SharedStore) {
        let election = create_election(&client, &with_deadline(), ElectionStatus::Live).await;
        let id: Id = election.id.into();
        let candidates = store.candidates(id).await.unwrap();
        let bob: ApiId = candidates[1].id.into();
        assert_eq!(Status::Ok, vote(&client, id, bob, "v1").await.status());

        let response = client.get(uri!(my_votes)).header(voter("v1")).dispatch().await;
        let records: Vec<HistoryRecord> = response.into_json().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phase, HistoryPhase::Live);
        assert_eq!(records[0].candidate_name, "Bob");

        // Voters wait for publication. The owner may preview.
        let response = client.get(uri!(results(id))).header(voter("v1")).dispatch().await;
        assert_eq!(Status::Conflict, response.status());
        let response = client.get(uri!(results(id))).header(organizer()).dispatch().await;
        assert_eq!(Status::Ok, response.status());

        let response = client
            .post(format!("/elections/{id}/publish"))
            .header(organizer())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get(uri!(my_votes)).header(voter("v1")).dispatch().await;
        let records: Vec<HistoryRecord> = response.into_json().await.unwrap();
        assert_eq!(records[0].phase, HistoryPhase::Published);
        assert!(records[0].results_visible);

        let response = client.get(uri!(results(id))).header(voter("v1")).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let leaderboard: Vec<LeaderboardEntry> = response.into_json().await.unwrap();
        assert_eq!(leaderboard.len(), 2);
        assert_eq!(leaderboard[0].candidate_name, "Bob");
        assert_eq!(leaderboard[0].vote_total, 1);
        assert_eq!(leaderboard[1].vote_total, 0);
    }

    #[backend_test]
    async fn closed_election_refuses_ballots(client: Client, store: SharedStore) {
        let election = create_election(&client, &ElectionSpec::example(), ElectionStatus::Closed).await;
        let id: Id = election.id.into();
        let candidates = store.candidates(id).await.unwrap();

        let response = vote(&client, id, candidates[0].id.into(), "v1").await;
        assert_eq!(Status::Conflict, response.status());
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "state_conflict");

        assert!(store.votes_by_voter(&"v1".into()).await.unwrap().is_empty());
        assert!(counts(&client, id).await.iter().all(|c| c.vote_total == 0));
    }

    #[backend_test]
    async fn unknown_candidate_is_invalid(client: Client) {
        let election = create_election(&client, &ElectionSpec::example(), ElectionStatus::Live).await;
        let response = vote(&client, election.id.into(), ApiId::from(Id::new()), "v1").await;
        assert_eq!(Status::BadRequest, response.status());

        let response = vote(&client, Id::new(), ApiId::from(Id::new()), "v1").await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn summary_counts(client: Client, store: SharedStore) {
        let election = create_election(&client, &ElectionSpec::example(), ElectionStatus::Live).await;
        create_election(&client, &ElectionSpec::example_private(), ElectionStatus::Live).await;
        let id: Id = election.id.into();
        let candidates = store.candidates(id).await.unwrap();
        assert_eq!(
            Status::Ok,
            vote(&client, id, candidates[0].id.into(), "v1").await.status()
        );

        let response = client
            .get(uri!(my_summary))
            .header(voter("v1"))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let summary: Summary = response.into_json().await.unwrap();
        assert_eq!(
            summary,
            Summary {
                owned: 0,
                votes: 1,
                public_live: 1
            }
        );

        let response = client.get(uri!(my_summary)).header(organizer()).dispatch().await;
        let summary: Summary = response.into_json().await.unwrap();
        assert_eq!(summary.owned, 2);
        assert_eq!(summary.votes, 0);
    }
}
