use chrono::{DateTime, Utc};
use mongodb::{
    bson::{self, doc, Bson, DateTime as BsonDateTime, Document},
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    common::{
        election::{ElectionStatus, ShareCode, Visibility},
        user::UserId,
    },
    db::{
        candidate::Candidate,
        election::Election,
        vote::{Vote, VoteTotal},
    },
    mongodb::{ensure_indexes_exist, is_duplicate_key_error, Coll, Id},
};

use super::{ElectionUpdate, Insertion, Store, UpdateOutcome, VoteInsertion};

/// A store backed by MongoDB.
///
/// Multi-document steps run in transactions, so the deployment must be a
/// replica set or sharded cluster.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
}

impl MongoStore {
    /// Connect to the given database and make sure its indexes exist.
    pub async fn connect(uri: &str, db_name: &str) -> std::result::Result<Self, DbError> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        ensure_indexes_exist(&db).await?;
        Ok(Self::from_db(client, &db))
    }

    fn from_db(client: Client, db: &Database) -> Self {
        Self {
            client,
            elections: Coll::from_db(db),
            candidates: Coll::from_db(db),
            votes: Coll::from_db(db),
        }
    }

    async fn transaction(&self) -> Result<ClientSession> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(session)
    }
}

fn bson_datetime(datetime: DateTime<Utc>) -> Bson {
    Bson::DateTime(BsonDateTime::from_chrono(datetime))
}

/// The `$set` document for an election update.
fn update_document(update: &ElectionUpdate) -> Document {
    let mut set = Document::new();
    if let Some(title) = &update.title {
        set.insert("title", title.as_str());
    }
    if let Some(description) = &update.description {
        set.insert("description", description.as_str());
    }
    if let Some(banner_url) = &update.banner_url {
        set.insert(
            "banner_url",
            banner_url.as_deref().map_or(Bson::Null, Bson::from),
        );
    }
    if let Some(visibility) = update.visibility {
        set.insert("visibility", visibility);
    }
    if let Some(status) = update.status {
        set.insert("status", status);
    }
    if let Some(deadline) = update.deadline {
        set.insert("deadline", deadline.map_or(Bson::Null, bson_datetime));
    }
    if update.publish_results {
        set.insert("results_visible", true);
    }
    set
}

/// Matches the election only while it accepts ballots at `now`.
fn accepting_filter(election_id: Id, now: DateTime<Utc>) -> Document {
    doc! {
        "_id": election_id,
        "status": ElectionStatus::Live,
        "$or": [
            { "deadline": Bson::Null },
            { "deadline": { "$gt": bson_datetime(now) } },
        ],
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    fn backend(&self) -> &'static str {
        "MongoDB"
    }

    async fn insert_election(
        &self,
        election: &Election,
        candidates: &[Candidate],
    ) -> Result<Insertion> {
        let mut session = self.transaction().await?;

        match self
            .elections
            .insert_one_with_session(election, None, &mut session)
            .await
        {
            Ok(_) => {}
            // Dropping the session aborts the transaction.
            Err(err) if is_duplicate_key_error(&err) => return Ok(Insertion::Conflict),
            Err(err) => return Err(err.into()),
        }
        if !candidates.is_empty() {
            self.candidates
                .insert_many_with_session(candidates, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
        Ok(Insertion::Inserted)
    }

    async fn election(&self, id: Id) -> Result<Option<Election>> {
        Ok(self.elections.find_one(id.as_doc(), None).await?)
    }

    async fn election_by_code(&self, code: ShareCode) -> Result<Option<Election>> {
        Ok(self
            .elections
            .find_one(doc! { "share_code": code }, None)
            .await?)
    }

    async fn elections_by_owner(&self, owner: &UserId) -> Result<Vec<Election>> {
        Ok(self
            .elections
            .find(doc! { "owner_id": owner }, None)
            .await?
            .try_collect()
            .await?)
    }

    async fn public_elections(&self) -> Result<Vec<Election>> {
        Ok(self
            .elections
            .find(doc! { "visibility": Visibility::Public }, None)
            .await?
            .try_collect()
            .await?)
    }

    async fn update_election(&self, id: Id, update: &ElectionUpdate) -> Result<UpdateOutcome> {
        let mut filter = id.as_doc();
        if let Some(expected) = update.expected_status {
            filter.insert("status", expected);
        }

        let set = update_document(update);
        let updated = if set.is_empty() {
            self.elections.find_one(filter, None).await?
        } else {
            let options = FindOneAndUpdateOptions::builder()
                .return_document(ReturnDocument::After)
                .build();
            self.elections
                .find_one_and_update(filter, doc! { "$set": set }, options)
                .await?
        };

        Ok(match updated {
            Some(election) => UpdateOutcome::Updated(election),
            None => match self.election(id).await? {
                Some(_) => UpdateOutcome::StatusChanged,
                None => UpdateOutcome::Missing,
            },
        })
    }

    async fn delete_election(&self, id: Id) -> Result<bool> {
        let mut session = self.transaction().await?;

        let deleted = self
            .elections
            .delete_one_with_session(id.as_doc(), None, &mut session)
            .await?;
        if deleted.deleted_count == 0 {
            return Ok(false);
        }

        let filter = doc! { "election_id": id };
        self.candidates
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        let votes = self
            .votes
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        debug!(
            "Deleted election {id} along with {} votes",
            votes.deleted_count
        );
        Ok(true)
    }

    async fn insert_candidates(&self, election_id: Id, candidates: &[Candidate]) -> Result<bool> {
        let mut session = self.transaction().await?;

        if self
            .elections
            .find_one_with_session(election_id.as_doc(), None, &mut session)
            .await?
            .is_none()
        {
            return Ok(false);
        }
        if !candidates.is_empty() {
            self.candidates
                .insert_many_with_session(candidates, None, &mut session)
                .await?;
        }

        session.commit_transaction().await?;
        Ok(true)
    }

    async fn candidates(&self, election_id: Id) -> Result<Vec<Candidate>> {
        Ok(self
            .candidates
            .find(
                doc! { "election_id": election_id },
                FindOptions::builder()
                    .sort(doc! { "number": 1, "name": 1, "_id": 1 })
                    .build(),
            )
            .await?
            .try_collect()
            .await?)
    }

    async fn candidate(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.candidates.find_one(id.as_doc(), None).await?)
    }

    async fn insert_vote(&self, vote: &Vote) -> Result<VoteInsertion> {
        // Only the (election, voter) index entry is written besides the vote,
        // so votes from different voters never conflict.
        let accepting = self
            .elections
            .find_one(accepting_filter(vote.election_id, vote.created_at), None)
            .await?;
        if accepting.is_none() {
            return Ok(match self.election(vote.election_id).await? {
                Some(_) => VoteInsertion::NotAccepting,
                None => VoteInsertion::ElectionMissing,
            });
        }

        match self.votes.insert_one(vote, None).await {
            Ok(_) => {}
            Err(err) if is_duplicate_key_error(&err) => return Ok(VoteInsertion::Duplicate),
            Err(err) => return Err(err.into()),
        }

        // A cascade delete may have committed between the read and the insert.
        if self.election(vote.election_id).await?.is_none() {
            self.votes.delete_one(vote.id.as_doc(), None).await?;
            debug!("Removed vote {} cast into deleted election", vote.id);
            return Ok(VoteInsertion::ElectionMissing);
        }
        Ok(VoteInsertion::Recorded)
    }

    async fn vote_totals(&self, election_id: Id) -> Result<Vec<VoteTotal>> {
        let pipeline = [
            doc! { "$match": { "election_id": election_id } },
            doc! { "$group": { "_id": "$candidate_id", "vote_total": { "$sum": 1 } } },
        ];
        let groups: Vec<Document> = self
            .votes
            .aggregate(pipeline, None)
            .await?
            .try_collect()
            .await?;
        groups
            .into_iter()
            .map(|group| {
                bson::from_document(group).map_err(|err| {
                    Error::Storage(format!("Malformed vote total: {err}"))
                })
            })
            .collect()
    }

    async fn votes_by_voter(&self, voter: &UserId) -> Result<Vec<Vote>> {
        Ok(self
            .votes
            .find(doc! { "voter_id": voter }, None)
            .await?
            .try_collect()
            .await?)
    }
}
