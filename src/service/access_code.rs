use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{common::election::ShareCode, db::election::Election};
use crate::store::SharedStore;

use super::component_guard;

/// Issues and resolves the six digit share codes voters use to find
/// private elections.
#[derive(Clone)]
pub struct AccessCodeResolver {
    store: SharedStore,
    attempts: u32,
}

component_guard!(AccessCodeResolver);

impl AccessCodeResolver {
    pub fn new(store: SharedStore, config: &Config) -> Self {
        Self {
            store,
            attempts: config.share_code_attempts(),
        }
    }

    /// Draw random codes until one is not held by any existing election.
    ///
    /// The code is only reserved once an election holding it is inserted, so
    /// callers must still handle a conflict on insert.
    pub async fn generate_code(&self) -> Result<ShareCode> {
        for _ in 0..self.attempts {
            let code = ShareCode::random(&mut rand::thread_rng());
            if self.store.election_by_code(code).await?.is_none() {
                return Ok(code);
            }
            debug!("Share code {code} is taken, drawing another");
        }
        error!("No free share code after {} attempts", self.attempts);
        Err(Error::Storage(
            "could not allocate a unique share code".to_string(),
        ))
    }

    /// The election currently holding `code`.
    pub async fn resolve(&self, code: ShareCode) -> Result<Election> {
        self.store
            .election_by_code(code)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election with code {code}")))
    }

    /// Parse a code as typed by a voter and resolve it.
    pub async fn resolve_str(&self, code: &str) -> Result<Election> {
        let code = code
            .parse::<ShareCode>()
            .map_err(|e| Error::Validation(e.to_string()))?;
        self.resolve(code).await
    }
}

#[cfg(test)]
mod tests {
    use crate::model::common::election::ElectionStatus;
    use crate::store::MemoryStore;

    use super::*;

    fn resolver(store: &SharedStore) -> AccessCodeResolver {
        AccessCodeResolver::new(store.clone(), &Config::example())
    }

    #[rocket::async_test]
    async fn unknown_code_is_not_found() {
        let store = MemoryStore::shared();
        let codes = resolver(&store);
        assert!(matches!(
            codes.resolve_str("000042").await,
            Err(Error::NotFound(_))
        ));
    }

    #[rocket::async_test]
    async fn malformed_code_is_invalid() {
        let store = MemoryStore::shared();
        let codes = resolver(&store);
        for code in ["42", "1234567", "12a456", ""] {
            assert!(matches!(
                codes.resolve_str(code).await,
                Err(Error::Validation(_))
            ));
        }
    }

    #[rocket::async_test]
    async fn resolves_zero_padded_codes() {
        let store = MemoryStore::shared();
        let mut election = Election::example("org", ElectionStatus::Live);
        election.share_code = ShareCode::try_from(42).unwrap();
        store.insert_election(&election, &[]).await.unwrap();

        let found = resolver(&store).resolve_str("000042").await.unwrap();
        assert_eq!(found.id, election.id);
    }

    #[rocket::async_test]
    async fn generated_codes_avoid_held_codes() {
        let store = MemoryStore::shared();
        let codes = resolver(&store);
        let election = Election::example("org", ElectionStatus::Draft);
        store.insert_election(&election, &[]).await.unwrap();
        for _ in 0..100 {
            let code = codes.generate_code().await.unwrap();
            assert_ne!(code, election.share_code);
            assert_eq!(code.to_string().len(), 6);
        }
    }
}
