use std::sync::Arc;

use chrono::Duration;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::store::{MemoryStore, MongoStore, SharedStore};

fn default_live_refresh_ms() -> u64 {
    4500
}

fn default_share_code_attempts() -> u32 {
    64
}

fn default_db_name() -> String {
    "ballots".to_string()
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // non-secrets
    #[serde(default = "default_live_refresh_ms")]
    live_refresh_ms: u64,
    #[serde(default)]
    strict_transitions: bool,
    #[serde(default = "default_share_code_attempts")]
    share_code_attempts: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Secret key used to verify JWTs issued by the identity provider.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Interval between refreshes of streamed live counts.
    pub fn live_refresh(&self) -> Duration {
        Duration::milliseconds(self.live_refresh_ms as i64)
    }

    /// Whether status changes must follow the lifecycle graph.
    pub fn strict_transitions(&self) -> bool {
        self.strict_transitions
    }

    /// How many random share codes to try before giving up on a create.
    pub fn share_code_attempts(&self) -> u32 {
        self.share_code_attempts.max(1)
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the store fairing and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the backing store.
#[derive(Deserialize)]
struct StoreConfig {
    // secrets
    db_uri: Option<String>,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
}

/// A fairing that loads the store config, connects to MongoDB if a `db_uri`
/// is configured, and places a [`SharedStore`] into managed state.
///
/// Without a `db_uri` all data lives in process memory and is lost on exit.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: SharedStore = match config.db_uri {
            Some(db_uri) => {
                info!("Loaded database config, connecting...");
                match MongoStore::connect(&db_uri, &config.db_name).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Arc::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
            None => {
                warn!("No `db_uri` configured, keeping all data in memory");
                MemoryStore::shared()
            }
        };

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl Config {
        pub fn example() -> Self {
            Self {
                live_refresh_ms: 20,
                strict_transitions: false,
                share_code_attempts: default_share_code_attempts(),
                jwt_secret: "test-secret".to_string(),
            }
        }

        pub fn strict() -> Self {
            Self {
                strict_transitions: true,
                ..Self::example()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn store_falls_back_to_memory_without_db_uri() {
        let rocket = rocket::custom(rocket::Config::default())
            .attach(StoreFairing)
            .ignite()
            .await
            .unwrap();
        let store = rocket.state::<SharedStore>().unwrap();
        assert_eq!(store.backend(), "in-memory");
    }
}
