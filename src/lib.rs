#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

/// Build the server from `Rocket.toml` and the environment.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(LoggerFairing)
}

/// Build a server over the given store, with test configuration.
#[cfg(test)]
pub(crate) fn rocket_for_store(store: store::SharedStore) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "test-secret"))
        .merge(("live_refresh_ms", 20))
        .merge(("strict_transitions", false));
    rocket::custom(figment)
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(LoggerFairing)
        .manage(store)
}
