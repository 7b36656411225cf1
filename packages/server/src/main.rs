#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Entry point for the incident map API server.

#[actix_web::main]
async fn main() -> Result<(), incident_map_server::ServerError> {
    incident_map_server::run_server().await
}
