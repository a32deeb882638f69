//! Users API routes
//!
//! Wires the users domain to HTTP routes and the MongoDB store.

use axum::Router;
use axum_helpers::JwtAuth;
use domain_users::{handlers, MongoUserRepository, UserService};
use tracing::info;

use crate::state::AppState;

/// Create the users router
pub fn router(state: &AppState) -> Router {
    // Create the MongoDB repository
    let repository = MongoUserRepository::new(state.db.clone());

    // The token issuer shares the process-wide signing secret
    let jwt = JwtAuth::new(&state.config.jwt);

    // Create the service
    let service = UserService::new(repository, jwt);

    // Return the domain's router
    handlers::router(service)
}

/// Initialize user indexes in MongoDB
///
/// The unique email index is the authoritative duplicate-email
/// enforcement, so it must exist before the API takes traffic.
pub async fn init_indexes(db: &mongodb::Database) -> eyre::Result<()> {
    let repository = MongoUserRepository::new(db.clone());
    repository
        .create_indexes()
        .await
        .map_err(|e| eyre::eyre!("Failed to create user indexes: {}", e))?;
    info!("User collection indexes created");
    Ok(())
}
