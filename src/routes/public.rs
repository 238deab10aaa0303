use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Public Router Module
///
/// Endpoints that do not require a bearer token. Mounted under `/api`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /api/users
        // Registers an account. Validates the payload and hashes the password.
        .route("/users", post(handlers::register_user))
        // POST /api/auth/login
        // Exchanges username and password for a signed token.
        .route("/auth/login", post(handlers::login))
}
