use crate::{AppState, handlers::auth};
use axum::{Router, routing::post};

/// Auth Router
///
/// Mounted at `/auth`. POST /login trades credentials for a bearer token.
pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(auth::login))
}
