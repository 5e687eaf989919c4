use crate::{AppState, handlers::roles};
use axum::{Router, routing::get};

/// Role Router
///
/// Mounted at `/roles`. Reads are public, every write needs `admin`.
/// DELETE is the only hard delete in the API.
pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(roles::list_roles).post(roles::create_role))
        .route(
            "/{id}",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
}
