use crate::{AppState, handlers::categories};
use axum::{Router, routing::get};

/// Category Router
///
/// Mounted at `/categories`.
/// - Reads are public and not soft-delete aware.
/// - Create and rename need `moderator`; delete needs `admin`.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
}
