use crate::{AppState, handlers::users};
use axum::{Router, routing::get};

/// User Router
///
/// Mounted at `/users`. Nothing here is public.
/// - Reads need `moderator` and only ever see active accounts.
/// - Writes need `admin`. DELETE deactivates rather than removes.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
}
