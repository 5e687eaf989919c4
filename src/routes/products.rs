use crate::{AppState, handlers::products};
use axum::{Router, routing::get};

/// Product Router
///
/// Mounted at `/products`.
/// - GET / accepts `name`, `price[$gte]` and `price[$lte]` query parameters.
/// - Create and update need `moderator`; delete needs `admin`.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/{id}",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
}
