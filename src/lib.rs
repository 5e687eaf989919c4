use axum::{Router, extract::FromRef, http::HeaderName, routing::get};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity, authorization and request plumbing.
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod guard;
pub mod permissions;
pub mod response;

// Domain and persistence.
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repository;

// One router per resource.
pub mod routes;
use routes::{auth as auth_routes, categories, products, roles, users};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, RepoError};
pub use memory::InMemoryRepository;
pub use permissions::PermissionLevel;
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// The OpenAPI document, aggregated from every `#[utoipa::path]` handler and
/// `ToSchema` model. Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::create_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::products::list_products, handlers::products::get_product,
        handlers::products::create_product, handlers::products::update_product,
        handlers::products::delete_product,
        handlers::roles::list_roles, handlers::roles::get_role, handlers::roles::create_role,
        handlers::roles::update_role, handlers::roles::delete_role,
        handlers::users::list_users, handlers::users::get_user, handlers::users::create_user,
        handlers::users::update_user, handlers::users::delete_user,
        handlers::auth::login
    ),
    components(
        schemas(
            models::Category, models::Product, models::CategoryRef, models::ProductListing,
            models::Role, models::User, models::UserDetails, permissions::PermissionLevel,
            models::CreateCategoryRequest, models::UpdateCategoryRequest,
            models::CreateProductRequest, models::UpdateProductRequest,
            models::CreateRoleRequest, models::UpdateRoleRequest,
            models::CreateUserRequest, models::UpdateUserRequest,
            models::LoginRequest, models::LoginResponse,
        )
    ),
    tags(
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Catalog products"),
        (name = "roles", description = "Role records"),
        (name = "users", description = "User accounts"),
        (name = "auth", description = "Token issuance")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, immutable container for the store and the configuration, cloned
/// into every request.
#[derive(Clone)]
pub struct AppState {
    /// Any `Repository` implementation: Postgres in production, in-memory locally and in tests.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Mounts the resource routers, the Swagger UI and `/health`, then wraps the
/// whole tree in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(|| async { "ok" }))
        .nest("/auth", auth_routes::auth_routes())
        .nest("/categories", categories::category_routes())
        .nest("/products", products::product_routes())
        .nest("/roles", roles::role_routes())
        .nest("/users", users::user_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for `TraceLayer`, tagging it with the
/// request id so every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
