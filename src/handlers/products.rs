use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extract::{ValidatedJson, parse_id},
    guard::{AdminOnly, Guarded, ModeratorOnly},
    models::{
        CreateProductRequest, NewProduct, Product, ProductListing, ProductQuery,
        UpdateProductRequest,
    },
    response::ApiResponse,
};

pub const DEFAULT_MIN_PRICE: f64 = 0.0;
pub const DEFAULT_MAX_PRICE: f64 = 10_000.0;

/// ProductFilter
///
/// Query parameters of `GET /products`. Bounds arrive as raw strings so that a
/// non-numeric value degrades to the default instead of rejecting the request.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Case-insensitive substring of the product name.
    pub name: Option<String>,
    /// Inclusive lower price bound (default 0).
    #[serde(rename = "price[$gte]")]
    pub price_gte: Option<String>,
    /// Inclusive upper price bound (default 10000).
    #[serde(rename = "price[$lte]")]
    pub price_lte: Option<String>,
}

/// Numeric coercion for a price bound. Unparseable, NaN and zero values all
/// fall back to `default`, so `price[$lte]=0` still means "up to 10000".
fn coerce_bound(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite() && *value != 0.0)
        .unwrap_or(default)
}

impl ProductFilter {
    pub fn into_query(self) -> ProductQuery {
        ProductQuery {
            name: self.name.filter(|name| !name.is_empty()),
            min_price: coerce_bound(self.price_gte.as_deref(), DEFAULT_MIN_PRICE),
            max_price: coerce_bound(self.price_lte.as_deref(), DEFAULT_MAX_PRICE),
        }
    }
}

/// list_products
///
/// [Public Route] Filtered product listing with each product's category joined
/// in. Soft-deleted products and products in soft-deleted categories are
/// still listed.
#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    params(ProductFilter),
    responses((status = 200, description = "Matching products", body = [ProductListing]))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> ApiResult<ApiResponse<Vec<ProductListing>>> {
    let products = state.repo.list_products(&filter.into_query()).await?;
    Ok(ApiResponse::ok(products))
}

/// get_product
///
/// [Public Route] Looks a product up by id; deleted products are still returned.
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Found", body = Product),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Product>> {
    let id = parse_id(&id, "Product")?;
    state
        .repo
        .get_product(id)
        .await?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found("Product"))
}

/// create_product
///
/// [Moderator Route] Creates a product under the category named in the body.
/// An unknown category name answers 404 and nothing is written.
#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Created", body = Product),
        (status = 404, description = "Category not found")
    )
)]
pub async fn create_product(
    Guarded(caller, _): Guarded<ModeratorOnly>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateProductRequest>,
) -> ApiResult<ApiResponse<Product>> {
    let product = state.repo.create_product(NewProduct::from(payload)).await?;
    tracing::info!(product_id = %product.id, by = %caller.id, "product created");
    Ok(ApiResponse::ok(product))
}

/// update_product
///
/// [Moderator Route] Applies the allow-listed fields (`name`, `price`,
/// `quantity`, `category`). A new `category` is given by name.
#[utoipa::path(
    put,
    path = "/products/{id}",
    tag = "products",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated", body = Product),
        (status = 400, description = "Field outside the allow-list"),
        (status = 404, description = "Product or category not found")
    )
)]
pub async fn update_product(
    Guarded(caller, _): Guarded<ModeratorOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateProductRequest>,
) -> ApiResult<ApiResponse<Product>> {
    let id = parse_id(&id, "Product")?;
    let product = state
        .repo
        .update_product(id, payload.into())
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    tracing::info!(product_id = %id, by = %caller.id, "product updated");
    Ok(ApiResponse::ok(product))
}

/// delete_product
///
/// [Admin Route] Soft delete via `isDeleted`.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "products",
    params(("id" = uuid::Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Soft deleted", body = Product),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_product(
    Guarded(caller, _): Guarded<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Product>> {
    let id = parse_id(&id, "Product")?;
    let product = state
        .repo
        .soft_delete_product(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    tracing::info!(product_id = %id, by = %caller.id, "product soft deleted");
    Ok(ApiResponse::ok(product))
}
