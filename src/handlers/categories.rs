use axum::extract::{Path, State};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extract::{ValidatedJson, parse_id},
    guard::{AdminOnly, Guarded, ModeratorOnly},
    models::{Category, CreateCategoryRequest, UpdateCategoryRequest},
    response::ApiResponse,
};

/// list_categories
///
/// [Public Route] Every category, soft-deleted ones included. Callers that only
/// want live categories must filter on `isDeleted` themselves.
#[utoipa::path(
    get,
    path = "/categories",
    tag = "categories",
    responses((status = 200, description = "All categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<Category>>> {
    let categories = state.repo.list_categories().await?;
    Ok(ApiResponse::ok(categories))
}

/// get_category
///
/// [Public Route] Looks a category up by id. Not soft-delete aware: a deleted
/// category is still returned, with `isDeleted: true`.
#[utoipa::path(
    get,
    path = "/categories/{id}",
    tag = "categories",
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Category>> {
    let id = parse_id(&id, "Category")?;
    state
        .repo
        .get_category(id)
        .await?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found("Category"))
}

/// create_category
///
/// [Moderator Route] Creates a category. Answers 200 rather than 201, matching
/// the product route.
#[utoipa::path(
    post,
    path = "/categories",
    tag = "categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Created", body = Category),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn create_category(
    Guarded(caller, _): Guarded<ModeratorOnly>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> ApiResult<ApiResponse<Category>> {
    let category = state.repo.create_category(payload.name).await?;
    tracing::info!(category_id = %category.id, by = %caller.id, "category created");
    Ok(ApiResponse::ok(category))
}

/// update_category
///
/// [Moderator Route] Renames a category.
#[utoipa::path(
    put,
    path = "/categories/{id}",
    tag = "categories",
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    Guarded(caller, _): Guarded<ModeratorOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> ApiResult<ApiResponse<Category>> {
    let id = parse_id(&id, "Category")?;
    let category = state
        .repo
        .rename_category(id, payload.name)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;
    tracing::info!(category_id = %id, by = %caller.id, "category renamed");
    Ok(ApiResponse::ok(category))
}

/// delete_category
///
/// [Admin Route] Soft delete: raises `isDeleted` and returns the record.
/// Products referencing the category are left untouched.
#[utoipa::path(
    delete,
    path = "/categories/{id}",
    tag = "categories",
    params(("id" = uuid::Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Soft deleted", body = Category),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    Guarded(caller, _): Guarded<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Category>> {
    let id = parse_id(&id, "Category")?;
    let category = state
        .repo
        .soft_delete_category(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category"))?;
    tracing::info!(category_id = %id, by = %caller.id, "category soft deleted");
    Ok(ApiResponse::ok(category))
}
