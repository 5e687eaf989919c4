use axum::extract::{Path, State};

use crate::{
    AppState,
    error::{ApiError, ApiResult},
    extract::{ValidatedJson, parse_id},
    guard::{AdminOnly, Guarded},
    models::{CreateRoleRequest, NewRole, Role, UpdateRoleRequest},
    response::ApiResponse,
};

/// list_roles
///
/// [Public Route] All role records.
#[utoipa::path(
    get,
    path = "/roles",
    tag = "roles",
    responses((status = 200, description = "All roles", body = [Role]))
)]
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<ApiResponse<Vec<Role>>> {
    Ok(ApiResponse::ok(state.repo.list_roles().await?))
}

#[utoipa::path(
    get,
    path = "/roles/{id}",
    tag = "roles",
    params(("id" = uuid::Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Found", body = Role),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Role>> {
    let id = parse_id(&id, "Role")?;
    state
        .repo
        .get_role(id)
        .await?
        .map(ApiResponse::ok)
        .ok_or_else(|| ApiError::not_found("Role"))
}

/// create_role
///
/// [Admin Route] Creates a role. A taken name answers 409 before any write;
/// the store's unique constraint covers the race between check and insert.
#[utoipa::path(
    post,
    path = "/roles",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Created", body = Role),
        (status = 409, description = "Role already exists")
    )
)]
pub async fn create_role(
    Guarded(caller, _): Guarded<AdminOnly>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateRoleRequest>,
) -> ApiResult<ApiResponse<Role>> {
    if state.repo.find_role_by_name(&payload.name).await?.is_some() {
        return Err(ApiError::Conflict("Role already exists".to_string()));
    }

    let role = state
        .repo
        .create_role(NewRole {
            name: payload.name,
            description: payload.description.unwrap_or_default(),
        })
        .await?;
    tracing::info!(role_id = %role.id, name = %role.name, by = %caller.id, "role created");
    Ok(ApiResponse::created(role))
}

/// update_role
///
/// [Admin Route] Partial update: only non-empty provided fields change.
#[utoipa::path(
    put,
    path = "/roles/{id}",
    tag = "roles",
    params(("id" = uuid::Uuid, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated", body = Role),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_role(
    Guarded(caller, _): Guarded<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateRoleRequest>,
) -> ApiResult<ApiResponse<Role>> {
    let id = parse_id(&id, "Role")?;
    let role = state
        .repo
        .update_role(id, payload.into())
        .await?
        .ok_or_else(|| ApiError::not_found("Role"))?;
    tracing::info!(role_id = %id, by = %caller.id, "role updated");
    Ok(ApiResponse::ok(role))
}

/// delete_role
///
/// [Admin Route] Hard delete. Roles are the only records removed for good.
#[utoipa::path(
    delete,
    path = "/roles/{id}",
    tag = "roles",
    params(("id" = uuid::Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_role(
    Guarded(caller, _): Guarded<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    let id = parse_id(&id, "Role")?;
    if !state.repo.delete_role(id).await? {
        return Err(ApiError::not_found("Role"));
    }
    tracing::info!(role_id = %id, by = %caller.id, "role deleted");
    Ok(ApiResponse::message("Role deleted"))
}
