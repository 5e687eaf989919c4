use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::{
    AppState,
    auth::hash_password,
    error::{ApiError, ApiResult},
    extract::{ValidatedJson, parse_id},
    guard::{AdminOnly, Guarded, ModeratorOnly},
    models::{
        CreateUserRequest, NewUser, UpdateUserRequest, User, UserChanges, UserDetails, UserQuery,
    },
    response::ApiResponse,
};

/// UserFilter
///
/// Query parameters of `GET /users`. Login bounds that are not whole integers
/// are ignored, so `5abc` is dropped rather than read as 5.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    /// Case-insensitive substring of the username.
    pub username: Option<String>,
    /// Case-insensitive substring of the full name.
    pub full_name: Option<String>,
    /// Minimum login count (inclusive).
    pub min_login: Option<String>,
    /// Maximum login count (inclusive).
    pub max_login: Option<String>,
}

impl UserFilter {
    pub fn into_query(self) -> UserQuery {
        let parse = |raw: Option<String>| raw.and_then(|v| v.trim().parse::<i64>().ok());
        UserQuery {
            username: self.username.filter(|v| !v.is_empty()),
            full_name: self.full_name.filter(|v| !v.is_empty()),
            min_login: parse(self.min_login),
            max_login: parse(self.max_login),
        }
    }
}

/// list_users
///
/// [Moderator Route] Active users only, whatever the filter, each with its role
/// record joined in.
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(UserFilter),
    responses(
        (status = 200, description = "Active users", body = [UserDetails]),
        (status = 403, description = "Insufficient permission")
    )
)]
pub async fn list_users(
    Guarded(_caller, _): Guarded<ModeratorOnly>,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<ApiResponse<Vec<UserDetails>>> {
    let users = state.repo.list_users(&filter.into_query()).await?;
    Ok(ApiResponse::ok(users))
}

/// get_user
///
/// [Moderator Route] Looks up another user's account. Asking for one's own id
/// through this route is refused for every role; inactive accounts read as
/// missing.
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserDetails),
        (status = 403, description = "Own account or insufficient permission"),
        (status = 404, description = "Not Found or inactive")
    )
)]
pub async fn get_user(
    Guarded(caller, _): Guarded<ModeratorOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<UserDetails>> {
    let id = parse_id(&id, "User")?;
    if caller.id == id {
        return Err(ApiError::Forbidden(
            "You cannot view your own account.".to_string(),
        ));
    }

    match state.repo.get_user_details(id).await? {
        Some(details) if details.user.status => Ok(ApiResponse::ok(details)),
        _ => Err(ApiError::not_found("User")),
    }
}

/// create_user
///
/// [Admin Route] Creates an account. The password is stored as a bcrypt hash.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Created", body = User),
        (status = 400, description = "Validation failure"),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn create_user(
    Guarded(caller, _): Guarded<AdminOnly>,
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost)?;
    let user = state
        .repo
        .create_user(NewUser {
            username: payload.username,
            email: payload.email,
            password_hash,
            full_name: payload.full_name.unwrap_or_default(),
            avatar_url: payload.avatar_url.unwrap_or_default(),
            status: payload.status.unwrap_or(false),
            role: payload.role.unwrap_or_default(),
        })
        .await?;
    tracing::info!(user_id = %user.id, role = %user.role, by = %caller.id, "user created");
    Ok(ApiResponse::created(user))
}

/// update_user
///
/// [Admin Route] Applies the allow-listed account fields to an active user.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 400, description = "Field outside the allow-list"),
        (status = 404, description = "Not Found or inactive")
    )
)]
pub async fn update_user(
    Guarded(caller, _): Guarded<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    let id = parse_id(&id, "User")?;
    let password_hash = payload
        .password
        .as_deref()
        .map(|password| hash_password(password, state.config.bcrypt_cost))
        .transpose()?;

    let changes = UserChanges {
        username: payload.username,
        email: payload.email,
        password_hash,
        full_name: payload.full_name,
        avatar_url: payload.avatar_url,
        role: payload.role,
    };

    let user = state
        .repo
        .update_user(id, changes)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    tracing::info!(user_id = %id, by = %caller.id, "user updated");
    Ok(ApiResponse::ok(user))
}

/// delete_user
///
/// [Admin Route] Deactivates the account (`status = false`). Already inactive
/// accounts answer 404.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "users",
    params(("id" = uuid::Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User soft deleted"),
        (status = 404, description = "Not Found or inactive")
    )
)]
pub async fn delete_user(
    Guarded(caller, _): Guarded<AdminOnly>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    let id = parse_id(&id, "User")?;
    state
        .repo
        .deactivate_user(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    tracing::info!(user_id = %id, by = %caller.id, "user soft deleted");
    Ok(ApiResponse::message("User soft deleted"))
}
