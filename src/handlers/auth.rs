use axum::extract::State;

use crate::{
    AppState,
    auth::{issue_token, verify_password},
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    models::{LoginRequest, LoginResponse},
    response::ApiResponse,
};

fn invalid_credentials() -> ApiError {
    ApiError::Unauthenticated("Invalid credentials".to_string())
}

/// login
///
/// [Public Route] Exchanges a username and password for a bearer token.
///
/// Unknown users, inactive users and wrong passwords all answer the same 401
/// so the response does not reveal which accounts exist. A successful login
/// bumps the account's `loginCount`.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let user = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .filter(|user| user.status)
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid_credentials());
    }

    let user = state
        .repo
        .record_login(user.id)
        .await?
        .ok_or_else(invalid_credentials)?;
    let token = issue_token(user.id, &state.config)?;

    tracing::info!(user_id = %user.id, login_count = user.login_count, "login succeeded");
    Ok(ApiResponse::ok(LoginResponse { token, user }))
}
