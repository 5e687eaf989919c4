use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AdminSeed, AppConfig, Env},
    error::ApiError,
    models::{NewUser, User},
    permissions::PermissionLevel,
    repository::RepositoryState,
};

/// Claims
///
/// The payload carried inside every issued JSON Web Token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the user the token was issued to.
    pub sub: Uuid,
    /// Expiration Time (exp): seconds since the epoch after which the token is refused.
    pub exp: usize,
    /// Issued At (iat): seconds since the epoch when the token was issued.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. The role is read from the
/// stored user on every request, so a demotion takes effect immediately even
/// for tokens issued before it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: PermissionLevel,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id,
            role: user.role,
        }
    }
}

fn unauthenticated() -> ApiError {
    ApiError::Unauthenticated("Authentication required".to_string())
}

/// Loads the user behind an identity claim. Missing and inactive accounts are
/// both refused.
async fn resolve_active_user(repo: &RepositoryState, id: Uuid) -> Result<AuthUser, ApiError> {
    match repo.get_user(id).await? {
        Some(user) if user.status => Ok(AuthUser::from(&user)),
        _ => Err(unauthenticated()),
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local Bypass: in `Env::Local` an `x-user-id` header naming an active user
///    authenticates as that user.
/// 2. Token Validation: `Authorization: Bearer <jwt>`, signature and `exp` checked.
/// 3. DB Lookup: the subject must still exist and be active.
///
/// Rejection: `ApiError::Unauthenticated` (401) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|raw| Uuid::parse_str(raw).ok());
            if let Some(user_id) = bypass {
                if let Ok(user) = resolve_active_user(&repo, user_id).await {
                    return Ok(user);
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(unauthenticated)?;

        let claims = verify_token(token, &config.jwt_secret)?;
        resolve_active_user(&repo, claims.sub).await
    }
}

/// Decodes and validates a token, mapping every failure to 401.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Unauthenticated("Token expired".to_string()),
            _ => unauthenticated(),
        })
}

/// Signs a token for `user_id` valid for `config.jwt_ttl_seconds`.
pub fn issue_token(user_id: Uuid, config: &AppConfig) -> Result<String, ApiError> {
    let now = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + config.jwt_ttl_seconds as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Failed to sign token: {e}")))
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    bcrypt::hash(password, cost)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    bcrypt::verify(password, hash)
        .map_err(|e| ApiError::Internal(format!("Failed to verify password: {e}")))
}

/// seed_admin
///
/// Creates the bootstrap administrator unless an account with that username
/// already exists. Returns the created user, or `None` when nothing was written.
pub async fn seed_admin(
    repo: &RepositoryState,
    seed: &AdminSeed,
    cost: u32,
) -> Result<Option<User>, ApiError> {
    if repo.find_user_by_username(&seed.username).await?.is_some() {
        tracing::debug!(username = %seed.username, "admin seed already present");
        return Ok(None);
    }

    let user = repo
        .create_user(NewUser {
            username: seed.username.clone(),
            email: seed.email.clone(),
            password_hash: hash_password(&seed.password, cost)?,
            full_name: String::new(),
            avatar_url: String::new(),
            status: true,
            role: PermissionLevel::Admin,
        })
        .await?;
    tracing::info!(user_id = %user.id, username = %user.username, "admin account seeded");
    Ok(Some(user))
}
