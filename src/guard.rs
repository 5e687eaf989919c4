//! Route authorization as an explicit, ordered list of guards.
//!
//! Each protected route names a `Policy`; its `GUARDS` run front to back and
//! the first `Verdict::Reject` ends the request before the handler runs.

use std::marker::PhantomData;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    auth::AuthUser,
    config::AppConfig,
    error::ApiError,
    permissions::{ADMIN_PERMISSION, MOD_PERMISSION, PermissionLevel},
    repository::RepositoryState,
};

/// One step of a route's authorization chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guard {
    /// Resolve the caller's identity (401 on failure).
    Authenticate,
    /// Require the resolved identity to hold at least this level (403 otherwise).
    AtLeast(PermissionLevel),
}

/// Outcome of evaluating a single guard.
#[derive(Debug)]
pub enum Verdict {
    Continue,
    Reject(ApiError),
}

/// Checks a resolved identity against a permission guard.
pub fn authorize(caller: &AuthUser, required: PermissionLevel) -> Verdict {
    if caller.role.satisfies(required) {
        Verdict::Continue
    } else {
        Verdict::Reject(ApiError::Forbidden(format!(
            "Requires {required} permission"
        )))
    }
}

/// A named guard list attached to a route.
pub trait Policy: Send + Sync + 'static {
    const GUARDS: &'static [Guard];
}

/// Moderators and admins.
pub struct ModeratorOnly;

impl Policy for ModeratorOnly {
    const GUARDS: &'static [Guard] = &[Guard::Authenticate, Guard::AtLeast(MOD_PERMISSION)];
}

/// Admins only.
pub struct AdminOnly;

impl Policy for AdminOnly {
    const GUARDS: &'static [Guard] = &[Guard::Authenticate, Guard::AtLeast(ADMIN_PERMISSION)];
}

/// Guarded
///
/// Extractor that runs `P::GUARDS` in order and yields the authenticated caller.
pub struct Guarded<P: Policy>(pub AuthUser, pub PhantomData<P>);

impl<S, P> FromRequestParts<S> for Guarded<P>
where
    S: Send + Sync,
    P: Policy,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let mut caller: Option<AuthUser> = None;

        for guard in P::GUARDS {
            let verdict = match guard {
                Guard::Authenticate => match AuthUser::from_request_parts(parts, state).await {
                    Ok(user) => {
                        caller = Some(user);
                        Verdict::Continue
                    }
                    Err(rejection) => Verdict::Reject(rejection),
                },
                Guard::AtLeast(level) => match &caller {
                    Some(user) => authorize(user, *level),
                    None => Verdict::Reject(ApiError::Unauthenticated(
                        "Authentication required".to_string(),
                    )),
                },
            };

            if let Verdict::Reject(err) = verdict {
                tracing::debug!(?guard, "request rejected by guard");
                return Err(err);
            }
        }

        caller
            .map(|user| Guarded(user, PhantomData))
            .ok_or_else(|| ApiError::Unauthenticated("Authentication required".to_string()))
    }
}
