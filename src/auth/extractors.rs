use std::marker::PhantomData;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::{error, warn};

use super::{claims::Role, cookie::{get_cookie, SESSION_COOKIE_NAME}, repo_types::User};
use crate::{error::ApiError, state::AppState};

/// Resolves the session cookie to a stored user.
///
/// no cookie -> 403; token fails verification -> 403; user gone -> 403.
/// The store is only read.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = get_cookie(&parts.headers, SESSION_COOKIE_NAME)
            .ok_or_else(|| ApiError::unauthorized("Not authorized, please log in first."))?;

        let claims = state.jwt.verify(token).map_err(|e| {
            warn!(error = %e, "session token rejected");
            ApiError::unauthorized("Invalid or expired token.")
        })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %claims.sub, "session user lookup failed");
                ApiError::from(e)
            })?
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "session user no longer exists");
                ApiError::unauthorized("User not found.")
            })?;

        Ok(CurrentUser(user))
    }
}

/// Exact-membership role check. No hierarchy: `admin` does not satisfy a
/// `merchant`-only gate.
pub fn authorize(user: Option<&User>, allowed: &[Role]) -> Result<(), ApiError> {
    match user {
        None => Err(ApiError::unauthorized("Not authorized, please log in first.")),
        Some(u) if allowed.contains(&u.role) => Ok(()),
        Some(u) => {
            warn!(user_id = %u.id, role = %u.role, "role not allowed");
            Err(ApiError::unauthorized(format!("Access denied. Role '{}' is not allowed.", u.role)))
        }
    }
}

/// A set of roles allowed through an `Authorized` gate.
pub trait RoleSet: Send + Sync + 'static {
    const ALLOWED: &'static [Role];
}

pub struct Admin;

impl RoleSet for Admin {
    const ALLOWED: &'static [Role] = &[Role::Admin];
}

/// `CurrentUser` whose role is in `R::ALLOWED`.
pub struct Authorized<R: RoleSet> {
    pub user: User,
    _roles: PhantomData<R>,
}

#[async_trait]
impl<R: RoleSet> FromRequestParts<AppState> for Authorized<R> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        authorize(Some(&user), R::ALLOWED)?;
        Ok(Self {
            user,
            _roles: PhantomData,
        })
    }
}
