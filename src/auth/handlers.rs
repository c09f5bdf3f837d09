use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        claims::Role,
        cookie::{cleared_cookie, session_cookie},
        dto::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest},
        extractors::CurrentUser,
        password::{hash_password, verify_password},
        repo_types::{NewUser, User},
    },
    error::ApiError,
    response::{ApiJson, Envelope},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(get_me).put(update_me))
        .route("/auth/password", put(change_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<Envelope<User>, ApiError> {
    let reg = payload.validate()?;

    // Only email is pre-checked; username collisions come back from the
    // unique index as a generic duplicate error.
    if state.users.find_by_email(&reg.email).await?.is_some() {
        warn!(email = %reg.email, "email already registered");
        return Err(ApiError::DuplicateEmail);
    }

    let password = hash_password(&reg.password)?;
    let user = state
        .users
        .create(NewUser {
            full_name: reg.full_name,
            username: reg.username,
            email: reg.email,
            phone: reg.phone,
            password,
            role: Role::User,
            is_active: true,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "create user failed");
            ApiError::from(e)
        })?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(Envelope::ok(user, "Registration successful"))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let creds = payload.validate()?;

    // Inactive accounts are filtered by the lookup itself and get the same
    // answer as unknown ones.
    let user = match state.users.find_active_by_identifier(&creds.identifier).await? {
        Some(u) => u,
        None => {
            warn!(identifier = %creds.identifier, "login unknown or inactive user");
            return Err(ApiError::unauthorized("User not found"));
        }
    };

    if !verify_password(&creds.password, &user.secret())? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::unauthorized("Password not match"));
    }

    let token = state.jwt.issue(user.id, user.role)?;
    let cookie = session_cookie(
        &token,
        state.config.jwt.cookie_expire_days,
        state.config.production,
        OffsetDateTime::now_utc(),
    );

    info!(user_id = %user.id, role = %user.role, "user logged in");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Envelope::ok(user, "Login successful"),
    ))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, cleared_cookie(state.config.production))],
        Envelope::ok((), "Logged out"),
    )
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Envelope<User> {
    Envelope::ok(user, "Success get user profile")
}

#[instrument(skip_all)]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Envelope<User>, ApiError> {
    let changes = payload.validate()?;
    let updated = state
        .users
        .update_profile(user.id, changes)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User not found."))?;
    info!(user_id = %updated.id, "profile updated");
    Ok(Envelope::ok(updated, "Profile updated"))
}

#[instrument(skip_all)]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Envelope<()>, ApiError> {
    let change = payload.validate()?;

    if !verify_password(&change.current_password, &user.secret())? {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(ApiError::unauthorized("Password not match"));
    }

    let hashed = hash_password(&change.new_password)?;
    if !state.users.update_password(user.id, &hashed).await? {
        return Err(ApiError::unauthorized("User not found."));
    }

    info!(user_id = %user.id, "password changed");
    Ok(Envelope::ok((), "Password updated"))
}
