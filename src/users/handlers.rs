use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{AuthResponse, LoginRequest, RegisterRequest};
use super::repo_types::{NewUser, User};
use crate::{
    auth::{password, AuthUser},
    db::StoreError,
    error::{ApiError, ApiJson, DUPLICATE_USER},
    state::AppState,
};

/// Same body for unknown email and wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/profile", get(profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let reg = payload.validate()?;

    if state
        .db
        .find_user_conflict(&reg.username, &reg.email)
        .await?
        .is_some()
    {
        warn!(username = %reg.username, email = %reg.email, "username or email already registered");
        return Err(ApiError::Conflict(DUPLICATE_USER.into()));
    }

    let password_hash = password::hash_password_blocking(reg.password).await?;

    // The unique constraints decide a race between two concurrent registrations.
    let user = match state
        .db
        .create_user(NewUser {
            username: reg.username,
            email: reg.email,
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(StoreError::Duplicate(constraint)) => {
            warn!(%constraint, "registration lost a uniqueness race");
            return Err(ApiError::Conflict(DUPLICATE_USER.into()));
        }
        Err(e) => return Err(e.into()),
    };

    let token = issue_token(&state, &user)?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(auth_response(user, token))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (email, plain) = payload.validate()?;

    let user = state.db.find_user_by_email(&email).await?;
    let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
    let ok = password::verify_password_blocking(plain, stored_hash).await?;

    let user = match user {
        Some(u) if ok => u,
        Some(u) => {
            warn!(user_id = %u.id, "login invalid password");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let token = issue_token(&state, &user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(auth_response(user, token)))
}

#[instrument(skip(state, caller))]
pub async fn profile(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<Json<User>, ApiError> {
    match state.db.find_user_by_id(caller.id).await? {
        Some(user) => Ok(Json(user)),
        None => {
            warn!(user_id = %caller.id, "token for missing user");
            Err(ApiError::not_found("User not found"))
        }
    }
}

fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    state
        .jwt
        .issue(user)
        .map_err(|e| ApiError::Internal(e.into()))
}

fn auth_response(user: User, token: String) -> AuthResponse {
    AuthResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        token,
    }
}
