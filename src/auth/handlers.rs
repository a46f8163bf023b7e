use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::ErrorCode;
use serde::Deserialize;
use serde_json::json;

use crate::auth::cookie::{clear_session_cookie, session_cookie};
use crate::auth::password;
use crate::auth::token::Identity;
use crate::db::models::{PublicUser, Role, User};
use crate::db::users::{self, NewUser};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, CurrentUser};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// -- Helpers --

fn requested_role(raw: Option<&str>, open_admin_registration: bool) -> AppResult<Role> {
    let role = match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => return Ok(Role::User),
        Some(r) => r
            .parse::<Role>()
            .map_err(|_| AppError::bad_request("Invalid role"))?,
    };

    match role {
        Role::User => Ok(Role::User),
        Role::Admin if open_admin_registration => Ok(Role::Admin),
        Role::Admin => Err(AppError::forbidden("Admin registration is disabled")),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Exactly one bcrypt verify runs whether or not the email matched a user.
/// The decoy hash never authenticates anyone.
fn check_credentials(user: Option<User>, plaintext: &str, decoy_hash: &str) -> Option<User> {
    let stored = user.as_ref().map_or(decoy_hash, |u| u.password_hash.as_str());
    let matches = password::verify(plaintext, stored);
    user.filter(|_| matches)
}

/// Sign a credential for `user` and attach it as the session cookie.
fn signed_in(state: &AppState, status: StatusCode, message: &str, user: User) -> AppResult<Response> {
    let token = state.tokens.issue(&Identity::from(&user))?;
    let cookie = session_cookie(&token, state.config.auth.cookie_secure);

    Ok((
        status,
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "message": message,
            "user": PublicUser::from(user),
        })),
    )
        .into_response())
}

// -- Handlers --

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<Response> {
    let username = req.username.trim();
    let email = req.email.trim();
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request(
            "Username, email and password are required",
        ));
    }
    let role = requested_role(req.role.as_deref(), state.config.auth.open_admin_registration)?;

    let user = {
        let conn = state.db.get()?;
        if users::exists_with_email_or_username(&conn, email, username)? {
            return Err(AppError::bad_request("User already exists"));
        }

        let hash = password::hash(&req.password, state.config.auth.bcrypt_cost)?;
        users::insert(
            &conn,
            NewUser {
                username,
                email,
                password_hash: &hash,
                role,
            },
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::bad_request("User already exists")
            } else {
                AppError::Database(e)
            }
        })?
    };

    tracing::info!("Registered {} ({}) as {}", user.username, user.id, user.role);
    signed_in(&state, StatusCode::CREATED, "User registered successfully", user)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Response> {
    let user = {
        let conn = state.db.get()?;
        users::find_by_email(&conn, req.email.trim())?
    };

    let user = check_credentials(user, &req.password, &state.decoy_hash)
        .ok_or_else(|| AppError::bad_request("Invalid email or password"))?;

    tracing::info!("{} signed in", user.username);
    signed_in(&state, StatusCode::OK, "Login successful", user)
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            clear_session_cookie(state.config.auth.cookie_secure),
        )],
        Json(json!({ "message": "Logged out successfully" })),
    )
        .into_response()
}

/// GET /api/auth/me
///
/// Re-reads the record so that a deleted account is reported even while
/// its token is still within its lifetime.
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let user = users::find_by_id(&conn, &identity.id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(Json(json!({ "user": PublicUser::from(user) })))
}
