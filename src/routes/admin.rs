use axum::extract::{Path, State};
use axum::middleware;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::auth::middleware::require_admin;
use crate::auth::policy::{self, Action};
use crate::db::models::PublicUser;
use crate::db::posts::{self, AuthorDetail};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;

/// Every admin route sits behind both gates. The middleware is the only
/// role check and rejects before any handler or query runs; handlers read
/// the identity it attached.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/posts", get(list_posts))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let users: Vec<PublicUser> = users::list_all(&conn)?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(Json(json!({ "users": users })))
}

async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let target = users::find_by_id(&conn, &id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    policy::authorize(
        &admin,
        Action::DeleteUser {
            target_role: target.role,
        },
    )?;

    users::delete(&conn, &id)?;
    tracing::info!("{} deleted user {} ({})", admin.username, target.username, id);
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let posts = posts::list_all(&conn, AuthorDetail::Full)?;
    Ok(Json(json!({ "posts": posts })))
}
