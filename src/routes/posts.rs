use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::policy::{self, Action};
use crate::db::posts::{self, AuthorDetail, NewPost};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, CurrentUser};
use crate::state::AppState;

const MAX_TITLE_CHARS: usize = 200;

// --- Forms ---

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/my-posts", get(my_posts))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
}

// --- Handlers ---

async fn list_posts(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let posts = posts::list_all(&conn, AuthorDetail::Public)?;
    Ok(Json(json!({ "posts": posts })))
}

async fn my_posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let posts = posts::list_by_author(&conn, &user.id)?;
    Ok(Json(json!({ "posts": posts })))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let post = posts::find(&conn, &id)?.ok_or_else(|| AppError::not_found("Post not found"))?;
    Ok(Json(json!({ "post": post })))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<PostInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let title = non_empty(input.title.as_deref());
    let content = non_empty(input.content.as_deref());
    let (Some(title), Some(content)) = (title, content) else {
        return Err(AppError::bad_request("Title and content are required"));
    };
    check_title(title)?;
    let image = input.image.as_deref().map(str::trim).unwrap_or("");

    let conn = state.db.get()?;
    // The token may outlive its account.
    if users::find_by_id(&conn, &user.id)?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let id = posts::insert(
        &conn,
        NewPost {
            author_id: &user.id,
            title,
            content,
            image,
        },
    )?;
    let post = posts::find(&conn, &id)?
        .ok_or_else(|| AppError::Internal(format!("post {id} vanished after insert")))?;

    tracing::info!("{} created post {}", user.username, id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Post created successfully", "post": post })),
    ))
}

async fn update_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<PostInput>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let existing = posts::find(&conn, &id)?.ok_or_else(|| AppError::not_found("Post not found"))?;
    policy::authorize(
        &user,
        Action::EditPost {
            author_id: &existing.author.id,
        },
    )?;

    // Missing or blank fields keep their current value.
    let title = non_empty(input.title.as_deref()).unwrap_or(existing.title.as_str());
    let content = non_empty(input.content.as_deref()).unwrap_or(existing.content.as_str());
    let image = non_empty(input.image.as_deref()).unwrap_or(existing.image.as_str());
    check_title(title)?;

    if !posts::update(&conn, &id, title, content, image)? {
        return Err(AppError::not_found("Post not found"));
    }
    let post = posts::find(&conn, &id)?.ok_or_else(|| AppError::not_found("Post not found"))?;

    Ok(Json(json!({ "message": "Post updated successfully", "post": post })))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let author_id =
        posts::author_of(&conn, &id)?.ok_or_else(|| AppError::not_found("Post not found"))?;
    policy::authorize(
        &user,
        Action::DeletePost {
            author_id: &author_id,
        },
    )?;

    posts::delete(&conn, &id)?;
    tracing::info!("{} deleted post {}", user.username, id);
    Ok(Json(json!({ "message": "Post deleted successfully" })))
}

// --- Validation helpers ---

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn check_title(title: &str) -> AppResult<()> {
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::bad_request(format!(
            "Title must be {MAX_TITLE_CHARS} characters or less"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_trims_and_filters() {
        assert_eq!(non_empty(Some("  hi ")), Some("hi"));
        assert_eq!(non_empty(Some("   ")), None);
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn title_length_is_bounded() {
        assert!(check_title(&"x".repeat(MAX_TITLE_CHARS)).is_ok());
        assert!(check_title(&"x".repeat(MAX_TITLE_CHARS + 1)).is_err());
    }
}
