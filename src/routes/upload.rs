use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::middleware;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::auth::middleware::require_user;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::images::ImageUpload;
use crate::state::AppState;

/// Multipart framing on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/upload/image", post(upload_image))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user))
        .layer(DefaultBodyLimit::max(
            state.config.images.max_bytes + MULTIPART_OVERHEAD,
        ))
}

async fn upload_image(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        upload = Some(ImageUpload {
            file_name,
            content_type,
            bytes,
        });
        break;
    }

    let upload = upload.ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    let kind = upload.validate(state.config.images.max_bytes)?;

    tracing::info!(
        "{} uploading {} ({} bytes) via {}",
        user.username,
        upload.file_name,
        upload.bytes.len(),
        state.images.name()
    );
    let url = state.images.store(upload, kind).await?;

    Ok(Json(json!({
        "url": url,
        "message": "Image uploaded successfully",
    })))
}
