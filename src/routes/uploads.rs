use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::images::local::is_safe_file_name;
use crate::state::AppState;

/// GET /uploads/{file}: images stored by the local provider.
pub async fn serve(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    if !is_safe_file_name(&file) {
        return AppError::not_found("Image not found").into_response();
    }

    match tokio::fs::read(state.config.uploads_path().join(&file)).await {
        Ok(data) => {
            let mime = mime_guess::from_path(&file).first_or_octet_stream();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                data,
            )
                .into_response()
        }
        Err(_) => AppError::not_found("Image not found").into_response(),
    }
}
