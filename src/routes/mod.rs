pub mod admin;
pub mod auth;
pub mod posts;
pub mod upload;
pub mod uploads;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

/// Full application router: the JSON API under `/api` plus locally hosted images.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(posts::router())
        .merge(admin::router(&state))
        .merge(upload::router(&state));

    Router::new()
        .nest("/api", api)
        .route("/uploads/{file}", get(uploads::serve))
        .fallback(|| async { AppError::not_found("Route not found") })
        .layer(cors_layer(&state.config.server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Explicit origins only. A wildcard cannot be combined with credentials,
/// so it is dropped along with anything that is not a valid header value.
fn allowed_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| {
            if origin.trim() == "*" {
                tracing::warn!("Ignoring wildcard CORS origin; list origins explicitly");
                return None;
            }
            match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            }
        })
        .collect()
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_and_invalid_origins_are_skipped() {
        let origins = vec![
            "*".to_string(),
            "http://localhost:5173".to_string(),
            "bad\norigin".to_string(),
        ];
        assert_eq!(
            allowed_origins(&origins),
            vec![HeaderValue::from_static("http://localhost:5173")]
        );
    }

    #[test]
    fn wildcard_only_config_builds_a_layer() {
        let _layer = cors_layer(&["*".to_string()]);
    }
}
