use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::auth::cookie::{get_cookie_value, TOKEN_COOKIE};
use crate::auth::policy;
use crate::auth::token::{Identity, TokenIssuer};
use crate::db::models::Role;
use crate::error::AppError;
use crate::state::AppState;

/// Gate 1: a `token` cookie must be present and verify.
pub fn authenticate(headers: &HeaderMap, issuer: &TokenIssuer) -> Result<Identity, AppError> {
    let token = get_cookie_value(headers, TOKEN_COOKIE).ok_or(AppError::Unauthorized)?;
    Ok(issuer.verify(token)?)
}

async fn gate(
    state: &AppState,
    mut req: Request,
    next: Next,
    required: Option<Role>,
) -> Result<Response, AppError> {
    let identity = authenticate(req.headers(), &state.tokens)?;
    if let Some(role) = required {
        policy::require_role(&identity, role)?;
    }

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Middleware for routes that need any signed-in user.
pub async fn require_user(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    gate(&state, req, next, None).await
}

/// Middleware for admin-only routes.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    gate(&state, req, next, Some(Role::Admin)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn issuer() -> TokenIssuer {
        TokenIssuer::from_secret(b"middleware-test")
    }

    fn with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_cookie_is_unauthorized() {
        let err = authenticate(&HeaderMap::new(), &issuer()).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn tampered_cookie_is_bad_token() {
        let err = authenticate(&with_cookie("token=abc.def.ghi"), &issuer()).unwrap_err();
        assert!(matches!(err, AppError::BadToken));
    }

    #[test]
    fn valid_cookie_yields_identity() {
        let issuer = issuer();
        let identity = Identity {
            id: "u1".into(),
            username: "alice".into(),
            role: Role::User,
        };
        let token = issuer.issue(&identity).unwrap();
        let headers = with_cookie(&format!("token={token}"));
        assert_eq!(authenticate(&headers, &issuer).unwrap(), identity);
    }
}
