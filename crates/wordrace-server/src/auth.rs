use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;

/// REST authentication settings. `bearer_token: None` disables auth.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub bearer_token: Option<String>,
}

impl AuthConfig {
    /// True when auth is disabled or the request carries the expected token.
    pub fn permits(&self, headers: &HeaderMap) -> bool {
        match self.bearer_token {
            Some(ref expected) => bearer_token(headers) == Some(expected.as_str()),
            None => true,
        }
    }
}

/// Rejects REST requests that lack the configured bearer token.
pub async fn require_bearer(
    State(auth): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !auth.permits(request.headers()) {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
