use std::sync::Arc;

use archiva_core::AppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::error::HttpAppError;

/// The fixed set of accepted ingest tokens.
#[derive(Clone)]
pub struct AuthState {
    tokens: Vec<String>,
}

impl AuthState {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Compares against every token so timing does not reveal which one matched.
    pub fn accepts(&self, candidate: &str) -> bool {
        self.tokens
            .iter()
            .fold(false, |matched, token| matched | secure_compare(candidate, token))
    }
}

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized(message: &str) -> Response {
    HttpAppError(AppError::Unauthorized(message.to_string())).into_response()
}

pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        tracing::debug!(path = %request.uri().path(), "Missing authorization header");
        return unauthorized("Missing authorization header");
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return unauthorized("Invalid authorization header format");
    };

    if !auth_state.accepts(token.trim()) {
        tracing::warn!(path = %request.uri().path(), "Rejected ingest token");
        return unauthorized("Invalid token");
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_any_configured_token() {
        let auth = AuthState::new(vec!["alpha".to_string(), " beta ".to_string(), "".to_string()]);
        assert!(auth.accepts("alpha"));
        assert!(auth.accepts("beta"));
        assert!(!auth.accepts("gamma"));
        assert!(!auth.accepts(""));
        assert!(!auth.accepts("alph"));
    }

    #[test]
    fn empty_token_set_rejects_everything() {
        let auth = AuthState::new(Vec::new());
        assert!(!auth.accepts("anything"));
    }
}
