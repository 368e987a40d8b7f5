//! Admin guard for the dashboard routes.
//!
//! A request is admitted when it carries the configured admin token, either
//! as `Authorization: Bearer <token>` or as the `admin_session` cookie.

use super::{error_response, AppState};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

const SESSION_COOKIE: &str = "admin_session";

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let presented = bearer_token(req.headers()).or_else(|| session_cookie(req.headers()));

    match (state.config.admin_token.as_deref(), presented) {
        (Some(expected), Some(token)) if tokens_match(expected, &token) => next.run(req).await,
        _ => {
            tracing::warn!("Rejected unauthenticated admin request to {}", req.uri().path());
            error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get("cookie")
        .and_then(|h| h.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(|c| c.trim())
                .find_map(|c| {
                    c.strip_prefix(SESSION_COOKIE)
                        .and_then(|rest| rest.strip_prefix('='))
                })
                .map(|t| t.to_string())
        })
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(expected: &str, presented: &str) -> bool {
    let (a, b) = (expected.as_bytes(), presented.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
