use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::{Claims, SessionManager, SESSION_COOKIE};
use crate::AppState;

/// Pages under this prefix need a session.
pub const PROTECTED_PREFIX: &str = "/main";
/// Public entry point; signed-in visitors are sent on to the app.
pub const PUBLIC_ENTRY: &str = "/";

/// Authenticated caller. The user id always comes from the verified token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub claims: Claims,
}

fn cookie_token(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
}

/// Session cookie first, then `Authorization: Bearer`. A stale cookie does
/// not hide a valid bearer token.
fn verified(parts: &Parts, sessions: &SessionManager) -> Option<Claims> {
    cookie_token(parts)
        .and_then(|token| sessions.verify(&token))
        .or_else(|| bearer_token(parts).and_then(|token| sessions.verify(&token)))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = verified(parts, &state.sessions).ok_or(AppError::Unauthorized)?;
        Ok(AuthUser {
            user_id: claims.sub,
            claims,
        })
    }
}

enum Gate {
    Pass,
    RedirectTo(&'static str),
}

fn gate(path: &str, signed_in: bool) -> Gate {
    let protected = path == PROTECTED_PREFIX || path.starts_with("/main/");
    if protected && !signed_in {
        Gate::RedirectTo(PUBLIC_ENTRY)
    } else if path == PUBLIC_ENTRY && signed_in {
        Gate::RedirectTo(PROTECTED_PREFIX)
    } else {
        Gate::Pass
    }
}

/// Redirects page requests according to the session. API paths never reach here.
pub async fn session_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let signed_in = verified(&parts, &state.sessions).is_some();
    match gate(parts.uri.path(), signed_in) {
        Gate::Pass => next.run(Request::from_parts(parts, body)).await,
        Gate::RedirectTo(target) => {
            tracing::debug!(path = %parts.uri.path(), target, "Page gate redirect");
            (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
        }
    }
}
