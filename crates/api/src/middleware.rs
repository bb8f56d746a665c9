use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use keyportal_auth::Hs256SessionSigner;

use crate::app::errors;
use crate::context::SessionContext;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "client_portal";

#[derive(Clone)]
pub struct AuthState {
    pub signer: Arc<Hs256SessionSigner>,
}

pub async fn session_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let Some(token) = extract_token(req.headers()) else {
        return Err(errors::json_error(
            StatusCode::UNAUTHORIZED,
            "auth_pending",
            "Please enter your credentials.",
        ));
    };

    let claims = state.signer.verify(&token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "session rejected");
        errors::json_error(StatusCode::UNAUTHORIZED, "session_invalid", "Please log in again.")
    })?;

    req.extensions_mut()
        .insert(SessionContext::new(claims.identity()));

    Ok(next.run(req).await)
}

/// Session token from the session cookie, or a `Bearer` authorization header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string());

    let token = from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(|t| t.trim().to_string())
    })?;

    (!token.is_empty()).then_some(token)
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie =
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_is_read_from_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; client_portal=abc.def.ghi; other=1"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_token(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn empty_cookie_is_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("client_portal="));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("t", 60, true);
        assert!(cookie.starts_with("client_portal=t;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.ends_with("; Secure"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }
}
