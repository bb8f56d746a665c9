//! Login / logout: the HTTP face of the auth gate.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{StatusCode, header},
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use keyportal_auth::{Credentials, LoginStatus, SessionClaims};

use crate::app::{dto::LoginResponse, errors, services::AppServices};
use crate::middleware::{clear_session_cookie, session_cookie};

/// POST /login - Verify credentials and establish a session cookie
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<Credentials>,
) -> axum::response::Response {
    let data = match services.load_data() {
        Ok(d) => d,
        Err(e) => return errors::store_error_to_response(e),
    };

    if data.users.is_empty() {
        return errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "no_users",
            "No users found in users.yaml. Add a user first.",
        );
    }

    let outcome = keyportal_auth::login(&data.users, Some(&body));
    let identity = match (outcome.status, outcome.identity) {
        (LoginStatus::Ok, Some(identity)) => identity,
        (LoginStatus::Pending, _) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "auth_pending",
                "Please enter your credentials.",
            );
        }
        _ => {
            return errors::json_error(
                StatusCode::UNAUTHORIZED,
                "auth_rejected",
                "Username/password incorrect.",
            );
        }
    };

    let claims = SessionClaims::issue(&identity, Utc::now(), services.session_lifetime);
    let token = match services.signer.sign(&claims) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!(error = %e, "failed to sign session");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "session_error",
                "could not establish a session",
            );
        }
    };

    tracing::info!(user = %identity.username, "login succeeded");

    let cookie = session_cookie(
        &token,
        services.session_lifetime.num_seconds(),
        services.secure_cookies,
    );
    let is_admin = services.admins.is_admin(identity.username.as_str());

    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            status: "ok",
            username: identity.username.to_string(),
            name: identity.display_name,
            is_admin,
        }),
    )
        .into_response()
}

/// POST /logout - Drop the session cookie
pub async fn logout() -> axum::response::Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(serde_json::json!({ "status": "logged_out" })),
    )
        .into_response()
}
