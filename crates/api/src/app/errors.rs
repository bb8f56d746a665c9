use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use keyportal_auth::{AccessDenied, AuthzError, EditError};
use keyportal_infra::StoreError;

use crate::authz::AdminGateError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Error response that also returns caller-supplied state (e.g. unsaved rows).
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    key: &'static str,
    value: serde_json::Value,
) -> axum::response::Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    body[key] = value;
    (status, axum::Json(body)).into_response()
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    if err.is_write_failure() {
        tracing::error!(error = %err, "failed to save document");
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "save_failed", err.to_string());
    }
    tracing::error!(error = %err, "portal documents are unreadable; refusing to serve");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "config_error", err.to_string())
}

pub fn access_denied_to_response(denied: AccessDenied) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, denied.code(), denied.to_string())
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn admin_gate_error_to_response(err: AdminGateError) -> axum::response::Response {
    match err {
        AdminGateError::Account(denied) => access_denied_to_response(denied),
        AdminGateError::NotAdmin(e) => authz_error_to_response(e),
    }
}

pub fn edit_error_status(err: &EditError) -> StatusCode {
    match err {
        EditError::UnknownUser(_) => StatusCode::NOT_FOUND,
        EditError::InvalidRow { .. } | EditError::DuplicateUsername(_) => StatusCode::BAD_REQUEST,
    }
}
