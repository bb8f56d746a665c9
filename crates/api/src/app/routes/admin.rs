//! Admin editor endpoints.
//!
//! Every handler loads the documents and passes the admin gate (account still
//! present and unblocked, then allowlisted) before reading or writing users.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json,
};

use keyportal_auth::{CredentialError, EditError, apply_edits, hash_password, rows_from_users};
use keyportal_infra::{PortalData, save_users};

use crate::app::{
    dto::{AdminUsersResponse, SaveUsersRequest, SavedUsersResponse, SetPasswordRequest},
    errors,
    services::AppServices,
};
use crate::authz::require_active_admin;
use crate::context::SessionContext;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list_users).put(replace_users))
        .route("/users/:username/password", post(reset_password))
}

/// Fresh documents for an admin request, or the response refusing it.
fn admin_data(
    services: &AppServices,
    session: &SessionContext,
) -> Result<PortalData, axum::response::Response> {
    let data = services.load_data().map_err(errors::store_error_to_response)?;
    require_active_admin(&services.admins, &data, session, services.today())
        .map_err(errors::admin_gate_error_to_response)?;
    Ok(data)
}

/// GET /admin/users - The editable user table, in store order
async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    let data = match admin_data(&services, &session) {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    Json(AdminUsersResponse::new(rows_from_users(&data.user_records()))).into_response()
}

/// PUT /admin/users - Replace the whole user list with the submitted rows
///
/// On any failure the submitted rows are echoed back so the table keeps the
/// admin's unsaved edits.
async fn replace_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Json(body): Json<SaveUsersRequest>,
) -> axum::response::Response {
    let submitted = serde_json::to_value(&body.rows).unwrap_or_default();

    let data = match services.load_data() {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(error = %e, "cannot load users before save");
            return errors::json_error_with(
                StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                e.to_string(),
                "rows",
                submitted,
            );
        }
    };

    if let Err(e) = require_active_admin(&services.admins, &data, &session, services.today()) {
        return errors::admin_gate_error_to_response(e);
    }

    let users = match apply_edits(&data.user_records(), &body.rows) {
        Ok(users) => users,
        Err(e) => {
            return errors::json_error_with(
                errors::edit_error_status(&e),
                "validation_error",
                e.to_string(),
                "rows",
                submitted,
            );
        }
    };

    let count = users.len();
    let rows = rows_from_users(&users);
    if let Err(e) = save_users(&services.store, users) {
        let code = if e.is_write_failure() {
            "save_failed"
        } else {
            "config_error"
        };
        tracing::error!(error = %e, "user table save failed");
        return errors::json_error_with(
            StatusCode::INTERNAL_SERVER_ERROR,
            code,
            e.to_string(),
            "rows",
            submitted,
        );
    }

    tracing::info!(admin = %session.username(), users = count, "user table saved");

    Json(SavedUsersResponse {
        message: "Saved. Reload page to apply.",
        users: AdminUsersResponse::new(rows),
    })
    .into_response()
}

/// POST /admin/users/:username/password - Set a fresh credential for one user
async fn reset_password(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
    Path(username): Path<String>,
    Json(body): Json<SetPasswordRequest>,
) -> axum::response::Response {
    let mut users = match admin_data(&services, &session) {
        Ok(d) => d.user_records(),
        Err(resp) => return resp,
    };

    let hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(CredentialError::EmptyPassword) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                CredentialError::EmptyPassword.to_string(),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "password hashing failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "hashing_failed",
                e.to_string(),
            );
        }
    };

    if let Err(e) = keyportal_auth::set_password(&mut users, &username, hash) {
        let status = errors::edit_error_status(&e);
        let code = match e {
            EditError::UnknownUser(_) => "not_found",
            _ => "validation_error",
        };
        return errors::json_error(status, code, e.to_string());
    }

    if let Err(e) = save_users(&services.store, users) {
        return errors::store_error_to_response(e);
    }

    tracing::info!(admin = %session.username(), user = %username, "password reset");

    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "password_set", "username": username })),
    )
        .into_response()
}
