use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::services::AppServices;
use crate::context::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "username": session.username().as_str(),
        "name": session.display_name(),
        "is_admin": services.admins.is_admin(session.username().as_str()),
    }))
}
