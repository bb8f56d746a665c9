//! The portal view: tool cards and subscription summary for the session user.

use std::sync::Arc;

use axum::{extract::Extension, response::IntoResponse, Json};

use keyportal_auth::{AccessDenied, resolve};

use crate::app::{
    dto::{PortalView, SubscriptionView},
    errors,
    services::AppServices,
};
use crate::context::SessionContext;

/// GET /portal - Resolve access and render the allowed tools
///
/// Documents are re-read on every call so admin edits apply on reload.
pub async fn portal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(session): Extension<SessionContext>,
) -> axum::response::Response {
    let data = match services.load_data() {
        Ok(d) => d,
        Err(e) => return errors::store_error_to_response(e),
    };

    let username = session.username().as_str();
    let Some(user) = data.users.get(username) else {
        tracing::warn!(user = %username, "session user no longer exists");
        return errors::access_denied_to_response(AccessDenied::UnknownUser);
    };

    let access = resolve(user, &data.packages, services.today());
    let tools = match access.gate() {
        Ok(tools) => tools,
        Err(denied) => {
            tracing::info!(user = %username, reason = denied.code(), "portal access blocked");
            return errors::access_denied_to_response(denied);
        }
    };

    let view = PortalView {
        name: user.display_name().to_string(),
        cards: data.tools.cards(tools),
        subscription: SubscriptionView {
            package: user.package.as_ref().map(ToString::to_string),
            enabled_tools: tools
                .iter()
                .map(|t| data.tools.display_name(t).to_string())
                .collect(),
            active: access.active,
            expires_at: user.expires_at.as_ref().map(ToString::to_string),
        },
        is_admin: services.admins.is_admin(username),
    };

    Json(view).into_response()
}
