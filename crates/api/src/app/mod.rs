//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, session signer and admin allowlist shared by handlers
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use keyportal_infra::ConfigStore;

use crate::{middleware, settings::Settings};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(settings: &Settings, store: ConfigStore) -> Router {
    let services = Arc::new(services::AppServices::new(settings, store));
    let auth_state = middleware::AuthState {
        signer: services.signer.clone(),
    };

    // Protected routes: require a valid session.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::session_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routes::public_router())
        .merge(protected)
        .layer(Extension(services))
}
