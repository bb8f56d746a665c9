use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod portal;
pub mod session;
pub mod system;

/// Routes reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/login", post(session::login))
        .route("/logout", post(session::logout))
}

/// Router for all session-protected endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/portal", get(portal::portal))
        .nest("/admin", admin::router())
}
