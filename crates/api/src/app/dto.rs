use serde::{Deserialize, Serialize};

use keyportal_auth::{EditableRow, ToolCard};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct SaveUsersRequest {
    pub rows: Vec<EditableRow>,
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: &'static str,
    pub username: String,
    pub name: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub package: Option<String>,
    /// Display names of every granted tool (unknown ids shown verbatim).
    pub enabled_tools: Vec<String>,
    pub active: bool,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortalView {
    pub name: String,
    pub cards: Vec<ToolCard>,
    pub subscription: SubscriptionView,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminUsersResponse {
    pub rows: Vec<EditableRow>,
    /// Usernames created from the table that still need a password.
    pub without_credential: Vec<String>,
}

impl AdminUsersResponse {
    pub fn new(rows: Vec<EditableRow>) -> Self {
        let without_credential = rows
            .iter()
            .filter(|r| !r.has_credential)
            .map(|r| r.username.clone())
            .collect();
        Self {
            rows,
            without_credential,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SavedUsersResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub users: AdminUsersResponse,
}
