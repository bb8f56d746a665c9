//! `keyportal-auth`: pure access-resolution and account-lifecycle boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod access;
pub mod admin;
pub mod catalog;
pub mod claims;
pub mod credential;
pub mod editor;
pub mod user;

pub use access::{AccessDenied, EffectiveAccess, resolve, resolve_username};
pub use admin::{AdminAllowlist, AuthzError, authorize_admin};
pub use catalog::{PackageMap, ToolCard, ToolCatalog, ToolInfo};
pub use claims::{Hs256SessionSigner, SessionClaims, SessionError, validate_claims};
pub use credential::{
    AuthenticatedIdentity, CredentialError, Credentials, LoginOutcome, LoginStatus, hash_password,
    login, verify_password,
};
pub use editor::{EditError, EditableRow, apply_edits, rows_from_users, set_password};
pub use user::{Expiry, PasswordHash, UserDirectory, UserRecord};
