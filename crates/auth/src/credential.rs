//! Credential verification (the login half of the auth gate).
//!
//! New hashes are argon2 PHC strings. Stored bcrypt hashes (`$2a$`, `$2b$`,
//! `$2y$`) from older user files still verify, through `bcrypt`.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash as PhcHash, PasswordHasher, PasswordVerifier};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use keyportal_core::Username;

use crate::{PasswordHash, UserDirectory};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("password cannot be empty")]
    EmptyPassword,

    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Submitted login form.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Identity established by a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub username: Username,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    Ok,
    Rejected,
    /// Nothing submitted yet.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub identity: Option<AuthenticatedIdentity>,
    pub status: LoginStatus,
}

impl LoginOutcome {
    fn rejected() -> Self {
        Self {
            identity: None,
            status: LoginStatus::Rejected,
        }
    }

    fn pending() -> Self {
        Self {
            identity: None,
            status: LoginStatus::Pending,
        }
    }
}

/// Hash a plaintext password into a PHC string.
pub fn hash_password(plain: &str) -> Result<PasswordHash, CredentialError> {
    if plain.is_empty() {
        return Err(CredentialError::EmptyPassword);
    }
    let salt = SaltString::generate(&mut OsRng);
    let phc = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(PasswordHash::new(phc.to_string()))
}

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

/// Check `plain` against `stored`. Empty or malformed hashes never verify.
pub fn verify_password(plain: &str, stored: &PasswordHash) -> bool {
    if stored.is_empty() {
        return false;
    }
    let stored = stored.as_str().trim();

    if BCRYPT_PREFIXES.iter().any(|p| stored.starts_with(p)) {
        return bcrypt::verify(plain, stored).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "stored bcrypt hash is malformed");
            false
        });
    }

    match PhcHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is not a valid PHC string");
            false
        }
    }
}

/// Evaluate a login attempt against the user directory.
pub fn login(directory: &UserDirectory, credentials: Option<&Credentials>) -> LoginOutcome {
    let Some(credentials) = credentials else {
        return LoginOutcome::pending();
    };
    let username = credentials.username.trim();
    if username.is_empty() || credentials.password.is_empty() {
        return LoginOutcome::pending();
    }

    let Some(user) = directory.get(username) else {
        tracing::info!(user = %username, "login rejected: unknown user");
        return LoginOutcome::rejected();
    };

    if !verify_password(&credentials.password, &user.password) {
        tracing::info!(user = %username, "login rejected: bad credentials");
        return LoginOutcome::rejected();
    }

    LoginOutcome {
        identity: Some(AuthenticatedIdentity {
            username: user.username.clone(),
            display_name: user.display_name().to_string(),
        }),
        status: LoginStatus::Ok,
    }
}
