use std::collections::BTreeSet;

use thiserror::Error;

use keyportal_core::Username;

use crate::AuthenticatedIdentity;

/// Usernames granted admin capability for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowlist {
    admins: BTreeSet<Username>,
}

impl AdminAllowlist {
    /// Parse a comma-separated list. Entries are trimmed; blanks are dropped.
    pub fn parse(raw: &str) -> Self {
        raw.split(',')
            .filter_map(|s| s.parse::<Username>().ok())
            .collect()
    }

    pub fn is_admin(&self, username: &str) -> bool {
        self.admins.contains(username)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Username> {
        self.admins.iter()
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

impl FromIterator<Username> for AdminAllowlist {
    fn from_iter<I: IntoIterator<Item = Username>>(iter: I) -> Self {
        Self {
            admins: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: '{0}' is not an administrator")]
    NotAdmin(String),
}

/// Authorize an authenticated identity for admin operations.
///
/// Must only be called after a successful login; the identity is trusted.
pub fn authorize_admin(
    allowlist: &AdminAllowlist,
    identity: &AuthenticatedIdentity,
) -> Result<(), AuthzError> {
    if allowlist.is_admin(identity.username.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::NotAdmin(identity.username.to_string()))
    }
}
