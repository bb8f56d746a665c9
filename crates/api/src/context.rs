use keyportal_auth::AuthenticatedIdentity;
use keyportal_core::Username;

/// Session context for a request (identity from a verified session token).
///
/// Inserted by the session middleware; present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    identity: AuthenticatedIdentity,
}

impl SessionContext {
    pub fn new(identity: AuthenticatedIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &AuthenticatedIdentity {
        &self.identity
    }

    pub fn username(&self) -> &Username {
        &self.identity.username
    }

    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }
}
