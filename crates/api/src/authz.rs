//! API-side admin guard.
//!
//! Admin capability is layered on top of an authenticated session *and* an
//! account that still passes the portal gate; both are checked per request
//! against freshly loaded documents before any admin handler writes.

use chrono::NaiveDate;
use thiserror::Error;

use keyportal_auth::{AccessDenied, AdminAllowlist, AuthzError, authorize_admin, resolve};
use keyportal_infra::PortalData;

use crate::context::SessionContext;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdminGateError {
    #[error(transparent)]
    Account(#[from] AccessDenied),

    #[error(transparent)]
    NotAdmin(#[from] AuthzError),
}

/// Check that the session's user is on the admin allowlist.
pub fn require_admin(admins: &AdminAllowlist, session: &SessionContext) -> Result<(), AuthzError> {
    authorize_admin(admins, session.identity()).inspect_err(|e| {
        tracing::warn!(user = %session.username(), error = %e, "admin access denied");
    })
}

/// The session user must still exist and pass the account gate, then be an admin.
pub fn require_active_admin(
    admins: &AdminAllowlist,
    data: &PortalData,
    session: &SessionContext,
    today: NaiveDate,
) -> Result<(), AdminGateError> {
    let username = session.username();
    let Some(user) = data.users.get(username.as_str()) else {
        tracing::warn!(user = %username, "admin request from a removed account");
        return Err(AccessDenied::UnknownUser.into());
    };

    if let Err(denied) = resolve(user, &data.packages, today).gate() {
        tracing::warn!(user = %username, reason = denied.code(), "admin request from a blocked account");
        return Err(denied.into());
    }

    require_admin(admins, session)?;
    Ok(())
}
