use chrono::NaiveDate;
use indexmap::IndexSet;
use serde::Serialize;
use thiserror::Error;

use keyportal_core::ToolId;

use crate::{PackageMap, UserDirectory, UserRecord, user::Expiry};

/// Why the portal refuses to show tools to an authenticated user.
///
/// The `Display` text is the user-facing message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessDenied {
    #[error("Your account is inactive. Please contact support.")]
    Inactive,

    #[error("Your subscription has expired. Please contact billing to reactivate.")]
    Expired,

    #[error("No tools assigned to your account. Please contact support.")]
    NoToolsAssigned,

    #[error("Unknown account. Please contact support.")]
    UnknownUser,
}

impl AccessDenied {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AccessDenied::Inactive => "account_inactive",
            AccessDenied::Expired => "account_expired",
            AccessDenied::NoToolsAssigned => "no_tools_assigned",
            AccessDenied::UnknownUser => "unknown_user",
        }
    }
}

/// Resolved, non-persisted access for one user at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveAccess {
    pub active: bool,
    pub expired: bool,
    /// Explicit tools first, then package tools not already listed.
    /// Always empty when `active` is false or `expired` is true.
    pub tools: Vec<ToolId>,
}

impl EffectiveAccess {
    /// First reason access is blocked, if any. Inactive wins over expired.
    pub fn denial(&self) -> Option<AccessDenied> {
        if !self.active {
            Some(AccessDenied::Inactive)
        } else if self.expired {
            Some(AccessDenied::Expired)
        } else if self.tools.is_empty() {
            Some(AccessDenied::NoToolsAssigned)
        } else {
            None
        }
    }

    pub fn blocked(&self) -> bool {
        self.denial().is_some()
    }

    /// The tools to render, or the reason nothing may be rendered.
    pub fn gate(&self) -> Result<&[ToolId], AccessDenied> {
        match self.denial() {
            Some(reason) => Err(reason),
            None => Ok(&self.tools),
        }
    }
}

/// Whether `expiry` lies strictly before `today`.
///
/// Absent expiry never expires. An expiry that is not a valid date is treated
/// as not expired.
pub fn is_expired(expiry: Option<&Expiry>, today: NaiveDate) -> bool {
    match expiry {
        None => false,
        Some(Expiry::On(date)) => *date < today,
        Some(Expiry::Unparsed(raw)) => {
            tracing::warn!(expires_at = %raw, "unparseable expiry date; treating as not expired");
            false
        }
    }
}

/// Resolve effective access for `user` against `packages` as of `today`.
///
/// - No IO
/// - No panics
/// - Pure function of its inputs (no caching across config reloads)
pub fn resolve(user: &UserRecord, packages: &PackageMap, today: NaiveDate) -> EffectiveAccess {
    let active = user.active;
    let expired = is_expired(user.expires_at.as_ref(), today);

    if !active || expired {
        return EffectiveAccess {
            active,
            expired,
            tools: Vec::new(),
        };
    }

    let mut tools: IndexSet<ToolId> = user.allowed_tools.clone();
    if let Some(bundle) = user.package.as_ref().and_then(|p| packages.tools_for(p)) {
        tools.extend(bundle.iter().cloned());
    } else if let Some(package) = &user.package {
        tracing::debug!(user = %user.username, package = %package, "package not defined; ignoring");
    }

    EffectiveAccess {
        active,
        expired,
        tools: tools.into_iter().collect(),
    }
}

/// Look `username` up in `directory` and resolve its access.
pub fn resolve_username(
    username: &str,
    directory: &UserDirectory,
    packages: &PackageMap,
    today: NaiveDate,
) -> Result<EffectiveAccess, AccessDenied> {
    let user = directory.get(username).ok_or(AccessDenied::UnknownUser)?;
    Ok(resolve(user, packages, today))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyportal_core::{PackageId, Username};
    use proptest::prelude::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn user(name: &str) -> UserRecord {
        UserRecord::new(Username::new(name))
    }

    fn tools(ids: &[&str]) -> Vec<ToolId> {
        ids.iter().map(|s| ToolId::new(*s)).collect()
    }

    fn pro_packages() -> PackageMap {
        [(PackageId::new("pro"), tools(&["crm", "invoicer"]))]
            .into_iter()
            .collect()
    }

    #[test]
    fn package_tools_are_granted() {
        let mut alice = user("alice");
        alice.package = Some(PackageId::new("pro"));
        alice.expires_at = Expiry::parse("2099-01-01");

        let access = resolve(&alice, &pro_packages(), date("2024-06-01"));

        assert_eq!(access.tools, tools(&["crm", "invoicer"]));
        assert!(!access.blocked());
    }

    #[test]
    fn past_expiry_blocks() {
        let mut bob = user("bob");
        bob.allowed_tools = tools(&["crm"]).into_iter().collect();
        bob.expires_at = Expiry::parse("2020-01-01");

        let access = resolve(&bob, &pro_packages(), date("2024-06-01"));

        assert!(access.expired);
        assert!(access.blocked());
        assert_eq!(access.gate(), Err(AccessDenied::Expired));
        assert!(access.tools.is_empty());
    }

    #[test]
    fn expiry_today_is_still_valid() {
        let mut bob = user("bob");
        bob.allowed_tools = tools(&["crm"]).into_iter().collect();
        bob.expires_at = Expiry::parse("2024-06-01");

        let access = resolve(&bob, &PackageMap::new(), date("2024-06-01"));
        assert!(!access.expired);
        assert_eq!(access.gate().unwrap(), tools(&["crm"]).as_slice());
    }

    #[test]
    fn inactive_is_reported_before_expiry() {
        let mut carol = user("carol");
        carol.active = false;
        carol.expires_at = Expiry::parse("2000-01-01");

        let access = resolve(&carol, &pro_packages(), date("2024-06-01"));
        assert_eq!(access.denial(), Some(AccessDenied::Inactive));

        carol.expires_at = None;
        let access = resolve(&carol, &pro_packages(), date("2024-06-01"));
        assert_eq!(access.gate(), Err(AccessDenied::Inactive));
    }

    #[test]
    fn unparseable_expiry_is_not_expired() {
        let mut dan = user("dan");
        dan.allowed_tools = tools(&["crm"]).into_iter().collect();
        dan.expires_at = Expiry::parse("someday");

        let access = resolve(&dan, &PackageMap::new(), date("2024-06-01"));
        assert!(!access.expired);
        assert!(!access.blocked());
    }

    #[test]
    fn no_package_and_no_tools_is_empty() {
        let access = resolve(&user("eve"), &pro_packages(), date("2024-06-01"));
        assert!(access.tools.is_empty());
        assert_eq!(access.gate(), Err(AccessDenied::NoToolsAssigned));
    }

    #[test]
    fn unknown_package_falls_back_to_explicit_tools() {
        let mut fay = user("fay");
        fay.package = Some(PackageId::new("enterprise"));
        fay.allowed_tools = tools(&["wiki"]).into_iter().collect();

        let access = resolve(&fay, &pro_packages(), date("2024-06-01"));
        assert_eq!(access.tools, tools(&["wiki"]));
    }

    #[test]
    fn explicit_tools_come_first_without_duplicates() {
        let mut gus = user("gus");
        gus.package = Some(PackageId::new("pro"));
        gus.allowed_tools = tools(&["invoicer", "wiki"]).into_iter().collect();

        let access = resolve(&gus, &pro_packages(), date("2024-06-01"));
        assert_eq!(access.tools, tools(&["invoicer", "wiki", "crm"]));
    }

    #[test]
    fn resolve_username_reports_unknown_user() {
        let directory = UserDirectory::from_records(vec![user("alice")]).unwrap();
        let err = resolve_username("mallory", &directory, &PackageMap::new(), date("2024-06-01"))
            .unwrap_err();
        assert_eq!(err, AccessDenied::UnknownUser);
    }

    #[test]
    fn denial_messages_are_distinct() {
        assert_ne!(AccessDenied::Inactive.to_string(), AccessDenied::Expired.to_string());
        assert_eq!(AccessDenied::Expired.code(), "account_expired");
    }

    proptest! {
        #[test]
        fn inactive_always_blocks(
            explicit in proptest::collection::vec("[a-e]", 0..5),
            expiry_year in 1990i32..2100,
        ) {
            let mut u = user("x");
            u.active = false;
            u.allowed_tools = explicit.iter().map(|s| ToolId::new(s.as_str())).collect();
            u.expires_at = NaiveDate::from_ymd_opt(expiry_year, 1, 1).map(Expiry::On);

            let access = resolve(&u, &pro_packages(), date("2024-06-01"));
            prop_assert_eq!(access.denial(), Some(AccessDenied::Inactive));
            prop_assert!(access.tools.is_empty());
        }

        #[test]
        fn tools_are_the_union_of_explicit_and_package(
            explicit in proptest::collection::vec("[a-f]", 0..6),
            bundle in proptest::collection::vec("[a-f]", 0..6),
        ) {
            let mut u = user("x");
            u.package = Some(PackageId::new("p"));
            u.allowed_tools = explicit.iter().map(|s| ToolId::new(s.as_str())).collect();
            let packages: PackageMap = [(
                PackageId::new("p"),
                bundle.iter().map(|s| ToolId::new(s.as_str())).collect(),
            )]
            .into_iter()
            .collect();

            let access = resolve(&u, &packages, date("2024-06-01"));

            let got: std::collections::BTreeSet<_> = access.tools.iter().cloned().collect();
            let want: std::collections::BTreeSet<_> = explicit
                .iter()
                .chain(bundle.iter())
                .map(|s| ToolId::new(s.as_str()))
                .collect();
            prop_assert_eq!(&got, &want);
            prop_assert_eq!(got.len(), access.tools.len());

            // Resolving again is idempotent.
            prop_assert_eq!(resolve(&u, &packages, date("2024-06-01")), access);
        }
    }
}
