//! Admin table editor: bulk rewrite of user records.
//!
//! The editor works on flat rows (one per user, tools as a comma-delimited
//! string) and turns them back into records. It never touches credentials
//! except through [`set_password`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use keyportal_core::{DomainError, Entity, PackageId, ToolId, Username};

use crate::{PasswordHash, UserRecord, user::Expiry};

/// One editable row of the admin table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableRow {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub package: String,
    /// Comma-delimited tool identifiers.
    #[serde(default)]
    pub allowed_tools: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// `YYYY-MM-DD` or empty.
    #[serde(default)]
    pub expires_at: String,
    /// Read-only; ignored on submit.
    #[serde(default, skip_deserializing)]
    pub has_credential: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: DomainError,
    },

    #[error("duplicate username '{0}'")]
    DuplicateUsername(String),

    #[error("unknown user '{0}'")]
    UnknownUser(String),
}

/// Build the editable table from stored records, in store order.
pub fn rows_from_users(users: &[UserRecord]) -> Vec<EditableRow> {
    users
        .iter()
        .map(|u| EditableRow {
            username: u.username.to_string(),
            name: u.name.clone().unwrap_or_default(),
            package: u.package.as_ref().map(ToString::to_string).unwrap_or_default(),
            allowed_tools: u
                .allowed_tools
                .iter()
                .map(ToolId::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            active: u.active,
            expires_at: u.expires_at.as_ref().map(ToString::to_string).unwrap_or_default(),
            has_credential: u.has_credential(),
        })
        .collect()
}

/// Parse a comma-delimited tool list: trimmed, blanks dropped, first occurrence wins.
pub fn parse_tool_list(raw: &str) -> Vec<ToolId> {
    let mut seen = HashSet::new();
    raw.split(',')
        .filter_map(|s| s.parse::<ToolId>().ok())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Turn edited rows into the new user list.
///
/// - Stored credentials are carried over by username; new usernames get an
///   empty credential.
/// - Blank package/expiry become unset; blank name becomes the username.
/// - Usernames must be non-empty and unique; expiry must be `YYYY-MM-DD`.
///
/// Rows absent from `edited` are dropped (the table is the full user list).
pub fn apply_edits(
    existing: &[UserRecord],
    edited: &[EditableRow],
) -> Result<Vec<UserRecord>, EditError> {
    let stored: HashMap<&Username, &UserRecord> = existing.iter().map(|u| (u.id(), u)).collect();

    let mut seen: HashSet<Username> = HashSet::with_capacity(edited.len());
    let mut out = Vec::with_capacity(edited.len());

    for (idx, row) in edited.iter().enumerate() {
        let invalid = |source: DomainError| EditError::InvalidRow { row: idx + 1, source };

        let username: Username = row.username.parse().map_err(invalid)?;
        if !seen.insert(username.clone()) {
            return Err(EditError::DuplicateUsername(username.into_inner()));
        }

        let previous = stored.get(&username).copied();

        // A malformed expiry already on file may be carried over unchanged.
        let expires_at = match Expiry::parse_strict(&row.expires_at) {
            Ok(expiry) => expiry,
            Err(e) => match previous.and_then(|u| u.expires_at.as_ref()) {
                Some(Expiry::Unparsed(raw)) if raw.trim() == row.expires_at.trim() => {
                    Some(Expiry::Unparsed(raw.clone()))
                }
                _ => return Err(invalid(e)),
            },
        };
        let package = row.package.parse::<PackageId>().ok();
        let name = match row.name.trim() {
            "" => username.to_string(),
            name => name.to_string(),
        };

        let password = match previous {
            Some(user) => user.password.clone(),
            None => {
                tracing::warn!(user = %username, "new user created without a credential");
                PasswordHash::empty()
            }
        };

        out.push(UserRecord {
            username,
            name: Some(name),
            password,
            package,
            allowed_tools: parse_tool_list(&row.allowed_tools).into_iter().collect(),
            active: row.active,
            expires_at,
        });
    }

    Ok(out)
}

/// Replace the credential of `username`.
pub fn set_password(
    users: &mut [UserRecord],
    username: &str,
    hash: PasswordHash,
) -> Result<(), EditError> {
    let user = users
        .iter_mut()
        .find(|u| u.username.as_str() == username)
        .ok_or_else(|| EditError::UnknownUser(username.to_string()))?;
    user.password = hash;
    Ok(())
}
