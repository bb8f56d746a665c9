//! User records as stored in the users document.
//!
//! A record carries identity, an opaque credential and the subscription data
//! (package, explicit tools, active flag, expiry) that access resolution reads.

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use keyportal_core::scalar::optional_scalar;
use keyportal_core::{DomainError, Entity, PackageId, ScalarString, ToolId, Username};

/// Date format used for `expires_at` values.
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d";

// ─────────────────────────────────────────────────────────────────────────────
// Password Hash
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque stored credential (argon2 PHC or legacy bcrypt). Empty means "no usable password".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            f.write_str("PasswordHash(<empty>)")
        } else {
            f.write_str("PasswordHash(<redacted>)")
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Expiry
// ─────────────────────────────────────────────────────────────────────────────

/// Subscription expiry as stored.
///
/// Values that are not `YYYY-MM-DD` are kept verbatim so a load/save cycle
/// never rewrites what an operator typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiry {
    On(NaiveDate),
    Unparsed(String),
}

impl Expiry {
    /// Lenient parse used at the document boundary. Blank input means "unset".
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Some(match NaiveDate::parse_from_str(raw, EXPIRY_FORMAT) {
            Ok(date) => Expiry::On(date),
            Err(_) => Expiry::Unparsed(raw.to_string()),
        })
    }

    /// Strict parse used for admin input: malformed dates are rejected.
    pub fn parse_strict(raw: &str) -> Result<Option<Self>, DomainError> {
        match Self::parse(raw) {
            Some(Expiry::Unparsed(bad)) => Err(DomainError::validation(format!(
                "expiry '{bad}' is not a YYYY-MM-DD date"
            ))),
            other => Ok(other),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Expiry::On(date) => Some(*date),
            Expiry::Unparsed(_) => None,
        }
    }
}

impl From<NaiveDate> for Expiry {
    fn from(value: NaiveDate) -> Self {
        Expiry::On(value)
    }
}

impl core::fmt::Display for Expiry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Expiry::On(date) => write!(f, "{}", date.format(EXPIRY_FORMAT)),
            Expiry::Unparsed(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for Expiry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Expiry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = ScalarString::deserialize(deserializer)?.into_inner();
        Expiry::parse(&raw).ok_or_else(|| serde::de::Error::custom("expiry cannot be blank"))
    }
}

fn de_optional_expiry<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Expiry>, D::Error> {
    let raw = optional_scalar(d)?;
    Ok(raw.as_deref().and_then(Expiry::parse))
}

fn de_optional_package<'de, D: Deserializer<'de>>(d: D) -> Result<Option<PackageId>, D::Error> {
    let raw = optional_scalar(d)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}

fn de_tool_set<'de, D: Deserializer<'de>>(d: D) -> Result<IndexSet<ToolId>, D::Error> {
    let raw: Option<Vec<ScalarString>> = Option::deserialize(d)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|s| s.into_inner().parse().ok())
        .collect())
}

fn default_active() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// User Record
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of the users document.
///
/// # Invariants
/// - `username` is unique across the store (enforced by [`UserDirectory`]).
/// - `active` defaults to `true` when the key is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: Username,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub name: Option<String>,
    #[serde(default)]
    pub password: PasswordHash,
    #[serde(default, deserialize_with = "de_optional_package")]
    pub package: Option<PackageId>,
    #[serde(default, deserialize_with = "de_tool_set")]
    pub allowed_tools: IndexSet<ToolId>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, deserialize_with = "de_optional_expiry")]
    pub expires_at: Option<Expiry>,
}

impl UserRecord {
    /// A fresh, active record with no credential and no tools.
    pub fn new(username: Username) -> Self {
        Self {
            username,
            name: None,
            password: PasswordHash::empty(),
            package: None,
            allowed_tools: IndexSet::new(),
            active: true,
            expires_at: None,
        }
    }

    /// Display name, falling back to the username.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self.username.as_str(),
        }
    }

    pub fn has_credential(&self) -> bool {
        !self.password.is_empty()
    }
}

impl Entity for UserRecord {
    type Id = Username;

    fn id(&self) -> &Self::Id {
        &self.username
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory
// ─────────────────────────────────────────────────────────────────────────────

/// Username-keyed view of the user store, in document order.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: IndexMap<Username, UserRecord>,
}

impl UserDirectory {
    /// Build a directory, rejecting blank or duplicate usernames.
    pub fn from_records(records: Vec<UserRecord>) -> Result<Self, DomainError> {
        let mut users = IndexMap::with_capacity(records.len());
        for record in records {
            if record.username.as_str().trim().is_empty() {
                return Err(DomainError::invalid_id("username cannot be empty"));
            }
            if users.contains_key(&record.username) {
                return Err(DomainError::invariant(format!(
                    "duplicate username '{}'",
                    record.username
                )));
            }
            users.insert(record.username.clone(), record);
        }
        Ok(Self { users })
    }

    pub fn get(&self, username: &str) -> Option<&UserRecord> {
        self.users.get(username)
    }

    pub fn records(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values()
    }

    pub fn into_records(self) -> Vec<UserRecord> {
        self.users.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
