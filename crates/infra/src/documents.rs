//! The three portal documents and the explicit configuration object built
//! from them.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use keyportal_auth::{PackageMap, ToolCatalog, UserDirectory, UserRecord};

use crate::config_store::{ConfigStore, StoreError};

pub const USERS_DOCUMENT: &str = "users.yaml";
pub const PACKAGES_DOCUMENT: &str = "packages.yaml";
pub const TOOLS_DOCUMENT: &str = "tools.yaml";

/// Required key whose value may be written as null.
fn nullable<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// `users.yaml`: `credentials.users` is the list of records.
///
/// Unrecognised keys are carried through a save untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsersDocument {
    #[serde(deserialize_with = "nullable")]
    pub credentials: CredentialsSection,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsSection {
    #[serde(default, deserialize_with = "nullable")]
    pub users: Vec<UserRecord>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
}

/// `packages.yaml`: package → tool ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackagesDocument {
    #[serde(deserialize_with = "nullable")]
    pub packages: PackageMap,
}

/// `tools.yaml`: tool id → metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolsDocument {
    #[serde(deserialize_with = "nullable")]
    pub tools: ToolCatalog,
}

impl UsersDocument {
    pub fn load(store: &ConfigStore) -> Result<Self, StoreError> {
        store.load(USERS_DOCUMENT, Self::default())
    }
}

/// Everything one request needs, loaded together from the store.
///
/// Built fresh per request; nothing here is cached across saves.
#[derive(Debug, Clone, Default)]
pub struct PortalData {
    pub users: UserDirectory,
    pub packages: PackageMap,
    pub tools: ToolCatalog,
}

impl PortalData {
    pub fn load(store: &ConfigStore) -> Result<Self, StoreError> {
        let users_doc = UsersDocument::load(store)?;
        let packages: PackagesDocument = store.load(PACKAGES_DOCUMENT, PackagesDocument::default())?;
        let tools: ToolsDocument = store.load(TOOLS_DOCUMENT, ToolsDocument::default())?;

        let users = UserDirectory::from_records(users_doc.credentials.users).map_err(|source| {
            StoreError::Invalid {
                name: USERS_DOCUMENT.to_string(),
                source,
            }
        })?;

        Ok(Self {
            users,
            packages: packages.packages,
            tools: tools.tools,
        })
    }

    /// Stored user records, in document order.
    pub fn user_records(&self) -> Vec<UserRecord> {
        self.users.records().cloned().collect()
    }
}

/// Replace the user list in `users.yaml`, keeping every other key.
pub fn save_users(store: &ConfigStore, users: Vec<UserRecord>) -> Result<(), StoreError> {
    // Re-check uniqueness so a bad list never reaches disk.
    let directory = UserDirectory::from_records(users).map_err(|source| StoreError::Invalid {
        name: USERS_DOCUMENT.to_string(),
        source,
    })?;

    let mut doc = UsersDocument::load(store)?;
    doc.credentials.users = directory.into_records();
    store.save(USERS_DOCUMENT, &doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::InMemoryBackend;
    use keyportal_auth::Expiry;
    use keyportal_core::{PackageId, ToolId, Username};

    const USERS: &str = r#"
cookie:
  name: client_portal
credentials:
  users:
    - username: alice
      name: Alice
      password: "$argon2id$stored"
      package: pro
      allowed_tools: [wiki]
      active: true
      expires_at: 2099-01-01
    - username: bob
      expires_at: "not a date"
"#;

    const PACKAGES: &str = "packages:\n  pro: [crm, invoicer]\n  empty:\n";

    const TOOLS: &str = r#"
tools:
  crm: {name: CRM, desc: Customer records, url: "https://crm.example.com"}
  invoicer: {name: Invoicer}
"#;

    fn seeded() -> ConfigStore {
        ConfigStore::in_memory(
            InMemoryBackend::new()
                .with_document(USERS_DOCUMENT, USERS)
                .with_document(PACKAGES_DOCUMENT, PACKAGES)
                .with_document(TOOLS_DOCUMENT, TOOLS),
        )
    }

    #[test]
    fn loads_all_three_documents() {
        let data = PortalData::load(&seeded()).unwrap();

        assert_eq!(data.users.len(), 2);
        let alice = data.users.get("alice").unwrap();
        assert_eq!(alice.package, Some(PackageId::new("pro")));
        assert!(alice.expires_at.as_ref().and_then(Expiry::date).is_some());

        let bob = data.users.get("bob").unwrap();
        assert!(bob.active);
        assert_eq!(bob.expires_at, Some(Expiry::Unparsed("not a date".into())));

        assert_eq!(
            data.packages.tools_for(&PackageId::new("pro")).unwrap(),
            &[ToolId::new("crm"), ToolId::new("invoicer")]
        );
        assert_eq!(data.packages.tools_for(&PackageId::new("empty")), Some(&[][..]));
        assert!(data.packages.tools_for(&PackageId::new("basic")).is_none());
        assert_eq!(data.tools.display_name(&ToolId::new("crm")), "CRM");
    }

    #[test]
    fn empty_store_loads_defaults() {
        let data = PortalData::load(&ConfigStore::in_memory(InMemoryBackend::new())).unwrap();
        assert!(data.users.is_empty());
        assert!(data.packages.is_empty());
    }

    #[test]
    fn unquoted_numeric_values_load_as_text() {
        let store = ConfigStore::in_memory(
            InMemoryBackend::new()
                .with_document(
                    USERS_DOCUMENT,
                    "credentials:\n  users:\n    - username: 1001\n      name: 2024\n      package: 7\n      allowed_tools: [crm, 365, 2.5]\n",
                )
                .with_document(PACKAGES_DOCUMENT, "packages:\n  7: [365]\n")
                .with_document(TOOLS_DOCUMENT, "tools:\n  365: {name: 365}\n"),
        );
        let data = PortalData::load(&store).unwrap();

        let user = data.users.get("1001").unwrap();
        assert_eq!(user.display_name(), "2024");
        assert_eq!(user.package, Some(PackageId::new("7")));
        let tools: Vec<_> = user.allowed_tools.iter().map(ToolId::as_str).collect();
        assert_eq!(tools, vec!["crm", "365", "2.5"]);
        assert_eq!(
            data.packages.tools_for(&PackageId::new("7")).unwrap(),
            &[ToolId::new("365")]
        );
        assert_eq!(data.tools.display_name(&ToolId::new("365")), "365");
    }

    #[test]
    fn duplicate_usernames_are_rejected_at_load() {
        let store = ConfigStore::in_memory(InMemoryBackend::new().with_document(
            USERS_DOCUMENT,
            "credentials:\n  users:\n    - username: a\n    - username: a\n",
        ));
        let err = PortalData::load(&store).unwrap_err();
        assert!(matches!(err, StoreError::Invalid { .. }));
    }

    #[test]
    fn missing_top_level_key_is_rejected() {
        let store = ConfigStore::in_memory(
            InMemoryBackend::new().with_document(PACKAGES_DOCUMENT, "bundles:\n  pro: [crm]\n"),
        );
        let err = PortalData::load(&store).unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[test]
    fn save_users_keeps_other_keys_and_order() {
        let store = seeded();
        let mut users = PortalData::load(&store).unwrap().user_records();
        users.reverse();
        users.push(keyportal_auth::UserRecord::new(Username::new("carol")));

        save_users(&store, users).unwrap();

        let doc = UsersDocument::load(&store).unwrap();
        assert!(doc.extra.contains_key("cookie"));
        let names: Vec<_> = doc
            .credentials
            .users
            .iter()
            .map(|u| u.username.as_str())
            .collect();
        assert_eq!(names, vec!["bob", "alice", "carol"]);
        assert_eq!(doc.credentials.users[1].password.as_str(), "$argon2id$stored");
        assert_eq!(
            doc.credentials.users[0].expires_at,
            Some(Expiry::Unparsed("not a date".into()))
        );
    }

    #[test]
    fn save_users_rejects_duplicates() {
        let store = seeded();
        let users = vec![
            keyportal_auth::UserRecord::new(Username::new("x")),
            keyportal_auth::UserRecord::new(Username::new("x")),
        ];
        assert!(matches!(
            save_users(&store, users),
            Err(StoreError::Invalid { .. })
        ));
    }
}
