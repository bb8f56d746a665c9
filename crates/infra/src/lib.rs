//! Infrastructure layer: durable documents behind the portal.

pub mod config_store;
pub mod documents;

pub use config_store::{ConfigStore, DocumentBackend, FileBackend, InMemoryBackend, StoreError};
pub use documents::{
    PACKAGES_DOCUMENT, PackagesDocument, PortalData, TOOLS_DOCUMENT, ToolsDocument,
    USERS_DOCUMENT, UsersDocument, save_users,
};
