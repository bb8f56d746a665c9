use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};

use keyportal_auth::{AdminAllowlist, Hs256SessionSigner};
use keyportal_infra::{ConfigStore, PortalData, StoreError};

use crate::settings::Settings;

/// Shared, read-only request dependencies.
///
/// Documents are not held here: each request loads them fresh through `store`.
pub struct AppServices {
    pub store: ConfigStore,
    pub admins: AdminAllowlist,
    pub signer: Arc<Hs256SessionSigner>,
    pub session_lifetime: Duration,
    pub secure_cookies: bool,
}

impl AppServices {
    pub fn new(settings: &Settings, store: ConfigStore) -> Self {
        Self {
            store,
            admins: settings.admins.clone(),
            signer: Arc::new(Hs256SessionSigner::new(settings.session_secret.as_bytes())),
            session_lifetime: Duration::days(settings.session_days),
            secure_cookies: settings.is_production(),
        }
    }

    pub fn load_data(&self) -> Result<PortalData, StoreError> {
        PortalData::load(&self.store)
    }

    /// Calendar date used for expiry checks (server local time).
    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
