use anyhow::Context;

use keyportal_api::settings::Settings;
use keyportal_infra::{ConfigStore, PortalData};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    keyportal_observability::init();

    let settings = Settings::from_env().context("invalid portal settings")?;
    tracing::info!(?settings, "starting portal");

    let store = ConfigStore::files(&settings.data_dir);

    // Refuse to start on unreadable documents rather than serve an empty portal.
    let data = PortalData::load(&store).context("failed to load portal documents")?;
    if data.users.is_empty() {
        tracing::warn!("No users found in users.yaml. Add a user first.");
    }
    tracing::info!(
        users = data.users.len(),
        packages = data.packages.len(),
        admins = settings.admins.len(),
        "portal documents loaded"
    );

    let app = keyportal_api::app::build_app(&settings, store);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
