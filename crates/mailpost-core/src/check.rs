//! Connection check for configuration screens and the CLI.

use tracing::debug;

use crate::Result;
use crate::scanner::Connector;
use crate::settings::Settings;

/// Connects, logs in and selects the folder, then logs out.
///
/// Returns a human-readable confirmation with the folder's message count.
///
/// # Errors
///
/// Returns an error if the settings are incomplete or any step fails.
pub async fn check_connection<C: Connector>(settings: &Settings, connector: &C) -> Result<String> {
    settings.validate()?;

    let client = connector.connect(&settings.imap_config()).await?;
    let client = client
        .login(settings.username.trim(), &settings.password)
        .await?;
    let (selected, status) = client.select(&settings.folder).await?;

    if let Err(e) = selected.logout().await {
        debug!("LOGOUT failed: {e}");
    }

    Ok(format!(
        "Connection successful! Mailbox has {} message(s).",
        status.exists
    ))
}
