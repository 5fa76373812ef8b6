//! Settings file and data locations.

use std::path::{Path, PathBuf};

use anyhow::Context;
use mailpost_core::Settings;

/// Environment variable that overrides the password from the settings file.
pub const PASSWORD_ENV: &str = "MAILPOST_PASSWORD";

/// Default settings file: `<config_dir>/mailpost/settings.json`.
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailpost")
        .join("settings.json")
}

/// Default data directory: `<data_dir>/mailpost`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailpost")
}

/// Loads settings and applies the password override from the environment.
///
/// A missing file at the default location yields default settings, which
/// then fail validation with a message naming the missing fields. A missing
/// file given explicitly is an error.
pub async fn load_settings(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match explicit {
        Some(path) => read_settings(path).await?,
        None => {
            let path = default_settings_path();
            if path.exists() {
                read_settings(&path).await?
            } else {
                tracing::warn!("no settings file at {}", path.display());
                Settings::default()
            }
        }
    };

    Ok(with_password_override(
        settings,
        std::env::var(PASSWORD_ENV).ok(),
    ))
}

async fn read_settings(path: &Path) -> anyhow::Result<Settings> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading settings from {}", path.display()))?;
    let settings = serde_json::from_str(&contents)
        .with_context(|| format!("parsing settings in {}", path.display()))?;
    tracing::debug!("settings loaded from {}", path.display());
    Ok(settings)
}

/// Replaces the password when the override is present and non-empty.
fn with_password_override(mut settings: Settings, password: Option<String>) -> Settings {
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        settings.password = password;
    }
    settings
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use mailpost_core::{Encryption, PostStatus};

    #[tokio::test]
    async fn test_read_partial_settings_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(
            &path,
            r#"{"host": "imap.example.com", "username": "news", "encryption": "tls", "post_status": "publish"}"#,
        )
        .await
        .unwrap();

        let settings = read_settings(&path).await.unwrap();
        assert_eq!(settings.host, "imap.example.com");
        assert_eq!(settings.encryption, Encryption::Tls);
        assert_eq!(settings.post_status, PostStatus::Publish);
        assert_eq!(settings.port, 993);
        assert_eq!(settings.folder, "INBOX");
        assert!(settings.password.is_empty());
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_settings(Some(&dir.path().join("absent.json")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        let err = read_settings(&path).await.unwrap_err();
        assert!(err.to_string().starts_with("parsing settings"));
    }

    #[test]
    fn test_password_override() {
        let settings = Settings {
            password: "from-file".to_string(),
            ..Settings::default()
        };

        let kept = with_password_override(settings.clone(), None);
        assert_eq!(kept.password, "from-file");

        let kept = with_password_override(settings.clone(), Some(String::new()));
        assert_eq!(kept.password, "from-file");

        let replaced = with_password_override(settings, Some("from-env".to_string()));
        assert_eq!(replaced.password, "from-env");
    }

    #[test]
    fn test_default_paths_end_in_mailpost() {
        assert!(default_settings_path().ends_with("mailpost/settings.json"));
        assert!(default_data_dir().ends_with("mailpost"));
    }
}
