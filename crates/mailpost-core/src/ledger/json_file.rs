//! Ledger stored as a JSON array on disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::LedgerStore;
use crate::{Error, Result};

/// Ledger persisted as a JSON array of Message-IDs.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// ledger, so a crash mid-write leaves the previous ledger intact.
#[derive(Debug, Clone)]
pub struct JsonFileLedger {
    path: PathBuf,
}

impl JsonFileLedger {
    /// Creates a ledger backed by `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the ledger file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn ledger_error(&self, action: &str, e: impl std::fmt::Display) -> Error {
        Error::Ledger(format!("{action} {}: {e}", self.path.display()))
    }
}

impl LedgerStore for JsonFileLedger {
    async fn load(&self) -> Result<Vec<String>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no ledger at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.ledger_error("reading", e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|e| self.ledger_error("parsing", e))
    }

    async fn save(&self, ids: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.ledger_error("creating directory for", e))?;
        }

        let json = serde_json::to_vec_pretty(ids)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| self.ledger_error("writing", e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.ledger_error("replacing", e))?;

        debug!("saved {} ledger entries to {}", ids.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonFileLedger::new(dir.path().join("processed.json"));
        assert!(ledger.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonFileLedger::new(dir.path().join("state").join("processed.json"));
        let ids = vec!["<one@x>".to_string(), "<two@x>".to_string()];

        ledger.save(&ids).await.unwrap();
        assert_eq!(ledger.load().await.unwrap(), ids);
        assert!(!ledger.temp_path().exists());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JsonFileLedger::new(dir.path().join("processed.json"));
        ledger.save(&["<a@x>".to_string()]).await.unwrap();
        ledger.save(&["<b@x>".to_string()]).await.unwrap();
        assert_eq!(ledger.load().await.unwrap(), ["<b@x>"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_ledger_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonFileLedger::new(&path).load().await.unwrap_err();
        assert!(matches!(err, Error::Ledger(m) if m.contains("parsing")));
    }

    #[tokio::test]
    async fn test_unwritable_location_is_ledger_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("state");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let ledger = JsonFileLedger::new(blocker.join("processed.json"));
        let err = ledger.save(&["<a@example.com>".to_string()]).await.unwrap_err();
        assert!(matches!(&err, Error::Ledger(m) if m.contains("processed.json")));
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let ledger = JsonFileLedger::new("/var/lib/mailpost/processed.json");
        assert_eq!(
            ledger.temp_path(),
            PathBuf::from("/var/lib/mailpost/processed.json.tmp")
        );
    }
}
