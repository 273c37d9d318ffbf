//! Keeps user preferences in `preferences.json` in the client home.

use crate::model::Preferences;
use crate::{utils, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PreferencesFile {
    path: PathBuf,
}

impl PreferencesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved preferences. A missing file yields the defaults, as does a file that cannot be
    /// parsed; the latter is logged.
    pub async fn load(&self) -> Preferences {
        if !self.path.is_file() {
            debug!("No preferences at {}, using defaults", self.path.display());
            return Preferences::default();
        }
        match utils::deserialize(&self.path).await {
            Ok(preferences) => preferences,
            Err(e) => {
                warn!("Ignoring unreadable preferences: {e:#}");
                Preferences::default()
            }
        }
    }

    pub async fn save(&self, preferences: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            utils::make_dir(parent).await?;
        }
        utils::serialize(&self.path, preferences).await?;
        debug!("Saved preferences to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Theme;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_and_corrupt_files_yield_defaults() {
        let dir = TempDir::new().unwrap();
        let file = PreferencesFile::new(dir.path().join("preferences.json"));
        assert_eq!(file.load().await, Preferences::default());

        utils::write(file.path(), "{not json").await.unwrap();
        assert_eq!(file.load().await, Preferences::default());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let file = PreferencesFile::new(dir.path().join("sub").join("preferences.json"));
        let preferences = Preferences {
            theme: Theme::Dark,
            items_per_page: 25,
            currency: "EUR".to_string(),
        };
        file.save(&preferences).await.unwrap();
        assert_eq!(file.load().await, preferences);

        let json = utils::read(file.path()).await.unwrap();
        assert!(json.contains("\"itemsPerPage\": 25"));
    }
}
