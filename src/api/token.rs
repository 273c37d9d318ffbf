//! Persists the bearer token between runs.

use crate::{utils, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The bearer token file, e.g. `$EXPENSE_CLIENT_HOME/.secrets/token.json`.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenFile {
    token: String,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored token, or `None` if there is no token file. An unreadable token file is treated
    /// as no token.
    pub async fn load(&self) -> Result<Option<String>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        match utils::deserialize::<TokenFile>(&self.path).await {
            Ok(file) if !file.token.is_empty() => Ok(Some(file.token)),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!("Ignoring the token file: {e:#}");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            utils::make_dir(parent).await?;
        }
        let data = serde_json::to_string_pretty(&TokenFile {
            token: token.to_string(),
        })
        .context("Unable to serialize the token")?;
        utils::write(&self.path, data).await?;
        debug!("Saved the token to {}", self.path.display());
        Ok(())
    }

    /// Removes the token file. Clearing when there is no token is not an error.
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!("Removed the token at {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Unable to remove the token at {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_token_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join(".secrets").join("token.json"));
        assert_eq!(store.load().await.unwrap(), None);

        store.save("abc123").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("abc123"));

        store.clear().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_token_is_no_token() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        utils::write(&path, "not json").await.unwrap();
        let store = TokenStore::new(path);
        assert_eq!(store.load().await.unwrap(), None);
    }
}
