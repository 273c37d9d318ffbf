use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the client home directory and an initial `config.json` pointing at `api_url`.
///
/// # Errors
/// - Returns an error if `api_url` is not a URL or if any file operations fail.
pub async fn init(home: &Path, api_url: &str) -> Result<Out<()>> {
    let config = Config::create(home, api_url)
        .await
        .context("Unable to create the client home directory and config")?;
    Ok(format!(
        "Successfully created the client home at {} using the API at {}",
        config.root().display(),
        config.api_url()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let out = init(&home, "http://localhost:8000/api").await.unwrap();
        assert!(out.message().starts_with("Successfully created"));
        assert!(Config::load(&home).await.is_ok());
    }
}
