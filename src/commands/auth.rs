//! Token and connectivity commands.
//!
//! - `expense login` stores the bearer token
//! - `expense logout` removes it
//! - `expense health` checks that the backend answers

use crate::api::{self, Mode, TokenStore};
use crate::commands::{user_error, Out};
use crate::{Config, Result};
use anyhow::Context;

/// Saves `token` so that subsequent commands authenticate with it.
pub async fn login(config: &Config, token: &str) -> Result<Out<()>> {
    let token = token.trim();
    anyhow::ensure!(!token.is_empty(), "The token must not be empty");
    TokenStore::new(config.token_path())
        .save(token)
        .await
        .context("Unable to save the token")?;
    Ok("Token saved".into())
}

/// Removes the stored token. Succeeds when there is none.
pub async fn logout(config: &Config) -> Result<Out<()>> {
    TokenStore::new(config.token_path())
        .clear()
        .await
        .context("Unable to remove the token")?;
    Ok("Logged out".into())
}

/// Calls the backend's health endpoint.
pub async fn health(config: &Config, mode: Mode) -> Result<Out<serde_json::Value>> {
    let backend = api::backend(config, mode).await?;
    let report = backend.health().await.map_err(user_error)?;
    let status = report
        .get("status")
        .and_then(|s| s.as_str())
        .unwrap_or("unknown")
        .to_string();
    Ok(Out::new(
        format!("The API at {} reports status '{status}'", config.api_url()),
        report,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_login_logout() {
        let env = TestEnv::new().await;
        let config = env.config();
        let tokens = TokenStore::new(config.token_path());

        assert!(login(&config, "  ").await.is_err());
        login(&config, " secret-token\n").await.unwrap();
        assert_eq!(tokens.load().await.unwrap().as_deref(), Some("secret-token"));

        logout(&config).await.unwrap();
        assert_eq!(tokens.load().await.unwrap(), None);
        logout(&config).await.unwrap();
    }

    #[tokio::test]
    async fn test_health_in_test_mode() {
        let env = TestEnv::new().await;
        let out = health(&env.config(), Mode::Test).await.unwrap();
        assert!(out.message().ends_with("reports status 'ok'"));
        assert_eq!(out.structure().unwrap()["backend"], "in-memory");
    }
}
