use crate::args::SetPrefsArgs;
use crate::commands::Out;
use crate::format::capitalize;
use crate::model::Preferences;
use crate::preferences::PreferencesFile;
use crate::store::Store;
use crate::{Config, Result};
use anyhow::Context;

/// Prints the saved preferences, or the defaults if none were saved.
pub async fn show_prefs(config: &Config) -> Result<Out<Preferences>> {
    let preferences = PreferencesFile::new(config.preferences_path()).load().await;
    Ok(Out::new(describe(&preferences), preferences))
}

/// Merges the given values into the saved preferences and saves them.
pub async fn set_prefs(config: &Config, args: &SetPrefsArgs) -> Result<Out<Preferences>> {
    let patch = args.patch();
    if let Some(items_per_page) = patch.items_per_page {
        anyhow::ensure!(items_per_page > 0, "items-per-page must be at least 1");
    }
    if let Some(currency) = &patch.currency {
        anyhow::ensure!(
            currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()),
            "The currency must be a three-letter code such as USD, got '{currency}'"
        );
    }

    let file = PreferencesFile::new(config.preferences_path());
    let store = Store::with_preferences(file.load().await);
    store.preferences().set_preferences(patch);
    let preferences = store.state().preferences.as_ref().clone();
    file.save(&preferences)
        .await
        .context("Unable to save the preferences")?;
    Ok(Out::new(describe(&preferences), preferences))
}

fn describe(p: &Preferences) -> String {
    format!(
        "theme: {}, items per page: {}, currency: {}",
        capitalize(&p.theme.to_string()),
        p.items_per_page,
        p.currency
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Theme;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_show_defaults() {
        let env = TestEnv::new().await;
        let out = show_prefs(&env.config()).await.unwrap();
        assert_eq!(out.message(), "theme: Light, items per page: 15, currency: USD");
    }

    #[tokio::test]
    async fn test_set_merges_and_saves() {
        let env = TestEnv::new().await;
        let config = env.config();
        set_prefs(&config, &SetPrefsArgs::new(Some(Theme::Dark), None, None))
            .await
            .unwrap();
        let out = set_prefs(&config, &SetPrefsArgs::new(None, Some(25), Some("eur".to_string())))
            .await
            .unwrap();
        assert_eq!(out.message(), "theme: Dark, items per page: 25, currency: EUR");
        assert_eq!(show_prefs(&config).await.unwrap().message(), out.message());
    }

    #[tokio::test]
    async fn test_set_rejects_bad_values() {
        let env = TestEnv::new().await;
        let config = env.config();
        assert!(set_prefs(&config, &SetPrefsArgs::new(None, Some(0), None))
            .await
            .is_err());
        assert!(
            set_prefs(&config, &SetPrefsArgs::new(None, None, Some("dollars".to_string())))
                .await
                .is_err()
        );
        assert!(!config.preferences_path().exists());
    }
}
