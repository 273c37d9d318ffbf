use crate::model::page::DEFAULT_PER_PAGE;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

serde_plain::derive_display_from_serialize!(Theme);
serde_plain::derive_fromstr_from_deserialize!(Theme);

/// User preferences. These never leave the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            items_per_page: DEFAULT_PER_PAGE,
            currency: default_currency(),
        }
    }
}

impl Preferences {
    /// Returns a copy of `self` with every field that `patch` sets replaced.
    pub fn merged(&self, patch: &PreferencesPatch) -> Preferences {
        Preferences {
            theme: patch.theme.unwrap_or(self.theme),
            items_per_page: patch.items_per_page.unwrap_or(self.items_per_page),
            currency: patch
                .currency
                .clone()
                .unwrap_or_else(|| self.currency.clone()),
        }
    }
}

/// A partial preferences update.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items_per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

fn default_items_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn default_currency() -> String {
    "USD".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Preferences::default();
        assert_eq!(p.theme, Theme::Light);
        assert_eq!(p.items_per_page, 15);
        assert_eq!(p.currency, "USD");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let p: Preferences = serde_json::from_str(r#"{"theme": "dark"}"#).unwrap();
        assert_eq!(p.theme, Theme::Dark);
        assert_eq!(p.items_per_page, 15);
        assert_eq!(p.currency, "USD");
    }

    #[test]
    fn test_merge() {
        let patch = PreferencesPatch {
            currency: Some("EUR".to_string()),
            ..Default::default()
        };
        let p = Preferences::default().merged(&patch);
        assert_eq!(p.currency, "EUR");
        assert_eq!(p.theme, Theme::Light);
    }
}
