//! Command handlers for the expense CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod auth;
mod categories;
mod dashboard;
mod expenses;
mod init;
mod prefs;

use crate::api::{self, Backend, Mode};
use crate::controllers::{Confirm, DEFAULT_DEBOUNCE};
use crate::error::{normalize, ApiError};
use crate::forms::ValidationError;
use crate::model::Preferences;
use crate::preferences::PreferencesFile;
use crate::store::Store;
use crate::{Config, Error, Result};
use serde::Serialize;
use std::fmt::Debug;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub use auth::{health, login, logout};
pub use categories::{add_category, delete_category, list_categories, update_category};
pub use dashboard::{dashboard, monthly_stats};
pub use expenses::{add_expense, delete_expense, export_expenses, list_expenses, update_expense};
pub use init::init;
pub use prefs::{set_prefs, show_prefs};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// What a command needs to drive a page: a store seeded with the saved preferences, a backend and
/// the configured search delay.
pub(crate) struct Session {
    pub(crate) store: Store,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) search_debounce: Duration,
}

impl Session {
    pub(crate) async fn open(config: &Config, mode: Mode) -> Result<Self> {
        let preferences = PreferencesFile::new(config.preferences_path()).load().await;
        let backend = api::backend(config, mode).await?;
        let mut session = Self::with_backend(preferences, backend);
        session.search_debounce = config.search_debounce();
        Ok(session)
    }

    pub(crate) fn with_backend(preferences: Preferences, backend: Arc<dyn Backend>) -> Self {
        Self {
            store: Store::with_preferences(preferences),
            backend,
            search_debounce: DEFAULT_DEBOUNCE,
        }
    }

    pub(crate) fn currency(&self) -> String {
        self.store.state().preferences.currency.clone()
    }
}

/// Puts the message a user should see on top of a failure. Form errors already read well.
pub(crate) fn user_error(e: Error) -> Error {
    if e.downcast_ref::<ValidationError>().is_some() {
        return e;
    }
    let unauthorized = e
        .chain()
        .filter_map(|cause| cause.downcast_ref::<ApiError>())
        .any(ApiError::is_unauthorized);
    if unauthorized {
        return e.context("Authentication required, run 'expense login' with a valid token");
    }
    let message = normalize(&e);
    e.context(message)
}

/// Asks on stderr and reads the answer from stdin. Only `y` or `yes` approve.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Prompt;

impl Confirm for Prompt {
    fn confirm(&self, prompt: &str) -> bool {
        let mut stderr = std::io::stderr();
        if write!(stderr, "{prompt} [y/N] ").and_then(|_| stderr.flush()).is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// The confirmation to use for a delete command.
pub(crate) fn confirmation(yes: bool) -> Arc<dyn Confirm> {
    if yes {
        Arc::new(crate::controllers::AssumeYes)
    } else {
        Arc::new(Prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn test_user_error_prefers_backend_message() {
        let e: Error = ApiError::from_response(422, r#"{"message": "Nope"}"#).into();
        assert_eq!(user_error(e).to_string(), "Nope");

        let e: Error = ApiError::from_response(401, "{}").into();
        assert!(user_error(e).to_string().contains("expense login"));

        let e: Error = ApiError::Transport("connection refused".to_string()).into();
        assert_eq!(user_error(e).to_string(), crate::error::FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_session_uses_config() {
        let env = crate::test::TestEnv::new().await;
        let session = Session::open(&env.config(), Mode::Test).await.unwrap();
        assert_eq!(session.search_debounce, env.config().search_debounce());
        assert_eq!(session.currency(), "USD");
    }

    #[test]
    fn test_out_message() {
        let out: Out<()> = "done".into();
        assert_eq!(out.message(), "done");
        assert!(out.structure().is_none());
        let out = Out::new("one", vec![1]);
        assert_eq!(out.structure(), Some(&vec![1]));
    }
}
