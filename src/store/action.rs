//! The complete set of state transitions.

use crate::model::{
    Category, DashboardData, Expense, FiltersPatch, Id, Page, PreferencesPatch,
};
use crate::store::{ErrorKey, LoadingKey, Modal};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A state transition request. Actions travel as `{"type": "ADD_EXPENSE", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    SetLoading {
        key: LoadingKey,
        value: bool,
    },
    SetError {
        key: ErrorKey,
        message: String,
    },
    ClearError {
        key: ErrorKey,
    },
    ClearAllErrors,
    SetExpenses(Page<Expense>),
    SetCategories(Vec<Category>),
    SetDashboardData(DashboardData),
    AddExpense(Expense),
    UpdateExpense(Expense),
    DeleteExpense(Id),
    AddCategory(Category),
    UpdateCategory(Category),
    DeleteCategory(Id),
    SetFilters(FiltersPatch),
    ResetFilters,
    SetModalState(Modal),
    ResetModals,
    SetPreferences(PreferencesPatch),
    ResetState,
    /// An action whose type this client does not know. Reducing it changes nothing.
    #[serde(skip)]
    Unknown(String),
}

/// The `type` tag of each known action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    SetLoading,
    SetError,
    ClearError,
    ClearAllErrors,
    SetExpenses,
    SetCategories,
    SetDashboardData,
    AddExpense,
    UpdateExpense,
    DeleteExpense,
    AddCategory,
    UpdateCategory,
    DeleteCategory,
    SetFilters,
    ResetFilters,
    SetModalState,
    ResetModals,
    SetPreferences,
    ResetState,
}

serde_plain::derive_display_from_serialize!(ActionKind);
serde_plain::derive_fromstr_from_deserialize!(ActionKind);

impl Action {
    /// Decodes an action from JSON. An unrecognized `type` yields `Action::Unknown` rather than an
    /// error; a recognized type with a malformed payload is an error.
    pub fn from_json(json: &str) -> Result<Action> {
        let value: serde_json::Value =
            serde_json::from_str(json).context("Action is not valid JSON")?;
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .context("Action has no string 'type'")?;
        if ActionKind::from_str(kind).is_err() {
            return Ok(Action::Unknown(kind.to_string()));
        }
        let kind = kind.to_string();
        serde_json::from_value(value).with_context(|| format!("Invalid payload for {kind}"))
    }

    pub fn kind(&self) -> Option<ActionKind> {
        let kind = match self {
            Action::SetLoading { .. } => ActionKind::SetLoading,
            Action::SetError { .. } => ActionKind::SetError,
            Action::ClearError { .. } => ActionKind::ClearError,
            Action::ClearAllErrors => ActionKind::ClearAllErrors,
            Action::SetExpenses(_) => ActionKind::SetExpenses,
            Action::SetCategories(_) => ActionKind::SetCategories,
            Action::SetDashboardData(_) => ActionKind::SetDashboardData,
            Action::AddExpense(_) => ActionKind::AddExpense,
            Action::UpdateExpense(_) => ActionKind::UpdateExpense,
            Action::DeleteExpense(_) => ActionKind::DeleteExpense,
            Action::AddCategory(_) => ActionKind::AddCategory,
            Action::UpdateCategory(_) => ActionKind::UpdateCategory,
            Action::DeleteCategory(_) => ActionKind::DeleteCategory,
            Action::SetFilters(_) => ActionKind::SetFilters,
            Action::ResetFilters => ActionKind::ResetFilters,
            Action::SetModalState(_) => ActionKind::SetModalState,
            Action::ResetModals => ActionKind::ResetModals,
            Action::SetPreferences(_) => ActionKind::SetPreferences,
            Action::ResetState => ActionKind::ResetState,
            Action::Unknown(_) => return None,
        };
        Some(kind)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (self.kind(), self) {
            (Some(kind), _) => Display::fmt(&kind, f),
            (None, Action::Unknown(name)) => write!(f, "{name} (unknown)"),
            (None, _) => f.write_str("UNKNOWN"),
        }
    }
}
