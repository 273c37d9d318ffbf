use crate::model::{Category, DashboardData, Expense, Filters, Id, Page, Preferences};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The whole application state tree.
///
/// Each slice lives behind an `Arc`. A transition replaces only the slices it touches, so an
/// observer can tell whether a slice changed with `Arc::ptr_eq`. Equality (`==`) compares values.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub expenses: Arc<Page<Expense>>,
    pub categories: Arc<Vec<Category>>,
    pub dashboard: Option<Arc<DashboardData>>,
    pub loading: Loading,
    pub error: Arc<Errors>,
    pub filters: Arc<Filters>,
    pub modal: Modal,
    pub preferences: Arc<Preferences>,
}

impl Default for AppState {
    /// The initial state: no data, nothing loading, no errors, initial filters, no dialog open and
    /// default preferences.
    fn default() -> Self {
        Self {
            expenses: Arc::new(Page::default()),
            categories: Arc::new(Vec::new()),
            dashboard: None,
            loading: Loading::default(),
            error: Arc::new(Errors::default()),
            filters: Arc::new(Filters::default()),
            modal: Modal::Closed,
            preferences: Arc::new(Preferences::default()),
        }
    }
}

impl AppState {
    /// The initial state with `preferences` loaded from client storage.
    pub fn with_preferences(preferences: Preferences) -> Self {
        Self {
            preferences: Arc::new(preferences),
            ..Self::default()
        }
    }

    pub fn find_expense(&self, id: Id) -> Option<&Expense> {
        self.expenses.data.iter().find(|e| e.id == id)
    }

    pub fn find_category(&self, id: Id) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }
}

/// The slices that have a loading flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingKey {
    Expenses,
    Categories,
    Dashboard,
}

serde_plain::derive_display_from_serialize!(LoadingKey);

/// The error slots. `General` is for failures that belong to no particular page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKey {
    Expenses,
    Categories,
    Dashboard,
    General,
}

serde_plain::derive_display_from_serialize!(ErrorKey);

/// Independent loading flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loading {
    pub expenses: bool,
    pub categories: bool,
    pub dashboard: bool,
}

impl Loading {
    pub fn get(&self, key: LoadingKey) -> bool {
        match key {
            LoadingKey::Expenses => self.expenses,
            LoadingKey::Categories => self.categories,
            LoadingKey::Dashboard => self.dashboard,
        }
    }

    pub(crate) fn set(&mut self, key: LoadingKey, value: bool) {
        match key {
            LoadingKey::Expenses => self.expenses = value,
            LoadingKey::Categories => self.categories = value,
            LoadingKey::Dashboard => self.dashboard = value,
        }
    }
}

/// Independent error messages, already normalized for display.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Errors {
    pub expenses: Option<String>,
    pub categories: Option<String>,
    pub dashboard: Option<String>,
    pub general: Option<String>,
}

impl Errors {
    pub fn get(&self, key: ErrorKey) -> Option<&str> {
        match key {
            ErrorKey::Expenses => self.expenses.as_deref(),
            ErrorKey::Categories => self.categories.as_deref(),
            ErrorKey::Dashboard => self.dashboard.as_deref(),
            ErrorKey::General => self.general.as_deref(),
        }
    }

    pub(crate) fn with(&self, key: ErrorKey, message: Option<String>) -> Errors {
        let mut next = self.clone();
        let slot = match key {
            ErrorKey::Expenses => &mut next.expenses,
            ErrorKey::Categories => &mut next.categories,
            ErrorKey::Dashboard => &mut next.dashboard,
            ErrorKey::General => &mut next.general,
        };
        *slot = message;
        next
    }
}

/// Which form dialog is open. At most one can be open; `None` inside a variant means the form is
/// creating rather than editing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Modal {
    #[default]
    Closed,
    ExpenseForm { editing: Option<Id> },
    CategoryForm { editing: Option<Id> },
}

impl Modal {
    pub fn is_open(&self) -> bool {
        !matches!(self, Modal::Closed)
    }

    /// The expense being edited, if the expense form is open in edit mode.
    pub fn editing_expense(&self) -> Option<Id> {
        match self {
            Modal::ExpenseForm { editing } => *editing,
            _ => None,
        }
    }

    /// The category being edited, if the category form is open in edit mode.
    pub fn editing_category(&self) -> Option<Id> {
        match self {
            Modal::CategoryForm { editing } => *editing,
            _ => None,
        }
    }
}
