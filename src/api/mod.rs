//! The seam between the client and the expense backend.
//!
//! `Backend` is implemented by `HttpBackend`, which talks to the REST API, and by `TestBackend`,
//! which keeps seeded data in memory. `TestBackend` is compiled into the production binary so that
//! the whole program can be run top-to-bottom without a server; set `EXPENSE_CLIENT_IN_TEST_MODE`
//! to a non-empty value to select it.

mod http;
mod test_backend;
mod token;

use crate::model::{
    Category, CategoryPayload, DashboardData, Expense, ExpensePayload, Filters, Id, Page,
};
use crate::{Config, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::debug;

pub(crate) use http::HttpBackend;
pub use test_backend::TestBackend;
pub use token::TokenStore;

/// The environment variable that, when non-empty, selects `Mode::Test`.
pub const TEST_MODE_ENV: &str = "EXPENSE_CLIENT_IN_TEST_MODE";

/// Every request the client makes to the backend.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    /// One page of expenses matching `filters`.
    async fn list_expenses(&self, filters: &Filters, page: u32) -> Result<Page<Expense>>;

    async fn get_expense(&self, id: Id) -> Result<Expense>;

    /// Creates an expense and returns it as stored by the backend.
    async fn create_expense(&self, payload: &ExpensePayload) -> Result<Expense>;

    /// Updates an expense and returns it as stored by the backend.
    async fn update_expense(&self, id: Id, payload: &ExpensePayload) -> Result<Expense>;

    async fn delete_expense(&self, id: Id) -> Result<()>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn get_category(&self, id: Id) -> Result<Category>;

    async fn create_category(&self, payload: &CategoryPayload) -> Result<Category>;

    async fn update_category(&self, id: Id, payload: &CategoryPayload) -> Result<Category>;

    async fn delete_category(&self, id: Id) -> Result<()>;

    /// Aggregates for the dashboard. A missing bound leaves the range open on that side.
    async fn dashboard(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<DashboardData>;

    /// Per-month statistics for `year`. The shape is backend-defined.
    async fn monthly_stats(&self, year: i32) -> Result<serde_json::Value>;

    /// The backend's health report. The shape is backend-defined.
    async fn health(&self) -> Result<serde_json::Value>;
}

/// Which `Backend` implementation to use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Http,
    Test,
}

impl Mode {
    /// `Mode::Test` when `EXPENSE_CLIENT_IN_TEST_MODE` is set and non-empty, otherwise
    /// `Mode::Http`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Http,
        }
    }
}

/// Creates the backend for `mode`.
pub async fn backend(config: &Config, mode: Mode) -> Result<Arc<dyn Backend>> {
    debug!("Creating the {mode:?} backend");
    match mode {
        Mode::Http => {
            let tokens = TokenStore::new(config.token_path());
            let backend = HttpBackend::new(config.api_url(), config.timeout(), tokens).await?;
            Ok(Arc::new(backend))
        }
        Mode::Test => Ok(Arc::new(TestBackend::default())),
    }
}

/// Drops parameters whose value is empty; the backend treats a present-but-empty parameter as a
/// filter on the empty string.
pub(crate) fn clean_params<I>(params: I) -> Vec<(&'static str, String)>
where
    I: IntoIterator<Item = (&'static str, String)>,
{
    params
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .collect()
}

/// The query parameters for an expense list request.
pub(crate) fn expense_params(filters: &Filters, page: u32) -> Vec<(&'static str, String)> {
    let mut params = filters.query_pairs();
    params.push(("page", page.max(1).to_string()));
    clean_params(params)
}

/// The query parameters for a dashboard request.
pub(crate) fn dashboard_params(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Vec<(&'static str, String)> {
    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    clean_params([("start_date", date(start_date)), ("end_date", date(end_date))])
}
