use crate::api::Backend;
use crate::controllers::{Fetch, RequestSeq};
use crate::error::normalize;
use crate::store::Store;
use crate::Result;
use chrono::{Datelike, Months, NaiveDate};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, error};

/// The period the dashboard summarizes. Either bound may be open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl DateRange {
    /// The calendar month containing `today`.
    pub fn current_month(today: NaiveDate) -> Self {
        let first = today.with_day(1).unwrap_or(today);
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(today);
        Self {
            start_date: Some(first),
            end_date: Some(last),
        }
    }
}

/// Drives the dashboard page.
pub struct DashboardController {
    store: Store,
    backend: Arc<dyn Backend>,
    range: Mutex<DateRange>,
    seq: RequestSeq,
}

impl DashboardController {
    /// A controller showing the month containing `today`.
    pub fn new(store: Store, backend: Arc<dyn Backend>, today: NaiveDate) -> Self {
        Self {
            store,
            backend,
            range: Mutex::new(DateRange::current_month(today)),
            seq: RequestSeq::default(),
        }
    }

    /// Starts from `range` instead of the current month.
    pub fn with_range(self, range: DateRange) -> Self {
        self.update_range(|r| *r = range);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn range(&self) -> DateRange {
        *self.range.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_range(&self, f: impl FnOnce(&mut DateRange)) {
        f(&mut self.range.lock().unwrap_or_else(PoisonError::into_inner));
    }

    pub async fn mount(&self) -> Result<Fetch> {
        self.store.dashboard().clear_error();
        self.refresh().await
    }

    /// Fetches the dashboard for the current range. Only the response to the latest call is
    /// committed.
    pub async fn refresh(&self) -> Result<Fetch> {
        let ticket = self.seq.issue();
        let view = self.store.dashboard();
        view.set_loading(true);
        view.clear_error();
        let range = self.range();
        debug!("Fetching dashboard for {range:?}");

        let result = self
            .backend
            .dashboard(range.start_date, range.end_date)
            .await;
        if !self.seq.is_current(ticket) {
            return Ok(Fetch::Stale);
        }
        let outcome = match result {
            Ok(data) => {
                view.set_dashboard_data(data);
                Ok(Fetch::Applied)
            }
            Err(e) => {
                error!("Error fetching dashboard data: {e:#}");
                view.set_error(normalize(&e));
                Err(e)
            }
        };
        view.set_loading(false);
        outcome
    }

    pub async fn set_start_date(&self, date: Option<NaiveDate>) -> Result<Fetch> {
        self.update_range(|r| r.start_date = date);
        self.refresh().await
    }

    pub async fn set_end_date(&self, date: Option<NaiveDate>) -> Result<Fetch> {
        self.update_range(|r| r.end_date = date);
        self.refresh().await
    }

    /// Per-month statistics for `year`. Not kept in the store.
    pub async fn monthly_stats(&self, year: i32) -> Result<serde_json::Value> {
        self.backend.monthly_stats(year).await.inspect_err(|e| {
            error!("Error fetching monthly stats: {e:#}");
            self.store.dashboard().set_error(normalize(e));
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestBackend;
    use serde_json::json;
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (Arc<TestBackend>, DashboardController) {
        let backend = Arc::new(TestBackend::default());
        let controller =
            DashboardController::new(Store::default(), backend.clone(), date(2025, 10, 21));
        (backend, controller)
    }

    #[test]
    fn test_current_month() {
        let range = DateRange::current_month(date(2024, 2, 10));
        assert_eq!(range.start_date, Some(date(2024, 2, 1)));
        assert_eq!(range.end_date, Some(date(2024, 2, 29)));
        let range = DateRange::current_month(date(2025, 12, 31));
        assert_eq!(range.end_date, Some(date(2025, 12, 31)));
    }

    #[tokio::test]
    async fn test_mount_loads_current_month() {
        let (_, controller) = setup();
        assert_eq!(controller.mount().await.unwrap(), Fetch::Applied);
        let state = controller.store().state();
        let data = state.dashboard.as_deref().unwrap();
        assert_eq!(data.summary.total_count, 14);
        assert_eq!(data.summary.total_expenses.to_string(), "866.06");
        let shares = data.category_shares();
        assert_eq!(shares[0].0.category.name, "Groceries");
        assert!(!state.loading.dashboard);
    }

    #[tokio::test]
    async fn test_with_range() {
        let (backend, controller) = setup();
        let range = DateRange {
            start_date: Some(date(2025, 9, 1)),
            end_date: Some(date(2025, 9, 30)),
        };
        let controller = controller.with_range(range);
        controller.mount().await.unwrap();
        assert_eq!(controller.range(), range);
        let state = controller.store().state();
        assert_eq!(state.dashboard.as_ref().unwrap().summary.total_count, 3);
        assert_eq!(backend.calls(), vec!["dashboard"]);
    }

    #[tokio::test]
    async fn test_range_change_refetches() {
        let (_, controller) = setup();
        controller.mount().await.unwrap();
        controller
            .set_start_date(Some(date(2025, 9, 1)))
            .await
            .unwrap();
        let state = controller.store().state();
        assert_eq!(state.dashboard.as_ref().unwrap().summary.total_count, 17);

        controller.set_end_date(None).await.unwrap();
        assert_eq!(controller.range().end_date, None);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_data() {
        let (backend, controller) = setup();
        controller.mount().await.unwrap();
        let before = controller.store().state();
        backend.fail_next(500, json!({"message": "Dashboard exploded"}));
        assert!(controller.refresh().await.is_err());
        let after = controller.store().state();
        assert_eq!(after.error.dashboard.as_deref(), Some("Dashboard exploded"));
        assert_eq!(after.dashboard, before.dashboard);
        assert!(!after.loading.dashboard);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_dropped() {
        let (backend, controller) = setup();
        let controller = Arc::new(controller);
        backend.delay_next(Duration::from_millis(200));
        let slow = {
            let c = controller.clone();
            tokio::spawn(async move { c.refresh().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(
            controller.set_start_date(None).await.unwrap(),
            Fetch::Applied
        );
        assert_eq!(slow.await.unwrap().unwrap(), Fetch::Stale);
        // The open range covers September too.
        let state = controller.store().state();
        assert_eq!(state.dashboard.as_ref().unwrap().summary.total_count, 17);
    }

    #[tokio::test]
    async fn test_monthly_stats() {
        let (_, controller) = setup();
        let stats = controller.monthly_stats(2025).await.unwrap();
        assert_eq!(stats["year"], 2025);
        assert_eq!(stats["months"][9]["count"], 14);
        assert_eq!(stats["months"][8]["count"], 3);
    }
}
