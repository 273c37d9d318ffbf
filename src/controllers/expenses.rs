use crate::api::Backend;
use crate::controllers::{Confirm, Debouncer, DeleteOutcome, Fetch, Pagination, RequestSeq};
use crate::error::normalize;
use crate::export;
use crate::forms::ExpenseForm;
use crate::model::{Expense, FiltersPatch, Id};
use crate::store::{Action, Modal, Store};
use crate::Result;
use anyhow::Context;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Preset date ranges ending today.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum QuickFilter {
    Today,
    /// Since the most recent Sunday.
    Week,
    Month,
    Year,
}

serde_plain::derive_display_from_serialize!(QuickFilter);
serde_plain::derive_fromstr_from_deserialize!(QuickFilter);

impl QuickFilter {
    /// The inclusive `(start, end)` range relative to `today`.
    pub fn range(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = match self {
            QuickFilter::Today => today,
            QuickFilter::Week => {
                today - Days::new(u64::from(today.weekday().num_days_from_sunday()))
            }
            QuickFilter::Month => today.with_day(1).unwrap_or(today),
            QuickFilter::Year => today.with_ordinal(1).unwrap_or(today),
        };
        (start, today)
    }
}

/// Drives the expenses page: the filtered, paginated list and the expense form.
pub struct ExpensesController {
    store: Store,
    backend: Arc<dyn Backend>,
    confirm: Arc<dyn Confirm>,
    pagination: Mutex<Pagination>,
    expenses_seq: RequestSeq,
    categories_seq: RequestSeq,
    debouncer: Debouncer,
}

impl ExpensesController {
    pub fn new(store: Store, backend: Arc<dyn Backend>, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            store,
            backend,
            confirm,
            pagination: Mutex::new(Pagination::default()),
            expenses_seq: RequestSeq::default(),
            categories_seq: RequestSeq::default(),
            debouncer: Debouncer::default(),
        }
    }

    /// Replaces the search debounce delay.
    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = Debouncer::new(delay);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn search_debounce(&self) -> Duration {
        self.debouncer.delay()
    }

    pub fn current_page(&self) -> u32 {
        self.pagination().current_page()
    }

    fn pagination(&self) -> std::sync::MutexGuard<'_, Pagination> {
        self.pagination
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears the page error and loads the categories (for the filter and the form) and the first
    /// list of expenses.
    pub async fn mount(&self) -> Result<Fetch> {
        self.store.expenses().clear_error();
        self.load_categories().await;
        self.refresh().await
    }

    /// Categories only feed the filter and the form here, so a failure is logged and not shown.
    async fn load_categories(&self) {
        let ticket = self.categories_seq.issue();
        let view = self.store.categories();
        view.set_loading(true);
        let result = self.backend.list_categories().await;
        if !self.categories_seq.is_current(ticket) {
            return;
        }
        match result {
            Ok(categories) => view.set_categories(categories),
            Err(e) => error!("Error fetching categories: {e:#}"),
        }
        view.set_loading(false);
    }

    /// Fetches the current page for the current filters. Only the response to the latest call is
    /// committed.
    pub async fn refresh(&self) -> Result<Fetch> {
        let ticket = self.expenses_seq.issue();
        let view = self.store.expenses();
        view.set_loading(true);
        view.clear_error();
        let filters = Arc::clone(&self.store.state().filters);
        let page = self.current_page();
        debug!("Fetching expenses page {page} with {filters:?}");

        let result = self.backend.list_expenses(&filters, page).await;
        if !self.expenses_seq.is_current(ticket) {
            debug!("Discarding a stale expenses response for page {page}");
            return Ok(Fetch::Stale);
        }
        let outcome = match result {
            Ok(expenses) => {
                view.set_expenses(expenses);
                Ok(Fetch::Applied)
            }
            Err(e) => {
                error!("Error fetching expenses: {e:#}");
                view.set_error(normalize(&e));
                Err(e)
            }
        };
        view.set_loading(false);
        outcome
    }

    /// Merges `patch` into the filters, returns to the first page and fetches.
    pub async fn change_filters(&self, patch: FiltersPatch) -> Result<Fetch> {
        self.store.filters().set_filters(patch);
        self.pagination().reset();
        self.refresh().await
    }

    /// Restores the initial filters, returns to the first page and fetches.
    pub async fn clear_filters(&self) -> Result<Fetch> {
        self.store.filters().reset_filters();
        self.pagination().reset();
        self.refresh().await
    }

    /// Applies a preset date range.
    pub async fn quick_filter(&self, filter: QuickFilter, today: NaiveDate) -> Result<Fetch> {
        let (start, end) = filter.range(today);
        self.change_filters(
            FiltersPatch::default()
                .start_date(Some(start))
                .end_date(Some(end)),
        )
        .await
    }

    /// Applies a search string once typing has paused. Returns `None` when a later call superseded
    /// this one or the text is already applied.
    pub async fn search(&self, text: &str) -> Result<Option<Fetch>> {
        if !self.debouncer.settle().await {
            return Ok(None);
        }
        if self.store.state().filters.search == text {
            return Ok(None);
        }
        self.change_filters(FiltersPatch::default().search(text))
            .await
            .map(Some)
    }

    pub async fn go_to_page(&self, page: u32) -> Result<Fetch> {
        self.pagination().go_to(page);
        self.refresh().await
    }

    /// Moves to the next page if the last response says there is one.
    pub async fn next_page(&self) -> Result<Option<Fetch>> {
        if !self.store.state().expenses.has_next() {
            return Ok(None);
        }
        self.pagination().next();
        self.refresh().await.map(Some)
    }

    pub async fn prev_page(&self) -> Result<Option<Fetch>> {
        if !self.store.state().expenses.has_prev() {
            return Ok(None);
        }
        self.pagination().prev();
        self.refresh().await.map(Some)
    }

    pub fn open_create(&self) {
        self.store.modals().open_expense_form(None);
    }

    pub fn open_edit(&self, id: Id) {
        self.store.modals().open_expense_form(Some(id));
    }

    pub fn close_form(&self) {
        self.store.modals().reset_modals();
    }

    /// The form for the open dialog: prefilled when editing a loaded expense, otherwise empty and
    /// dated `today`.
    pub fn form(&self, today: NaiveDate) -> ExpenseForm {
        let state = self.store.state();
        state
            .modal
            .editing_expense()
            .and_then(|id| state.find_expense(id))
            .map(ExpenseForm::from_expense)
            .unwrap_or_else(|| ExpenseForm::new(today))
    }

    /// Validates `form` and creates or updates the expense, depending on the open dialog. The
    /// backend's copy of the expense is committed and the dialog is closed. A create made from a
    /// page other than the first returns to the first page.
    pub async fn submit(&self, form: &ExpenseForm, today: NaiveDate) -> Result<Expense> {
        let payload = form.validate(today)?;
        let editing = self.store.state().modal.editing_expense();
        let result = match editing {
            Some(id) => self.backend.update_expense(id, &payload).await,
            None => self.backend.create_expense(&payload).await,
        };
        let expense = match result {
            Ok(expense) => expense,
            Err(e) => {
                error!("Error saving expense: {e:#}");
                self.store.expenses().set_error(normalize(&e));
                return Err(e);
            }
        };

        match editing {
            Some(_) => self.store.dispatch(Action::UpdateExpense(expense.clone())),
            None => self.store.dispatch(Action::AddExpense(expense.clone())),
        }
        self.store.dispatch(Action::SetModalState(Modal::Closed));
        info!("Saved expense {}", expense.id);

        // The expense exists on the server now; a failed reload only affects the list.
        if editing.is_none() && self.current_page() != 1 {
            self.pagination().reset();
            if let Err(e) = self.refresh().await {
                warn!("Expense {} was saved but the list could not be reloaded: {e:#}", expense.id);
            }
        }
        Ok(expense)
    }

    /// Asks for confirmation, then deletes the expense. The list is left untouched on failure.
    pub async fn delete(&self, id: Id) -> Result<DeleteOutcome> {
        if !self
            .confirm
            .confirm("Are you sure you want to delete this expense?")
        {
            return Ok(DeleteOutcome::Cancelled);
        }
        match self.backend.delete_expense(id).await {
            Ok(()) => {
                self.store.expenses().delete_expense(id);
                info!("Expense deleted successfully");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                error!("Error deleting expense: {e:#}");
                self.store.expenses().set_error(normalize(&e));
                Err(e)
            }
        }
    }

    /// Writes every expense matching the current filters, across all pages, to `out` as CSV.
    /// Returns the number of rows written.
    pub async fn export<W: Write>(&self, out: W) -> Result<usize> {
        let filters = Arc::clone(&self.store.state().filters);
        let expenses = export::fetch_all(self.backend.as_ref(), &filters)
            .await
            .context("Unable to fetch the expenses to export")?;
        export::write_csv(out, &expenses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestBackend;
    use crate::controllers::AssumeYes;
    use crate::error::FALLBACK_MESSAGE;
    use crate::model::{Amount, SortBy};
    use serde_json::json;
    use std::str::FromStr;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 21).unwrap()
    }

    fn setup() -> (Arc<TestBackend>, ExpensesController) {
        let backend = Arc::new(TestBackend::default());
        let controller =
            ExpensesController::new(Store::default(), backend.clone(), Arc::new(AssumeYes));
        (backend, controller)
    }

    fn form(title: &str, amount: &str) -> ExpenseForm {
        ExpenseForm {
            title: title.to_string(),
            description: String::new(),
            amount: amount.to_string(),
            expense_date: "2025-10-21".to_string(),
            category_id: "1".to_string(),
        }
    }

    #[test]
    fn test_quick_filter_ranges() {
        // 2025-10-21 is a Tuesday.
        let d = |m, d| NaiveDate::from_ymd_opt(2025, m, d).unwrap();
        assert_eq!(QuickFilter::Today.range(today()), (today(), today()));
        assert_eq!(QuickFilter::Week.range(today()), (d(10, 19), today()));
        assert_eq!(QuickFilter::Month.range(today()), (d(10, 1), today()));
        assert_eq!(QuickFilter::Year.range(today()), (d(1, 1), today()));
    }

    #[tokio::test]
    async fn test_mount_loads_expenses_and_categories() {
        let (_, controller) = setup();
        assert_eq!(controller.mount().await.unwrap(), Fetch::Applied);
        let state = controller.store().state();
        assert_eq!(state.expenses.total, 17);
        assert_eq!(state.categories.len(), 5);
        assert!(!state.loading.expenses);
        assert!(!state.loading.categories);
    }

    #[tokio::test]
    async fn test_filter_change_resets_page() {
        let (backend, controller) = setup();
        controller.mount().await.unwrap();
        controller.go_to_page(2).await.unwrap();
        assert_eq!(controller.store().state().expenses.current_page, 2);

        controller
            .change_filters(FiltersPatch::default().sort_by(SortBy::Amount))
            .await
            .unwrap();
        assert_eq!(controller.current_page(), 1);
        let state = controller.store().state();
        assert_eq!(state.filters.sort_by, SortBy::Amount);
        assert_eq!(state.expenses.data[0].amount.to_string(), "142.67");
        assert_eq!(backend.calls().last().map(String::as_str), Some("list_expenses"));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_data() {
        let (backend, controller) = setup();
        controller.mount().await.unwrap();
        let before = controller.store().state();

        backend.fail_next(500, json!({"message": "Database unavailable"}));
        assert!(controller.refresh().await.is_err());
        let after = controller.store().state();
        assert_eq!(after.error.expenses.as_deref(), Some("Database unavailable"));
        assert!(Arc::ptr_eq(&before.expenses, &after.expenses));
        assert!(!after.loading.expenses);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_responses() {
        let (backend, controller) = setup();
        let controller = Arc::new(controller);
        // The first request is slow, the second fast: the second is issued last and must win.
        backend.delay_next(Duration::from_millis(300));
        backend.delay_next(Duration::from_millis(10));

        let slow = {
            let c = controller.clone();
            tokio::spawn(async move {
                c.change_filters(FiltersPatch::default().category_id(Some(Id::new(1))))
                    .await
            })
        };
        tokio::task::yield_now().await;
        let fast = {
            let c = controller.clone();
            tokio::spawn(async move {
                c.change_filters(FiltersPatch::default().category_id(Some(Id::new(2))))
                    .await
            })
        };

        assert_eq!(fast.await.unwrap().unwrap(), Fetch::Applied);
        assert_eq!(slow.await.unwrap().unwrap(), Fetch::Stale);

        let state = controller.store().state();
        assert_eq!(state.filters.category_id, Some(Id::new(2)));
        assert!(state
            .expenses
            .data
            .iter()
            .all(|e| e.category_id == Id::new(2)));
        assert_eq!(state.expenses.total, 5);
        assert!(!state.loading.expenses);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_is_debounced() {
        let (backend, controller) = setup();
        let controller = Arc::new(controller.with_debounce(Duration::from_millis(500)));

        let mut handles = Vec::new();
        for text in ["b", "bi", "bill"] {
            let c = controller.clone();
            handles.push(tokio::spawn(async move { c.search(text).await }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }
        assert_eq!(results, vec![None, None, Some(Fetch::Applied)]);
        assert_eq!(backend.calls(), vec!["list_expenses"]);
        assert_eq!(controller.store().state().filters.search, "bill");
        assert_eq!(controller.store().state().expenses.total, 2);
    }

    #[tokio::test]
    async fn test_create_commits_server_copy_and_closes_dialog() {
        let (_, controller) = setup();
        controller.mount().await.unwrap();
        controller.open_create();
        let created = controller
            .submit(&form("  Lunch ", "12.5"), today())
            .await
            .unwrap();

        let state = controller.store().state();
        assert_eq!(state.expenses.data[0], created);
        assert_eq!(state.expenses.data[0].title, "Lunch");
        assert_eq!(state.expenses.data[0].category_name(), "Groceries");
        assert_eq!(state.expenses.total, 18);
        assert_eq!(state.modal, Modal::Closed);
    }

    #[tokio::test]
    async fn test_create_from_later_page_returns_to_first() {
        let (_, controller) = setup();
        controller.mount().await.unwrap();
        controller.go_to_page(2).await.unwrap();
        controller.open_create();
        controller
            .submit(&form("Lunch", "12.5"), today())
            .await
            .unwrap();
        assert_eq!(controller.current_page(), 1);
        assert_eq!(controller.store().state().expenses.current_page, 1);
    }

    #[tokio::test]
    async fn test_create_succeeds_when_reload_fails() {
        let (backend, controller) = setup();
        controller.mount().await.unwrap();
        controller.go_to_page(2).await.unwrap();
        controller.open_create();
        backend.pass_next();
        backend.fail_next(500, json!({}));

        let created = controller
            .submit(&form("Lunch", "12.5"), today())
            .await
            .unwrap();
        assert_eq!(created.title, "Lunch");

        let state = controller.store().state();
        assert!(!state.modal.is_open());
        assert_eq!(state.expenses.total, 18);
        assert_eq!(state.error.expenses.as_deref(), Some(FALLBACK_MESSAGE));
        assert_eq!(controller.current_page(), 1);
        assert_eq!(
            backend.calls().iter().filter(|c| *c == "create_expense").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_edit_prefills_and_updates() {
        let (_, controller) = setup();
        controller.mount().await.unwrap();
        let id = controller.store().state().expenses.data[1].id;
        controller.open_edit(id);

        let mut form = controller.form(today());
        assert_eq!(form.title, "Starbucks");
        form.amount = "7.25".to_string();
        let updated = controller.submit(&form, today()).await.unwrap();
        assert_eq!(updated.amount, Amount::from_str("7.25").unwrap());

        let state = controller.store().state();
        assert_eq!(state.expenses.data[1].amount, updated.amount);
        assert_eq!(state.expenses.total, 17);
        assert!(!state.modal.is_open());
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_store() {
        let (backend, controller) = setup();
        controller.mount().await.unwrap();
        controller.open_create();
        let before = controller.store().state();
        let e = controller
            .submit(&form("", "-1"), today())
            .await
            .unwrap_err();
        assert!(e.downcast_ref::<crate::forms::ValidationError>().is_some());
        assert_eq!(*controller.store().state(), *before);
        assert!(!backend.calls().contains(&"create_expense".to_string()));
    }

    #[tokio::test]
    async fn test_submit_failure_sets_error_and_keeps_dialog() {
        let (backend, controller) = setup();
        controller.mount().await.unwrap();
        controller.open_create();
        backend.fail_next(422, json!({"errors": {"title": ["The title has already been taken."]}}));
        assert!(controller
            .submit(&form("Lunch", "3"), today())
            .await
            .is_err());
        let state = controller.store().state();
        assert_eq!(
            state.error.expenses.as_deref(),
            Some("The title has already been taken.")
        );
        assert!(state.modal.is_open());
        assert_eq!(state.expenses.total, 17);
    }

    #[tokio::test]
    async fn test_delete_round_trip() {
        let (_, controller) = setup();
        controller.mount().await.unwrap();
        let before = controller.store().state();
        let id = before.expenses.data[0].id;
        assert_eq!(
            controller.delete(id).await.unwrap(),
            DeleteOutcome::Deleted
        );
        let after = controller.store().state();
        assert_eq!(after.expenses.total, 16);
        assert!(after.find_expense(id).is_none());
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let backend = Arc::new(TestBackend::default());
        let controller = ExpensesController::new(
            Store::default(),
            backend.clone(),
            Arc::new(|_: &str| false),
        );
        controller.mount().await.unwrap();
        let id = controller.store().state().expenses.data[0].id;
        assert_eq!(
            controller.delete(id).await.unwrap(),
            DeleteOutcome::Cancelled
        );
        assert!(!backend.calls().contains(&"delete_expense".to_string()));
        assert_eq!(controller.store().state().expenses.total, 17);
    }

    #[tokio::test]
    async fn test_delete_failure_leaves_list() {
        let (backend, controller) = setup();
        controller.mount().await.unwrap();
        let before = controller.store().state();
        backend.fail_next(503, json!("not an error body"));
        assert!(controller.delete(before.expenses.data[0].id).await.is_err());
        let after = controller.store().state();
        assert_eq!(after.error.expenses.as_deref(), Some(FALLBACK_MESSAGE));
        assert!(Arc::ptr_eq(&before.expenses, &after.expenses));
    }

    #[tokio::test]
    async fn test_paging_bounds() {
        let (_, controller) = setup();
        controller.mount().await.unwrap();
        assert_eq!(controller.prev_page().await.unwrap(), None);
        assert_eq!(controller.next_page().await.unwrap(), Some(Fetch::Applied));
        assert_eq!(controller.current_page(), 2);
        assert_eq!(controller.next_page().await.unwrap(), None);
        assert_eq!(controller.prev_page().await.unwrap(), Some(Fetch::Applied));
        assert_eq!(controller.current_page(), 1);
        assert_eq!(controller.store().state().expenses.current_page, 1);
    }

    #[tokio::test]
    async fn test_export_all_pages() {
        let (_, controller) = setup();
        controller.mount().await.unwrap();
        let mut out = Vec::new();
        let rows = controller.export(&mut out).await.unwrap();
        assert_eq!(rows, 17);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 18);
    }
}
