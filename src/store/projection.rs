//! Narrow, read-mostly views of the state tree, each paired with the actions that apply to it.
//!
//! A view is rebuilt only when the slices it reads change. `Projector` caches the last view and
//! hands out the same `Arc` for as long as its key is unchanged.

use crate::model::{
    Category, DashboardData, Expense, Filters, FiltersPatch, Id, Page, Preferences,
    PreferencesPatch,
};
use crate::store::{Action, AppState, ErrorKey, LoadingKey, Modal, Store};
use std::sync::{Arc, Mutex, PoisonError};

/// The identity of a shared slice. Two equal `SliceId`s were taken from the same allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceId(usize);

impl SliceId {
    pub fn of<T>(slice: &Arc<T>) -> Self {
        SliceId(Arc::as_ptr(slice) as *const () as usize)
    }
}

/// A view derived from the state tree.
pub trait Projection: Sized {
    /// Everything the view reads. When the key is unchanged the cached view is reused.
    type Key: PartialEq;

    fn key(state: &AppState) -> Self::Key;

    fn project(state: &AppState, store: Store) -> Self;
}

/// Caches the most recent projection of type `P` for one store.
///
/// The cached view holds `Arc`s to the slices its key was taken from, so those allocations stay
/// alive and a `SliceId` cannot be reused while it is cached.
pub struct Projector<P: Projection> {
    store: Store,
    cache: Mutex<Option<(P::Key, Arc<P>)>>,
}

impl<P: Projection> Projector<P> {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            cache: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// The view for the current state, reusing the previous one if nothing it reads has changed.
    pub fn get(&self) -> Arc<P> {
        let state = self.store.state();
        let key = P::key(&state);
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_key, view)) = cache.as_ref() {
            if *cached_key == key {
                return Arc::clone(view);
            }
        }
        let view = Arc::new(P::project(&state, self.store.clone()));
        *cache = Some((key, Arc::clone(&view)));
        view
    }
}

#[derive(Debug, Clone)]
pub struct ExpensesView {
    pub expenses: Arc<Page<Expense>>,
    pub loading: bool,
    pub error: Option<String>,
    store: Store,
}

impl Projection for ExpensesView {
    type Key = (SliceId, bool, Option<String>);

    fn key(state: &AppState) -> Self::Key {
        (
            SliceId::of(&state.expenses),
            state.loading.expenses,
            state.error.expenses.clone(),
        )
    }

    fn project(state: &AppState, store: Store) -> Self {
        Self {
            expenses: Arc::clone(&state.expenses),
            loading: state.loading.expenses,
            error: state.error.expenses.clone(),
            store,
        }
    }
}

impl ExpensesView {
    pub fn set_expenses(&self, page: Page<Expense>) {
        self.store.dispatch(Action::SetExpenses(page));
    }

    pub fn add_expense(&self, expense: Expense) {
        self.store.dispatch(Action::AddExpense(expense));
    }

    pub fn update_expense(&self, expense: Expense) {
        self.store.dispatch(Action::UpdateExpense(expense));
    }

    pub fn delete_expense(&self, id: Id) {
        self.store.dispatch(Action::DeleteExpense(id));
    }

    pub fn set_loading(&self, value: bool) {
        self.store.dispatch(Action::SetLoading {
            key: LoadingKey::Expenses,
            value,
        });
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.store.dispatch(Action::SetError {
            key: ErrorKey::Expenses,
            message: message.into(),
        });
    }

    pub fn clear_error(&self) {
        self.store.dispatch(Action::ClearError {
            key: ErrorKey::Expenses,
        });
    }
}

#[derive(Debug, Clone)]
pub struct CategoriesView {
    pub categories: Arc<Vec<Category>>,
    pub loading: bool,
    pub error: Option<String>,
    store: Store,
}

impl Projection for CategoriesView {
    type Key = (SliceId, bool, Option<String>);

    fn key(state: &AppState) -> Self::Key {
        (
            SliceId::of(&state.categories),
            state.loading.categories,
            state.error.categories.clone(),
        )
    }

    fn project(state: &AppState, store: Store) -> Self {
        Self {
            categories: Arc::clone(&state.categories),
            loading: state.loading.categories,
            error: state.error.categories.clone(),
            store,
        }
    }
}

impl CategoriesView {
    pub fn set_categories(&self, categories: Vec<Category>) {
        self.store.dispatch(Action::SetCategories(categories));
    }

    pub fn add_category(&self, category: Category) {
        self.store.dispatch(Action::AddCategory(category));
    }

    pub fn update_category(&self, category: Category) {
        self.store.dispatch(Action::UpdateCategory(category));
    }

    pub fn delete_category(&self, id: Id) {
        self.store.dispatch(Action::DeleteCategory(id));
    }

    pub fn set_loading(&self, value: bool) {
        self.store.dispatch(Action::SetLoading {
            key: LoadingKey::Categories,
            value,
        });
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.store.dispatch(Action::SetError {
            key: ErrorKey::Categories,
            message: message.into(),
        });
    }

    pub fn clear_error(&self) {
        self.store.dispatch(Action::ClearError {
            key: ErrorKey::Categories,
        });
    }
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub data: Option<Arc<DashboardData>>,
    pub loading: bool,
    pub error: Option<String>,
    store: Store,
}

impl Projection for DashboardView {
    type Key = (Option<SliceId>, bool, Option<String>);

    fn key(state: &AppState) -> Self::Key {
        (
            state.dashboard.as_ref().map(SliceId::of),
            state.loading.dashboard,
            state.error.dashboard.clone(),
        )
    }

    fn project(state: &AppState, store: Store) -> Self {
        Self {
            data: state.dashboard.clone(),
            loading: state.loading.dashboard,
            error: state.error.dashboard.clone(),
            store,
        }
    }
}

impl DashboardView {
    pub fn set_dashboard_data(&self, data: DashboardData) {
        self.store.dispatch(Action::SetDashboardData(data));
    }

    pub fn set_loading(&self, value: bool) {
        self.store.dispatch(Action::SetLoading {
            key: LoadingKey::Dashboard,
            value,
        });
    }

    pub fn set_error(&self, message: impl Into<String>) {
        self.store.dispatch(Action::SetError {
            key: ErrorKey::Dashboard,
            message: message.into(),
        });
    }

    pub fn clear_error(&self) {
        self.store.dispatch(Action::ClearError {
            key: ErrorKey::Dashboard,
        });
    }
}

#[derive(Debug, Clone)]
pub struct FiltersView {
    pub filters: Arc<Filters>,
    store: Store,
}

impl Projection for FiltersView {
    type Key = SliceId;

    fn key(state: &AppState) -> Self::Key {
        SliceId::of(&state.filters)
    }

    fn project(state: &AppState, store: Store) -> Self {
        Self {
            filters: Arc::clone(&state.filters),
            store,
        }
    }
}

impl FiltersView {
    pub fn set_filters(&self, patch: FiltersPatch) {
        self.store.dispatch(Action::SetFilters(patch));
    }

    pub fn reset_filters(&self) {
        self.store.dispatch(Action::ResetFilters);
    }
}

#[derive(Debug, Clone)]
pub struct ModalsView {
    pub modal: Modal,
    store: Store,
}

impl Projection for ModalsView {
    type Key = Modal;

    fn key(state: &AppState) -> Self::Key {
        state.modal
    }

    fn project(state: &AppState, store: Store) -> Self {
        Self {
            modal: state.modal,
            store,
        }
    }
}

impl ModalsView {
    pub fn set_modal_state(&self, modal: Modal) {
        self.store.dispatch(Action::SetModalState(modal));
    }

    pub fn open_expense_form(&self, editing: Option<Id>) {
        self.set_modal_state(Modal::ExpenseForm { editing });
    }

    pub fn open_category_form(&self, editing: Option<Id>) {
        self.set_modal_state(Modal::CategoryForm { editing });
    }

    pub fn reset_modals(&self) {
        self.store.dispatch(Action::ResetModals);
    }
}

#[derive(Debug, Clone)]
pub struct PreferencesView {
    pub preferences: Arc<Preferences>,
    store: Store,
}

impl Projection for PreferencesView {
    type Key = SliceId;

    fn key(state: &AppState) -> Self::Key {
        SliceId::of(&state.preferences)
    }

    fn project(state: &AppState, store: Store) -> Self {
        Self {
            preferences: Arc::clone(&state.preferences),
            store,
        }
    }
}

impl PreferencesView {
    pub fn set_preferences(&self, patch: PreferencesPatch) {
        self.store.dispatch(Action::SetPreferences(patch));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SortBy;

    #[test]
    fn test_projector_reuses_view_when_slice_unchanged() {
        let store = Store::default();
        let projector = Projector::<FiltersView>::new(store.clone());
        let first = projector.get();

        // Touches the modal slice only.
        store.dispatch(Action::SetModalState(Modal::ExpenseForm { editing: None }));
        let second = projector.get();
        assert!(Arc::ptr_eq(&first, &second));

        first.set_filters(FiltersPatch::default().sort_by(SortBy::Title));
        let third = projector.get();
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(third.filters.sort_by, SortBy::Title);
    }

    #[test]
    fn test_expenses_view_reacts_to_loading_and_error() {
        let store = Store::default();
        let projector = Projector::<ExpensesView>::new(store.clone());
        let view = projector.get();
        view.set_loading(true);
        let view = projector.get();
        assert!(view.loading);

        view.set_error("Not found");
        let view = projector.get();
        assert_eq!(view.error.as_deref(), Some("Not found"));

        // An error on another slice leaves this view alone.
        store.dispatch(Action::SetError {
            key: ErrorKey::Categories,
            message: "other".to_string(),
        });
        assert!(Arc::ptr_eq(&view, &projector.get()));
    }

    #[test]
    fn test_bound_actions_reach_the_store() {
        let store = Store::default();
        store.modals().open_category_form(Some(Id::new(2)));
        assert_eq!(store.state().modal.editing_category(), Some(Id::new(2)));
        store.modals().reset_modals();
        assert!(!store.state().modal.is_open());

        store.preferences().set_preferences(PreferencesPatch {
            items_per_page: Some(50),
            ..PreferencesPatch::default()
        });
        assert_eq!(store.preferences().preferences.items_per_page, 50);
    }

    #[test]
    fn test_dashboard_view_starts_empty() {
        let store = Store::default();
        let view = store.dashboard();
        assert!(view.data.is_none());
        assert!(!view.loading);
    }
}
