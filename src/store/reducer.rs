use crate::model::{Category, Expense, Filters, Id, Page};
use crate::store::{Action, AppState, ErrorKey, Errors, Modal};
use std::sync::Arc;
use tracing::debug;

/// Computes the state that follows `state` under `action`.
///
/// The function is pure. It never mutates `state`; only slices touched by `action` are replaced,
/// all others are shared with the previous tree. When the action changes nothing (an unknown
/// action, or an update for an id that is not loaded) the same `Arc` is returned.
pub fn reduce(state: &Arc<AppState>, action: Action) -> Arc<AppState> {
    let mut next = AppState::clone(state);
    match action {
        Action::SetLoading { key, value } => next.loading.set(key, value),
        Action::SetError { key, message } => {
            next.error = Arc::new(state.error.with(key, Some(message)));
        }
        Action::ClearError { key } => next.error = Arc::new(state.error.with(key, None)),
        Action::ClearAllErrors => next.error = Arc::new(Errors::default()),
        Action::SetExpenses(page) => {
            next.expenses = Arc::new(page);
            next.error = cleared(&state.error, ErrorKey::Expenses);
        }
        Action::SetCategories(categories) => {
            next.categories = Arc::new(categories);
            next.error = cleared(&state.error, ErrorKey::Categories);
        }
        Action::SetDashboardData(data) => {
            next.dashboard = Some(Arc::new(data));
            next.error = cleared(&state.error, ErrorKey::Dashboard);
        }
        Action::AddExpense(expense) => {
            let mut page = Page::clone(&state.expenses);
            page.data.insert(0, expense);
            page.total += 1;
            next.expenses = Arc::new(page);
        }
        Action::UpdateExpense(expense) => match replace_expense(&state.expenses, expense) {
            Some(page) => next.expenses = Arc::new(page),
            None => return Arc::clone(state),
        },
        Action::DeleteExpense(id) => {
            let mut page = Page::clone(&state.expenses);
            page.data.retain(|e| e.id != id);
            // Decremented even when the id is not on this page; total counts all pages. Every
            // listed copy of the id is removed, so adding an already listed id and deleting it
            // does not restore the previous list.
            page.total = page.total.saturating_sub(1);
            next.expenses = Arc::new(page);
        }
        Action::AddCategory(category) => {
            let mut categories = Vec::clone(&state.categories);
            categories.push(category);
            next.categories = Arc::new(categories);
        }
        Action::UpdateCategory(category) => {
            match replace_category(&state.categories, category) {
                Some(categories) => next.categories = Arc::new(categories),
                None => return Arc::clone(state),
            }
        }
        Action::DeleteCategory(id) => {
            next.categories = Arc::new(without_category(&state.categories, id));
        }
        Action::SetFilters(patch) => next.filters = Arc::new(state.filters.merged(&patch)),
        Action::ResetFilters => next.filters = Arc::new(Filters::default()),
        Action::SetModalState(modal) => next.modal = modal,
        Action::ResetModals => next.modal = Modal::Closed,
        Action::SetPreferences(patch) => {
            next.preferences = Arc::new(state.preferences.merged(&patch));
        }
        Action::ResetState => return Arc::new(AppState::default()),
        Action::Unknown(kind) => {
            debug!("Ignoring unknown action {kind}");
            return Arc::clone(state);
        }
    }
    Arc::new(next)
}

/// The error slice with `key` cleared, sharing the current slice if it is already clear.
fn cleared(errors: &Arc<Errors>, key: ErrorKey) -> Arc<Errors> {
    if errors.get(key).is_none() {
        Arc::clone(errors)
    } else {
        Arc::new(errors.with(key, None))
    }
}

fn replace_expense(page: &Page<Expense>, expense: Expense) -> Option<Page<Expense>> {
    let index = page.data.iter().position(|e| e.id == expense.id)?;
    let mut next = page.clone();
    next.data[index] = expense;
    Some(next)
}

fn replace_category(categories: &[Category], category: Category) -> Option<Vec<Category>> {
    let index = categories.iter().position(|c| c.id == category.id)?;
    let mut next = categories.to_vec();
    next[index] = category;
    Some(next)
}

fn without_category(categories: &[Category], id: Id) -> Vec<Category> {
    categories.iter().filter(|c| c.id != id).cloned().collect()
}
