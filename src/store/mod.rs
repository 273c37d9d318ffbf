//! The single state container: the state tree, the actions that change it, the pure reducer and
//! the projections that pages read from.
//!
//! A `Store` is created once per session and handed to every component that needs it. Cloning a
//! `Store` yields another handle to the same state. When the last handle is dropped the store is
//! torn down and subscribers observe a closed channel.

mod action;
mod projection;
mod reducer;
mod state;

pub use action::{Action, ActionKind};
pub use projection::{
    CategoriesView, DashboardView, ExpensesView, FiltersView, ModalsView, PreferencesView,
    Projection, Projector, SliceId,
};
pub use reducer::reduce;
pub use state::{AppState, ErrorKey, Errors, Loading, LoadingKey, Modal};

use crate::model::Preferences;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct Store {
    tx: Arc<watch::Sender<Arc<AppState>>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl Store {
    pub fn new(initial: AppState) -> Self {
        let (tx, _) = watch::channel(Arc::new(initial));
        Self { tx: Arc::new(tx) }
    }

    /// Creates a store whose initial state carries `preferences`.
    pub fn with_preferences(preferences: Preferences) -> Self {
        Self::new(AppState::with_preferences(preferences))
    }

    /// Applies `action` to the current state. Subscribers are woken only when the tree changed.
    pub fn dispatch(&self, action: Action) {
        trace!("dispatch {action}");
        self.tx.send_if_modified(|state| {
            let next = reduce(state, action);
            if Arc::ptr_eq(&next, state) {
                false
            } else {
                *state = next;
                true
            }
        });
    }

    /// A snapshot of the current state tree.
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.tx.borrow())
    }

    /// A receiver that is notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<AppState>> {
        self.tx.subscribe()
    }

    /// Returns the whole tree to its initial value.
    pub fn reset(&self) {
        self.dispatch(Action::ResetState);
    }

    pub fn expenses(&self) -> ExpensesView {
        ExpensesView::project(&self.state(), self.clone())
    }

    pub fn categories(&self) -> CategoriesView {
        CategoriesView::project(&self.state(), self.clone())
    }

    pub fn dashboard(&self) -> DashboardView {
        DashboardView::project(&self.state(), self.clone())
    }

    pub fn filters(&self) -> FiltersView {
        FiltersView::project(&self.state(), self.clone())
    }

    pub fn modals(&self) -> ModalsView {
        ModalsView::project(&self.state(), self.clone())
    }

    pub fn preferences(&self) -> PreferencesView {
        PreferencesView::project(&self.state(), self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Id;

    #[tokio::test]
    async fn test_dispatch_notifies_subscribers() {
        let store = Store::default();
        let mut rx = store.subscribe();
        store.dispatch(Action::SetModalState(Modal::ExpenseForm { editing: None }));
        rx.changed().await.unwrap();
        assert_eq!(
            rx.borrow_and_update().modal,
            Modal::ExpenseForm { editing: None }
        );
    }

    #[tokio::test]
    async fn test_noop_does_not_notify() {
        let store = Store::default();
        let mut rx = store.subscribe();
        store.dispatch(Action::Unknown("NOTHING".to_string()));
        store.dispatch(Action::DeleteCategory(Id::new(1)));
        // Only the delete produced a new tree.
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        store.dispatch(Action::Unknown("NOTHING".to_string()));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_drop_closes_subscribers() {
        let store = Store::default();
        let mut rx = store.subscribe();
        drop(store);
        assert!(rx.changed().await.is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let store = Store::default();
        let other = store.clone();
        other.dispatch(Action::SetModalState(Modal::CategoryForm { editing: None }));
        assert!(store.state().modal.is_open());
        assert!(!Store::default().state().modal.is_open());
    }

    #[test]
    fn test_with_preferences_and_reset() {
        let prefs = Preferences {
            currency: "EUR".to_string(),
            ..Preferences::default()
        };
        let store = Store::with_preferences(prefs);
        assert_eq!(store.state().preferences.currency, "EUR");
        store.reset();
        assert_eq!(*store.state(), AppState::default());
    }
}
