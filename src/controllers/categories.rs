use crate::api::Backend;
use crate::controllers::{Confirm, DeleteOutcome, Fetch, RequestSeq};
use crate::error::normalize;
use crate::forms::CategoryForm;
use crate::model::{Category, Id};
use crate::store::Store;
use crate::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Drives the categories page: the category list and the category form.
pub struct CategoriesController {
    store: Store,
    backend: Arc<dyn Backend>,
    confirm: Arc<dyn Confirm>,
    seq: RequestSeq,
}

impl CategoriesController {
    pub fn new(store: Store, backend: Arc<dyn Backend>, confirm: Arc<dyn Confirm>) -> Self {
        Self {
            store,
            backend,
            confirm,
            seq: RequestSeq::default(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub async fn mount(&self) -> Result<Fetch> {
        self.store.categories().clear_error();
        self.refresh().await
    }

    /// Fetches every category. Only the response to the latest call is committed.
    pub async fn refresh(&self) -> Result<Fetch> {
        let ticket = self.seq.issue();
        let view = self.store.categories();
        view.set_loading(true);
        view.clear_error();

        let result = self.backend.list_categories().await;
        if !self.seq.is_current(ticket) {
            return Ok(Fetch::Stale);
        }
        let outcome = match result {
            Ok(categories) => {
                view.set_categories(categories);
                Ok(Fetch::Applied)
            }
            Err(e) => {
                error!("Error fetching categories: {e:#}");
                view.set_error(normalize(&e));
                Err(e)
            }
        };
        view.set_loading(false);
        outcome
    }

    pub fn open_create(&self) {
        self.store.modals().open_category_form(None);
    }

    pub fn open_edit(&self, id: Id) {
        self.store.modals().open_category_form(Some(id));
    }

    pub fn close_form(&self) {
        self.store.modals().reset_modals();
    }

    /// The form for the open dialog, prefilled when editing a loaded category.
    pub fn form(&self) -> CategoryForm {
        let state = self.store.state();
        state
            .modal
            .editing_category()
            .and_then(|id| state.find_category(id))
            .map(CategoryForm::from_category)
            .unwrap_or_default()
    }

    /// Validates `form`, then creates or updates the category depending on the open dialog and
    /// closes it.
    pub async fn submit(&self, form: &CategoryForm) -> Result<Category> {
        let payload = form.validate()?;
        let editing = self.store.state().modal.editing_category();
        let result = match editing {
            Some(id) => self.backend.update_category(id, &payload).await,
            None => self.backend.create_category(&payload).await,
        };
        let category = match result {
            Ok(category) => category,
            Err(e) => {
                error!("Error saving category: {e:#}");
                self.store.categories().set_error(normalize(&e));
                return Err(e);
            }
        };

        let view = self.store.categories();
        match editing {
            Some(_) => view.update_category(category.clone()),
            None => view.add_category(category.clone()),
        }
        self.store.modals().reset_modals();
        info!("Saved category {}", category.name);
        Ok(category)
    }

    /// Deletes a category after confirmation. A category known to have expenses is never sent to
    /// the backend.
    pub async fn delete(&self, id: Id) -> Result<DeleteOutcome> {
        if let Some(category) = self.store.state().find_category(id) {
            if !category.can_delete() {
                warn!(
                    "Category {} has {} expenses and cannot be deleted",
                    category.name, category.expenses_count
                );
                return Ok(DeleteOutcome::Blocked);
            }
        }
        if !self
            .confirm
            .confirm("Are you sure you want to delete this category?")
        {
            return Ok(DeleteOutcome::Cancelled);
        }
        match self.backend.delete_category(id).await {
            Ok(()) => {
                self.store.categories().delete_category(id);
                info!("Category deleted successfully");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) => {
                error!("Error deleting category: {e:#}");
                self.store.categories().set_error(normalize(&e));
                Err(e)
            }
        }
    }
}
