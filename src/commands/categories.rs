use crate::api::Mode;
use crate::args::{CategoryFields, DeleteArgs, UpdateCategoryArgs};
use crate::commands::{confirmation, user_error, Out, Session};
use crate::controllers::{AssumeYes, CategoriesController, Confirm, DeleteOutcome};
use crate::format::{random_color, truncate_text};
use crate::forms::CategoryForm;
use crate::model::{Category, Id};
use crate::{Config, Result};
use std::fmt::Write;
use std::sync::Arc;

fn controller(session: &Session, confirm: Arc<dyn Confirm>) -> CategoriesController {
    CategoriesController::new(session.store.clone(), session.backend.clone(), confirm)
}

/// Lists every category with its expense count.
pub async fn list_categories(config: &Config, mode: Mode) -> Result<Out<Vec<Category>>> {
    let session = Session::open(config, mode).await?;
    run_list(&session).await
}

pub(crate) async fn run_list(session: &Session) -> Result<Out<Vec<Category>>> {
    controller(session, Arc::new(AssumeYes))
        .mount()
        .await
        .map_err(user_error)?;
    let categories = session.store.state().categories.as_ref().clone();
    if categories.is_empty() {
        return Ok(Out::new("No categories found", categories));
    }
    let mut s = String::new();
    let _ = writeln!(s, "{} categories", categories.len());
    for c in &categories {
        let _ = writeln!(
            s,
            "  #{:<6} {:<24} {}  {:>5} expenses  {}",
            c.id,
            truncate_text(&c.name, 24),
            c.color,
            c.expenses_count,
            truncate_text(c.description.as_deref().unwrap_or(""), 40)
        );
    }
    Ok(Out::new(s.trim_end(), categories))
}

/// Creates a category from `fields`.
pub async fn add_category(
    config: &Config,
    mode: Mode,
    fields: &CategoryFields,
) -> Result<Out<Category>> {
    let session = Session::open(config, mode).await?;
    run_add(&session, fields).await
}

pub(crate) async fn run_add(session: &Session, fields: &CategoryFields) -> Result<Out<Category>> {
    let controller = controller(session, Arc::new(AssumeYes));
    controller.open_create();
    let mut form = controller.form();
    apply(&mut form, fields);
    let category = controller.submit(&form).await.map_err(user_error)?;
    Ok(Out::new(
        format!("Created category #{}: {}", category.id, category.name),
        category,
    ))
}

/// Changes the fields given in `args`; the others keep their current value.
pub async fn update_category(
    config: &Config,
    mode: Mode,
    args: &UpdateCategoryArgs,
) -> Result<Out<Category>> {
    let session = Session::open(config, mode).await?;
    run_update(&session, args).await
}

pub(crate) async fn run_update(
    session: &Session,
    args: &UpdateCategoryArgs,
) -> Result<Out<Category>> {
    let existing = session
        .backend
        .get_category(args.id())
        .await
        .map_err(user_error)?;
    let mut form = CategoryForm::from_category(&existing);
    apply(&mut form, args.fields());

    let controller = controller(session, Arc::new(AssumeYes));
    controller.open_edit(args.id());
    let category = controller.submit(&form).await.map_err(user_error)?;
    Ok(Out::new(
        format!("Updated category #{}: {}", category.id, category.name),
        category,
    ))
}

/// Deletes a category, asking first unless `--yes` was given. Categories that still have
/// expenses are refused without contacting the backend.
pub async fn delete_category(config: &Config, mode: Mode, args: &DeleteArgs) -> Result<Out<()>> {
    let session = Session::open(config, mode).await?;
    run_delete(&session, args.id(), confirmation(args.yes())).await
}

pub(crate) async fn run_delete(
    session: &Session,
    id: Id,
    confirm: Arc<dyn Confirm>,
) -> Result<Out<()>> {
    let controller = controller(session, confirm);
    controller.mount().await.map_err(user_error)?;
    match controller.delete(id).await.map_err(user_error)? {
        DeleteOutcome::Deleted => Ok(format!("Deleted category #{id}").into()),
        DeleteOutcome::Cancelled => Ok("Nothing was deleted".into()),
        DeleteOutcome::Blocked => {
            let count = session
                .store
                .state()
                .find_category(id)
                .map(|c| c.expenses_count)
                .unwrap_or_default();
            anyhow::bail!(
                "Category #{id} still has {count} expenses. Move or delete them first."
            )
        }
    }
}

fn apply(form: &mut CategoryForm, fields: &CategoryFields) {
    if let Some(name) = fields.name() {
        form.name = name.to_string();
    }
    if let Some(color) = fields.color() {
        form.color = color.to_string();
    } else if fields.random_color() {
        form.color = random_color().to_string();
    }
    if let Some(description) = fields.description() {
        form.description = description.to_string();
    }
}
