use crate::api::Mode;
use crate::args::{DeleteArgs, ExpenseFields, ExportArgs, ListExpensesArgs, UpdateExpenseArgs};
use crate::commands::{confirmation, user_error, Out, Session};
use crate::controllers::{AssumeYes, Confirm, DeleteOutcome, ExpensesController};
use crate::format::{display_date, format_currency, truncate_text};
use crate::forms::ExpenseForm;
use crate::model::{Expense, Page};
use crate::{utils, Config, Result};
use chrono::NaiveDate;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

fn controller(session: &Session, confirm: Arc<dyn Confirm>) -> ExpensesController {
    ExpensesController::new(session.store.clone(), session.backend.clone(), confirm)
        .with_debounce(session.search_debounce)
}

/// Lists one page of expenses matching the filters.
pub async fn list_expenses(
    config: &Config,
    mode: Mode,
    args: &ListExpensesArgs,
    today: NaiveDate,
) -> Result<Out<Page<Expense>>> {
    let session = Session::open(config, mode).await?;
    run_list(&session, args, today).await
}

pub(crate) async fn run_list(
    session: &Session,
    args: &ListExpensesArgs,
    today: NaiveDate,
) -> Result<Out<Page<Expense>>> {
    let controller = controller(session, Arc::new(AssumeYes));
    session
        .store
        .filters()
        .set_filters(args.filters().patch(today));
    controller
        .go_to_page(args.page())
        .await
        .map_err(user_error)?;

    let page = session.store.state().expenses.as_ref().clone();
    let message = render_page(&page, &session.currency());
    Ok(Out::new(message, page))
}

/// Creates an expense from `fields`. The date defaults to `today`.
pub async fn add_expense(
    config: &Config,
    mode: Mode,
    fields: &ExpenseFields,
    today: NaiveDate,
) -> Result<Out<Expense>> {
    let session = Session::open(config, mode).await?;
    run_add(&session, fields, today).await
}

pub(crate) async fn run_add(
    session: &Session,
    fields: &ExpenseFields,
    today: NaiveDate,
) -> Result<Out<Expense>> {
    let controller = controller(session, Arc::new(AssumeYes));
    let mut form = ExpenseForm::new(today);
    apply(&mut form, fields);
    controller.open_create();
    let expense = controller
        .submit(&form, today)
        .await
        .map_err(user_error)?;
    let message = format!(
        "Created expense #{}: {}",
        expense.id,
        describe(&expense, &session.currency())
    );
    Ok(Out::new(message, expense))
}

/// Changes the fields given in `args`; the others keep their current value.
pub async fn update_expense(
    config: &Config,
    mode: Mode,
    args: &UpdateExpenseArgs,
    today: NaiveDate,
) -> Result<Out<Expense>> {
    let session = Session::open(config, mode).await?;
    run_update(&session, args, today).await
}

pub(crate) async fn run_update(
    session: &Session,
    args: &UpdateExpenseArgs,
    today: NaiveDate,
) -> Result<Out<Expense>> {
    let existing = session
        .backend
        .get_expense(args.id())
        .await
        .map_err(user_error)?;
    let mut form = ExpenseForm::from_expense(&existing);
    apply(&mut form, args.fields());

    let controller = controller(session, Arc::new(AssumeYes));
    controller.open_edit(args.id());
    let expense = controller
        .submit(&form, today)
        .await
        .map_err(user_error)?;
    let message = format!(
        "Updated expense #{}: {}",
        expense.id,
        describe(&expense, &session.currency())
    );
    Ok(Out::new(message, expense))
}

/// Deletes an expense, asking first unless `--yes` was given.
pub async fn delete_expense(config: &Config, mode: Mode, args: &DeleteArgs) -> Result<Out<()>> {
    let session = Session::open(config, mode).await?;
    run_delete(&session, args.id(), confirmation(args.yes())).await
}

pub(crate) async fn run_delete(
    session: &Session,
    id: crate::model::Id,
    confirm: Arc<dyn Confirm>,
) -> Result<Out<()>> {
    let controller = controller(session, confirm);
    let outcome = controller.delete(id).await.map_err(user_error)?;
    Ok(match outcome {
        DeleteOutcome::Deleted => format!("Deleted expense #{id}").into(),
        DeleteOutcome::Cancelled => "Nothing was deleted".into(),
        DeleteOutcome::Blocked => format!("Expense #{id} cannot be deleted").into(),
    })
}

/// Writes every expense matching the filters to CSV, to `--output` or stdout.
pub async fn export_expenses(
    config: &Config,
    mode: Mode,
    args: &ExportArgs,
    today: NaiveDate,
) -> Result<Out<usize>> {
    let session = Session::open(config, mode).await?;
    run_export(&session, args, today).await
}

pub(crate) async fn run_export(
    session: &Session,
    args: &ExportArgs,
    today: NaiveDate,
) -> Result<Out<usize>> {
    let controller = controller(session, Arc::new(AssumeYes));
    session
        .store
        .filters()
        .set_filters(args.filters().patch(today));
    let mut csv = Vec::new();
    let rows = controller.export(&mut csv).await.map_err(user_error)?;
    match args.output() {
        Some(path) => {
            write_output(path, &csv).await?;
            Ok(Out::new(
                format!("Exported {rows} expenses to {}", path.display()),
                rows,
            ))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&csv)?;
            stdout.flush()?;
            Ok(Out::new(format!("Exported {rows} expenses"), rows))
        }
    }
}

async fn write_output(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        utils::make_dir(parent).await?;
    }
    utils::write(path, contents).await
}

fn apply(form: &mut ExpenseForm, fields: &ExpenseFields) {
    if let Some(title) = fields.title() {
        form.title = title.to_string();
    }
    if let Some(amount) = fields.amount() {
        form.amount = amount.to_string();
    }
    if let Some(date) = fields.date() {
        form.expense_date = date.to_string();
    }
    if let Some(category) = fields.category() {
        form.category_id = category.to_string();
    }
    if let Some(description) = fields.description() {
        form.description = description.to_string();
    }
}

fn describe(expense: &Expense, currency: &str) -> String {
    format!(
        "{} {} on {}",
        expense.title,
        format_currency(Some(expense.amount.value()), currency),
        display_date(expense.expense_date)
    )
}

fn render_page(page: &Page<Expense>, currency: &str) -> String {
    if page.data.is_empty() {
        return "No expenses found".to_string();
    }
    let mut s = String::new();
    let _ = writeln!(
        s,
        "Expenses {}-{} of {} (page {} of {})",
        page.from,
        page.to,
        page.total,
        page.current_page,
        page.last_page()
    );
    for expense in &page.data {
        let _ = writeln!(
            s,
            "  #{:<6} {}  {:<30} {:<16} {:>14}",
            expense.id,
            display_date(expense.expense_date),
            truncate_text(&expense.title, 30),
            truncate_text(expense.category_name(), 16),
            format_currency(Some(expense.amount.value()), currency)
        );
    }
    s.trim_end().to_string()
}
