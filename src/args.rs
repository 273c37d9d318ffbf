//! These structs provide the CLI interface for the expense client.

use crate::controllers::QuickFilter;
use crate::model::{FiltersPatch, Id, PreferencesPatch, SortBy, SortOrder, Theme};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// expense: A command-line client for an expense-tracking REST API.
///
/// Lists, filters, creates, edits and deletes expenses and categories, shows a dashboard summary
/// for a date range, and exports expenses to CSV. Run `expense init` first to point the client at
/// a backend, then `expense login` if the backend requires a bearer token.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the client home directory and its config file.
    ///
    /// This is the first command you should run. Pass the base URL of the expense API, including
    /// any path prefix such as `/api`. The home directory defaults to ~/.expense-client; use
    /// --home or EXPENSE_CLIENT_HOME to put it somewhere else.
    Init(InitArgs),
    /// Store the bearer token sent with every request.
    Login(LoginArgs),
    /// Remove the stored bearer token.
    Logout,
    /// Ask the backend for its health status.
    Health,
    /// Show the spending summary for a date range (the current month by default).
    Dashboard(DashboardArgs),
    /// List, add, update, delete or export expenses.
    Expenses {
        #[command(subcommand)]
        command: ExpensesCommand,
    },
    /// List, add, update or delete categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommand,
    },
    /// Show or change the local display preferences.
    Prefs {
        #[command(subcommand)]
        command: PrefsCommand,
    },
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the client configuration, token and preferences are kept. Defaults to
    /// ~/.expense-client
    #[arg(long, env = "EXPENSE_CLIENT_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `expense init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the expense API, e.g. http://127.0.0.1:8000/api
    #[arg(long, default_value = crate::config::DEFAULT_API_URL)]
    api_url: String,
}

impl InitArgs {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

/// Args for the `expense login` command.
#[derive(Debug, Parser, Clone)]
pub struct LoginArgs {
    /// The bearer token issued by the backend.
    #[arg(long, env = "EXPENSE_API_TOKEN", hide_env_values = true)]
    token: String,
}

impl LoginArgs {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Args for the `expense dashboard` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct DashboardArgs {
    /// The first day of the period (YYYY-MM-DD). Defaults to the first of this month.
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// The last day of the period (YYYY-MM-DD). Defaults to the last of this month.
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Show per-month statistics for this year instead of the summary.
    #[arg(long, value_name = "YEAR")]
    monthly: Option<i32>,
}

impl DashboardArgs {
    pub fn new(
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        monthly: Option<i32>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            monthly,
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    pub fn monthly(&self) -> Option<i32> {
        self.monthly
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExpensesCommand {
    /// List one page of expenses matching the filters.
    List(ListExpensesArgs),
    /// Create an expense.
    Add(ExpenseFields),
    /// Change an expense. Fields that are not given keep their current value.
    Update(UpdateExpenseArgs),
    /// Delete an expense.
    Delete(DeleteArgs),
    /// Write every expense matching the filters to CSV.
    Export(ExportArgs),
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesCommand {
    /// List all categories with their expense counts.
    List,
    /// Create a category.
    Add(CategoryFields),
    /// Change a category. Fields that are not given keep their current value.
    Update(UpdateCategoryArgs),
    /// Delete a category. Categories that still have expenses cannot be deleted.
    Delete(DeleteArgs),
}

#[derive(Subcommand, Debug, Clone)]
pub enum PrefsCommand {
    /// Print the current preferences.
    Show,
    /// Change one or more preferences.
    Set(SetPrefsArgs),
}

/// Filters for the expense list and export.
#[derive(Debug, Parser, Clone, Default)]
pub struct FilterArgs {
    /// Only expenses on or after this date (YYYY-MM-DD).
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Only expenses on or before this date (YYYY-MM-DD).
    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// A preset date range ending today. Overrides --start-date and --end-date.
    #[arg(long, value_enum)]
    quick: Option<QuickFilter>,

    /// Only expenses in this category.
    #[arg(long)]
    category: Option<Id>,

    /// Only expenses whose title or description contains this text.
    #[arg(long)]
    search: Option<String>,

    #[arg(long, value_enum)]
    sort_by: Option<SortBy>,

    #[arg(long, value_enum)]
    sort_order: Option<SortOrder>,
}

impl FilterArgs {
    /// The filter changes these arguments ask for. `quick` is resolved against `today`.
    pub fn patch(&self, today: NaiveDate) -> FiltersPatch {
        let (start_date, end_date) = match self.quick {
            Some(quick) => {
                let (start, end) = quick.range(today);
                (Some(start), Some(end))
            }
            None => (self.start_date, self.end_date),
        };
        let mut patch = FiltersPatch::default();
        if start_date.is_some() {
            patch = patch.start_date(start_date);
        }
        if end_date.is_some() {
            patch = patch.end_date(end_date);
        }
        if self.category.is_some() {
            patch = patch.category_id(self.category);
        }
        if let Some(search) = &self.search {
            patch = patch.search(search.clone());
        }
        if let Some(sort_by) = self.sort_by {
            patch = patch.sort_by(sort_by);
        }
        if let Some(sort_order) = self.sort_order {
            patch = patch.sort_order(sort_order);
        }
        patch
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

/// Args for `expense expenses list`.
#[derive(Debug, Parser, Clone)]
pub struct ListExpensesArgs {
    #[clap(flatten)]
    filters: FilterArgs,

    /// The page to show, starting at 1.
    #[arg(long, default_value_t = 1)]
    page: u32,
}

impl ListExpensesArgs {
    pub fn new(filters: FilterArgs, page: u32) -> Self {
        Self { filters, page }
    }

    pub fn filters(&self) -> &FilterArgs {
        &self.filters
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

/// The expense form fields. On update, absent fields keep the current value.
#[derive(Debug, Parser, Clone, Default)]
pub struct ExpenseFields {
    #[arg(long)]
    title: Option<String>,

    /// The amount, e.g. 12.50. Thousands separators are allowed.
    #[arg(long)]
    amount: Option<String>,

    /// The date of the expense (YYYY-MM-DD). Defaults to today when adding.
    #[arg(long)]
    date: Option<String>,

    /// The category id.
    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    description: Option<String>,
}

impl ExpenseFields {
    pub fn new(
        title: Option<String>,
        amount: Option<String>,
        date: Option<String>,
        category: Option<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            title,
            amount,
            date,
            category,
            description,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn amount(&self) -> Option<&str> {
        self.amount.as_deref()
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Args for `expense expenses update`.
#[derive(Debug, Parser, Clone)]
pub struct UpdateExpenseArgs {
    /// The id of the expense to change.
    id: Id,

    #[clap(flatten)]
    fields: ExpenseFields,
}

impl UpdateExpenseArgs {
    pub fn new(id: Id, fields: ExpenseFields) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn fields(&self) -> &ExpenseFields {
        &self.fields
    }
}

/// Args for the delete subcommands.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the record to delete.
    id: Id,

    /// Do not ask for confirmation.
    #[arg(long, short = 'y')]
    yes: bool,
}

impl DeleteArgs {
    pub fn new(id: Id, yes: bool) -> Self {
        Self { id, yes }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn yes(&self) -> bool {
        self.yes
    }
}

/// Args for `expense expenses export`.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    #[clap(flatten)]
    filters: FilterArgs,

    /// Where to write the CSV. Defaults to stdout.
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn new(filters: FilterArgs, output: Option<PathBuf>) -> Self {
        Self { filters, output }
    }

    pub fn filters(&self) -> &FilterArgs {
        &self.filters
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// The category form fields. On update, absent fields keep the current value.
#[derive(Debug, Parser, Clone, Default)]
pub struct CategoryFields {
    #[arg(long)]
    name: Option<String>,

    /// A hex color such as #3B82F6. Defaults to #3B82F6 when adding.
    #[arg(long)]
    color: Option<String>,

    /// Pick a color from the palette instead of giving one.
    #[arg(long, conflicts_with = "color")]
    random_color: bool,

    #[arg(long)]
    description: Option<String>,
}

impl CategoryFields {
    pub fn new(name: Option<String>, color: Option<String>, description: Option<String>) -> Self {
        Self {
            name,
            color,
            random_color: false,
            description,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn random_color(&self) -> bool {
        self.random_color
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Args for `expense categories update`.
#[derive(Debug, Parser, Clone)]
pub struct UpdateCategoryArgs {
    /// The id of the category to change.
    id: Id,

    #[clap(flatten)]
    fields: CategoryFields,
}

impl UpdateCategoryArgs {
    pub fn new(id: Id, fields: CategoryFields) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn fields(&self) -> &CategoryFields {
        &self.fields
    }
}

/// Args for `expense prefs set`.
#[derive(Debug, Parser, Clone, Default)]
pub struct SetPrefsArgs {
    #[arg(long, value_enum)]
    theme: Option<Theme>,

    #[arg(long)]
    items_per_page: Option<u32>,

    /// An ISO currency code such as USD, EUR, GBP or JPY.
    #[arg(long)]
    currency: Option<String>,
}

impl SetPrefsArgs {
    pub fn new(theme: Option<Theme>, items_per_page: Option<u32>, currency: Option<String>) -> Self {
        Self {
            theme,
            items_per_page,
            currency,
        }
    }

    pub fn patch(&self) -> PreferencesPatch {
        PreferencesPatch {
            theme: self.theme,
            items_per_page: self.items_per_page,
            currency: self.currency.as_ref().map(|c| c.trim().to_uppercase()),
        }
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join(".expense-client"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or EXPENSE_CLIENT_HOME instead of relying on the default \
                client home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from(".expense-client")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("expense").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_is_well_formed() {
        <Args as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn test_parse_list_filters() {
        let args = parse(&[
            "--home",
            "/tmp/x",
            "expenses",
            "list",
            "--category",
            "3",
            "--sort-by",
            "amount",
            "--quick",
            "month",
            "--page",
            "2",
        ]);
        assert_eq!(args.common().home().path(), Path::new("/tmp/x"));
        let Command::Expenses {
            command: ExpensesCommand::List(list),
        } = args.command()
        else {
            panic!("expected expenses list");
        };
        assert_eq!(list.page(), 2);
        let today = NaiveDate::from_ymd_opt(2025, 10, 21).unwrap();
        let patch = list.filters().patch(today);
        let expected = FiltersPatch::default()
            .start_date(NaiveDate::from_ymd_opt(2025, 10, 1))
            .end_date(Some(today))
            .category_id(Some(Id::new(3)))
            .sort_by(SortBy::Amount);
        assert_eq!(patch, expected);
    }

    #[test]
    fn test_parse_delete_and_prefs() {
        let args = parse(&["categories", "delete", "5", "--yes"]);
        let Command::Categories {
            command: CategoriesCommand::Delete(delete),
        } = args.command()
        else {
            panic!("expected categories delete");
        };
        assert_eq!(delete.id(), Id::new(5));
        assert!(delete.yes());

        let args = parse(&["prefs", "set", "--theme", "dark", "--currency", "eur"]);
        let Command::Prefs {
            command: PrefsCommand::Set(set),
        } = args.command()
        else {
            panic!("expected prefs set");
        };
        let patch = set.patch();
        assert_eq!(patch.theme, Some(Theme::Dark));
        assert_eq!(patch.currency.as_deref(), Some("EUR"));
        assert_eq!(patch.items_per_page, None);
    }

    #[test]
    fn test_color_conflicts_with_random_color() {
        let result = Args::try_parse_from([
            "expense",
            "categories",
            "add",
            "--name",
            "x",
            "--color",
            "#000000",
            "--random-color",
        ]);
        assert!(result.is_err());
    }
}
