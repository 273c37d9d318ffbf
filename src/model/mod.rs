//! Types that represent the data exchanged with the expense backend, such as `Expense`, `Category`
//! and the paginated `Page` envelope.
mod amount;
mod category;
mod dashboard;
pub(crate) mod date;
mod expense;
mod filters;
mod id;
mod page;
mod preferences;

pub use amount::{Amount, AmountError, MAX_AMOUNT};
pub(crate) use category::CategoryList;
pub use category::{Category, CategoryPayload};
pub use dashboard::{CategoryBreakdown, DailyExpense, DashboardData, Summary, TopCategory};
pub use date::parse_date;
pub use expense::{CategoryRef, Expense, ExpensePayload};
pub use filters::{Filters, FiltersPatch, SortBy, SortOrder};
pub use id::Id;
pub use page::{Page, DEFAULT_PER_PAGE};
pub use preferences::{Preferences, PreferencesPatch, Theme};
