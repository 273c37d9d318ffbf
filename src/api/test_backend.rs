//! Implements the `Backend` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without an expense server.

use crate::api::Backend;
use crate::error::ApiError;
use crate::format::is_valid_hex_color;
use crate::model::{
    Amount, Category, CategoryBreakdown, CategoryPayload, CategoryRef, DailyExpense,
    DashboardData, Expense, ExpensePayload, Filters, Id, Page, SortBy, SortOrder, Summary,
    TopCategory, DEFAULT_PER_PAGE,
};
use crate::Result;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::trace;

/// An implementation of the `Backend` trait that keeps its records in memory. By default it is
/// seeded with a handful of categories and expenses.
///
/// It behaves like the real server where the client can observe it: it assigns ids and
/// timestamps, validates payloads with 422 responses, refuses to delete a category that still has
/// expenses and paginates 15 per page. Tests can also delay or fail the next calls.
#[derive(Debug)]
pub struct TestBackend {
    data: Mutex<TestData>,
    delays: Mutex<VecDeque<Duration>>,
    failures: Mutex<VecDeque<Option<(u16, String)>>>,
    calls: Mutex<Vec<String>>,
}

#[derive(Debug, Default)]
struct TestData {
    expenses: Vec<Expense>,
    categories: Vec<Category>,
    next_id: u64,
}

impl Default for TestBackend {
    /// Loads seed data from this module.
    fn default() -> Self {
        let (categories, expenses) = seed_data();
        Self::new(categories, expenses)
    }
}

impl TestBackend {
    /// Creates a backend holding `categories` and `expenses`. New records get ids above the largest
    /// id present.
    pub fn new(categories: Vec<Category>, expenses: Vec<Expense>) -> Self {
        let next_id = categories
            .iter()
            .map(|c| c.id.value())
            .chain(expenses.iter().map(|e| e.id.value()))
            .max()
            .unwrap_or_default()
            + 1;
        Self {
            data: Mutex::new(TestData {
                expenses,
                categories,
                next_id,
            }),
            delays: Mutex::new(VecDeque::new()),
            failures: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A backend with no records.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Delays the response to the next call by `delay`. Queued delays are consumed one per call.
    pub fn delay_next(&self, delay: Duration) {
        lock(&self.delays).push_back(delay);
    }

    /// Makes the next call fail with `status` and the JSON `body`. Queued failures are consumed
    /// one per call.
    pub fn fail_next(&self, status: u16, body: serde_json::Value) {
        lock(&self.failures).push_back(Some((status, body.to_string())));
    }

    /// Lets the next call through even when failures are queued behind it.
    pub fn pass_next(&self) {
        lock(&self.failures).push_back(None);
    }

    /// The names of the operations called so far, oldest first.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// The state of a request is computed when it arrives; the response is then held back by any
    /// queued delay.
    async fn respond<T, F>(&self, operation: &str, handle: F) -> Result<T>
    where
        F: FnOnce(&mut TestData) -> Result<T> + Send,
        T: Send,
    {
        trace!("TestBackend {operation}");
        lock(&self.calls).push(operation.to_string());
        let delay = lock(&self.delays).pop_front();
        let failure = lock(&self.failures).pop_front().flatten();
        let result = match failure {
            Some((status, body)) => Err(ApiError::from_response(status, &body).into()),
            None => {
                let mut data = lock(&self.data);
                handle(&mut data)
            }
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reject(status: u16, body: serde_json::Value) -> crate::Error {
    ApiError::from_response(status, &body.to_string()).into()
}

fn invalid(field: &str, message: &str) -> crate::Error {
    reject(
        422,
        json!({"message": message, "errors": {field: [message]}}),
    )
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

impl TestData {
    fn take_id(&mut self) -> Id {
        let id = Id::new(self.next_id);
        self.next_id += 1;
        id
    }

    fn category(&self, id: Id) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    fn category_ref(&self, id: Id) -> Option<CategoryRef> {
        self.category(id).map(|c| CategoryRef {
            id: c.id,
            name: c.name.clone(),
            color: c.color.clone(),
        })
    }

    /// An expense as the server sends it, with its category eager-loaded.
    fn present_expense(&self, expense: &Expense) -> Expense {
        Expense {
            category: self.category_ref(expense.category_id),
            ..expense.clone()
        }
    }

    /// A category as the server sends it, with its expense count.
    fn present_category(&self, category: &Category) -> Category {
        Category {
            expenses_count: self
                .expenses
                .iter()
                .filter(|e| e.category_id == category.id)
                .count() as u64,
            ..category.clone()
        }
    }

    fn expense_index(&self, id: Id) -> Result<usize> {
        self.expenses
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| reject(404, json!({"message": "Expense not found"})))
    }

    fn category_index(&self, id: Id) -> Result<usize> {
        self.categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| reject(404, json!({"message": "Category not found"})))
    }

    fn check_expense(&self, payload: &ExpensePayload) -> Result<()> {
        if payload.title.trim().is_empty() {
            return Err(invalid("title", "The title field is required."));
        }
        if payload.title.chars().count() > 255 {
            return Err(invalid(
                "title",
                "The title field must not be greater than 255 characters.",
            ));
        }
        if !payload.amount.is_positive() {
            return Err(invalid("amount", "The amount field must be at least 0.01."));
        }
        if self.category(payload.category_id).is_none() {
            return Err(invalid(
                "category_id",
                "The selected category id is invalid.",
            ));
        }
        Ok(())
    }

    fn check_category(&self, payload: &CategoryPayload, existing: Option<Id>) -> Result<()> {
        let name = payload.name.trim();
        if name.is_empty() {
            return Err(invalid("name", "The name field is required."));
        }
        let taken = self
            .categories
            .iter()
            .any(|c| Some(c.id) != existing && c.name.eq_ignore_ascii_case(name));
        if taken {
            return Err(invalid("name", "The name has already been taken."));
        }
        if !is_valid_hex_color(&payload.color) {
            return Err(invalid("color", "The color field format is invalid."));
        }
        Ok(())
    }

    fn list_expenses(&self, filters: &Filters, page: u32) -> Page<Expense> {
        let search = filters.search.trim().to_lowercase();
        let mut matches: Vec<&Expense> = self
            .expenses
            .iter()
            .filter(|e| filters.start_date.is_none_or(|d| e.expense_date >= d))
            .filter(|e| filters.end_date.is_none_or(|d| e.expense_date <= d))
            .filter(|e| filters.category_id.is_none_or(|id| e.category_id == id))
            .filter(|e| {
                search.is_empty()
                    || e.title.to_lowercase().contains(&search)
                    || e.description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&search))
            })
            .collect();

        matches.sort_by(|a, b| {
            let ordering = match filters.sort_by {
                SortBy::ExpenseDate => a.expense_date.cmp(&b.expense_date),
                SortBy::Amount => a.amount.cmp(&b.amount),
                SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
            }
            .then_with(|| a.id.cmp(&b.id));
            match filters.sort_order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        paginate(
            matches.into_iter().map(|e| self.present_expense(e)).collect(),
            page,
            DEFAULT_PER_PAGE,
        )
    }

    fn dashboard(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> DashboardData {
        let in_range: Vec<&Expense> = self
            .expenses
            .iter()
            .filter(|e| start.is_none_or(|d| e.expense_date >= d))
            .filter(|e| end.is_none_or(|d| e.expense_date <= d))
            .collect();

        let total: Decimal = in_range.iter().map(|e| e.amount.value()).sum();
        let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        let mut by_category: BTreeMap<Id, (u64, Decimal)> = BTreeMap::new();
        for expense in &in_range {
            *daily.entry(expense.expense_date).or_default() += expense.amount.value();
            let entry = by_category.entry(expense.category_id).or_default();
            entry.0 += 1;
            entry.1 += expense.amount.value();
        }

        let days = match (start, end) {
            (Some(s), Some(e)) => (e - s).num_days() + 1,
            _ => daily.len() as i64,
        }
        .max(1);

        let mut category_breakdown: Vec<CategoryBreakdown> = by_category
            .iter()
            .filter_map(|(id, (_, sum))| {
                Some(CategoryBreakdown {
                    category: self.category_ref(*id)?,
                    total_amount: Amount::new(*sum),
                })
            })
            .collect();
        category_breakdown.sort_by(|a, b| b.total_amount.cmp(&a.total_amount));

        let mut top_categories: Vec<TopCategory> = by_category
            .iter()
            .filter_map(|(id, (count, sum))| {
                let category = self.category(*id)?;
                Some(TopCategory {
                    id: category.id,
                    name: category.name.clone(),
                    color: category.color.clone(),
                    expense_count: *count,
                    total_spent: Amount::new(*sum),
                })
            })
            .collect();
        top_categories.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
        top_categories.truncate(5);

        let mut recent: Vec<&Expense> = in_range.clone();
        recent.sort_by(|a, b| newest_first(a, b));
        let recent_expenses = recent
            .into_iter()
            .take(5)
            .map(|e| self.present_expense(e))
            .collect();

        DashboardData {
            summary: Summary {
                total_expenses: Amount::new(total),
                total_count: in_range.len() as u64,
                average_per_day: Amount::new((total / Decimal::from(days)).round_dp(2)),
                monthly_growth: None,
            },
            daily_expenses: daily
                .into_iter()
                .map(|(date, amount)| DailyExpense {
                    date,
                    amount: Amount::new(amount),
                })
                .collect(),
            category_breakdown,
            recent_expenses,
            top_categories,
            period_info: json!({
                "start_date": start.map(|d| d.to_string()),
                "end_date": end.map(|d| d.to_string()),
                "days": days,
            }),
        }
    }

    fn monthly_stats(&self, year: i32) -> serde_json::Value {
        let months: Vec<serde_json::Value> = (1..=12)
            .map(|month| {
                let (count, total) = self
                    .expenses
                    .iter()
                    .filter(|e| e.expense_date.year() == year && e.expense_date.month() == month)
                    .fold((0u64, Decimal::ZERO), |(count, total), e| {
                        (count + 1, total + e.amount.value())
                    });
                json!({"month": month, "count": count, "total": Amount::new(total)})
            })
            .collect();
        json!({"year": year, "months": months})
    }
}

fn newest_first(a: &Expense, b: &Expense) -> Ordering {
    b.expense_date
        .cmp(&a.expense_date)
        .then_with(|| b.id.cmp(&a.id))
}

fn paginate<T>(items: Vec<T>, page: u32, per_page: u32) -> Page<T> {
    let total = items.len() as u64;
    let last_page = u32::try_from(total.div_ceil(u64::from(per_page)))
        .unwrap_or(u32::MAX)
        .max(1);
    let current_page = page.max(1);
    let skip = (u64::from(current_page) - 1) * u64::from(per_page);
    let data: Vec<T> = items
        .into_iter()
        .skip(usize::try_from(skip).unwrap_or(usize::MAX))
        .take(per_page as usize)
        .collect();
    let (from, to) = if data.is_empty() {
        (0, 0)
    } else {
        (skip + 1, skip + data.len() as u64)
    };
    Page {
        data,
        total,
        per_page,
        current_page,
        from,
        to,
        last_page: Some(last_page),
    }
}

#[async_trait::async_trait]
impl Backend for TestBackend {
    async fn list_expenses(&self, filters: &Filters, page: u32) -> Result<Page<Expense>> {
        self.respond("list_expenses", |data| Ok(data.list_expenses(filters, page)))
            .await
    }

    async fn get_expense(&self, id: Id) -> Result<Expense> {
        self.respond("get_expense", |data| {
            let index = data.expense_index(id)?;
            Ok(data.present_expense(&data.expenses[index]))
        })
        .await
    }

    async fn create_expense(&self, payload: &ExpensePayload) -> Result<Expense> {
        self.respond("create_expense", |data| {
            data.check_expense(payload)?;
            let stamp = now();
            let expense = Expense {
                id: data.take_id(),
                title: payload.title.trim().to_string(),
                description: payload.description.clone(),
                amount: payload.amount,
                expense_date: payload.expense_date,
                category_id: payload.category_id,
                category: None,
                created_at: Some(stamp.clone()),
                updated_at: Some(stamp),
            };
            data.expenses.push(expense.clone());
            Ok(data.present_expense(&expense))
        })
        .await
    }

    async fn update_expense(&self, id: Id, payload: &ExpensePayload) -> Result<Expense> {
        self.respond("update_expense", |data| {
            let index = data.expense_index(id)?;
            data.check_expense(payload)?;
            let expense = &mut data.expenses[index];
            expense.title = payload.title.trim().to_string();
            expense.description = payload.description.clone();
            expense.amount = payload.amount;
            expense.expense_date = payload.expense_date;
            expense.category_id = payload.category_id;
            expense.updated_at = Some(now());
            let expense = expense.clone();
            Ok(data.present_expense(&expense))
        })
        .await
    }

    async fn delete_expense(&self, id: Id) -> Result<()> {
        self.respond("delete_expense", |data| {
            let index = data.expense_index(id)?;
            data.expenses.remove(index);
            Ok(())
        })
        .await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.respond("list_categories", |data| {
            Ok(data
                .categories
                .iter()
                .map(|c| data.present_category(c))
                .collect())
        })
        .await
    }

    async fn get_category(&self, id: Id) -> Result<Category> {
        self.respond("get_category", |data| {
            let index = data.category_index(id)?;
            Ok(data.present_category(&data.categories[index]))
        })
        .await
    }

    async fn create_category(&self, payload: &CategoryPayload) -> Result<Category> {
        self.respond("create_category", |data| {
            data.check_category(payload, None)?;
            let stamp = now();
            let category = Category {
                id: data.take_id(),
                name: payload.name.trim().to_string(),
                color: payload.color.clone(),
                description: payload.description.clone(),
                expenses_count: 0,
                created_at: Some(stamp.clone()),
                updated_at: Some(stamp),
            };
            data.categories.push(category.clone());
            Ok(category)
        })
        .await
    }

    async fn update_category(&self, id: Id, payload: &CategoryPayload) -> Result<Category> {
        self.respond("update_category", |data| {
            let index = data.category_index(id)?;
            data.check_category(payload, Some(id))?;
            let category = &mut data.categories[index];
            category.name = payload.name.trim().to_string();
            category.color = payload.color.clone();
            category.description = payload.description.clone();
            category.updated_at = Some(now());
            let category = category.clone();
            Ok(data.present_category(&category))
        })
        .await
    }

    async fn delete_category(&self, id: Id) -> Result<()> {
        self.respond("delete_category", |data| {
            let index = data.category_index(id)?;
            if data.expenses.iter().any(|e| e.category_id == id) {
                return Err(reject(
                    422,
                    json!({"message": "Cannot delete category with existing expenses"}),
                ));
            }
            data.categories.remove(index);
            Ok(())
        })
        .await
    }

    async fn dashboard(
        &self,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<DashboardData> {
        self.respond("dashboard", |data| Ok(data.dashboard(start_date, end_date)))
            .await
    }

    async fn monthly_stats(&self, year: i32) -> Result<serde_json::Value> {
        self.respond("monthly_stats", |data| Ok(data.monthly_stats(year)))
            .await
    }

    async fn health(&self) -> Result<serde_json::Value> {
        self.respond("health", |_| {
            Ok(json!({"status": "ok", "timestamp": now(), "backend": "in-memory"}))
        })
        .await
    }
}

/// Provides the seed data for this module.
fn seed_data() -> (Vec<Category>, Vec<Expense>) {
    let categories = SEED_CATEGORIES
        .iter()
        .map(|(id, name, color, description)| Category {
            id: Id::new(*id),
            name: name.to_string(),
            color: color.to_string(),
            description: Some(description.to_string()),
            expenses_count: 0,
            created_at: Some(SEED_TIMESTAMP.to_string()),
            updated_at: Some(SEED_TIMESTAMP.to_string()),
        })
        .collect();
    let expenses = SEED_EXPENSES
        .iter()
        .filter_map(|(id, title, amount, date, category_id)| {
            Some(Expense {
                id: Id::new(*id),
                title: title.to_string(),
                description: None,
                amount: Amount::from_str(amount).ok()?,
                expense_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?,
                category_id: Id::new(*category_id),
                category: None,
                created_at: Some(format!("{date}T12:00:00+00:00")),
                updated_at: Some(format!("{date}T12:00:00+00:00")),
            })
        })
        .collect();
    (categories, expenses)
}

const SEED_TIMESTAMP: &str = "2025-09-01T00:00:00+00:00";

/// Seed categories: id, name, color, description.
const SEED_CATEGORIES: &[(u64, &str, &str, &str)] = &[
    (1, "Groceries", "#10B981", "Supermarkets and food shopping"),
    (2, "Restaurants", "#EF4444", "Eating out and takeaway"),
    (3, "Transport", "#3B82F6", "Fuel, parking and transit"),
    (4, "Utilities", "#8B5CF6", "Electricity, water and internet"),
    (5, "Travel", "#F59E0B", "Flights and hotels"),
];

/// Seed expenses: id, title, amount, date, category id.
const SEED_EXPENSES: &[(u64, &str, &str, &str, u64)] = &[
    (101, "Whole Foods Market", "87.43", "2025-10-20", 1),
    (102, "Starbucks", "6.75", "2025-10-19", 2),
    (103, "Shell Gas Station", "52.30", "2025-10-18", 3),
    (104, "Chipotle", "14.85", "2025-10-17", 2),
    (105, "Electric bill", "142.67", "2025-10-16", 4),
    (106, "Trader Joe's", "63.21", "2025-10-15", 1),
    (107, "Bus pass", "45.00", "2025-10-14", 3),
    (108, "Panera Bread", "12.40", "2025-10-12", 2),
    (109, "Internet", "89.99", "2025-10-11", 4),
    (110, "Safeway", "95.82", "2025-10-10", 1),
    (111, "Olive Garden", "42.30", "2025-10-07", 2),
    (112, "Costco Wholesale", "118.56", "2025-10-05", 1),
    (113, "Chevron", "48.90", "2025-10-03", 3),
    (114, "Water bill", "45.88", "2025-10-01", 4),
    (115, "Farmers market", "23.10", "2025-09-28", 1),
    (116, "Parking", "12.00", "2025-09-26", 3),
    (117, "Sushi night", "58.20", "2025-09-24", 2),
];
