use crate::model::{date, Amount, CategoryRef, Expense, Id};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The dashboard payload for a date range.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    #[serde(default)]
    pub summary: Summary,
    #[serde(default)]
    pub daily_expenses: Vec<DailyExpense>,
    #[serde(default)]
    pub category_breakdown: Vec<CategoryBreakdown>,
    #[serde(default)]
    pub recent_expenses: Vec<Expense>,
    #[serde(default)]
    pub top_categories: Vec<TopCategory>,
    #[serde(default)]
    pub period_info: serde_json::Value,
}

impl DashboardData {
    /// The share of the period total spent in each breakdown entry, as a rounded percentage.
    pub fn category_shares(&self) -> Vec<(&CategoryBreakdown, u32)> {
        let total = self.summary.total_expenses.value();
        self.category_breakdown
            .iter()
            .map(|c| {
                (
                    c,
                    crate::format::calculate_percentage(c.total_amount.value(), total),
                )
            })
            .collect()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub total_expenses: Amount,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub average_per_day: Amount,
    /// Percent change against the previous month. Absent when there is no previous data.
    #[serde(default)]
    pub monthly_growth: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyExpense {
    #[serde(with = "date")]
    pub date: NaiveDate,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: CategoryRef,
    pub total_amount: Amount,
}

/// A category with all-time spending statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopCategory {
    pub id: Id,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub expense_count: u64,
    #[serde(default)]
    pub total_spent: Amount,
}
