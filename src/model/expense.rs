use crate::model::{date, Amount, Id};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single expense as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Id,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Amount,
    #[serde(with = "date")]
    pub expense_date: NaiveDate,
    pub category_id: Id,
    /// Denormalized category fields for display. Absent when the backend did not eager-load it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Expense {
    /// The category name for display, or an empty string.
    pub fn category_name(&self) -> &str {
        self.category.as_ref().map(|c| c.name.as_str()).unwrap_or("")
    }
}

/// The subset of a category that is embedded in other payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: Id,
    pub name: String,
    pub color: String,
}

/// The body sent when creating or updating an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpensePayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Amount,
    #[serde(with = "date")]
    pub expense_date: NaiveDate,
    pub category_id: Id,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_deserialize_backend_expense() {
        let json = r##"{
            "id": "12",
            "title": "Whole Foods Market",
            "description": null,
            "amount": "87.43",
            "expense_date": "2025-10-20T00:00:00.000000Z",
            "category_id": 3,
            "category": {"id": 3, "name": "Groceries", "color": "#10B981"},
            "created_at": "2025-10-21T09:15:30.000000Z"
        }"##;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.id, Id::new(12));
        assert_eq!(expense.amount.value(), Decimal::from_str("87.43").unwrap());
        assert_eq!(
            expense.expense_date,
            NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()
        );
        assert_eq!(expense.category_name(), "Groceries");
        assert_eq!(expense.description, None);
        assert_eq!(expense.updated_at, None);
    }

    #[test]
    fn test_serialize_payload() {
        let payload = ExpensePayload {
            title: "Coffee".to_string(),
            description: None,
            amount: Amount::from_str("4.5").unwrap(),
            expense_date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            category_id: Id::new(1),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "title": "Coffee",
                "amount": 4.5,
                "expense_date": "2025-01-02",
                "category_id": 1
            })
        );
    }
}
