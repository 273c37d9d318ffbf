//! Client-side validation of the expense and category forms.
//!
//! A form holds the raw text a user typed. `validate` either produces the payload to send to the
//! backend or a `ValidationError` listing a message per offending field. Validation failures never
//! reach the store.

use crate::format::{format_date_for_input, is_valid_hex_color};
use crate::model::{
    parse_date, Amount, Category, CategoryPayload, Expense, ExpensePayload, Id, MAX_AMOUNT,
};
use chrono::NaiveDate;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

const TITLE_MAX: usize = 255;
const NAME_MAX: usize = 255;
const EXPENSE_DESCRIPTION_MAX: usize = 1000;
const CATEGORY_DESCRIPTION_MAX: usize = 500;

/// The color a new category starts with.
pub const DEFAULT_CATEGORY_COLOR: &str = "#3B82F6";

/// Field name to message, in the order the fields appear on the form.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// A form that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The form has errors: {0}")]
pub struct ValidationError(FieldErrors);

impl ValidationError {
    pub fn fields(&self) -> &FieldErrors {
        &self.0
    }
}

fn finish<T>(errors: FieldErrors, value: impl FnOnce() -> T) -> Result<T, ValidationError> {
    if errors.is_empty() {
        Ok(value())
    } else {
        Err(ValidationError(errors))
    }
}

fn optional_text(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// The expense form's raw inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseForm {
    pub title: String,
    pub description: String,
    pub amount: String,
    pub expense_date: String,
    pub category_id: String,
}

impl ExpenseForm {
    /// An empty form dated `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            amount: String::new(),
            expense_date: today.to_string(),
            category_id: String::new(),
        }
    }

    /// A form prefilled from an existing expense, for editing.
    pub fn from_expense(expense: &Expense) -> Self {
        Self {
            title: expense.title.clone(),
            description: expense.description.clone().unwrap_or_default(),
            amount: expense.amount.to_string(),
            expense_date: format_date_for_input(&expense.expense_date.to_string()),
            category_id: expense.category_id.to_string(),
        }
    }

    /// Checks every field and builds the payload. Dates after `today` are rejected.
    pub fn validate(&self, today: NaiveDate) -> Result<ExpensePayload, ValidationError> {
        let mut errors = FieldErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.add("title", "Title is required");
        } else if self.title.chars().count() > TITLE_MAX {
            errors.add("title", "Title must be less than 255 characters");
        }

        let amount = if self.amount.trim().is_empty() {
            errors.add("amount", "Amount is required");
            None
        } else {
            match Amount::from_str(&self.amount) {
                Ok(a) if !a.is_positive() => {
                    errors.add("amount", "Amount must be greater than 0");
                    None
                }
                Ok(a) if a.value() > MAX_AMOUNT => {
                    errors.add("amount", "Amount cannot exceed 99,999,999.99");
                    None
                }
                Ok(a) => Some(a),
                Err(_) => {
                    errors.add("amount", "Amount must be a valid number");
                    None
                }
            }
        };

        let expense_date = if self.expense_date.trim().is_empty() {
            errors.add("expense_date", "Date is required");
            None
        } else {
            match parse_date(&self.expense_date) {
                Some(d) if d > today => {
                    errors.add("expense_date", "Date cannot be in the future");
                    None
                }
                Some(d) => Some(d),
                None => {
                    errors.add("expense_date", "Date must be a valid date");
                    None
                }
            }
        };

        let category_id = match Id::from_str(&self.category_id) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add("category_id", "Category is required");
                None
            }
        };

        if self.description.chars().count() > EXPENSE_DESCRIPTION_MAX {
            errors.add(
                "description",
                "Description must be less than 1000 characters",
            );
        }

        match (amount, expense_date, category_id) {
            (Some(amount), Some(expense_date), Some(category_id)) => finish(errors, || {
                ExpensePayload {
                    title: title.to_string(),
                    description: optional_text(&self.description),
                    amount,
                    expense_date,
                    category_id,
                }
            }),
            _ => Err(ValidationError(errors)),
        }
    }
}

/// The category form's raw inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryForm {
    pub name: String,
    pub color: String,
    pub description: String,
}

impl Default for CategoryForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            description: String::new(),
        }
    }
}

impl CategoryForm {
    /// A form prefilled from an existing category, for editing.
    pub fn from_category(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            color: category.color.clone(),
            description: category.description.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> Result<CategoryPayload, ValidationError> {
        let mut errors = FieldErrors::default();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        } else if self.name.chars().count() > NAME_MAX {
            errors.add("name", "Name must be less than 255 characters");
        }

        if self.color.is_empty() {
            errors.add("color", "Color is required");
        } else if !is_valid_hex_color(&self.color) {
            errors.add("color", "Please enter a valid hex color (e.g., #FF5733)");
        }

        if self.description.chars().count() > CATEGORY_DESCRIPTION_MAX {
            errors.add("description", "Description must be less than 500 characters");
        }

        finish(errors, || CategoryPayload {
            name: name.to_string(),
            color: self.color.clone(),
            description: optional_text(&self.description),
        })
    }
}
