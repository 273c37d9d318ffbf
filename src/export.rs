//! CSV export of expenses.

use crate::api::Backend;
use crate::model::{Expense, Filters};
use crate::Result;
use anyhow::Context;
use std::io::Write;
use tracing::debug;

const HEADER: [&str; 6] = ["id", "date", "title", "category", "amount", "description"];

/// Fetches every page of expenses that match `filters`, in the backend's order.
pub(crate) async fn fetch_all(backend: &dyn Backend, filters: &Filters) -> Result<Vec<Expense>> {
    let mut expenses = Vec::new();
    let mut page = 1;
    loop {
        let fetched = backend
            .list_expenses(filters, page)
            .await
            .with_context(|| format!("Unable to fetch page {page} of the expenses"))?;
        debug!("Fetched export page {page} of {}", fetched.last_page());
        let more = fetched.has_next() && !fetched.data.is_empty();
        expenses.extend(fetched.data);
        if !more {
            break;
        }
        page += 1;
    }
    Ok(expenses)
}

/// Writes `expenses` with a header row. Returns the number of data rows.
pub(crate) fn write_csv<W: Write>(out: W, expenses: &[Expense]) -> Result<usize> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);
    csv.write_record(HEADER)?;
    for expense in expenses {
        csv.write_record([
            expense.id.to_string().as_str(),
            expense.expense_date.format("%Y-%m-%d").to_string().as_str(),
            expense.title.as_str(),
            expense.category_name(),
            expense.amount.to_string().as_str(),
            expense.description.as_deref().unwrap_or(""),
        ])?;
    }
    csv.flush().context("Unable to flush the CSV output")?;
    Ok(expenses.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestBackend;
    use crate::model::{FiltersPatch, Id};

    #[tokio::test]
    async fn test_fetch_all_follows_pages() {
        let backend = TestBackend::default();
        let all = fetch_all(&backend, &Filters::default()).await.unwrap();
        assert_eq!(all.len(), 17);
        assert_eq!(backend.calls(), vec!["list_expenses", "list_expenses"]);

        let filters =
            Filters::default().merged(&FiltersPatch::default().category_id(Some(Id::new(5))));
        assert!(fetch_all(&backend, &filters).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_csv_quotes_fields() {
        let backend = TestBackend::default();
        let mut expenses = fetch_all(&backend, &Filters::default()).await.unwrap();
        expenses.truncate(1);
        expenses[0].description = Some("weekly shop, organic".to_string());

        let mut out = Vec::new();
        assert_eq!(write_csv(&mut out, &expenses).unwrap(), 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "id,date,title,category,amount,description\n\
             101,2025-10-20,Whole Foods Market,Groceries,87.43,\"weekly shop, organic\"\n"
        );
    }
}
