use crate::api::Mode;
use crate::args::DashboardArgs;
use crate::commands::{user_error, Out, Session};
use crate::controllers::{DashboardController, DateRange};
use crate::format::{display_date, format_currency, truncate_text};
use crate::model::DashboardData;
use crate::{Config, Result};
use chrono::NaiveDate;
use std::fmt::Write;

/// Shows the summary for the requested range, defaulting to the month containing `today`.
pub async fn dashboard(
    config: &Config,
    mode: Mode,
    args: &DashboardArgs,
    today: NaiveDate,
) -> Result<Out<DashboardData>> {
    let session = Session::open(config, mode).await?;
    run_dashboard(&session, args, today).await
}

pub(crate) async fn run_dashboard(
    session: &Session,
    args: &DashboardArgs,
    today: NaiveDate,
) -> Result<Out<DashboardData>> {
    let month = DateRange::current_month(today);
    let range = DateRange {
        start_date: args.start_date().or(month.start_date),
        end_date: args.end_date().or(month.end_date),
    };
    let controller =
        DashboardController::new(session.store.clone(), session.backend.clone(), today)
            .with_range(range);
    controller.mount().await.map_err(user_error)?;

    let state = session.store.state();
    let data = state.dashboard.as_deref().cloned().unwrap_or_default();
    let message = render(&data, range.start_date, range.end_date, &session.currency());
    Ok(Out::new(message, data))
}

/// Per-month statistics for `year`, as the backend reports them.
pub async fn monthly_stats(
    config: &Config,
    mode: Mode,
    year: i32,
    today: NaiveDate,
) -> Result<Out<serde_json::Value>> {
    let session = Session::open(config, mode).await?;
    run_monthly_stats(&session, year, today).await
}

pub(crate) async fn run_monthly_stats(
    session: &Session,
    year: i32,
    today: NaiveDate,
) -> Result<Out<serde_json::Value>> {
    let controller =
        DashboardController::new(session.store.clone(), session.backend.clone(), today);
    let stats = controller.monthly_stats(year).await.map_err(user_error)?;
    let message = serde_json::to_string_pretty(&stats)?;
    Ok(Out::new(format!("Monthly statistics for {year}:\n{message}"), stats))
}

fn render(
    data: &DashboardData,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    currency: &str,
) -> String {
    let bound = |d: Option<NaiveDate>| d.map(display_date).unwrap_or_else(|| "...".to_string());
    let money = |a: &crate::model::Amount| format_currency(Some(a.value()), currency);
    let summary = &data.summary;

    let mut s = String::new();
    let _ = writeln!(s, "Dashboard {} to {}", bound(start), bound(end));
    let _ = writeln!(s, "  Total expenses:  {}", money(&summary.total_expenses));
    let _ = writeln!(s, "  Expenses:        {}", summary.total_count);
    let _ = writeln!(s, "  Average per day: {}", money(&summary.average_per_day));
    if let Some(growth) = summary.monthly_growth {
        let _ = writeln!(s, "  Monthly growth:  {growth:+.1}%");
    }

    if !data.category_breakdown.is_empty() {
        let _ = writeln!(s, "By category:");
        for (entry, share) in data.category_shares() {
            let _ = writeln!(
                s,
                "  {:<20} {:>14} {share:>3}%",
                truncate_text(&entry.category.name, 20),
                money(&entry.total_amount)
            );
        }
    }

    if !data.recent_expenses.is_empty() {
        let _ = writeln!(s, "Recent expenses:");
        for expense in &data.recent_expenses {
            let _ = writeln!(
                s,
                "  {}  {:<30} {:>14}",
                display_date(expense.expense_date),
                truncate_text(&expense.title, 30),
                money(&expense.amount)
            );
        }
    }
    s.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 21).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_defaults_to_current_month() {
        let env = TestEnv::new().await;
        let out = run_dashboard(&env.session(), &DashboardArgs::default(), today())
            .await
            .unwrap();
        let message = out.message();
        assert!(message.starts_with("Dashboard Oct 01, 2025 to Oct 31, 2025"));
        assert!(message.contains("Total expenses:  $866.06"));
        assert!(message.contains("Groceries"));
        assert_eq!(out.structure().unwrap().summary.total_count, 14);
    }

    #[tokio::test]
    async fn test_dashboard_custom_range() {
        let env = TestEnv::new().await;
        let args = DashboardArgs::new(
            NaiveDate::from_ymd_opt(2025, 9, 1),
            NaiveDate::from_ymd_opt(2025, 9, 30),
            None,
        );
        let out = run_dashboard(&env.session(), &args, today()).await.unwrap();
        let data = out.structure().unwrap();
        assert_eq!(data.summary.total_count, 3);
        assert!(out.message().starts_with("Dashboard Sep 01, 2025 to Sep 30, 2025"));
    }

    #[tokio::test]
    async fn test_monthly_stats() {
        let env = TestEnv::new().await;
        let out = run_monthly_stats(&env.session(), 2025, today()).await.unwrap();
        assert!(out.message().starts_with("Monthly statistics for 2025:"));
        assert_eq!(out.structure().unwrap()["months"][9]["total"], 866.06);
    }

    #[tokio::test]
    async fn test_dashboard_failure_message() {
        let env = TestEnv::new().await;
        env.backend()
            .fail_next(500, serde_json::json!({"message": "Failed to load dashboard data"}));
        let e = run_dashboard(&env.session(), &DashboardArgs::default(), today())
            .await
            .unwrap_err();
        assert_eq!(e.to_string(), "Failed to load dashboard data");
    }
}
