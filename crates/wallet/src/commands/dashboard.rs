//! Dashboard: balance, period summary and the latest transactions.

use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use wallet_core::format::{format_date, format_date_str};
use wallet_core::{Balance, Transaction, TransactionFilters, TransactionSummary, Wallet};

use crate::cli::{DashboardArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardView {
    start: NaiveDate,
    end: NaiveDate,
    balance: Balance,
    summary: TransactionSummary,
    recent: Vec<Transaction>,
}

fn month_start(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Newest first by date, then by creation time.
fn latest(mut transactions: Vec<Transaction>, count: usize) -> Vec<Transaction> {
    transactions.sort_by(|a, b| {
        b.calendar_date()
            .cmp(&a.calendar_date())
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    transactions.truncate(count);
    transactions
}

fn render_dashboard(view: &DashboardView, color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        output::detail_lines(&[
            ("Balance", output::currency(view.balance.balance, color)),
            (
                "Period",
                format!("{} - {}", format_date(view.start), format_date(view.end)),
            ),
            ("Income", output::currency(view.summary.income, color)),
            ("Expenses", output::currency(view.summary.expense, color)),
            ("Net", output::currency(view.summary.balance, color)),
        ])
    );

    if !view.summary.category_breakdown.is_empty() {
        let mut breakdown: Vec<_> = view.summary.category_breakdown.iter().collect();
        breakdown.sort_by(|a, b| b.1.total_cmp(a.1));
        let _ = writeln!(out, "\nBy category");
        let pairs: Vec<(&str, String)> = breakdown
            .into_iter()
            .map(|(name, total)| (name.as_str(), output::currency(*total, color)))
            .collect();
        let _ = writeln!(out, "{}", output::detail_lines(&pairs));
    }

    if view.recent.is_empty() {
        let _ = write!(out, "\nNo transactions yet");
    } else {
        let _ = writeln!(out, "\nRecent transactions");
        let lines: Vec<String> = view
            .recent
            .iter()
            .map(|tx| {
                format!(
                    "{}  {:<24}  {:<16}  {}",
                    format_date_str(&tx.date),
                    tx.description,
                    tx.category_name(),
                    output::signed_amount(tx.kind, tx.amount, color)
                )
            })
            .collect();
        let _ = write!(out, "{}", lines.join("\n"));
    }
    out
}

pub async fn handle(
    wallet: &Wallet,
    args: DashboardArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let end = util::parse_optional_date("end", args.end.as_deref())?.unwrap_or_else(util::today);
    let start =
        util::parse_optional_date("start", args.start.as_deref())?.unwrap_or(month_start(end));

    let filters = TransactionFilters::default();
    let (balance, summary, transactions) = util::with_spinner(
        "Loading dashboard...",
        global.quiet,
        async {
            tokio::try_join!(
                wallet.balance(),
                wallet.summary(Some(start), Some(end)),
                wallet.transactions(&filters),
            )
        },
    )
    .await?;

    let view = DashboardView {
        start,
        end,
        balance,
        summary,
        recent: latest(transactions, args.recent),
    };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| render_dashboard(v, color),
        |v| v.balance.balance.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
