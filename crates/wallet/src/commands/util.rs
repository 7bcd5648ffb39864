//! Shared helpers for command handlers.

use std::future::Future;
use std::io::{self, IsTerminal};
use std::time::Duration;

use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use wallet_core::{Level, Notification, TransactionType, Wallet};

use crate::cli::KindArg;
use crate::error::CliError;

impl From<KindArg> for TransactionType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Income => TransactionType::Income,
            KindArg::Expense => TransactionType::Expense,
        }
    }
}

/// Load the stored session; commands past this point are authenticated.
pub async fn require_session(wallet: &Wallet) -> Result<(), CliError> {
    match wallet.restore().await? {
        Some(session) => {
            tracing::debug!(user = %session.user.email, "session restored");
            Ok(())
        }
        None => Err(CliError::NotLoggedIn),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal to ask on, the operation is refused.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(io::Error::other(e)))?;
    Ok(confirmed)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Parse a `YYYY-MM-DD` flag value.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("expected YYYY-MM-DD, got '{raw}'"),
    })
}

pub fn parse_optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, CliError> {
    raw.map(|r| parse_date(field, r)).transpose()
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Print the success notifications a mutation produced.
///
/// Failures are reported through the returned error instead.
pub fn announce(notes: &mut broadcast::Receiver<Notification>, quiet: bool) {
    while let Ok(note) = notes.try_recv() {
        if quiet || note.level != Level::Success {
            continue;
        }
        eprintln!("✓ {}", note.message);
    }
}

/// Run `fut` behind a spinner on interactive terminals.
pub async fn with_spinner<T>(message: &str, quiet: bool, fut: impl Future<Output = T>) -> T {
    if quiet || !io::stderr().is_terminal() {
        return fut.await;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    pb.finish_and_clear();
    out
}
