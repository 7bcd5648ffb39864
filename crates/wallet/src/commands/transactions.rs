//! Transaction command handlers.

use tabled::Tabled;
use wallet_core::format::{format_date_str, format_datetime, format_decimal, format_signed_amount};
use wallet_core::{
    CoreError, Transaction, TransactionFilters, TransactionForm, TransactionUpdate, Wallet,
};

use crate::cli::{GlobalOpts, TransactionsArgs, TransactionsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Amount")]
    amount: String,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: tx.id.clone(),
            date: format_date_str(&tx.date),
            description: tx.description.clone(),
            category: tx.category_name().to_owned(),
            amount: format_signed_amount(tx.kind, tx.amount),
        }
    }
}

fn detail(tx: &Transaction, color: bool) -> String {
    let mut pairs = vec![
        ("ID", tx.id.clone()),
        ("Date", format_date_str(&tx.date)),
        ("Description", tx.description.clone()),
        ("Category", tx.category_name().to_owned()),
        ("Type", tx.kind.to_string()),
        ("Amount", output::signed_amount(tx.kind, tx.amount, color)),
    ];
    if let Some(at) = tx.created_at {
        pairs.push(("Created", format_datetime(at)));
    }
    output::detail_lines(&pairs)
}

/// Overlay the changed fields on the stored record and validate the
/// result the way a new transaction is validated.
fn edit_form(current: &Transaction, changes: Changes) -> TransactionForm {
    TransactionForm {
        kind: changes.kind.unwrap_or(current.kind),
        amount: changes
            .amount
            .unwrap_or_else(|| format_decimal(current.amount)),
        category_id: changes
            .category
            .unwrap_or_else(|| current.category_id.clone()),
        description: changes
            .description
            .unwrap_or_else(|| current.description.clone()),
        date: changes
            .date
            .unwrap_or_else(|| current.date.get(..10).unwrap_or(&current.date).to_owned()),
    }
}

#[derive(Default)]
struct Changes {
    kind: Option<wallet_core::TransactionType>,
    amount: Option<String>,
    category: Option<String>,
    description: Option<String>,
    date: Option<String>,
}

impl Changes {
    fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.date.is_none()
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    wallet: &Wallet,
    args: TransactionsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        TransactionsCommand::List {
            kind,
            start,
            end,
            limit,
        } => {
            let filters = TransactionFilters {
                start_date: util::parse_optional_date("start", start.as_deref())?,
                end_date: util::parse_optional_date("end", end.as_deref())?,
                kind: kind.map(Into::into),
            };
            let mut list =
                util::with_spinner("Loading transactions...", global.quiet, wallet.transactions(&filters))
                    .await?;
            if let Some(limit) = limit {
                list.truncate(limit);
            }
            let out = output::render_list(
                &global.output,
                &list,
                |tx| TransactionRow::from(tx),
                |tx| tx.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TransactionsCommand::Get { id } => {
            let tx = wallet
                .transaction(&id)
                .await
                .map_err(|e| CliError::from(e).listed_by("transactions list"))?;
            let out = output::render_single(&global.output, &tx, |t| detail(t, color), |t| {
                t.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TransactionsCommand::Create {
            kind,
            amount,
            category,
            description,
            date,
        } => {
            let form = TransactionForm {
                kind: kind.into(),
                amount,
                category_id: category,
                description,
                date: date.unwrap_or_else(|| util::today().format("%Y-%m-%d").to_string()),
            };
            let mut notes = wallet.notifications();
            let tx = wallet.submit_transaction(&form).await?;
            util::announce(&mut notes, global.quiet);

            let out = output::render_single(&global.output, &tx, |t| detail(t, color), |t| {
                t.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TransactionsCommand::Update {
            id,
            kind,
            amount,
            category,
            description,
            date,
        } => {
            let changes = Changes {
                kind: kind.map(Into::into),
                amount,
                category,
                description,
                date,
            };
            if changes.is_empty() {
                return Err(CliError::Validation {
                    field: "transaction".into(),
                    reason: "nothing to change; pass at least one field flag".into(),
                });
            }

            let current = wallet
                .transaction(&id)
                .await
                .map_err(|e| CliError::from(e).listed_by("transactions list"))?;
            let valid = edit_form(&current, changes)
                .validate()
                .map_err(CoreError::from)?;
            let update = TransactionUpdate {
                amount: Some(valid.amount),
                kind: Some(valid.kind),
                category_id: Some(valid.category_id),
                description: Some(valid.description),
                date: Some(valid.date),
            };

            let mut notes = wallet.notifications();
            let tx = wallet.update_transaction(&id, &update).await?;
            util::announce(&mut notes, global.quiet);

            let out = output::render_single(&global.output, &tx, |t| detail(t, color), |t| {
                t.id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        TransactionsCommand::Delete { id } => {
            if !util::confirm(
                &format!("Delete transaction '{id}'?"),
                "transactions delete",
                global.yes,
            )? {
                return Ok(());
            }
            let mut notes = wallet.notifications();
            wallet
                .delete_transaction(&id)
                .await
                .map_err(|e| CliError::from(e).listed_by("transactions list"))?;
            util::announce(&mut notes, global.quiet);
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use wallet_core::TransactionType;

    use super::*;

    fn stored() -> Transaction {
        Transaction {
            id: "t1".into(),
            amount: 1234.5,
            kind: TransactionType::Expense,
            category: None,
            category_id: "c1".into(),
            description: "Mercado".into(),
            date: "2024-03-05T00:00:00.000Z".into(),
            user_id: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn unchanged_fields_keep_stored_values() {
        let form = edit_form(
            &stored(),
            Changes {
                description: Some("Feira".into()),
                ..Changes::default()
            },
        );
        assert_eq!(form.amount, "1.234,50");
        assert_eq!(form.date, "2024-03-05");

        let valid = form.validate().unwrap();
        assert!((valid.amount - 1234.5).abs() < f64::EPSILON);
        assert_eq!(valid.description, "Feira");
        assert_eq!(valid.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn edited_fields_are_validated() {
        let form = edit_form(
            &stored(),
            Changes {
                description: Some("ab".into()),
                ..Changes::default()
            },
        );
        let err = form.validate().unwrap_err();
        assert!(err.message_for("description").is_some());
    }

    #[test]
    fn rows_show_signed_amounts() {
        let row = TransactionRow::from(&stored());
        assert_eq!(row.amount, "- R$ 1.234,50");
        assert_eq!(row.date, "05/03/2024");
        assert_eq!(row.category, "c1");
    }
}
