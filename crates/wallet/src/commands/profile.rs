//! Account profile command handlers.

use secrecy::SecretString;
use wallet_core::format::{format_cpf, format_currency, format_datetime};
use wallet_core::{CoreError, PasswordForm, ProfileUpdate, User, Wallet};

use crate::cli::{GlobalOpts, ProfileArgs, ProfileCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Detail view ─────────────────────────────────────────────────────

pub fn user_detail(user: &User) -> String {
    let mut pairs = vec![
        ("ID", user.id.clone()),
        ("Name", user.name.clone()),
        ("Email", user.email.clone()),
    ];
    if let Some(ref cpf) = user.cpf {
        pairs.push(("CPF", format_cpf(cpf)));
    }
    pairs.push(("Balance", format_currency(user.balance)));
    pairs.push(("Active", if user.is_active { "yes" } else { "no" }.into()));
    if let Some(at) = user.created_at {
        pairs.push(("Member since", format_datetime(at)));
    }
    output::detail_lines(&pairs)
}

fn prompt_secret(prompt: &str) -> Result<SecretString, CliError> {
    let secret = rpassword::prompt_password(prompt).map_err(util::prompt_err)?;
    Ok(SecretString::from(secret))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(wallet: &Wallet, args: ProfileArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ProfileCommand::Show => {
            let user = wallet.profile().await?;
            let out = output::render_single(&global.output, &user, user_detail, |u| u.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProfileCommand::Update { name, cpf } => {
            if name.is_none() && cpf.is_none() {
                return Err(CliError::Validation {
                    field: "profile".into(),
                    reason: "pass --name and/or --cpf".into(),
                });
            }
            let update = ProfileUpdate { name, cpf };
            let mut notes = wallet.notifications();
            let user = wallet.update_profile(&update).await?;
            util::announce(&mut notes, global.quiet);

            let out = output::render_single(&global.output, &user, user_detail, |u| u.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ProfileCommand::Password => {
            let form = PasswordForm {
                current_password: prompt_secret("Current password: ")?,
                new_password: prompt_secret("New password: ")?,
                confirm_password: prompt_secret("Confirm new password: ")?,
            };
            let change = form.validate().map_err(CoreError::from)?;

            let mut notes = wallet.notifications();
            wallet.change_password(&change).await?;
            util::announce(&mut notes, global.quiet);
            Ok(())
        }

        ProfileCommand::Delete => {
            if !util::confirm(
                "Permanently delete this account and all of its data?",
                "profile delete",
                global.yes,
            )? {
                return Ok(());
            }
            let mut notes = wallet.notifications();
            wallet.delete_account().await?;
            util::announce(&mut notes, global.quiet);
            Ok(())
        }
    }
}
