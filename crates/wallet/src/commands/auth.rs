//! Session command handlers: login, register, logout, whoami.

use std::io::{self, IsTerminal};

use dialoguer::Input;
use secrecy::{ExposeSecret, SecretString};
use wallet_core::{CoreError, LoginCredentials, RegisterForm, Wallet};

use crate::cli::{GlobalOpts, LoginArgs, RegisterArgs};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::{profile, util};

// ── Prompts ─────────────────────────────────────────────────────────

fn prompt_email() -> Result<String, CliError> {
    Input::new()
        .with_prompt("Email")
        .interact_text()
        .map_err(util::prompt_err)
}

fn prompt_secret(prompt: &str) -> Result<SecretString, CliError> {
    let secret = rpassword::prompt_password(prompt).map_err(util::prompt_err)?;
    Ok(SecretString::from(secret))
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn login(wallet: &Wallet, args: LoginArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let (profile_name, profile) = config::active_profile(global, &cfg)?;
    let interactive = io::stdin().is_terminal();

    // 1. Email (flag > profile > env > prompt)
    let email = match args.email {
        Some(email) => email,
        None => match wallet_config::resolve_email(&profile, &profile_name) {
            Ok(email) => email,
            Err(_) if interactive => prompt_email()?,
            Err(e) => return Err(e.into()),
        },
    };

    // 2. Password (env > keyring > config > prompt)
    let password = match wallet_config::resolve_password(&profile, &profile_name) {
        Ok(password) => password,
        Err(_) if interactive => prompt_secret("Password: ")?,
        Err(e) => return Err(e.into()),
    };

    let credentials = LoginCredentials { email, password };

    let mut notes = wallet.notifications();
    let session = util::with_spinner("Signing in...", global.quiet, wallet.login(&credentials))
        .await
        .map_err(|e| match e {
            CoreError::Unauthorized { message } => CoreError::InvalidCredentials { message },
            other => other,
        })?;
    util::announce(&mut notes, global.quiet);

    if args.save_password {
        wallet_config::store_password(&profile_name, credentials.password.expose_secret())?;
        if !global.quiet {
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
        }
    }

    let out = output::render_single(&global.output, &session.user, profile::user_detail, |u| {
        u.id.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn register(
    wallet: &Wallet,
    args: RegisterArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: "registration prompts for a password and needs a terminal".into(),
        });
    }

    let form = RegisterForm {
        name: args.name,
        email: args.email,
        password: prompt_secret("Password: ")?,
        confirm_password: prompt_secret("Confirm password: ")?,
        cpf: args.cpf.unwrap_or_default(),
    };
    let data = form.validate().map_err(CoreError::from)?;

    let mut notes = wallet.notifications();
    let session =
        util::with_spinner("Creating account...", global.quiet, wallet.register(&data)).await?;
    util::announce(&mut notes, global.quiet);

    let out = output::render_single(&global.output, &session.user, profile::user_detail, |u| {
        u.id.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

#[allow(clippy::unnecessary_wraps)]
pub fn logout(wallet: &Wallet, global: &GlobalOpts) -> Result<(), CliError> {
    wallet.logout();
    if !global.quiet {
        eprintln!("✓ Logged out");
    }
    Ok(())
}

pub async fn whoami(wallet: &Wallet, global: &GlobalOpts) -> Result<(), CliError> {
    let user = wallet.profile().await?;
    let out = output::render_single(&global.output, &user, profile::user_detail, |u| {
        u.email.clone()
    });
    output::print_output(&out, global.quiet);
    Ok(())
}
