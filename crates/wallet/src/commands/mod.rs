//! Command dispatch: bridges CLI args -> wallet operations -> output formatting.

pub mod auth;
pub mod categories;
pub mod config_cmd;
pub mod dashboard;
pub mod profile;
pub mod transactions;
pub mod util;

use wallet_core::Wallet;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, wallet: &Wallet, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        // Session commands manage the stored session themselves
        Command::Login(args) => auth::login(wallet, args, global).await,
        Command::Register(args) => auth::register(wallet, args, global).await,
        Command::Logout => auth::logout(wallet, global),

        // Everything else needs a restored session
        cmd => {
            util::require_session(wallet).await?;
            match cmd {
                Command::Whoami => auth::whoami(wallet, global).await,
                Command::Dashboard(args) => dashboard::handle(wallet, args, global).await,
                Command::Transactions(args) => transactions::handle(wallet, args, global).await,
                Command::Categories(args) => categories::handle(wallet, args, global).await,
                Command::Profile(args) => profile::handle(wallet, args, global).await,
                // Handled above or before dispatch
                Command::Login(_)
                | Command::Register(_)
                | Command::Logout
                | Command::Config(_)
                | Command::Completions(_) => unreachable!(),
            }
        }
    }
}
