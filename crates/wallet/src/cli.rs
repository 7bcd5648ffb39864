//! Clap derive structures for the `wallet` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wallet -- personal finance from the command line
#[derive(Debug, Parser)]
#[command(
    name = "wallet",
    version,
    about = "Track income, expenses and categories from the command line",
    long_about = "A command-line client for the wallet personal finance backend.\n\n\
        Sign in once with `wallet login`; the session is kept between runs\n\
        and renewed automatically while the refresh token is valid.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "WALLET_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile), e.g. http://localhost:3000/api
    #[arg(long, env = "WALLET_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WALLET_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "WALLET_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "WALLET_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Direction of a transaction or category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Money coming in
    #[value(alias = "receita")]
    Income,
    /// Money going out
    #[value(alias = "despesa")]
    Expense,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and keep the session for later commands
    Login(LoginArgs),

    /// Create an account and sign in
    Register(RegisterArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Balance, period summary and recent transactions
    #[command(alias = "dash")]
    Dashboard(DashboardArgs),

    /// Manage transactions
    #[command(alias = "tx", alias = "t")]
    Transactions(TransactionsArgs),

    /// Manage categories
    #[command(alias = "cat", alias = "c")]
    Categories(CategoriesArgs),

    /// View and manage the account
    Profile(ProfileArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  AUTH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email (defaults to the profile's email)
    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// Store the password in the system keyring after a successful login
    #[arg(long)]
    pub save_password: bool,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Full name
    #[arg(long)]
    pub name: String,

    /// Account email
    #[arg(long, short = 'e')]
    pub email: String,

    /// CPF (optional, digits only)
    #[arg(long)]
    pub cpf: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DASHBOARD
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Period start (YYYY-MM-DD, defaults to the first day of this month)
    #[arg(long)]
    pub start: Option<String>,

    /// Period end (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub end: Option<String>,

    /// Number of recent transactions to show
    #[arg(long, short = 'l', default_value = "5")]
    pub recent: usize,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TRANSACTIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TransactionsArgs {
    #[command(subcommand)]
    pub command: TransactionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TransactionsCommand {
    /// List transactions
    #[command(alias = "ls")]
    List {
        /// Only income or expense
        #[arg(long = "type", short = 't', value_enum)]
        kind: Option<KindArg>,

        /// From date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// To date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Max rows to show
        #[arg(long, short = 'l')]
        limit: Option<usize>,
    },

    /// Get transaction details
    Get {
        /// Transaction ID
        id: String,
    },

    /// Record a transaction
    Create {
        /// Income or expense
        #[arg(long = "type", short = 't', value_enum)]
        kind: KindArg,

        /// Amount in pt-BR notation, e.g. 1.234,56 or 50,00
        #[arg(long, short = 'a', allow_hyphen_values = true)]
        amount: String,

        /// Category ID
        #[arg(long, short = 'c')]
        category: String,

        /// Description (at least 3 characters)
        #[arg(long, short = 'd')]
        description: String,

        /// Date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Change a transaction
    Update {
        /// Transaction ID
        id: String,

        /// New direction
        #[arg(long = "type", short = 't', value_enum)]
        kind: Option<KindArg>,

        /// New amount in pt-BR notation
        #[arg(long, short = 'a')]
        amount: Option<String>,

        /// New category ID
        #[arg(long, short = 'c')]
        category: Option<String>,

        /// New description
        #[arg(long, short = 'd')]
        description: Option<String>,

        /// New date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Delete a transaction
    #[command(alias = "rm")]
    Delete {
        /// Transaction ID
        id: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CATEGORIES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    pub command: CategoriesCommand,
}

#[derive(Debug, Subcommand)]
pub enum CategoriesCommand {
    /// List categories
    #[command(alias = "ls")]
    List {
        /// Only income or expense categories
        #[arg(long = "type", short = 't', value_enum)]
        kind: Option<KindArg>,

        /// Hide deactivated categories
        #[arg(long)]
        active: bool,
    },

    /// Get category details
    Get {
        /// Category ID
        id: String,
    },

    /// Create a custom category
    Create {
        /// Name (2-50 characters)
        #[arg(long, short = 'n')]
        name: String,

        /// Income or expense
        #[arg(long = "type", short = 't', value_enum)]
        kind: KindArg,

        /// Colour as #RRGGBB
        #[arg(long, default_value = "#6366f1")]
        color: String,

        /// Icon (an emoji)
        #[arg(long, default_value = "📦")]
        icon: String,
    },

    /// Change a category's name, colour or icon
    Update {
        /// Category ID
        id: String,

        /// New name
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// New colour as #RRGGBB
        #[arg(long)]
        color: Option<String>,

        /// New icon
        #[arg(long)]
        icon: Option<String>,
    },

    /// Delete a custom category
    #[command(alias = "rm")]
    Delete {
        /// Category ID
        id: String,
    },

    /// Re-enable a category
    Activate {
        /// Category ID
        id: String,
    },

    /// Hide a category from selection
    Deactivate {
        /// Category ID
        id: String,
    },

    /// Set the display order
    Reorder {
        /// Every category ID, in the desired order
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PROFILE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    /// Show the account profile
    Show,

    /// Change name or CPF
    Update {
        /// New name
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// New CPF
        #[arg(long)]
        cpf: Option<String>,
    },

    /// Change the account password (prompts)
    Password,

    /// Permanently delete the account
    Delete,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Print the config and session file locations
    Path,

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
