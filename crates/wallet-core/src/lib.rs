// wallet-core: Session lifecycle and server-state cache between wallet-api and front ends.

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod keys;
pub mod navigation;
pub mod notify;
pub mod session;
pub mod validation;
pub mod wallet;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{QueryCache, QueryKey, QueryState, QueryStream, RetryPolicy, ViewScope};
pub use config::{ClientConfig, DEFAULT_API_URL, SessionStore, TlsVerification};
pub use error::CoreError;
pub use navigation::{Navigator, Route};
pub use notify::{Level, Notification, Notifier};
pub use session::{FileStorage, MemoryStorage, Session, SessionEvent, SessionManager, SessionStorage};
pub use validation::{
    CategoryForm, FieldError, PasswordForm, RegisterForm, TransactionForm, Validation,
};
pub use wallet::Wallet;

// Wire types front ends need alongside the wallet.
pub use wallet_api::{
    Balance, Category, CategoryUpdate, FieldMessage, LoginCredentials, NewCategory, NewTransaction,
    PasswordChange, ProfileUpdate, RefreshPolicy, RegisterData, Transaction, TransactionFilters,
    TransactionSummary, TransactionType, TransactionUpdate, User,
};
