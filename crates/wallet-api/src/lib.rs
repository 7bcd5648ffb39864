// wallet-api: Async Rust client for the wallet personal finance REST API

pub mod auth;
pub mod error;
pub mod rest;
pub mod transport;

pub use auth::{CredentialProvider, InMemoryCredentials, RefreshPolicy, TokenPair};
pub use error::{Error, FieldMessage};
pub use rest::ApiClient;
pub use rest::models::{
    AuthResponse, Balance, Category, CategoryUpdate, LoginCredentials, NewCategory,
    NewTransaction, PasswordChange, ProfileUpdate, RegisterData, Transaction, TransactionFilters,
    TransactionSummary, TransactionType, TransactionUpdate, User,
};
pub use transport::{TlsMode, TransportConfig};
