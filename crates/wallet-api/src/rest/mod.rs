// Wallet backend REST API
//
// JSON over HTTP under a single base URL, every response wrapped in
// `{ success, data, message? }`.

mod auth;
mod categories;
pub mod client;
pub mod models;
mod transactions;
mod users;

pub use client::ApiClient;
