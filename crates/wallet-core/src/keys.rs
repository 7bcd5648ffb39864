// Cache keys for every backend resource.
//
// The leading part names the resource kind; list keys append their
// filter set so different filters cache separately but invalidate
// together.

use chrono::NaiveDate;
use wallet_api::{TransactionFilters, TransactionType};

use crate::cache::QueryKey;

pub const TRANSACTIONS: &str = "transactions";
pub const TRANSACTION: &str = "transaction";
pub const BALANCE: &str = "balance";
pub const SUMMARY: &str = "summary";
pub const CATEGORIES: &str = "categories";
pub const CATEGORY: &str = "category";
pub const PROFILE: &str = "profile";

/// Prefix of every transaction list.
pub fn transactions() -> QueryKey {
    QueryKey::new([TRANSACTIONS])
}

pub fn transaction_list(filters: &TransactionFilters) -> QueryKey {
    let filter_part = if filters.is_empty() {
        "all".to_owned()
    } else {
        filters
            .to_query()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    };
    transactions().with(filter_part)
}

pub fn transaction(id: &str) -> QueryKey {
    QueryKey::new([TRANSACTION, id])
}

pub fn balance() -> QueryKey {
    QueryKey::new([BALANCE])
}

/// Prefix of every summary range.
pub fn summaries() -> QueryKey {
    QueryKey::new([SUMMARY])
}

pub fn summary(start: Option<NaiveDate>, end: Option<NaiveDate>) -> QueryKey {
    let day = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default();
    summaries().with(day(start)).with(day(end))
}

/// Prefix of every category list.
pub fn categories() -> QueryKey {
    QueryKey::new([CATEGORIES])
}

pub fn category_list(kind: Option<TransactionType>) -> QueryKey {
    categories().with(kind.map_or_else(|| "all".to_owned(), |k| k.to_string()))
}

pub fn category(id: &str) -> QueryKey {
    QueryKey::new([CATEGORY, id])
}

pub fn profile() -> QueryKey {
    QueryKey::new([PROFILE])
}

/// Everything a transaction write can change.
pub fn transaction_writes() -> Vec<QueryKey> {
    vec![transactions(), balance(), summaries()]
}
