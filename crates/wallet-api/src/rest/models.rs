// Wire types for the wallet REST API.
//
// Field names follow the backend's camelCase JSON. Timestamps are
// optional so partially populated records (e.g. a user embedded in an
// auth response) still decode.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::auth::TokenPair;

fn default_true() -> bool {
    true
}

/// Standard response envelope: `{ success, data, message? }`.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_true")]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

// ── Enums ───────────────────────────────────────────────────────────

/// Direction of money flow. Shared by transactions and categories.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

// ── Users & auth ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `data` of `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
    pub refresh_token: String,
}

impl AuthResponse {
    pub fn into_parts(self) -> (User, TokenPair) {
        let tokens = TokenPair::new(self.token, self.refresh_token);
        (self.user, tokens)
    }
}

/// `data` of `POST /auth/refresh-token`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TokenResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: SecretString,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegisterData {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub cpf: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
}

/// Body of `PUT /users/password`.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub current_password: SecretString,
    pub new_password: SecretString,
}

impl PasswordChange {
    pub fn new(current: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            current_password: SecretString::from(current.into()),
            new_password: SecretString::from(new.into()),
        }
    }
}

// ── Categories ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

// ── Transactions ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub category_id: String,
    pub description: String,
    /// Calendar date or full ISO timestamp, as the backend sent it.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// The calendar date, read from the leading `YYYY-MM-DD` of `date`.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        let prefix = self.date.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }

    /// Display name of the category, falling back to its id.
    pub fn category_name(&self) -> &str {
        self.category
            .as_ref()
            .map_or(self.category_id.as_str(), |c| c.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category_id: String,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

/// Query filters for `GET /transactions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TransactionFilters {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kind: Option<TransactionType>,
}

impl TransactionFilters {
    /// Query-string pairs, omitting unset filters.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = date_range_query(self.start_date, self.end_date);
        if let Some(kind) = self.kind {
            query.push(("type", kind.to_string()));
        }
        query
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.kind.is_none()
    }
}

pub(crate) fn date_range_query(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(start) = start {
        query.push(("startDate", start.format("%Y-%m-%d").to_string()));
    }
    if let Some(end) = end {
        query.push(("endDate", end.format("%Y-%m-%d").to_string()));
    }
    query
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
    #[serde(default)]
    pub category_breakdown: BTreeMap<String, f64>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn transaction_decodes_backend_shape() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": "t1",
            "amount": 50.0,
            "type": "expense",
            "categoryId": "food",
            "description": "Lunch",
            "date": "2024-01-01T00:00:00.000Z",
            "userId": "u1",
            "createdAt": "2024-01-01T12:00:00Z",
            "updatedAt": "2024-01-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(tx.kind, TransactionType::Expense);
        assert_eq!(tx.calendar_date(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(tx.category_name(), "food");
    }

    #[test]
    fn new_transaction_encodes_type_and_plain_date() {
        let body = serde_json::to_value(NewTransaction {
            amount: 50.0,
            kind: TransactionType::Expense,
            category_id: "food".into(),
            description: "Lunch".into(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        })
        .unwrap();

        assert_eq!(
            body,
            json!({
                "amount": 50.0,
                "type": "expense",
                "categoryId": "food",
                "description": "Lunch",
                "date": "2024-01-01"
            })
        );
    }

    #[test]
    fn update_omits_unset_fields() {
        let body = serde_json::to_value(TransactionUpdate {
            description: Some("Dinner".into()),
            ..TransactionUpdate::default()
        })
        .unwrap();
        assert_eq!(body, json!({ "description": "Dinner" }));
    }

    #[test]
    fn filters_build_query_in_stable_order() {
        let filters = TransactionFilters {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31),
            kind: Some(TransactionType::Income),
        };
        assert_eq!(
            filters.to_query(),
            vec![
                ("startDate", "2024-01-01".to_string()),
                ("endDate", "2024-01-31".to_string()),
                ("type", "income".to_string()),
            ]
        );
        assert!(TransactionFilters::default().is_empty());
    }

    #[test]
    fn envelope_without_success_flag_defaults_to_true() {
        let env: ApiEnvelope<Balance> =
            serde_json::from_value(json!({ "data": { "balance": 12.5 } })).unwrap();
        assert!(env.success);
        assert!((env.data.unwrap().balance - 12.5).abs() < f64::EPSILON);
    }
}
