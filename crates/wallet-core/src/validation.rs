// ── Form validation ──
//
// Each form validates on submit into either the request body it
// produces or a list of per-field errors. Messages are the pt-BR texts
// the web forms show.

use std::fmt;

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use wallet_api::{
    CategoryUpdate, NewCategory, NewTransaction, PasswordChange, RegisterData, TransactionType,
};

use crate::error::CoreError;
use crate::format::parse_amount_input;

/// Most custom categories a user may own.
pub const CATEGORY_LIMIT: usize = 50;

pub mod messages {
    pub const AMOUNT_REQUIRED: &str = "Valor é obrigatório";
    pub const AMOUNT_INVALID: &str = "Valor inválido";
    pub const CATEGORY_REQUIRED: &str = "Selecione uma categoria";
    pub const DESCRIPTION_TOO_SHORT: &str = "Descrição deve ter no mínimo 3 caracteres";
    pub const DATE_REQUIRED: &str = "Selecione uma data";
    pub const DATE_INVALID: &str = "Data inválida";

    pub const NAME_TOO_SHORT: &str = "Nome deve ter no mínimo 2 caracteres";
    pub const NAME_TOO_LONG: &str = "Nome deve ter no máximo 50 caracteres";
    pub const COLOR_INVALID: &str = "Cor inválida";
    pub const ICON_REQUIRED: &str = "Selecione um ícone";
    pub const CATEGORY_LIMIT_REACHED: &str = "Limite de categorias atingido";

    pub const PASSWORDS_DIFFER: &str = "As senhas não coincidem";
    pub const NEW_PASSWORD_TOO_SHORT: &str = "A nova senha deve ter no mínimo 6 caracteres";
}

/// One failed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Every failed field of one form, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    errors: Vec<FieldError>,
}

impl Validation {
    fn check(&mut self, ok: bool, field: &'static str, message: &'static str) {
        if !ok {
            self.errors.push(FieldError { field, message });
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// First message for `field`, for inline display.
    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message)
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Validation> {
        if self.is_valid() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl std::error::Error for Validation {}

impl From<Validation> for CoreError {
    fn from(validation: Validation) -> Self {
        CoreError::ValidationFailed {
            message: validation.to_string(),
            fields: validation
                .errors
                .iter()
                .map(|e| wallet_api::FieldMessage {
                    field: e.field.to_owned(),
                    message: e.message.to_owned(),
                })
                .collect(),
        }
    }
}

// ── Transaction form ────────────────────────────────────────────────

/// Raw input of the new-transaction form.
#[derive(Debug, Clone)]
pub struct TransactionForm {
    pub kind: TransactionType,
    /// Masked pt-BR amount, e.g. `1.234,56`.
    pub amount: String,
    pub category_id: String,
    pub description: String,
    /// `YYYY-MM-DD`.
    pub date: String,
}

impl TransactionForm {
    pub fn validate(&self) -> Result<NewTransaction, Validation> {
        let mut v = Validation::default();

        let amount = parse_amount_input(&self.amount);
        if self.amount.trim().is_empty() {
            v.check(false, "amount", messages::AMOUNT_REQUIRED);
        } else {
            v.check(
                amount.is_some_and(|a| a > 0.0),
                "amount",
                messages::AMOUNT_INVALID,
            );
        }
        v.check(
            !self.category_id.trim().is_empty(),
            "category",
            messages::CATEGORY_REQUIRED,
        );
        v.check(
            self.description.chars().count() >= 3,
            "description",
            messages::DESCRIPTION_TOO_SHORT,
        );

        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").ok();
        if self.date.trim().is_empty() {
            v.check(false, "date", messages::DATE_REQUIRED);
        } else {
            v.check(date.is_some(), "date", messages::DATE_INVALID);
        }

        match (amount, date) {
            (Some(amount), Some(date)) => v.finish(|| NewTransaction {
                amount,
                kind: self.kind,
                category_id: self.category_id.trim().to_owned(),
                description: self.description.clone(),
                date,
            }),
            _ => Err(v),
        }
    }
}

// ── Category form ───────────────────────────────────────────────────

/// Raw input of the category modal.
#[derive(Debug, Clone)]
pub struct CategoryForm {
    pub name: String,
    pub kind: TransactionType,
    /// `#RRGGBB`.
    pub color: String,
    pub icon: String,
}

impl CategoryForm {
    fn check_fields(&self) -> Validation {
        let mut v = Validation::default();
        let name_len = self.name.chars().count();
        v.check(name_len >= 2, "name", messages::NAME_TOO_SHORT);
        v.check(name_len <= 50, "name", messages::NAME_TOO_LONG);
        v.check(is_hex_color(&self.color), "color", messages::COLOR_INVALID);
        v.check(!self.icon.is_empty(), "icon", messages::ICON_REQUIRED);
        v
    }

    /// Validate for creation. `custom_count` is how many non-default
    /// categories the user already has.
    pub fn validate_new(&self, custom_count: usize) -> Result<NewCategory, Validation> {
        let mut v = self.check_fields();
        v.check(
            custom_count < CATEGORY_LIMIT,
            "category",
            messages::CATEGORY_LIMIT_REACHED,
        );
        v.finish(|| NewCategory {
            name: self.name.clone(),
            kind: self.kind,
            color: Some(self.color.clone()),
            icon: Some(self.icon.clone()),
        })
    }

    /// Validate for editing. The type of a category cannot change.
    pub fn validate_update(&self) -> Result<CategoryUpdate, Validation> {
        self.check_fields().finish(|| CategoryUpdate {
            name: Some(self.name.clone()),
            color: Some(self.color.clone()),
            icon: Some(self.icon.clone()),
        })
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color.bytes().skip(1).all(|b| b.is_ascii_hexdigit())
}

// ── Account forms ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
    pub cpf: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<RegisterData, Validation> {
        let mut v = Validation::default();
        v.check(
            self.password.expose_secret() == self.confirm_password.expose_secret(),
            "confirmPassword",
            messages::PASSWORDS_DIFFER,
        );
        let cpf = self.cpf.trim();
        v.finish(|| RegisterData {
            name: self.name.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            cpf: (!cpf.is_empty()).then(|| cpf.to_owned()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PasswordForm {
    pub current_password: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

impl PasswordForm {
    pub fn validate(&self) -> Result<PasswordChange, Validation> {
        let mut v = Validation::default();
        let new = self.new_password.expose_secret();
        v.check(
            new == self.confirm_password.expose_secret(),
            "confirmPassword",
            messages::PASSWORDS_DIFFER,
        );
        v.check(
            new.chars().count() >= 6,
            "newPassword",
            messages::NEW_PASSWORD_TOO_SHORT,
        );
        v.finish(|| PasswordChange {
            current_password: self.current_password.clone(),
            new_password: self.new_password.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_owned())
    }

    fn lunch() -> TransactionForm {
        TransactionForm {
            kind: TransactionType::Expense,
            amount: "50,00".into(),
            category_id: "food".into(),
            description: "Lunch".into(),
            date: "2024-01-01".into(),
        }
    }

    #[test]
    fn valid_transaction_converts_amount() {
        let tx = lunch().validate().unwrap();
        assert_eq!(tx.amount, 50.0);
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let big = TransactionForm {
            amount: "1.234,56".into(),
            ..lunch()
        };
        assert_eq!(big.validate().unwrap().amount, 1234.56);
    }

    #[test]
    fn empty_transaction_reports_every_field() {
        let form = TransactionForm {
            kind: TransactionType::Income,
            amount: String::new(),
            category_id: String::new(),
            description: "ab".into(),
            date: String::new(),
        };
        let v = form.validate().unwrap_err();

        assert_eq!(v.message_for("amount"), Some(messages::AMOUNT_REQUIRED));
        assert_eq!(v.message_for("category"), Some(messages::CATEGORY_REQUIRED));
        assert_eq!(v.message_for("description"), Some(messages::DESCRIPTION_TOO_SHORT));
        assert_eq!(v.message_for("date"), Some(messages::DATE_REQUIRED));
        assert_eq!(v.errors().len(), 4);
    }

    #[test]
    fn malformed_amount_and_date() {
        let form = TransactionForm {
            amount: "0,00".into(),
            date: "01/01/2024".into(),
            ..lunch()
        };
        let v = form.validate().unwrap_err();
        assert_eq!(v.message_for("amount"), Some(messages::AMOUNT_INVALID));
        assert_eq!(v.message_for("date"), Some(messages::DATE_INVALID));
    }

    #[test]
    fn category_rules() {
        let form = CategoryForm {
            name: "A".into(),
            kind: TransactionType::Expense,
            color: "#12345G".into(),
            icon: String::new(),
        };
        let v = form.validate_new(0).unwrap_err();
        assert_eq!(v.message_for("name"), Some(messages::NAME_TOO_SHORT));
        assert_eq!(v.message_for("color"), Some(messages::COLOR_INVALID));
        assert_eq!(v.message_for("icon"), Some(messages::ICON_REQUIRED));

        let long = CategoryForm {
            name: "x".repeat(51),
            kind: TransactionType::Expense,
            color: "#a1B2c3".into(),
            icon: "🍔".into(),
        };
        assert_eq!(
            long.validate_update().unwrap_err().message_for("name"),
            Some(messages::NAME_TOO_LONG)
        );

        let ok = CategoryForm {
            name: "Mercado".into(),
            ..long
        };
        assert!(ok.validate_new(49).is_ok());
        assert_eq!(
            ok.validate_new(50).unwrap_err().message_for("category"),
            Some(messages::CATEGORY_LIMIT_REACHED)
        );
    }

    #[test]
    fn register_passwords_must_match() {
        let form = RegisterForm {
            name: "Ana".into(),
            email: "a@b.com".into(),
            password: secret("secret"),
            confirm_password: secret("secreT"),
            cpf: "  ".into(),
        };
        assert_eq!(
            form.validate().unwrap_err().message_for("confirmPassword"),
            Some(messages::PASSWORDS_DIFFER)
        );

        let form = RegisterForm {
            confirm_password: secret("secret"),
            ..form
        };
        assert_eq!(form.validate().unwrap().cpf, None);
    }

    #[test]
    fn password_change_rules() {
        let form = PasswordForm {
            current_password: secret("old"),
            new_password: secret("abc"),
            confirm_password: secret("abd"),
        };
        let v = form.validate().unwrap_err();
        assert_eq!(v.errors().len(), 2);
        assert_eq!(v.message_for("newPassword"), Some(messages::NEW_PASSWORD_TOO_SHORT));
    }

    #[test]
    fn validation_becomes_core_error() {
        let err: CoreError = lunch_without_date().validate().unwrap_err().into();
        match err {
            CoreError::ValidationFailed { fields, message } => {
                assert_eq!(fields[0].field, "date");
                assert!(message.contains("Selecione uma data"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    fn lunch_without_date() -> TransactionForm {
        TransactionForm {
            date: String::new(),
            ..lunch()
        }
    }
}
