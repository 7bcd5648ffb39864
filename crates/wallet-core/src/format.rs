// pt-BR display formatting: currency, dates, CPF, and the amount input
// mask used by the transaction form.

use chrono::{DateTime, NaiveDate, Utc};
use wallet_api::TransactionType;

/// `1234.56` → `R$ 1.234,56`; negatives get a leading `-`.
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}R$ {}", format_decimal(value.abs()))
}

/// Amount with the direction sign shown in transaction lists:
/// `+ R$ 50,00` for income, `- R$ 50,00` for expense.
pub fn format_signed_amount(kind: TransactionType, amount: f64) -> String {
    let sign = match kind {
        TransactionType::Income => '+',
        TransactionType::Expense => '-',
    };
    format!("{sign} R$ {}", format_decimal(amount.abs()))
}

/// Two decimals, `,` as decimal separator, `.` between thousands.
pub fn format_decimal(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (sign, unsigned) = fixed
        .strip_prefix('-')
        .map_or(("", fixed.as_str()), |rest| ("-", rest));
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));
    format!("{sign}{},{frac_part}", group_thousands(int_part))
}

/// `dd/MM/yyyy`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// `dd/MM/yyyy` from an ISO date or timestamp; other input is returned
/// unchanged.
pub fn format_date_str(raw: &str) -> String {
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .map_or_else(|| raw.to_owned(), format_date)
}

/// `dd/MM/yyyy às HH:mm`.
pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y às %H:%M").to_string()
}

/// `12345678901` → `123.456.789-01`. Anything that is not eleven digits
/// is returned unchanged.
pub fn format_cpf(cpf: &str) -> String {
    if cpf.len() != 11 || !cpf.bytes().all(|b| b.is_ascii_digit()) {
        return cpf.to_owned();
    }
    format!("{}.{}.{}-{}", &cpf[..3], &cpf[3..6], &cpf[6..9], &cpf[9..])
}

/// `R$ 1.234,56` → `1234.56`. Keeps only digits and the decimal comma.
pub fn parse_currency(value: &str) -> Option<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    cleaned.replacen(',', ".", 1).parse().ok()
}

/// Input mask for typed amounts: digits are read as cents.
///
/// `"5000"` → `"50,00"`, `"R$ 1a2"` → `"0,12"`, no digits → `""`.
pub fn mask_amount_input(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_start_matches('0');
    if raw.chars().all(|c| !c.is_ascii_digit()) {
        return String::new();
    }
    let padded = format!("{digits:0>3}");
    let (int_part, cents) = padded.split_at(padded.len() - 2);
    format!("{},{cents}", group_thousands(int_part))
}

/// Read a masked amount (`1.234,56`) back as a number.
pub fn parse_amount_input(masked: &str) -> Option<f64> {
    let normalized = masked.trim().replace('.', "").replacen(',', ".", 1);
    if normalized.is_empty() {
        return None;
    }
    normalized.parse().ok()
}

/// Expects ASCII digits only; callers strip the sign first.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
