use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One payment attempt against a booking. A booking may accumulate several
/// rows (a failed attempt followed by a retry); rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub booking_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    /// Gateway payment-intent identifier. Unique: exactly one row per intent.
    pub intent_id: String,
    /// Gateway charge identifier, captured on success.
    pub charge_id: Option<String>,
    pub paid_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "succeeded" => PaymentStatus::Succeeded,
            "failed" => PaymentStatus::Failed,
            "refunded" => PaymentStatus::Refunded,
            _ => PaymentStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Deposit,
    Full,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Deposit => "deposit",
            PaymentType::Full => "full",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "full" => PaymentType::Full,
            _ => PaymentType::Deposit,
        }
    }

    /// Strict variant for validating client-supplied payment types.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(PaymentType::Deposit),
            "full" => Some(PaymentType::Full),
            _ => None,
        }
    }
}

/// Convert a decimal dollar amount from the HTTP layer into minor units.
pub fn dollars_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollars_round_to_nearest_cent() {
        assert_eq!(dollars_to_cents(75.0), 7500);
        assert_eq!(dollars_to_cents(33.33), 3333);
        assert_eq!(dollars_to_cents(0.1 + 0.2), 30);
        assert_eq!(dollars_to_cents(149.999), 15000);
    }

    #[test]
    fn cents_back_to_dollars() {
        assert_eq!(cents_to_dollars(7500), 75.0);
        assert_eq!(cents_to_dollars(3333), 33.33);
    }

    #[test]
    fn payment_type_defaults_to_deposit() {
        assert_eq!(PaymentType::from_str("full"), PaymentType::Full);
        assert_eq!(PaymentType::from_str("deposit"), PaymentType::Deposit);
        assert_eq!(PaymentType::from_str("garbage"), PaymentType::Deposit);
    }

    #[test]
    fn payment_type_parse_rejects_unknown_values() {
        assert_eq!(PaymentType::parse("full"), Some(PaymentType::Full));
        assert_eq!(PaymentType::parse("deposit"), Some(PaymentType::Deposit));
        assert_eq!(PaymentType::parse("ful"), None);
        assert_eq!(PaymentType::parse(""), None);
    }
}
