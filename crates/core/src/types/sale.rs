//! Completed sale records

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::receipt::{Receipt, ReceiptLine};

/// How the customer paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Card => write!(f, "Card"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            other => Err(CoreError::validation(format!("Unknown payment method: {other}"))),
        }
    }
}

/// One entry of the sales ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub date: NaiveDateTime,
    pub cashier: String,
    pub payment_method: PaymentMethod,
    pub total_amount: Decimal,
    pub items: Vec<ReceiptLine>,
}

impl SaleRecord {
    /// Ledger entry for a checkout
    pub fn from_receipt(receipt: &Receipt, cashier: impl Into<String>) -> Self {
        Self {
            date: receipt.timestamp,
            cashier: cashier.into(),
            payment_method: receipt.payment_method,
            total_amount: receipt.total,
            items: receipt.lines.clone(),
        }
    }
}
