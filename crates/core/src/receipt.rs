//! Receipt snapshot and fixed-width text rendering
//!
//! The default layout is the thermal-printer contract:
//!
//! ```text
//! ========== SMARTPOS ==========
//! Receipt #: 1a2b3c4d
//! Date: 2025-01-31 14:05
//! --------------------------------
//! Milk 1L x2       200.00
//! --------------------------------
//! Subtotal:       200.00
//! VAT (16%):       32.00
//! TOTAL:          232.00
//! ================================
//!    THANK YOU FOR SHOPPING!
//! ================================
//! ```

use std::fmt::Write as _;

use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::format_money;
use crate::types::PaymentMethod;

/// Length of the receipt number token
const RECEIPT_NUMBER_LEN: usize = 8;

/// Line item frozen at checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLine {
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// Immutable checkout snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub number: String,
    pub timestamp: NaiveDateTime,
    pub payment_method: PaymentMethod,
    pub lines: Vec<ReceiptLine>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Receipt {
    /// Create receipt stamped with a fresh number and the local time
    pub fn new(
        lines: Vec<ReceiptLine>,
        subtotal: Decimal,
        tax_rate: Decimal,
        tax: Decimal,
        total: Decimal,
        payment_method: PaymentMethod,
    ) -> Self {
        Self {
            number: generate_receipt_number(),
            timestamp: Local::now().naive_local(),
            payment_method,
            lines,
            subtotal,
            tax_rate,
            tax,
            total,
        }
    }

    /// Override number and timestamp (reprints, fixtures)
    pub fn with_identity(mut self, number: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        self.number = number.into();
        self.timestamp = timestamp;
        self
    }

    /// Render with the default layout
    pub fn to_text(&self) -> String {
        format_receipt(self, &ReceiptLayout::default())
    }
}

/// Short unique token: first 8 hex chars of a random UUID
pub fn generate_receipt_number() -> String {
    let mut simple = Uuid::new_v4().simple().to_string();
    simple.truncate(RECEIPT_NUMBER_LEN);
    simple
}

/// Column layout for receipt text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLayout {
    /// Store name in the header banner
    pub title: String,
    /// Closing message between the footer rules
    pub footer: String,
    /// Width of the rules under the header and around the footer
    pub rule_width: usize,
    /// Width of right-aligned amounts
    pub amount_width: usize,
    /// Width of the totals label column
    pub label_width: usize,
    /// Gap between `name xQty` and the line amount
    pub item_gap: usize,
}

impl Default for ReceiptLayout {
    fn default() -> Self {
        Self {
            title: "SMARTPOS".to_string(),
            footer: "THANK YOU FOR SHOPPING!".to_string(),
            rule_width: 32,
            amount_width: 10,
            label_width: 12,
            item_gap: 3,
        }
    }
}

impl ReceiptLayout {
    /// Set store name
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set amount column width
    pub fn with_amount_width(mut self, width: usize) -> Self {
        self.amount_width = width;
        self
    }
}

/// Render a receipt as a fixed-width text block
pub fn format_receipt(receipt: &Receipt, layout: &ReceiptLayout) -> String {
    let width = layout.amount_width;
    let rule = "-".repeat(layout.rule_width);
    let banner = "=".repeat(layout.rule_width);

    let mut out = String::new();
    // writeln! into a String cannot fail
    let _ = writeln!(out, "========== {} ==========", layout.title);
    let _ = writeln!(out, "Receipt #: {}", receipt.number);
    let _ = writeln!(out, "Date: {}", receipt.timestamp.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "{rule}");
    for line in &receipt.lines {
        let _ = writeln!(
            out,
            "{} x{}{}{:>width$}",
            line.name,
            line.quantity,
            " ".repeat(layout.item_gap),
            format_money(line.line_total),
        );
    }
    let _ = writeln!(out, "{rule}");

    let totals = [
        ("Subtotal:".to_string(), receipt.subtotal),
        (format!("VAT ({}%):", percent_label(receipt.tax_rate)), receipt.tax),
        ("TOTAL:".to_string(), receipt.total),
    ];
    for (label, amount) in totals {
        let _ = writeln!(
            out,
            "{:<label_width$}{:>width$}",
            label,
            format_money(amount),
            label_width = layout.label_width,
        );
    }

    let _ = writeln!(out, "{banner}");
    let _ = writeln!(out, "   {}   ", layout.footer);
    let _ = writeln!(out, "{banner}");
    out
}

/// `0.16` -> `16`, `0.125` -> `12.5`
fn percent_label(rate: Decimal) -> String {
    (rate * Decimal::ONE_HUNDRED).normalize().to_string()
}
