//! Cart engine: line items, totals, checkout
//!
//! Lines are keyed by product name and kept in first-add order. Adding a product
//! that already has a line bumps its quantity instead of adding a second line.
//! A line never survives with a quantity below one.

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::error::{CoreError, Result};
use crate::money::{format_money, round_money};
use crate::printer::ReceiptPrinter;
use crate::receipt::{format_receipt, Receipt, ReceiptLayout, ReceiptLine};
use crate::types::{PaymentMethod, Product};

/// One product in the cart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    product: Product,
    quantity: u32,
}

impl CartLine {
    fn new(product: Product) -> Self {
        Self { product, quantity: 1 }
    }

    /// Product on this line
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Units of the product
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// price × quantity
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }

    fn to_receipt_line(&self) -> ReceiptLine {
        ReceiptLine {
            name: self.product.name.clone(),
            unit_price: self.product.price,
            quantity: self.quantity,
            line_total: self.line_total(),
        }
    }
}

/// Result of a completed checkout
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub receipt: Receipt,
    /// Rendered receipt text
    pub text: String,
    /// Set when printing failed; the sale still stands
    pub print_error: Option<CoreError>,
}

/// Result of holding an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// Nothing to hold
    Empty,
    /// Acknowledged, but the cart is not saved anywhere
    NotPersisted { lines: usize },
}

/// Shopping cart for the current customer
#[derive(Debug, Clone)]
pub struct Cart {
    lines: Vec<CartLine>,
    tax_rate: Decimal,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    /// Empty cart using the default tax rate
    pub fn new() -> Self {
        Self::with_tax_rate(crate::default_tax_rate())
    }

    /// Empty cart with a custom tax rate (`0.16` = 16%)
    pub fn with_tax_rate(tax_rate: Decimal) -> Self {
        Self {
            lines: Vec::new(),
            tax_rate,
        }
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Lines in first-add order
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Line for a product name
    pub fn line(&self, name: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product.name == name)
    }

    /// Add one unit of `product`
    ///
    /// Returns the line's quantity after the add.
    pub fn add(&mut self, product: &Product) -> u32 {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product.same_key(product)) {
            line.quantity = line.quantity.saturating_add(1);
            return line.quantity;
        }
        self.lines.push(CartLine::new(product.clone()));
        1
    }

    /// Remove the line for `name`
    ///
    /// Returns false if there was no such line.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product.name != name);
        self.lines.len() != before
    }

    /// Adjust a line's quantity by `delta`
    ///
    /// A result of zero or less removes the line. Returns the new quantity,
    /// or `None` if the line was removed or never existed.
    pub fn change_quantity(&mut self, name: &str, delta: i64) -> Option<u32> {
        let idx = self.lines.iter().position(|l| l.product.name == name)?;
        let next = i64::from(self.lines[idx].quantity).saturating_add(delta);
        if next <= 0 {
            self.lines.remove(idx);
            return None;
        }
        let quantity = u32::try_from(next).unwrap_or(u32::MAX);
        self.lines[idx].quantity = quantity;
        Some(quantity)
    }

    /// Drop every line
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of line totals, to the cent
    pub fn subtotal(&self) -> Decimal {
        round_money(self.lines.iter().map(CartLine::line_total).sum())
    }

    /// subtotal × tax rate, to the cent
    pub fn tax(&self) -> Decimal {
        round_money(self.subtotal() * self.tax_rate)
    }

    /// subtotal + tax
    pub fn total(&self) -> Decimal {
        self.subtotal() + self.tax()
    }

    /// Three-line totals block for the till display
    pub fn summary(&self) -> String {
        format!(
            "Subtotal: Ksh {}\nTax: Ksh {}\nTotal: Ksh {}",
            format_money(self.subtotal()),
            format_money(self.tax()),
            format_money(self.total()),
        )
    }

    /// Freeze the current lines and totals into a receipt
    pub fn snapshot(&self, payment_method: PaymentMethod) -> Receipt {
        Receipt::new(
            self.lines.iter().map(CartLine::to_receipt_line).collect(),
            self.subtotal(),
            self.tax_rate,
            self.tax(),
            self.total(),
            payment_method,
        )
    }

    /// Complete the sale
    ///
    /// Fails with `EmptyCart` (leaving the cart untouched) when there are no lines.
    /// Otherwise renders and prints the receipt, then clears the cart whether or not
    /// printing succeeded.
    pub fn checkout(
        &mut self,
        payment_method: PaymentMethod,
        printer: &mut dyn ReceiptPrinter,
        layout: &ReceiptLayout,
    ) -> Result<CheckoutOutcome> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let receipt = self.snapshot(payment_method);
        let text = format_receipt(&receipt, layout);
        let print_error = printer.print(&receipt, &text).err();
        if let Some(e) = &print_error {
            warn!("Receipt {} not printed: {}", receipt.number, e);
        }

        self.clear();
        info!(
            "Checkout {} complete: {} via {}",
            receipt.number,
            format_money(receipt.total),
            payment_method
        );

        Ok(CheckoutOutcome {
            receipt,
            text,
            print_error,
        })
    }

    /// Acknowledge a hold request
    ///
    /// Held carts are not stored and cannot be resumed; the cart is left as is.
    pub fn hold_order(&self) -> HoldOutcome {
        if self.is_empty() {
            HoldOutcome::Empty
        } else {
            HoldOutcome::NotPersisted {
                lines: self.lines.len(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::MockPrinter;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn milk() -> Product {
        Product::new("Milk 1L", Decimal::from(100))
    }

    fn bread() -> Product {
        Product::new("Bread", Decimal::from(120))
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = Cart::new();
        let products = [milk(), bread(), milk(), milk(), bread()];
        for p in &products {
            cart.add(p);
        }

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.line("Milk 1L").unwrap().quantity(), 3);
        assert_eq!(cart.line("Bread").unwrap().quantity(), 2);
    }

    #[test]
    fn test_lines_keep_first_add_order() {
        let mut cart = Cart::new();
        cart.add(&bread());
        cart.add(&milk());
        cart.add(&bread());
        let names: Vec<_> = cart.lines().iter().map(|l| l.product().name.as_str()).collect();
        assert_eq!(names, ["Bread", "Milk 1L"]);
    }

    #[test]
    fn test_example_totals() {
        let mut cart = Cart::new();
        cart.add(&milk());
        cart.add(&milk());
        cart.add(&bread());

        assert_eq!(cart.subtotal(), d("320.00"));
        assert_eq!(cart.tax(), d("51.20"));
        assert_eq!(cart.total(), d("371.20"));
    }

    #[test]
    fn test_totals_many_small_lines() {
        let mut cart = Cart::new();
        for i in 0..50 {
            cart.add(&Product::new(format!("Sweet {i}"), d("0.10")));
        }
        assert_eq!(cart.subtotal(), d("5.00"));
        assert_eq!(cart.tax(), d("0.80"));
        assert_eq!(cart.total(), d("5.80"));
    }

    #[test]
    fn test_tax_rounds_to_cents() {
        let mut cart = Cart::new();
        cart.add(&Product::new("Gum", d("0.99")));
        // 0.99 * 0.16 = 0.1584
        assert_eq!(cart.tax(), d("0.16"));
        assert_eq!(cart.total(), d("1.15"));
    }

    #[test]
    fn test_custom_tax_rate() {
        let mut cart = Cart::with_tax_rate(d("0.08"));
        cart.add(&bread());
        assert_eq!(cart.tax(), d("9.60"));
    }

    #[test]
    fn test_remove_line() {
        let mut cart = Cart::new();
        cart.add(&milk());
        assert!(cart.remove("Milk 1L"));
        assert!(cart.is_empty());
        assert!(!cart.remove("Milk 1L"));
    }

    #[test]
    fn test_change_quantity() {
        let mut cart = Cart::new();
        cart.add(&milk());
        assert_eq!(cart.change_quantity("Milk 1L", 4), Some(5));
        assert_eq!(cart.change_quantity("Milk 1L", -2), Some(3));
        assert_eq!(cart.change_quantity("Unknown", 1), None);
    }

    #[test]
    fn test_decrement_single_unit_removes_line() {
        let mut cart = Cart::new();
        cart.add(&milk());
        assert_eq!(cart.change_quantity("Milk 1L", -1), None);
        assert!(cart.line("Milk 1L").is_none());
    }

    #[test]
    fn test_change_by_negative_quantity_removes_line() {
        let mut cart = Cart::new();
        for _ in 0..7 {
            cart.add(&milk());
        }
        cart.add(&bread());
        let qty = cart.line("Milk 1L").unwrap().quantity();
        cart.change_quantity("Milk 1L", -i64::from(qty));
        assert!(cart.line("Milk 1L").is_none());
        assert_eq!(cart.len(), 1);

        cart.change_quantity("Bread", -10);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_checkout_empty_cart() {
        let mut cart = Cart::new();
        let mut printer = MockPrinter::new();
        let result = cart.checkout(PaymentMethod::Cash, &mut printer, &ReceiptLayout::default());
        assert!(matches!(result, Err(CoreError::EmptyCart)));
        assert!(printer.printed().is_empty());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_checkout_prints_and_clears() {
        let mut cart = Cart::new();
        cart.add(&milk());
        cart.add(&milk());
        cart.add(&bread());
        let mut printer = MockPrinter::new();

        let outcome = cart
            .checkout(PaymentMethod::Card, &mut printer, &ReceiptLayout::default())
            .unwrap();

        assert!(cart.is_empty());
        assert!(outcome.print_error.is_none());
        assert_eq!(outcome.receipt.total, d("371.20"));
        assert_eq!(outcome.receipt.lines.len(), 2);
        assert_eq!(outcome.receipt.lines[0].quantity, 2);
        assert_eq!(outcome.receipt.payment_method, PaymentMethod::Card);
        assert_eq!(printer.printed(), [outcome.text.clone()]);
    }

    #[test]
    fn test_checkout_clears_even_when_print_fails() {
        let mut cart = Cart::new();
        cart.add(&bread());
        let mut printer = MockPrinter::failing("offline");

        let outcome = cart
            .checkout(PaymentMethod::Cash, &mut printer, &ReceiptLayout::default())
            .unwrap();

        assert!(cart.is_empty());
        assert!(matches!(outcome.print_error, Some(CoreError::Print(_))));
        assert_eq!(outcome.receipt.subtotal, d("120.00"));
    }

    #[test]
    fn test_receipt_snapshot_is_independent_of_cart() {
        let mut cart = Cart::new();
        cart.add(&milk());
        let receipt = cart.snapshot(PaymentMethod::Cash);
        cart.add(&milk());
        assert_eq!(receipt.lines[0].quantity, 1);
        assert_eq!(receipt.total, d("116.00"));
    }

    #[test]
    fn test_summary() {
        let mut cart = Cart::new();
        cart.add(&milk());
        cart.add(&milk());
        cart.add(&bread());
        assert_eq!(
            cart.summary(),
            "Subtotal: Ksh 320.00\nTax: Ksh 51.20\nTotal: Ksh 371.20"
        );
    }

    #[test]
    fn test_hold_order_keeps_cart() {
        let mut cart = Cart::new();
        assert_eq!(cart.hold_order(), HoldOutcome::Empty);
        cart.add(&bread());
        assert_eq!(cart.hold_order(), HoldOutcome::NotPersisted { lines: 1 });
        assert_eq!(cart.len(), 1);
    }
}
