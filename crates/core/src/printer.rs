//! Receipt printer abstraction

use crate::error::{CoreError, Result};
use crate::receipt::Receipt;

/// Output device for rendered receipts
///
/// Printing is best-effort: checkout has already committed when `print` runs,
/// so an error is reported to the operator and nothing is rolled back.
pub trait ReceiptPrinter: Send {
    /// Print the rendered text of `receipt`
    fn print(&mut self, receipt: &Receipt, text: &str) -> Result<()>;
}

/// Printer that records output in memory
#[derive(Debug, Default)]
pub struct MockPrinter {
    printed: Vec<String>,
    fail_with: Option<String>,
}

impl MockPrinter {
    /// Create printer that accepts every receipt
    pub fn new() -> Self {
        Self::default()
    }

    /// Create printer that rejects every receipt with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            printed: Vec::new(),
            fail_with: Some(reason.into()),
        }
    }

    /// Texts printed so far
    pub fn printed(&self) -> &[String] {
        &self.printed
    }
}

impl ReceiptPrinter for MockPrinter {
    fn print(&mut self, _receipt: &Receipt, text: &str) -> Result<()> {
        if let Some(reason) = &self.fail_with {
            return Err(CoreError::Print(reason.clone()));
        }
        self.printed.push(text.to_string());
        Ok(())
    }
}
