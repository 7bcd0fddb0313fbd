//! Sales ledger and report summaries

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{error, warn};

use crate::error::{CoreError, Result};
use crate::storage;
use crate::types::SaleRecord;

/// Aggregate over a set of sales
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesSummary {
    pub transactions: usize,
    pub total_sales: Decimal,
    pub last_sale: Option<chrono::NaiveDateTime>,
}

impl SalesSummary {
    fn over<'a>(records: impl Iterator<Item = &'a SaleRecord>) -> Self {
        let mut summary = SalesSummary {
            transactions: 0,
            total_sales: Decimal::ZERO,
            last_sale: None,
        };
        for record in records {
            summary.transactions += 1;
            summary.total_sales += record.total_amount;
            summary.last_sale = summary.last_sale.max(Some(record.date));
        }
        summary
    }

    /// `14 Mar 2025, 09:26`, or `—` when there are no sales
    pub fn last_sale_display(&self) -> String {
        self.last_sale
            .map(|d| d.format("%d %b %Y, %H:%M").to_string())
            .unwrap_or_else(|| "—".to_string())
    }
}

/// Append-only list of completed sales, persisted as a JSON array
#[derive(Debug)]
pub struct SalesLedger {
    path: PathBuf,
    records: Vec<SaleRecord>,
    /// Set when an unreadable file could not be moved out of the way
    blocked: Option<String>,
}

impl SalesLedger {
    /// Open the ledger at `path`
    ///
    /// A missing or empty file opens as an empty ledger. An unreadable file is
    /// moved to `<name>.bak` first; if that fails the ledger refuses to append
    /// so the old history is never overwritten.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::read(&path) {
            Ok(records) => Self {
                path,
                records,
                blocked: None,
            },
            Err(e) => {
                warn!("Sales ledger unreadable: {}", e);
                let blocked = match storage::set_aside(&path) {
                    Ok(_) => None,
                    Err(e) => {
                        error!("Failed to move unreadable sales ledger, sales will not be saved: {}", e);
                        Some(format!("{} is unreadable and could not be moved aside", path.display()))
                    }
                };
                Self {
                    path,
                    records: Vec::new(),
                    blocked,
                }
            }
        }
    }

    fn read(path: &Path) -> Result<Vec<SaleRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let json = fs::read_to_string(path)?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&json)?)
    }

    pub fn records(&self) -> &[SaleRecord] {
        &self.records
    }

    /// Record a sale and rewrite the file
    ///
    /// If the write fails the sale is dropped from memory too, so the ledger
    /// never shows sales the file does not have.
    pub fn append(&mut self, record: SaleRecord) -> Result<()> {
        if let Some(reason) = &self.blocked {
            return Err(CoreError::Persistence(reason.clone()));
        }
        self.records.push(record);
        if let Err(e) = self.save() {
            self.records.pop();
            return Err(e);
        }
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.records)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json).map_err(|e| {
            CoreError::Persistence(format!("Failed to save sales to {}: {}", self.path.display(), e))
        })
    }

    /// Summary over every sale
    pub fn summary(&self) -> SalesSummary {
        SalesSummary::over(self.records.iter())
    }

    /// Summary over sales made on `date`
    pub fn summary_for(&self, date: NaiveDate) -> SalesSummary {
        SalesSummary::over(self.records.iter().filter(|r| r.date.date() == date))
    }
}
