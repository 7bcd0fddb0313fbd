//! Receipt spool printer
//!
//! Each receipt is written to `receipts/<number>.txt` and, when echo is on,
//! shown on the console.

use std::fs;
use std::path::PathBuf;

use smartpos_core::{CoreError, Receipt, ReceiptPrinter, Result};
use tracing::debug;

pub struct SpoolPrinter {
    dir: PathBuf,
    echo: bool,
}

impl SpoolPrinter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            echo: true,
        }
    }

    /// Spool only, without console output
    #[cfg(test)]
    fn quiet(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            echo: false,
        }
    }

    pub fn path_for(&self, receipt: &Receipt) -> PathBuf {
        self.dir.join(format!("{}.txt", receipt.number))
    }
}

impl ReceiptPrinter for SpoolPrinter {
    fn print(&mut self, receipt: &Receipt, text: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| CoreError::Print(format!("{}: {}", self.dir.display(), e)))?;

        let path = self.path_for(receipt);
        fs::write(&path, text).map_err(|e| CoreError::Print(format!("{}: {}", path.display(), e)))?;
        debug!("Spooled receipt {} to {}", receipt.number, path.display());

        if self.echo {
            println!("{}", text);
        }
        Ok(())
    }
}
