//! Cashier credential store
//!
//! Accounts are kept in `cashiers.json` as Argon2 PHC hashes. The file is
//! rewritten on every change; a write failure leaves the in-memory list as it
//! was before the change.
//!
//! A file in the first release's format (PascalCase, clear-text passwords) is
//! rehashed on open. Anything else that fails to parse is moved to
//! `cashiers.json.bak`, and the store stays locked: with no accounts loaded it
//! still will not hand out the first-account admin role.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use smartpos_core::auth::{CashierRecord, LegacyCashier, Role};
use smartpos_core::{storage, CoreError, Result};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct CredentialStore {
    path: Arc<PathBuf>,
    cashiers: Arc<RwLock<Vec<CashierRecord>>>,
    /// An earlier accounts file exists but could not be loaded
    locked: bool,
}

impl CredentialStore {
    /// Load accounts from `path`
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (cashiers, locked) = match read(&path) {
            Ok(cashiers) => {
                let locked = cashiers.is_empty() && storage::backup_path(&path).exists();
                if locked {
                    warn!(
                        "No cashier accounts but {} exists; first-account setup is disabled",
                        storage::backup_path(&path).display()
                    );
                }
                (cashiers, locked)
            }
            Err(e) => {
                warn!("Cashier file unreadable: {}", e);
                if let Err(e) = storage::set_aside(&path) {
                    error!("Failed to move unreadable cashier file: {}", e);
                }
                (Vec::new(), true)
            }
        };
        Self {
            path: Arc::new(path),
            cashiers: Arc::new(RwLock::new(cashiers)),
            locked,
        }
    }

    /// Whether the next account may be created without an admin login
    ///
    /// True only for a terminal that has never had accounts.
    pub async fn is_unclaimed(&self) -> bool {
        !self.locked && self.cashiers.read().await.is_empty()
    }

    /// Create an account
    pub async fn add_cashier(
        &self,
        name: &str,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<()> {
        let (name, username) = (name.trim(), username.trim());
        if name.is_empty() || username.is_empty() || password.is_empty() {
            return Err(CoreError::validation(
                "Name, username and password are required.",
            ));
        }

        let mut cashiers = self.cashiers.write().await;
        if cashiers
            .iter()
            .any(|c| c.username.eq_ignore_ascii_case(username))
        {
            return Err(CoreError::UsernameTaken(username.to_string()));
        }

        cashiers.push(CashierRecord::new(name, username, password, role)?);
        if let Err(e) = write(&self.path, &cashiers) {
            cashiers.pop();
            return Err(e);
        }

        info!("Added cashier {} ({})", username, role);
        Ok(())
    }

    /// Check a login and stamp `last_login`
    pub async fn verify(&self, username: &str, password: &str) -> Result<CashierRecord> {
        let mut cashiers = self.cashiers.write().await;
        let record = cashiers
            .iter_mut()
            .find(|c| c.username.eq_ignore_ascii_case(username.trim()))
            .filter(|c| c.verify(password))
            .ok_or(CoreError::AuthFailed)?;

        record.last_login = Some(Local::now().naive_local());
        let verified = record.clone();

        // The login itself succeeded; a stale timestamp on disk is tolerable
        if let Err(e) = write(&self.path, &cashiers) {
            warn!("Failed to record login for {}: {}", verified.username, e);
        }

        Ok(verified)
    }

    pub async fn cashier_count(&self) -> usize {
        self.cashiers.read().await.len()
    }
}

fn read(path: &Path) -> Result<Vec<CashierRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(path)?;
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(&json) {
        Ok(cashiers) => Ok(cashiers),
        Err(e) => {
            let Ok(legacy) = serde_json::from_str::<Vec<LegacyCashier>>(&json) else {
                return Err(e.into());
            };
            let cashiers = legacy
                .into_iter()
                .map(LegacyCashier::upgrade)
                .collect::<Result<Vec<_>>>()?;
            info!("Rehashed {} accounts from the old cashier format", cashiers.len());
            if let Err(e) = write(path, &cashiers) {
                warn!("Failed to rewrite upgraded cashier file: {}", e);
            }
            Ok(cashiers)
        }
    }
}

fn write(path: &Path, cashiers: &[CashierRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(cashiers)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, json).map_err(|e| {
        CoreError::Persistence(format!("Failed to save cashiers to {}: {}", path.display(), e))
    })
}
