//! Cashier credential records
//!
//! Passwords are never stored. Each record keeps an Argon2id hash in PHC string
//! form, which carries its own salt and parameters.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    Cashier,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Cashier => write!(f, "Cashier"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

/// Stored cashier account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashierRecord {
    /// Full name printed on reports
    pub name: String,
    /// Unique login name
    pub username: String,
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub last_login: Option<NaiveDateTime>,
}

fn default_active() -> bool {
    true
}

impl CashierRecord {
    /// Create an active account with a fresh hash of `password`
    pub fn new(
        name: impl Into<String>,
        username: impl Into<String>,
        password: &str,
        role: Role,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            username: username.into(),
            password_hash: hash_password(password)?,
            role,
            is_active: true,
            created_at: Local::now().naive_local(),
            last_login: None,
        })
    }

    /// Check `password` against the stored hash
    ///
    /// Inactive accounts and unparseable hashes never verify.
    pub fn verify(&self, password: &str) -> bool {
        if !self.is_active {
            return false;
        }
        let Ok(parsed) = PasswordHash::new(&self.password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Hash `password` with Argon2id and a random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CoreError::PasswordHash(e.to_string()))
}

/// Account as written by the first SmartPOS release: PascalCase fields and
/// the password in clear text
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyCashier {
    #[serde(default)]
    pub name: Option<String>,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl LegacyCashier {
    /// Rehash into a current record
    ///
    /// Accounts without a password come out inactive, since nothing could log
    /// into them anyway.
    pub fn upgrade(self) -> Result<CashierRecord> {
        let role = match self.role.as_deref() {
            Some(r) if r.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Cashier,
        };
        let password = self.password.unwrap_or_default();
        let mut record = CashierRecord::new(
            self.name.unwrap_or_else(|| self.username.clone()),
            self.username,
            &password,
            role,
        )?;
        record.is_active = self.is_active && !password.is_empty();
        Ok(record)
    }
}
