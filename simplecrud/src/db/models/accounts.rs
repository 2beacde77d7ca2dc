//! Database models for accounts.

use crate::types::AccountId;
use sqlx::FromRow;

/// Database request for creating (or overwriting) an account
#[derive(Debug, Clone)]
pub struct AccountCreateDBRequest {
    pub id: AccountId,
    pub balance: i64,
}

impl AccountCreateDBRequest {
    /// New account with a freshly generated id
    pub fn with_balance(balance: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            balance,
        }
    }
}

/// Database request for updating an account
#[derive(Debug, Clone)]
pub struct AccountUpdateDBRequest {
    pub balance: i64,
}

/// Database response for an account
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct AccountDBResponse {
    pub id: AccountId,
    pub balance: i64,
}
