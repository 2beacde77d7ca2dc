//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` (a pooled connection or an open transaction,
//! both deref to one) and exposes strongly-typed operations on a single table:
//!
//! ```ignore
//! use simplecrud::db::handlers::{Accounts, Repository};
//!
//! let mut tx = pool.begin().await?;
//! let mut accounts = Accounts::new(&mut tx);
//! accounts.ensure_schema().await?;
//! let account = accounts.create(&AccountCreateDBRequest::with_balance(1000)).await?;
//! tx.commit().await?;
//! ```

pub mod accounts;
pub mod repository;

pub use accounts::Accounts;
pub use repository::Repository;
