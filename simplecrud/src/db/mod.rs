//! Database layer, built on SQLx with the PostgreSQL driver.
//!
//! CockroachDB speaks the PostgreSQL wire protocol, so the same driver and queries work against
//! either. The only CockroachDB-specific behaviour the crate relies on is transaction retry
//! errors, see [`crate::transactions`].
//!
//! ```text
//! workflow ─→ handlers (repositories) ─→ models ─→ CockroachDB / PostgreSQL
//! ```
//!
//! - [`pools`]: connection pool construction from [`crate::config::DatabaseConfig`]
//! - [`handlers`]: repositories with the CRUD queries
//! - [`models`]: request and response records
//! - [`errors`]: classification of driver errors

pub mod errors;
pub mod handlers;
pub mod models;
pub mod pools;
