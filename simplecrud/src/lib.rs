//! # simplecrud: CRUD against CockroachDB with SQLx
//!
//! A small example of the four basic persistence operations against a distributed SQL database,
//! plus a money transfer run inside a transaction that is retried when the database reports a
//! serialization failure.
//!
//! ## Flow
//!
//! [`workflow::run`] connects with the URL from [`Config`], then in order:
//!
//! 1. creates the `accounts` table if missing and upserts two accounts (1000 and 250)
//! 2. prints every balance
//! 3. transfers `transfer.amount` from the first account to the second via
//!    [`transactions::run_transaction`]
//! 4. prints every balance again
//! 5. deletes all accounts and closes the pool
//!
//! ```no_run
//! use clap::Parser;
//! use simplecrud::{Config, config::Args, workflow};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::load(&Args::parse())?;
//! let summary = workflow::run(&config, &mut std::io::stdout()).await?;
//! println!("transferred: {}", summary.transferred);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod errors;
pub mod telemetry;
pub mod transactions;
pub mod types;
pub mod workflow;

pub use config::Config;
pub use errors::{Error, Result};
