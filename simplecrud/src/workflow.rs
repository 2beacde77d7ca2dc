//! The CRUD walkthrough: create two accounts, print them, move money between them inside a
//! retried transaction, print again, then delete everything.

use crate::config::Config;
use crate::db::handlers::accounts::AccountFilter;
use crate::db::handlers::{Accounts, Repository};
use crate::db::models::accounts::{AccountCreateDBRequest, AccountDBResponse};
use crate::db::pools;
use crate::errors::{Error, Result};
use crate::transactions::{RetryPolicy, run_transaction};
use crate::types::{AccountId, abbrev_uuid};
use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use std::io::Write;
use tracing::{debug, info, instrument};

/// What a full run did, for callers that want more than the printed output
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub account_ids: Vec<AccountId>,
    pub balances_before: Vec<AccountDBResponse>,
    pub balances_after: Vec<AccountDBResponse>,
    /// False when the transfer gave up after exhausting its retries
    pub transferred: bool,
    pub deleted: u64,
}

/// Create the table if needed and upsert one fresh account per balance, returning their ids in
/// the same order.
#[instrument(skip(conn, balances), fields(count = balances.len()), err)]
pub async fn create_accounts(conn: &mut PgConnection, balances: &[i64]) -> Result<Vec<AccountId>> {
    let mut accounts = Accounts::new(conn);
    accounts.ensure_schema().await?;

    let requests: Vec<_> = balances.iter().copied().map(AccountCreateDBRequest::with_balance).collect();
    accounts.create_many(&requests).await?;

    Ok(requests.into_iter().map(|request| request.id).collect())
}

#[instrument(skip(conn), err)]
pub async fn delete_accounts(conn: &mut PgConnection) -> Result<u64> {
    Ok(Accounts::new(conn).delete_all().await?)
}

/// One output line per account
pub fn format_balance_line(account: &AccountDBResponse) -> String {
    format!("account id: {}  balance: ${:2}", account.id, account.balance)
}

/// Write a timestamped listing of every account to `out` and return the rows.
pub async fn print_balances<W: Write>(conn: &mut PgConnection, out: &mut W) -> Result<Vec<AccountDBResponse>> {
    let accounts = Accounts::new(conn).list(&AccountFilter::default()).await?;

    writeln!(out, "Balances at {}:", chrono::Local::now().format("%a %b %e %H:%M:%S %Y")).context("writing balances")?;
    for account in &accounts {
        writeln!(out, "{}", format_balance_line(account)).context("writing balances")?;
    }

    Ok(accounts)
}

/// Move `amount` from one account to another.
///
/// Meant to run inside [`run_transaction`]: the source balance is checked before either update,
/// and a missing destination aborts after the debit, relying on the rollback.
#[instrument(skip(conn, from, to), fields(from = %abbrev_uuid(&from), to = %abbrev_uuid(&to)), err(level = "debug"))]
pub async fn transfer_funds(conn: &mut PgConnection, from: AccountId, to: AccountId, amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::InvalidTransfer {
            message: format!("amount must be positive, got {amount}"),
        });
    }
    if from == to {
        return Err(Error::InvalidTransfer {
            message: format!("source and destination are both {from}"),
        });
    }

    let mut accounts = Accounts::new(conn);

    let from_balance = accounts.get_balance(from).await?.ok_or_else(|| Error::NotFound {
        resource: "Account".to_string(),
        id: from.to_string(),
    })?;
    if from_balance < amount {
        return Err(Error::InsufficientFunds {
            account: from,
            available: from_balance,
            requested: amount,
        });
    }

    accounts.adjust_balance(from, -amount).await?;
    if !accounts.adjust_balance(to, amount).await? {
        return Err(Error::NotFound {
            resource: "Account".to_string(),
            id: to.to_string(),
        });
    }

    debug!(amount, "transfer_funds(): done");
    Ok(())
}

/// Connect, run the walkthrough and close the pool.
pub async fn run<W: Write>(config: &Config, out: &mut W) -> Result<RunSummary> {
    let pool = pools::connect(&config.database).await?;
    let result = run_with_pool(&pool, config, out).await;

    info!("Closing database connections...");
    pool.close().await;

    result
}

/// The walkthrough on an already open pool.
///
/// Connections are handed back between steps so a pool of size one is enough.
pub async fn run_with_pool<W: Write>(pool: &PgPool, config: &Config, out: &mut W) -> Result<RunSummary> {
    let (account_ids, balances_before) = {
        let mut conn = pool.acquire().await?;
        let ids = create_accounts(&mut conn, &config.accounts.initial_balances).await?;
        let balances = print_balances(&mut conn, out).await?;
        (ids, balances)
    };

    let (from, to) = match account_ids.as_slice() {
        [from, to, ..] => (*from, *to),
        _ => {
            return Err(Error::InvalidConfig {
                message: format!("need two accounts for a transfer, have {}", account_ids.len()),
            });
        }
    };
    let amount = config.transfer.amount;
    let policy = RetryPolicy::from(&config.retry);

    let transferred = match run_transaction(pool, &policy, async |conn: &mut PgConnection| -> Result<()> {
        transfer_funds(conn, from, to, amount).await
    })
    .await
    {
        Ok(()) => true,
        // Carry on so the example can be run again and again
        Err(e @ Error::RetriesExhausted { .. }) => {
            debug!(error = %e, "run_transaction(pool, op) failed");
            false
        }
        Err(e) => return Err(e),
    };

    let mut conn = pool.acquire().await?;
    let balances_after = print_balances(&mut conn, out).await?;
    let deleted = delete_accounts(&mut conn).await?;

    Ok(RunSummary {
        account_ids,
        balances_before,
        balances_after,
        transferred,
        deleted,
    })
}
