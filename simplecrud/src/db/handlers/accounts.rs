//! Database repository for accounts.

use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::accounts::{AccountCreateDBRequest, AccountDBResponse, AccountUpdateDBRequest},
};
use crate::types::{AccountId, abbrev_uuid};
use sqlx::{PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Filter for listing accounts
#[derive(Debug, Clone)]
pub struct AccountFilter {
    pub skip: i64,
    pub limit: i64,
}

impl AccountFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

impl Default for AccountFilter {
    fn default() -> Self {
        Self { skip: 0, limit: i64::MAX }
    }
}

pub struct Accounts<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Accounts<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Create the accounts table if it is missing.
    ///
    /// `INT8` is spelled out so the column decodes as `i64` on PostgreSQL too, where plain `INT`
    /// is four bytes. On CockroachDB the two are the same type.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&mut self) -> Result<()> {
        let result = sqlx::query("CREATE TABLE IF NOT EXISTS accounts (id UUID PRIMARY KEY, balance INT8)")
            .execute(&mut *self.db)
            .await?;
        debug!(rows_affected = result.rows_affected(), "ensure_schema(): CREATE TABLE");
        Ok(())
    }

    /// Upsert several accounts in a single statement
    #[instrument(skip(self, requests), fields(count = requests.len()), err)]
    pub async fn create_many(&mut self, requests: &[AccountCreateDBRequest]) -> Result<Vec<AccountDBResponse>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO accounts (id, balance) ");
        builder.push_values(requests.iter(), |mut row, request| {
            row.push_bind(request.id).push_bind(request.balance);
        });
        builder.push(" ON CONFLICT (id) DO UPDATE SET balance = excluded.balance RETURNING id, balance");

        let accounts = builder
            .build_query_as::<AccountDBResponse>()
            .fetch_all(&mut *self.db)
            .await?;
        debug!(rows_affected = accounts.len(), "create_many(): UPSERT");

        Ok(accounts)
    }

    /// Current balance, or `None` if the account does not exist
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err(level = "debug"))]
    pub async fn get_balance(&mut self, id: AccountId) -> Result<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>("SELECT balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;
        Ok(balance)
    }

    /// Add `delta` (possibly negative) to a balance. Returns whether the account exists.
    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err(level = "debug"))]
    pub async fn adjust_balance(&mut self, id: AccountId, delta: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + $1 WHERE id = $2")
            .bind(delta)
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        debug!(rows_affected = result.rows_affected(), "adjust_balance(): UPDATE");
        Ok(result.rows_affected() > 0)
    }

    /// Remove every account, returning how many rows went
    #[instrument(skip(self), err)]
    pub async fn delete_all(&mut self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM accounts").execute(&mut *self.db).await?;
        debug!(rows_affected = result.rows_affected(), "delete_all(): DELETE");
        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Accounts<'c> {
    type CreateRequest = AccountCreateDBRequest;
    type UpdateRequest = AccountUpdateDBRequest;
    type Response = AccountDBResponse;
    type Id = AccountId;
    type Filter = AccountFilter;

    /// Upsert: an existing account with the same id has its balance overwritten
    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&request.id)), err(level = "debug"))]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let account = sqlx::query_as::<_, AccountDBResponse>(
            r#"
            INSERT INTO accounts (id, balance)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET balance = excluded.balance
            RETURNING id, balance
            "#,
        )
        .bind(request.id)
        .bind(request.balance)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(account)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let account = sqlx::query_as::<_, AccountDBResponse>("SELECT id, balance FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(account)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()), err)]
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let accounts = sqlx::query_as::<_, AccountDBResponse>("SELECT id, balance FROM accounts WHERE id = ANY($1)")
            .bind(ids.as_slice())
            .fetch_all(&mut *self.db)
            .await?;

        Ok(accounts.into_iter().map(|account| (account.id, account)).collect())
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let accounts = sqlx::query_as::<_, AccountDBResponse>("SELECT id, balance FROM accounts ORDER BY id LIMIT $1 OFFSET $2")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(accounts)
    }

    #[instrument(skip(self), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;
        debug!(rows_affected = result.rows_affected(), "delete(): DELETE");

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(account_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let account = sqlx::query_as::<_, AccountDBResponse>("UPDATE accounts SET balance = $1 WHERE id = $2 RETURNING id, balance")
            .bind(request.balance)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        account.ok_or(DbError::NotFound)
    }
}
