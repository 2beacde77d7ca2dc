//! The CRUD surface shared by table repositories.

use crate::db::errors::Result;
use std::collections::HashMap;

/// Create, read, update and delete for a single table.
///
/// Implementors borrow a connection (or an open transaction) for their lifetime, so every call
/// through one repository runs on the same session.
#[async_trait::async_trait]
pub trait Repository {
    /// Row to insert
    type CreateRequest;

    /// Columns to overwrite on an existing row
    type UpdateRequest;

    /// Row as read back from the table
    type Response;

    /// Primary key
    type Id: Send + Sync;

    /// Pagination / selection for `list`
    type Filter: Send + Sync;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// `None` when no row has this key
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    /// Rows for every key that exists; missing keys are absent from the map
    async fn get_bulk(&mut self, ids: Vec<Self::Id>) -> Result<HashMap<Self::Id, Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Returns whether a row was removed
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;

    /// Fails with `DbError::NotFound` when no row has this key
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;
}
