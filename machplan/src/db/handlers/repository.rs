//! Base repository trait for database operations.

use crate::db::errors::Result;
use crate::types::UserId;

/// Owner-scoped data access for one postgres table.
///
/// Every operation takes the owning user's id and filters on it, so a record owned by
/// someone else behaves exactly like a missing one: `get_by_id` and `update` return
/// `None`, `delete` returns `false`.
#[async_trait::async_trait]
pub trait Repository {
    /// The request type for creating entities
    type CreateRequest: Sync;

    /// The request type for updating entities
    type UpdateRequest: Sync;

    /// The row type returned by operations
    type Response;

    /// The identifier type for lookups
    type Id: Send + Sync;

    /// Create a new entity owned by `owner`
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response>;

    /// Get an entity by ID
    async fn get_by_id(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>>;

    /// List the owner's entities, newest first
    async fn list(&mut self, owner: UserId) -> Result<Vec<Self::Response>>;

    /// Update an entity by ID, refreshing `updated_at`
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>>;

    /// Delete an entity by ID
    async fn delete(&mut self, owner: UserId, id: Self::Id) -> Result<bool>;
}
