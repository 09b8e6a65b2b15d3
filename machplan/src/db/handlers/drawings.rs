//! Database repository for drawing metadata.
//!
//! Owner-facing methods filter on `user_id`. The two retention methods
//! ([`Drawings::list_expired`], [`Drawings::purge`]) are only used by the retention
//! sweeper and act across owners.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::models::drawings::{Drawing, DrawingCreateDBRequest};
use crate::types::{DrawingId, UserId, abbrev_uuid};

pub struct Drawings<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Drawings<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), drawing_id = %abbrev_uuid(&request.id)), err)]
    pub async fn create(&mut self, owner: UserId, request: &DrawingCreateDBRequest) -> Result<Drawing> {
        let drawing = sqlx::query_as::<_, Drawing>(
            r#"
            INSERT INTO drawings (id, user_id, file_name, content_type, size_bytes, storage_key, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(owner)
        .bind(&request.file_name)
        .bind(&request.content_type)
        .bind(request.size_bytes)
        .bind(&request.storage_key)
        .bind(request.expires_at)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(drawing)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), drawing_id = %abbrev_uuid(&id)), err)]
    pub async fn get_by_id(&mut self, owner: UserId, id: DrawingId) -> Result<Option<Drawing>> {
        let drawing = sqlx::query_as::<_, Drawing>("SELECT * FROM drawings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(drawing)
    }

    /// Delete the row and hand it back so the caller can remove the blob.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), drawing_id = %abbrev_uuid(&id)), err)]
    pub async fn delete(&mut self, owner: UserId, id: DrawingId) -> Result<Option<Drawing>> {
        let drawing = sqlx::query_as::<_, Drawing>("DELETE FROM drawings WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(drawing)
    }

    /// Drawings whose retention deadline is at or before `now`, oldest deadline first.
    #[instrument(skip(self), err)]
    pub async fn list_expired(&mut self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Drawing>> {
        let drawings = sqlx::query_as::<_, Drawing>(
            r#"
            SELECT * FROM drawings
            WHERE expires_at IS NOT NULL AND expires_at <= $1
            ORDER BY expires_at ASC
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(drawings)
    }

    #[instrument(skip(self), fields(drawing_id = %abbrev_uuid(&id)), err)]
    pub async fn purge(&mut self, id: DrawingId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM drawings WHERE id = $1")
            .bind(id)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn request(expires_at: Option<DateTime<Utc>>) -> DrawingCreateDBRequest {
        let id = Uuid::new_v4();
        DrawingCreateDBRequest {
            id,
            file_name: "eixo.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            size_bytes: 1024,
            storage_key: id.to_string(),
            expires_at,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_expired_ignores_unexpired_and_permanent(pool: PgPool) {
        let owner = Uuid::new_v4();
        let now = Utc::now();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Drawings::new(&mut conn);

        let expired = repo.create(owner, &request(Some(now - Duration::hours(1)))).await.unwrap();
        repo.create(owner, &request(Some(now + Duration::hours(1)))).await.unwrap();
        repo.create(owner, &request(None)).await.unwrap();

        let due = repo.list_expired(now, 100).await.unwrap();
        assert_eq!(due.iter().map(|d| d.id).collect::<Vec<_>>(), vec![expired.id]);

        assert!(repo.purge(expired.id).await.unwrap());
        assert!(repo.list_expired(now, 100).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_is_owner_scoped(pool: PgPool) {
        let owner = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Drawings::new(&mut conn);

        let drawing = repo.create(owner, &request(None)).await.unwrap();
        assert!(repo.delete(Uuid::new_v4(), drawing.id).await.unwrap().is_none());

        let deleted = repo.delete(owner, drawing.id).await.unwrap().unwrap();
        assert_eq!(deleted.storage_key, drawing.storage_key);
        assert!(repo.get_by_id(owner, drawing.id).await.unwrap().is_none());
    }
}
