//! Database repository for analysis presets (`models` table).

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::repository::Repository;
use crate::db::models::presets::{COPY_SUFFIX, Preset, PresetDBRequest};
use crate::types::{PresetId, UserId, abbrev_uuid};

pub struct Presets<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Presets<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Copy a preset under a new id, suffixing its name. Returns `None` when the source
    /// does not exist or belongs to someone else.
    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), preset_id = %abbrev_uuid(&id)), err)]
    pub async fn duplicate(&mut self, owner: UserId, id: PresetId) -> Result<Option<Preset>> {
        let preset = sqlx::query_as::<_, Preset>(
            r#"
            INSERT INTO models (user_id, name, description)
            SELECT user_id, name || $3, description
            FROM models
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(COPY_SUFFIX)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(preset)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Presets<'c> {
    type CreateRequest = PresetDBRequest;
    type UpdateRequest = PresetDBRequest;
    type Response = Preset;
    type Id = PresetId;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), name = %request.name), err)]
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response> {
        let preset = sqlx::query_as::<_, Preset>(
            r#"
            INSERT INTO models (user_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&request.name)
        .bind(&request.description)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(preset)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), preset_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>> {
        let preset = sqlx::query_as::<_, Preset>("SELECT * FROM models WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(preset)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner)), err)]
    async fn list(&mut self, owner: UserId) -> Result<Vec<Self::Response>> {
        let presets = sqlx::query_as::<_, Preset>("SELECT * FROM models WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(owner)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(presets)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), preset_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let preset = sqlx::query_as::<_, Preset>(
            r#"
            UPDATE models
            SET name = $3, description = $4, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&request.name)
        .bind(&request.description)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(preset)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), preset_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, owner: UserId, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM models WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_copies_fields_with_suffix(pool: PgPool) {
        let owner = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Presets::new(&mut conn);

        let original = repo
            .create(
                owner,
                &PresetDBRequest {
                    name: "Foo".to_string(),
                    description: Some("Aço 1045, fresamento".to_string()),
                },
            )
            .await
            .unwrap();

        let copy = repo.duplicate(owner, original.id).await.unwrap().unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Foo (cópia)");
        assert_eq!(copy.description, original.description);
        assert_eq!(copy.user_id, owner);

        assert_eq!(repo.list(owner).await.unwrap().len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_of_foreign_preset_is_none(pool: PgPool) {
        let owner = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Presets::new(&mut conn);

        let original = repo
            .create(
                owner,
                &PresetDBRequest {
                    name: "Privado".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();

        let other = Uuid::new_v4();
        assert!(repo.duplicate(other, original.id).await.unwrap().is_none());
        assert!(repo.list(other).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_blank_name_violates_check_constraint(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Presets::new(&mut conn);

        let err = repo
            .create(
                Uuid::new_v4(),
                &PresetDBRequest {
                    name: "   ".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, crate::db::errors::DbError::CheckViolation { .. }));
    }
}
