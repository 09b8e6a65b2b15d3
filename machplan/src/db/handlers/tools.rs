//! Database repository for the tool inventory.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::repository::Repository;
use crate::db::models::tools::{Tool, ToolDBRequest};
use crate::types::{ToolId, UserId, abbrev_uuid};

pub struct Tools<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Tools<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Tools<'c> {
    type CreateRequest = ToolDBRequest;
    type UpdateRequest = ToolDBRequest;
    type Response = Tool;
    type Id = ToolId;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), name = %request.name), err)]
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response> {
        let tool = sqlx::query_as::<_, Tool>(
            r#"
            INSERT INTO tools (
                user_id, name, type, material, diameter, length, flutes,
                coating, manufacturer, part_number, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&request.name)
        .bind(request.tool_type.as_str())
        .bind(&request.material)
        .bind(request.diameter)
        .bind(request.length)
        .bind(request.flutes)
        .bind(&request.coating)
        .bind(&request.manufacturer)
        .bind(&request.part_number)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(tool)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), tool_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>> {
        let tool = sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(tool)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner)), err)]
    async fn list(&mut self, owner: UserId) -> Result<Vec<Self::Response>> {
        let tools = sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(owner)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(tools)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), tool_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let tool = sqlx::query_as::<_, Tool>(
            r#"
            UPDATE tools
            SET
                name = $3,
                type = $4,
                material = $5,
                diameter = $6,
                length = $7,
                flutes = $8,
                coating = $9,
                manufacturer = $10,
                part_number = $11,
                notes = $12,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&request.name)
        .bind(request.tool_type.as_str())
        .bind(&request.material)
        .bind(request.diameter)
        .bind(request.length)
        .bind(request.flutes)
        .bind(&request.coating)
        .bind(&request.manufacturer)
        .bind(&request.part_number)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(tool)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), tool_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, owner: UserId, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tools WHERE id = $1 AND user_id = $2")
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
    use crate::db::models::tools::ToolType;
    use sqlx::PgPool;
    use uuid::Uuid;

    #[sqlx::test]
    #[test_log::test]
    async fn test_tool_round_trip_keeps_optional_columns(pool: PgPool) {
        let owner = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Tools::new(&mut conn);

        let request = ToolDBRequest {
            name: "Fresa de topo 10mm".to_string(),
            tool_type: ToolType::EndMill,
            material: Some("Metal duro".to_string()),
            diameter: Some(10.0),
            length: Some(72.0),
            flutes: Some(4),
            coating: Some("TiAlN".to_string()),
            manufacturer: Some("Sandvik".to_string()),
            part_number: Some("2P342-1000-PA".to_string()),
            notes: None,
        };
        let tool = repo.create(owner, &request).await.unwrap();

        let fetched = repo.get_by_id(owner, tool.id).await.unwrap().unwrap();
        assert_eq!(fetched.kind(), ToolType::EndMill);
        assert_eq!(fetched.diameter, Some(10.0));
        assert_eq!(fetched.flutes, Some(4));
        assert_eq!(fetched.coating.as_deref(), Some("TiAlN"));

        assert!(repo.get_by_id(Uuid::new_v4(), tool.id).await.unwrap().is_none());
    }
}
