//! Database repository for reference cutting parameters.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::repository::Repository;
use crate::db::models::cutting_parameters::{CuttingParameter, CuttingParameterDBRequest};
use crate::types::{CuttingParameterId, UserId, abbrev_uuid};

pub struct CuttingParameters<'c> {
    db: &'c mut PgConnection,
}

impl<'c> CuttingParameters<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for CuttingParameters<'c> {
    type CreateRequest = CuttingParameterDBRequest;
    type UpdateRequest = CuttingParameterDBRequest;
    type Response = CuttingParameter;
    type Id = CuttingParameterId;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), material = %request.material), err)]
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response> {
        let parameter = sqlx::query_as::<_, CuttingParameter>(
            r#"
            INSERT INTO cutting_parameters (user_id, material, tool_type, rpm, feed_rate, depth_of_cut, ap, ae, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&request.material)
        .bind(&request.tool_type)
        .bind(request.rpm)
        .bind(request.feed_rate)
        .bind(request.depth_of_cut)
        .bind(request.ap)
        .bind(request.ae)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(parameter)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), parameter_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>> {
        let parameter = sqlx::query_as::<_, CuttingParameter>("SELECT * FROM cutting_parameters WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(parameter)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner)), err)]
    async fn list(&mut self, owner: UserId) -> Result<Vec<Self::Response>> {
        let parameters =
            sqlx::query_as::<_, CuttingParameter>("SELECT * FROM cutting_parameters WHERE user_id = $1 ORDER BY created_at DESC")
                .bind(owner)
                .fetch_all(&mut *self.db)
                .await?;

        Ok(parameters)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), parameter_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let parameter = sqlx::query_as::<_, CuttingParameter>(
            r#"
            UPDATE cutting_parameters
            SET
                material = $3,
                tool_type = $4,
                rpm = $5,
                feed_rate = $6,
                depth_of_cut = $7,
                ap = $8,
                ae = $9,
                notes = $10,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&request.material)
        .bind(&request.tool_type)
        .bind(request.rpm)
        .bind(request.feed_rate)
        .bind(request.depth_of_cut)
        .bind(request.ap)
        .bind(request.ae)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(parameter)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), parameter_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, owner: UserId, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cutting_parameters WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
