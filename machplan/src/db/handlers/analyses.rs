//! Database repository for drawing analyses.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::repository::Repository;
use crate::db::models::analyses::{Analysis, AnalysisCreateDBRequest, AnalysisStatus, AnalysisUpdateDBRequest};
use crate::types::{AnalysisId, UserId, abbrev_uuid};

pub struct Analyses<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Analyses<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    /// Store the model's result and mark the analysis `completed`.
    #[instrument(skip(self, features, machining_plan), fields(user_id = %abbrev_uuid(&owner), analysis_id = %abbrev_uuid(&id)), err)]
    pub async fn complete(
        &mut self,
        owner: UserId,
        id: AnalysisId,
        features: &serde_json::Value,
        machining_plan: &serde_json::Value,
    ) -> Result<Option<Analysis>> {
        let analysis = sqlx::query_as::<_, Analysis>(
            r#"
            UPDATE analyses
            SET status = $3, features = $4, machining_plan = $5, error = NULL, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(AnalysisStatus::Completed.as_str())
        .bind(features)
        .bind(machining_plan)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(analysis)
    }

    /// Mark the analysis `failed`, keeping the reason for display.
    #[instrument(skip(self, error), fields(user_id = %abbrev_uuid(&owner), analysis_id = %abbrev_uuid(&id)), err)]
    pub async fn fail(&mut self, owner: UserId, id: AnalysisId, error: &str) -> Result<Option<Analysis>> {
        let analysis = sqlx::query_as::<_, Analysis>(
            r#"
            UPDATE analyses
            SET status = $3, error = $4, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(AnalysisStatus::Failed.as_str())
        .bind(error)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(analysis)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Analyses<'c> {
    type CreateRequest = AnalysisCreateDBRequest;
    type UpdateRequest = AnalysisUpdateDBRequest;
    type Response = Analysis;
    type Id = AnalysisId;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), title = %request.title), err)]
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response> {
        let analysis = sqlx::query_as::<_, Analysis>(
            r#"
            INSERT INTO analyses (user_id, title, drawing_id, drawing_url, drawing_type, material, process_type, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&request.title)
        .bind(request.drawing_id)
        .bind(&request.drawing_url)
        .bind(request.drawing_type.as_str())
        .bind(&request.material)
        .bind(request.process_type.as_str())
        .bind(AnalysisStatus::Processing.as_str())
        .fetch_one(&mut *self.db)
        .await?;

        Ok(analysis)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), analysis_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>> {
        let analysis = sqlx::query_as::<_, Analysis>("SELECT * FROM analyses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(analysis)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner)), err)]
    async fn list(&mut self, owner: UserId) -> Result<Vec<Self::Response>> {
        let analyses = sqlx::query_as::<_, Analysis>("SELECT * FROM analyses WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(owner)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(analyses)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), analysis_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let analysis = sqlx::query_as::<_, Analysis>(
            r#"
            UPDATE analyses
            SET title = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&request.title)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(analysis)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), analysis_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, owner: UserId, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM analyses WHERE id = $1 AND user_id = $2")
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
    use crate::db::models::analyses::{DrawingType, ProcessType};
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn request() -> AnalysisCreateDBRequest {
        AnalysisCreateDBRequest {
            title: "Flange".to_string(),
            drawing_id: None,
            drawing_url: Some("https://cdn.example.com/flange.png".to_string()),
            drawing_type: DrawingType::Image,
            material: "Aço 1045".to_string(),
            process_type: ProcessType::Milling,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_analysis_status_transitions(pool: PgPool) {
        let owner = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Analyses::new(&mut conn);

        let analysis = repo.create(owner, &request()).await.unwrap();
        assert_eq!(analysis.analysis_status(), AnalysisStatus::Processing);
        assert_eq!(analysis.features, json!([]));
        assert!(analysis.machining_plan.is_none());

        let features = json!([{"type": "hole", "description": "Furo passante Ø8"}]);
        let plan = json!({"operations": [], "recommendations": [], "warnings": []});
        let completed = repo.complete(owner, analysis.id, &features, &plan).await.unwrap().unwrap();
        assert_eq!(completed.analysis_status(), AnalysisStatus::Completed);
        assert_eq!(completed.features, features);
        assert_eq!(completed.machining_plan, Some(plan));
        assert_eq!(completed.process(), ProcessType::Milling);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_fail_records_error(pool: PgPool) {
        let owner = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Analyses::new(&mut conn);

        let analysis = repo.create(owner, &request()).await.unwrap();
        let failed = repo.fail(owner, analysis.id, "model timeout").await.unwrap().unwrap();
        assert_eq!(failed.analysis_status(), AnalysisStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("model timeout"));

        // Another user cannot flip the status
        assert!(repo.fail(Uuid::new_v4(), analysis.id, "nope").await.unwrap().is_none());
    }
}
