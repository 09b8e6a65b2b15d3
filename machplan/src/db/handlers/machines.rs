//! Database repository for machines.

use sqlx::PgConnection;
use tracing::instrument;

use crate::db::errors::Result;
use crate::db::handlers::repository::Repository;
use crate::db::models::machines::{Machine, MachineDBRequest};
use crate::types::{MachineId, UserId, abbrev_uuid};

pub struct Machines<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Machines<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Machines<'c> {
    type CreateRequest = MachineDBRequest;
    type UpdateRequest = MachineDBRequest;
    type Response = Machine;
    type Id = MachineId;

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), name = %request.name), err)]
    async fn create(&mut self, owner: UserId, request: &Self::CreateRequest) -> Result<Self::Response> {
        let machine = sqlx::query_as::<_, Machine>(
            r#"
            INSERT INTO machines (
                user_id, name, type, manufacturer, model, max_rpm, max_power,
                work_area_x, work_area_y, work_area_z, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(owner)
        .bind(&request.name)
        .bind(request.machine_type.as_str())
        .bind(&request.manufacturer)
        .bind(&request.model)
        .bind(request.max_rpm)
        .bind(request.max_power)
        .bind(request.work_area_x)
        .bind(request.work_area_y)
        .bind(request.work_area_z)
        .bind(&request.notes)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(machine)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), machine_id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, owner: UserId, id: Self::Id) -> Result<Option<Self::Response>> {
        let machine = sqlx::query_as::<_, Machine>("SELECT * FROM machines WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(machine)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner)), err)]
    async fn list(&mut self, owner: UserId) -> Result<Vec<Self::Response>> {
        let machines = sqlx::query_as::<_, Machine>("SELECT * FROM machines WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(owner)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(machines)
    }

    #[instrument(skip(self, request), fields(user_id = %abbrev_uuid(&owner), machine_id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, owner: UserId, id: Self::Id, request: &Self::UpdateRequest) -> Result<Option<Self::Response>> {
        let machine = sqlx::query_as::<_, Machine>(
            r#"
            UPDATE machines
            SET
                name = $3,
                type = $4,
                manufacturer = $5,
                model = $6,
                max_rpm = $7,
                max_power = $8,
                work_area_x = $9,
                work_area_y = $10,
                work_area_z = $11,
                notes = $12,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner)
        .bind(&request.name)
        .bind(request.machine_type.as_str())
        .bind(&request.manufacturer)
        .bind(&request.model)
        .bind(request.max_rpm)
        .bind(request.max_power)
        .bind(request.work_area_x)
        .bind(request.work_area_y)
        .bind(request.work_area_z)
        .bind(&request.notes)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(machine)
    }

    #[instrument(skip(self), fields(user_id = %abbrev_uuid(&owner), machine_id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, owner: UserId, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM machines WHERE id = $1 AND user_id = $2")
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
    use crate::db::models::machines::MachineType;
    use sqlx::PgPool;
    use uuid::Uuid;

    fn request(name: &str) -> MachineDBRequest {
        MachineDBRequest {
            name: name.to_string(),
            machine_type: MachineType::Vertical,
            manufacturer: Some("Romi".to_string()),
            model: Some("D 800".to_string()),
            max_rpm: Some(10000),
            max_power: Some(15.0),
            work_area_x: Some(800.0),
            work_area_y: Some(530.0),
            work_area_z: Some(580.0),
            notes: None,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_machine_lifecycle(pool: PgPool) {
        let owner = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Machines::new(&mut conn);

        let created = repo.create(owner, &request("Centro vertical")).await.unwrap();
        assert_eq!(created.user_id, owner);
        assert_eq!(created.kind(), MachineType::Vertical);
        assert_eq!(created.max_rpm, Some(10000));

        let mut replacement = request("Centro vertical 2");
        replacement.machine_type = MachineType::MachiningCenter;
        replacement.manufacturer = None;
        let updated = repo.update(owner, created.id, &replacement).await.unwrap().unwrap();
        assert_eq!(updated.name, "Centro vertical 2");
        assert_eq!(updated.kind(), MachineType::MachiningCenter);
        assert_eq!(updated.manufacturer, None);
        assert!(updated.updated_at >= created.updated_at);

        assert!(repo.delete(owner, created.id).await.unwrap());
        assert!(repo.get_by_id(owner, created.id).await.unwrap().is_none());
        assert!(!repo.delete(owner, created.id).await.unwrap());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_machines_are_scoped_to_owner(pool: PgPool) {
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Machines::new(&mut conn);

        let machine = repo.create(owner, &request("Torno CNC")).await.unwrap();

        assert!(repo.get_by_id(intruder, machine.id).await.unwrap().is_none());
        assert!(repo.update(intruder, machine.id, &request("hijacked")).await.unwrap().is_none());
        assert!(!repo.delete(intruder, machine.id).await.unwrap());
        assert!(repo.list(intruder).await.unwrap().is_empty());

        let still_there = repo.get_by_id(owner, machine.id).await.unwrap().unwrap();
        assert_eq!(still_there.name, "Torno CNC");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_is_newest_first(pool: PgPool) {
        let owner = Uuid::new_v4();
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Machines::new(&mut conn);

        let first = repo.create(owner, &request("first")).await.unwrap();
        let second = repo.create(owner, &request("second")).await.unwrap();

        let listed = repo.list(owner).await.unwrap();
        assert_eq!(listed.iter().map(|m| m.id).collect::<Vec<_>>(), vec![second.id, first.id]);
    }
}
