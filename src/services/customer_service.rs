// src/services/customer_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::CustomerRepository,
    models::customers::{Customer, CustomerGroup, CustomerGroupDeleted, CustomerGroupListResponse},
    services::entity_validator::EntityValidator,
};

#[derive(Clone)]
pub struct CustomerService {
    customer_repo: CustomerRepository,
    validator: EntityValidator,
}

impl CustomerService {
    pub fn new(customer_repo: CustomerRepository, validator: EntityValidator) -> Self {
        Self { customer_repo, validator }
    }

    pub async fn list_groups<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<CustomerGroupListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer_groups = self.customer_repo.list_groups(executor, organization_id).await?;
        let total = customer_groups.len() as i64;
        Ok(CustomerGroupListResponse { customer_groups, total })
    }

    pub async fn get_group<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<CustomerGroup, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.customer_repo
            .find_group(executor, organization_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::CustomerGroup, id })
    }

    pub async fn create_group<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<CustomerGroup, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let group = self.customer_repo.create_group(executor, organization_id, name, description).await?;
        tracing::info!("👥 Grupo de clientes '{}' criado ({})", group.name, group.id);
        Ok(group)
    }

    pub async fn update_group<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<CustomerGroup, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.customer_repo
            .update_group(executor, organization_id, id, name, description)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::CustomerGroup, id })
    }

    /// Remove o grupo e desvincula os membros. Nenhum cliente é apagado.
    pub async fn delete_group<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<CustomerGroupDeleted, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.customer_repo
            .find_group_for_update(&mut *tx, organization_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::CustomerGroup, id })?;

        let ungrouped = self.customer_repo.ungroup_all(&mut *tx, id).await?;
        self.customer_repo.delete_group(&mut *tx, organization_id, id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Grupo {} removido; {} clientes sem grupo", id, ungrouped);
        Ok(CustomerGroupDeleted { id, ungrouped_customers: ungrouped as i64 })
    }

    pub async fn members<'e, E>(&self, executor: E, organization_id: Uuid, group_id: Uuid) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        self.customer_repo
            .find_group(&mut *conn, organization_id, group_id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::CustomerGroup, id: group_id })?;
        self.customer_repo.list_members(&mut *conn, organization_id, group_id).await
    }

    /// Coloca os clientes no grupo. Todos precisam ser da organização.
    pub async fn assign_members<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        group_id: Uuid,
        customer_ids: &[Uuid],
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::CustomerGroup, organization_id, group_id).await?;
        self.validator.ensure_all(&mut tx, EntityKind::Customer, organization_id, customer_ids).await?;

        let assigned = self
            .customer_repo
            .assign_group(&mut *tx, organization_id, Some(group_id), customer_ids)
            .await?;
        let members = self.customer_repo.list_members(&mut *tx, organization_id, group_id).await?;
        tx.commit().await?;

        tracing::info!("👥 {} clientes adicionados ao grupo {}", assigned, group_id);
        Ok(members)
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::OwnershipRepository;
    use sqlx::PgPool;

    async fn seed_org(pool: &PgPool, name: &str, slug: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(slug)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_customer(pool: &PgPool, org: Uuid, name: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO customers (organization_id, name) VALUES ($1, $2) RETURNING id")
            .bind(org)
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn service() -> CustomerService {
        CustomerService::new(CustomerRepository, EntityValidator::new(OwnershipRepository))
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn deleting_group_ungroups_members_without_deleting_them(pool: PgPool) {
        let org = seed_org(&pool, "Loja Centro", "centro").await;
        let svc = service();
        let group = svc.create_group(&pool, org, "VIP", None).await.unwrap();
        let mut ids = Vec::new();
        for name in ["Ana", "Bruno", "Carla"] {
            ids.push(seed_customer(&pool, org, name).await);
        }
        svc.assign_members(&pool, org, group.id, &ids).await.unwrap();

        let deleted = svc.delete_group(&pool, org, group.id).await.unwrap();

        assert_eq!(deleted.ungrouped_customers, 3);
        let (remaining, grouped): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(group_id) FROM customers WHERE organization_id = $1",
        )
        .bind(org)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!((remaining, grouped), (3, 0));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn other_organization_sees_not_found(pool: PgPool) {
        let owner = seed_org(&pool, "Dona", "dona").await;
        let intruder = seed_org(&pool, "Outra", "outra").await;
        let svc = service();
        let group = svc.create_group(&pool, owner, "Atacado", None).await.unwrap();

        let err = svc.get_group(&pool, intruder, group.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: EntityKind::CustomerGroup, .. }));

        let foreign = seed_customer(&pool, intruder, "Zé").await;
        let err = svc.assign_members(&pool, owner, group.id, &[foreign]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: EntityKind::Customer, id } if id == foreign));
    }
}
