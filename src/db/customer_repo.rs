// src/db/customer_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::is_unique_violation, error::AppError},
    models::customers::{Customer, CustomerGroup, CustomerGroupSummary},
};

#[derive(Clone, Default)]
pub struct CustomerRepository;

impl CustomerRepository {
    // ---
    // Clientes
    // ---

    pub async fn find<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(customer)
    }

    pub async fn list_members<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<Customer>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE organization_id = $1 AND group_id = $2 ORDER BY name",
        )
        .bind(organization_id)
        .bind(group_id)
        .fetch_all(executor)
        .await?;
        Ok(customers)
    }

    pub async fn assign_group<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        group_id: Option<Uuid>,
        customer_ids: &[Uuid],
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE customers SET group_id = $1 WHERE organization_id = $2 AND id = ANY($3)",
        )
        .bind(group_id)
        .bind(organization_id)
        .bind(customer_ids)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Tira todos os membros do grupo. Devolve quantos foram afetados.
    pub async fn ungroup_all<'e, E>(&self, executor: E, group_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE customers SET group_id = NULL WHERE group_id = $1")
            .bind(group_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    // ---
    // Grupos
    // ---

    pub async fn list_groups<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<Vec<CustomerGroupSummary>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let groups = sqlx::query_as::<_, CustomerGroupSummary>(
            r#"
            SELECT g.*, COUNT(c.id) AS member_count
            FROM customer_groups g
            LEFT JOIN customers c ON c.group_id = g.id
            WHERE g.organization_id = $1
            GROUP BY g.id
            ORDER BY g.name
            "#,
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(groups)
    }

    pub async fn find_group<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CustomerGroup>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let group = sqlx::query_as::<_, CustomerGroup>(
            "SELECT * FROM customer_groups WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(group)
    }

    pub async fn find_group_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<CustomerGroup>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let group = sqlx::query_as::<_, CustomerGroup>(
            "SELECT * FROM customer_groups WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(group)
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
        sqlx::query_as::<_, CustomerGroup>(
            r#"
            INSERT INTO customer_groups (organization_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(name)
        .bind(description)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::UniqueConstraintViolation(format!("customer group {}", name));
            }
            e.into()
        })
    }

    pub async fn update_group<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<CustomerGroup>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CustomerGroup>(
            r#"
            UPDATE customer_groups
            SET name = COALESCE($3, name), description = COALESCE($4, description)
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(name)
        .bind(description)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::UniqueConstraintViolation(format!(
                    "customer group {}",
                    name.unwrap_or_default()
                ));
            }
            e.into()
        })
    }

    pub async fn delete_group<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM customer_groups WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
