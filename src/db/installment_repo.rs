// src/db/installment_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::installments::{Installment, InstallmentStatus, PlannedInstallment},
};

#[derive(Clone, Default)]
pub struct InstallmentRepository;

impl InstallmentRepository {
    /// Parcelas em aberto vencidas viram OVERDUE. Devolve quantas mudaram.
    pub async fn normalize_overdue<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        today: NaiveDate,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE installments SET status = 'OVERDUE', updated_at = NOW()
            WHERE organization_id = $1 AND NOT paid AND status = 'PENDING' AND due_date < $2
            "#,
        )
        .bind(organization_id)
        .bind(today)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        sale_id: Option<Uuid>,
        customer_id: Option<Uuid>,
        status: Option<InstallmentStatus>,
    ) -> Result<Vec<Installment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let installments = sqlx::query_as::<_, Installment>(
            r#"
            SELECT * FROM installments
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR sale_id = $2)
              AND ($3::uuid IS NULL OR customer_id = $3)
              AND ($4::installment_status IS NULL OR status = $4)
            ORDER BY due_date, sequence
            "#,
        )
        .bind(organization_id)
        .bind(sale_id)
        .bind(customer_id)
        .bind(status)
        .fetch_all(executor)
        .await?;
        Ok(installments)
    }

    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Installment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let installment = sqlx::query_as::<_, Installment>(
            "SELECT * FROM installments WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(installment)
    }

    pub async fn insert_plan<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        sale_id: Option<Uuid>,
        customer_id: Option<Uuid>,
        plan: &[PlannedInstallment],
    ) -> Result<Vec<Installment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sequences: Vec<i32> = plan.iter().map(|p| p.sequence).collect();
        let due_dates: Vec<NaiveDate> = plan.iter().map(|p| p.due_date).collect();
        let amounts: Vec<_> = plan.iter().map(|p| p.amount).collect();

        let installments = sqlx::query_as::<_, Installment>(
            r#"
            INSERT INTO installments (organization_id, sale_id, customer_id, sequence, due_date, amount)
            SELECT $1, $2, $3, * FROM UNNEST($4::int4[], $5::date[], $6::numeric[])
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(sale_id)
        .bind(customer_id)
        .bind(&sequences)
        .bind(&due_dates)
        .bind(&amounts)
        .fetch_all(executor)
        .await?;
        Ok(installments)
    }

    /// paid, paidDate e status gravados juntos.
    pub async fn mark_paid<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<Installment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let installment = sqlx::query_as::<_, Installment>(
            r#"
            UPDATE installments
            SET paid = TRUE, paid_date = $2, status = 'PAID', updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(paid_at)
        .fetch_one(executor)
        .await?;
        Ok(installment)
    }

    // ---
    // Parcelas de uma venda
    // ---

    pub async fn for_sale_for_update<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Vec<Installment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let installments = sqlx::query_as::<_, Installment>(
            "SELECT * FROM installments WHERE sale_id = $1 ORDER BY sequence FOR UPDATE",
        )
        .bind(sale_id)
        .fetch_all(executor)
        .await?;
        Ok(installments)
    }

    /// Pagas ficam como histórico.
    pub async fn delete_unpaid_for_sale<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM installments WHERE sale_id = $1 AND NOT paid")
            .bind(sale_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_amounts<'e, E>(
        &self,
        executor: E,
        ids: &[Uuid],
        amounts: &[Decimal],
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE installments AS i
            SET amount = u.amount, updated_at = NOW()
            FROM UNNEST($1::uuid[], $2::numeric[]) AS u(id, amount)
            WHERE i.id = u.id
            "#,
        )
        .bind(ids)
        .bind(amounts)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn reassign_customer_for_sale<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        customer_id: Uuid,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("UPDATE installments SET customer_id = $2, updated_at = NOW() WHERE sale_id = $1")
            .bind(sale_id)
            .bind(customer_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
