// src/db/promotion_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::is_unique_violation, error::AppError},
    models::promotion::{Promotion, PromotionInput},
};

#[derive(Clone, Default)]
pub struct PromotionRepository;

impl PromotionRepository {
    // ---
    // Leitura
    // ---

    pub async fn list<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<Vec<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotions = sqlx::query_as::<_, Promotion>(
            "SELECT * FROM promotions WHERE organization_id = $1 ORDER BY start_date DESC, name",
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(promotions)
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotion = sqlx::query_as::<_, Promotion>(
            "SELECT * FROM promotions WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(promotion)
    }

    /// Busca só pelo id, sem filtro de organização: quem chama confere o escopo.
    /// `FOR UPDATE` serializa resgates concorrentes da mesma promoção.
    pub async fn find_any_for_update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
    ) -> Result<Option<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotion = sqlx::query_as::<_, Promotion>(
            "SELECT * FROM promotions WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(promotion)
    }

    pub async fn find_by_code_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        code: &str,
    ) -> Result<Option<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotion = sqlx::query_as::<_, Promotion>(
            "SELECT * FROM promotions WHERE organization_id = $1 AND code = $2 FOR UPDATE",
        )
        .bind(organization_id)
        .bind(code)
        .fetch_optional(executor)
        .await?;
        Ok(promotion)
    }

    pub async fn count_redemptions<'e, E>(
        &self,
        executor: E,
        promotion_id: Uuid,
        customer_id: Uuid,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM promotion_redemptions WHERE promotion_id = $1 AND customer_id = $2",
        )
        .bind(promotion_id)
        .bind(customer_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    // ---
    // Escrita
    // ---

    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        input: &PromotionInput,
    ) -> Result<Promotion, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Promotion>(
            r#"
            INSERT INTO promotions (
                organization_id, name, code, description, discount, is_percentage,
                start_date, end_date, min_purchase_amount, max_discount_amount,
                limit_per_customer, product_ids, category_ids, customer_group_ids
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.discount)
        .bind(input.is_percentage)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.min_purchase_amount)
        .bind(input.max_discount_amount)
        .bind(input.limit_per_customer)
        .bind(&input.product_ids)
        .bind(&input.category_ids)
        .bind(&input.customer_group_ids)
        .fetch_one(executor)
        .await
        .map_err(|e| map_code_conflict(e, input))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        input: &PromotionInput,
    ) -> Result<Option<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Promotion>(
            r#"
            UPDATE promotions SET
                name = $3, code = $4, description = $5, discount = $6, is_percentage = $7,
                start_date = $8, end_date = $9, min_purchase_amount = $10,
                max_discount_amount = $11, limit_per_customer = $12,
                product_ids = $13, category_ids = $14, customer_group_ids = $15,
                updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&input.name)
        .bind(&input.code)
        .bind(&input.description)
        .bind(input.discount)
        .bind(input.is_percentage)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.min_purchase_amount)
        .bind(input.max_discount_amount)
        .bind(input.limit_per_customer)
        .bind(&input.product_ids)
        .bind(&input.category_ids)
        .bind(&input.customer_group_ids)
        .fetch_optional(executor)
        .await
        .map_err(|e| map_code_conflict(e, input))
    }

    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM promotions WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn record_redemption<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        promotion_id: Uuid,
        customer_id: Option<Uuid>,
        sale_id: Uuid,
        discount_amount: Decimal,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO promotion_redemptions (organization_id, promotion_id, customer_id, sale_id, discount_amount)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(organization_id)
        .bind(promotion_id)
        .bind(customer_id)
        .bind(sale_id)
        .bind(discount_amount)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// O resgate acompanha o cliente da venda.
    pub async fn reassign_redemptions<'e, E>(&self, executor: E, sale_id: Uuid, customer_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE promotion_redemptions SET customer_id = $2 WHERE sale_id = $1")
            .bind(sale_id)
            .bind(customer_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}

// Código repetido na mesma organização
fn map_code_conflict(e: sqlx::Error, input: &PromotionInput) -> AppError {
    if is_unique_violation(&e) {
        return AppError::UniqueConstraintViolation(format!(
            "promotion code {}",
            input.code.as_deref().unwrap_or_default()
        ));
    }
    e.into()
}
