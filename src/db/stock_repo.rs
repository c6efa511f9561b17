// src/db/stock_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::inventory::{ProductStock, StockMovementReason},
};

#[derive(Clone, Default)]
pub struct StockRepository;

impl StockRepository {
    // ---
    // Leitura
    // ---

    /// Saldo de um produto num ponto de venda, travado `FOR UPDATE`.
    pub async fn get_for_update<'e, E>(
        &self,
        executor: E,
        outlet_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<ProductStock>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stock = sqlx::query_as::<_, ProductStock>(
            "SELECT * FROM product_stocks WHERE outlet_id = $1 AND product_id = $2 FOR UPDATE",
        )
        .bind(outlet_id)
        .bind(product_id)
        .fetch_optional(executor)
        .await?;
        Ok(stock)
    }

    // ---
    // Escrita
    // ---

    /// Soma `delta` ao saldo (negativo = saída). Cria a linha se não existir.
    /// A CHECK `quantity >= 0` é a última barreira contra saldo negativo.
    pub async fn apply_delta<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        outlet_id: Uuid,
        product_id: Uuid,
        delta: Decimal,
    ) -> Result<ProductStock, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let stock = sqlx::query_as::<_, ProductStock>(
            r#"
            INSERT INTO product_stocks (organization_id, outlet_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (outlet_id, product_id)
            DO UPDATE SET quantity = product_stocks.quantity + EXCLUDED.quantity,
                          updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(outlet_id)
        .bind(product_id)
        .bind(delta)
        .fetch_one(executor)
        .await?;
        Ok(stock)
    }

    pub async fn record_movement<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        outlet_id: Uuid,
        product_id: Uuid,
        quantity_changed: Decimal,
        reason: StockMovementReason,
        reference_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO stock_movements
                (organization_id, outlet_id, product_id, quantity_changed, reason, reference_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(organization_id)
        .bind(outlet_id)
        .bind(product_id)
        .bind(quantity_changed)
        .bind(reason)
        .bind(reference_id)
        .execute(executor)
        .await?;
        Ok(())
    }
}
