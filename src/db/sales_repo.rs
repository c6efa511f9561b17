// src/db/sales_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sales::{PaymentMethod, Sale, SaleFilter, SaleItem, SaleStatus, SalesByDay},
    services::sale_calculator::{PricedLine, Totals},
};

/// Cabeçalho de venda pronto para gravar (totais já calculados).
#[derive(Debug, Clone)]
pub struct SaleHeader {
    pub outlet_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub promotion_id: Option<Uuid>,
    pub totals: Totals,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
}

#[derive(Clone, Default)]
pub struct SalesRepository;

impl SalesRepository {
    // ---
    // Leitura
    // ---

    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filter: &SaleFilter,
    ) -> Result<Vec<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE organization_id = $1
              AND ($2::sale_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR outlet_id = $3)
              AND ($4::date IS NULL OR created_at::date >= $4)
              AND ($5::date IS NULL OR created_at::date <= $5)
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(filter.status)
        .bind(filter.outlet_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(executor)
        .await?;
        Ok(sales)
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(sale)
    }

    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Sale>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(sale)
    }

    pub async fn items<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, SaleItem>("SELECT * FROM sale_items WHERE sale_id = $1 ORDER BY id")
            .bind(sale_id)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    /// Vendas concluídas agregadas por dia, só os dias com movimento.
    pub async fn completed_by_day<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<SalesByDay>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, SalesByDay>(
            r#"
            SELECT created_at::date AS day,
                   COUNT(*) AS sales_count,
                   COALESCE(SUM(total_amount), 0) AS total_amount
            FROM sales
            WHERE organization_id = $1
              AND status = 'COMPLETED'
              AND created_at::date BETWEEN $2 AND $3
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(organization_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    // ---
    // Escrita
    // ---

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        header: &SaleHeader,
    ) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let t = &header.totals;
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            INSERT INTO sales (
                organization_id, outlet_id, customer_id, promotion_id, subtotal, discount_amount,
                promotion_discount, tax_rate, tax_amount, total_amount, payment_method, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(header.outlet_id)
        .bind(header.customer_id)
        .bind(header.promotion_id)
        .bind(t.subtotal)
        .bind(t.discount_amount)
        .bind(t.promotion_discount)
        .bind(t.tax_rate)
        .bind(t.tax_amount)
        .bind(t.total_amount)
        .bind(header.payment_method)
        .bind(header.status)
        .bind(&header.notes)
        .fetch_one(executor)
        .await?;
        Ok(sale)
    }

    /// Insere os itens numa única instrução (UNNEST).
    pub async fn insert_items<'e, E>(
        &self,
        executor: E,
        sale_id: Uuid,
        lines: &[PricedLine],
    ) -> Result<Vec<SaleItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let quantities: Vec<_> = lines.iter().map(|l| l.quantity).collect();
        let unit_prices: Vec<_> = lines.iter().map(|l| l.unit_price).collect();
        let discounts: Vec<_> = lines.iter().map(|l| l.discount_amount).collect();
        let totals: Vec<_> = lines.iter().map(|l| l.line_total).collect();

        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            INSERT INTO sale_items (sale_id, product_id, quantity, unit_price, discount_amount, line_total)
            SELECT $1, * FROM UNNEST($2::uuid[], $3::numeric[], $4::numeric[], $5::numeric[], $6::numeric[])
            RETURNING *
            "#,
        )
        .bind(sale_id)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&unit_prices)
        .bind(&discounts)
        .bind(&totals)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn delete_items<'e, E>(&self, executor: E, sale_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM sale_items WHERE sale_id = $1")
            .bind(sale_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Regrava o cabeçalho inteiro com o estado já decidido pelo serviço.
    pub async fn update<'e, E>(&self, executor: E, sale: &Sale, now: DateTime<Utc>) -> Result<Sale, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let updated = sqlx::query_as::<_, Sale>(
            r#"
            UPDATE sales SET
                customer_id = $2, subtotal = $3, discount_amount = $4, promotion_discount = $5,
                tax_rate = $6, tax_amount = $7, total_amount = $8, payment_method = $9,
                status = $10, notes = $11, updated_at = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(sale.id)
        .bind(sale.customer_id)
        .bind(sale.subtotal)
        .bind(sale.discount_amount)
        .bind(sale.promotion_discount)
        .bind(sale.tax_rate)
        .bind(sale.tax_amount)
        .bind(sale.total_amount)
        .bind(sale.payment_method)
        .bind(sale.status)
        .bind(&sale.notes)
        .bind(now)
        .fetch_one(executor)
        .await?;
        Ok(updated)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM sales WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
