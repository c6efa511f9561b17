// src/db/quotation_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::sales::{Quotation, QuotationItem},
    services::sale_calculator::{PricedLine, Totals},
};

#[derive(Clone, Default)]
pub struct QuotationRepository;

impl QuotationRepository {
    pub async fn list<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<Vec<Quotation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotations = sqlx::query_as::<_, Quotation>(
            "SELECT * FROM quotations WHERE organization_id = $1 ORDER BY created_at DESC",
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(quotations)
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<Quotation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if for_update {
            "SELECT * FROM quotations WHERE id = $1 AND organization_id = $2 FOR UPDATE"
        } else {
            "SELECT * FROM quotations WHERE id = $1 AND organization_id = $2"
        };
        let quotation = sqlx::query_as::<_, Quotation>(sql)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(quotation)
    }

    pub async fn items<'e, E>(&self, executor: E, quotation_id: Uuid) -> Result<Vec<QuotationItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, QuotationItem>(
            "SELECT * FROM quotation_items WHERE quotation_id = $1 ORDER BY id",
        )
        .bind(quotation_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        outlet_id: Uuid,
        customer_id: Option<Uuid>,
        totals: &Totals,
        valid_until: Option<NaiveDate>,
        notes: Option<&str>,
    ) -> Result<Quotation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            INSERT INTO quotations (
                organization_id, outlet_id, customer_id, subtotal, discount_amount,
                tax_rate, tax_amount, total_amount, valid_until, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(outlet_id)
        .bind(customer_id)
        .bind(totals.subtotal)
        .bind(totals.discount_amount)
        .bind(totals.tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.total_amount)
        .bind(valid_until)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(quotation)
    }

    pub async fn insert_items<'e, E>(
        &self,
        executor: E,
        quotation_id: Uuid,
        lines: &[PricedLine],
    ) -> Result<Vec<QuotationItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let quantities: Vec<_> = lines.iter().map(|l| l.quantity).collect();
        let unit_prices: Vec<_> = lines.iter().map(|l| l.unit_price).collect();
        let discounts: Vec<_> = lines.iter().map(|l| l.discount_amount).collect();
        let totals: Vec<_> = lines.iter().map(|l| l.line_total).collect();

        let items = sqlx::query_as::<_, QuotationItem>(
            r#"
            INSERT INTO quotation_items (quotation_id, product_id, quantity, unit_price, discount_amount, line_total)
            SELECT $1, * FROM UNNEST($2::uuid[], $3::numeric[], $4::numeric[], $5::numeric[], $6::numeric[])
            RETURNING *
            "#,
        )
        .bind(quotation_id)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&unit_prices)
        .bind(&discounts)
        .bind(&totals)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn mark_converted<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        sale_id: Uuid,
    ) -> Result<Quotation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            UPDATE quotations
            SET status = 'CONVERTED', converted_sale_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(sale_id)
        .fetch_one(executor)
        .await?;
        Ok(quotation)
    }
}
