// src/services/quotation_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::QuotationRepository,
    models::sales::{
        PaymentMethod, QuotationDetail, QuotationItem, QuotationListResponse, SaleDetail, SaleStatus,
    },
    services::{
        entity_validator::EntityValidator,
        sale_calculator::{compute_totals, price_lines, LineInput},
        sales_service::{InstallmentPlanInput, NewSale, SalesService},
    },
};

#[derive(Debug, Clone)]
pub struct NewQuotation {
    pub outlet_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub items: Vec<LineInput>,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// O que a conversão acrescenta ao orçamento para virar venda.
#[derive(Debug, Clone)]
pub struct QuotationConversion {
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub installment_plan: Option<InstallmentPlanInput>,
}

fn lines_of(items: &[QuotationItem]) -> Vec<LineInput> {
    items
        .iter()
        .map(|i| LineInput {
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price: i.unit_price,
            discount_amount: i.discount_amount,
        })
        .collect()
}

#[derive(Clone)]
pub struct QuotationService {
    quotation_repo: QuotationRepository,
    validator: EntityValidator,
    sales: SalesService,
}

impl QuotationService {
    pub fn new(quotation_repo: QuotationRepository, validator: EntityValidator, sales: SalesService) -> Self {
        Self { quotation_repo, validator, sales }
    }

    /// Precificado como venda, sem promoção e sem mexer no estoque.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        input: NewQuotation,
    ) -> Result<QuotationDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if input.items.is_empty() {
            return Err(AppError::InvalidField { field: "items", code: "items_required" });
        }
        let (lines, subtotal) = price_lines(&input.items)?;
        let totals = compute_totals(subtotal, input.discount_amount, Decimal::ZERO, input.tax_rate)?;

        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::Outlet, organization_id, input.outlet_id).await?;
        self.validator
            .ensure_opt(&mut tx, EntityKind::Customer, organization_id, input.customer_id)
            .await?;
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        self.validator.products(&mut tx, organization_id, &product_ids).await?;

        let quotation = self
            .quotation_repo
            .insert(
                &mut *tx,
                organization_id,
                input.outlet_id,
                input.customer_id,
                &totals,
                input.valid_until,
                input.notes.as_deref(),
            )
            .await?;
        let items = self.quotation_repo.insert_items(&mut *tx, quotation.id, &lines).await?;
        tx.commit().await?;

        tracing::info!("📝 Orçamento {} criado: total {}", quotation.id, quotation.total_amount);
        Ok(QuotationDetail { quotation, items })
    }

    pub async fn list<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<QuotationListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let quotations = self.quotation_repo.list(executor, organization_id).await?;
        let total = quotations.len() as i64;
        Ok(QuotationListResponse { quotations, total })
    }

    pub async fn detail<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<QuotationDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        let quotation = self
            .quotation_repo
            .find(&mut *conn, organization_id, id, false)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Quotation, id })?;
        let items = self.quotation_repo.items(&mut *conn, quotation.id).await?;
        Ok(QuotationDetail { quotation, items })
    }

    /// Vira venda concluída numa transação só: a venda inteira (estoque incluso)
    /// e a marcação do orçamento acontecem juntas ou não acontecem.
    pub async fn convert<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        conversion: QuotationConversion,
    ) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let quotation = self
            .quotation_repo
            .find(&mut *tx, organization_id, id, true)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Quotation, id })?;
        if !quotation.is_convertible_on(Utc::now().date_naive()) {
            tracing::warn!("Orçamento {} fechado ou vencido ({:?})", id, quotation.status);
            return Err(AppError::QuotationClosed(id));
        }

        let items = self.quotation_repo.items(&mut *tx, quotation.id).await?;
        // Desconto do orçamento = desconto do cabeçalho (orçamento não tem promoção)
        let sale = NewSale {
            outlet_id: quotation.outlet_id,
            customer_id: quotation.customer_id,
            items: lines_of(&items),
            discount_amount: quotation.discount_amount,
            tax_rate: quotation.tax_rate,
            payment_method: conversion.payment_method,
            notes: conversion.notes.or(quotation.notes),
            promotion: None,
            status: SaleStatus::Completed,
            installment_plan: conversion.installment_plan,
        };
        let detail = self.sales.create_in_tx(&mut tx, organization_id, sale).await?;
        self.quotation_repo.mark_converted(&mut *tx, quotation.id, detail.sale.id).await?;
        tx.commit().await?;

        tracing::info!("🔁 Orçamento {} convertido na venda {}", id, detail.sale.id);
        Ok(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn stored_items_reprice_to_the_same_lines() {
        let item = QuotationItem {
            id: Uuid::new_v4(),
            quotation_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: dec!(3),
            unit_price: dec!(4.50),
            discount_amount: dec!(1),
            line_total: dec!(12.50),
        };

        let (lines, subtotal) = price_lines(&lines_of(&[item.clone()])).unwrap();

        assert_eq!(lines[0].line_total, item.line_total);
        assert_eq!(subtotal, dec!(12.50));
    }
}

// Escrita atômica contra um banco real: rode com `cargo test -- --ignored` e DATABASE_URL definida.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::{
        db::{
            CustomerRepository, InstallmentRepository, OwnershipRepository, PromotionRepository, SalesRepository,
            StockRepository,
        },
        models::sales::QuotationStatus,
        services::{
            installment_service::InstallmentService, inventory_service::InventoryService,
            promotion_engine::PromotionService,
        },
    };
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    fn service() -> QuotationService {
        let validator = EntityValidator::new(OwnershipRepository);
        let sales = SalesService::new(
            SalesRepository,
            PromotionRepository,
            validator.clone(),
            InventoryService::new(StockRepository),
            PromotionService::new(PromotionRepository, CustomerRepository, validator.clone()),
            InstallmentService::new(InstallmentRepository, validator.clone()),
        );
        QuotationService::new(QuotationRepository, validator, sales)
    }

    async fn seed(pool: &PgPool) -> (Uuid, Uuid, Uuid) {
        let org: Uuid = sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ('Loja', 'loja') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
        let outlet: Uuid = sqlx::query_scalar("INSERT INTO outlets (organization_id, name) VALUES ($1, 'Centro') RETURNING id")
            .bind(org)
            .fetch_one(pool)
            .await
            .unwrap();
        let product: Uuid = sqlx::query_scalar(
            "INSERT INTO products (organization_id, name, sku, selling_price) VALUES ($1, 'Café', 'CAF-1', 10) RETURNING id",
        )
        .bind(org)
        .fetch_one(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO product_stocks (organization_id, outlet_id, product_id, quantity) VALUES ($1, $2, $3, 5)")
            .bind(org)
            .bind(outlet)
            .bind(product)
            .execute(pool)
            .await
            .unwrap();
        (org, outlet, product)
    }

    fn new_quotation(outlet: Uuid, product: Uuid) -> NewQuotation {
        NewQuotation {
            outlet_id: outlet,
            customer_id: None,
            items: vec![LineInput { product_id: product, quantity: dec!(2), unit_price: dec!(10), discount_amount: dec!(0) }],
            discount_amount: dec!(0),
            tax_rate: dec!(0.1),
            valid_until: Some(Utc::now().date_naive() + chrono::Duration::days(7)),
            notes: None,
        }
    }

    fn cash() -> QuotationConversion {
        QuotationConversion { payment_method: PaymentMethod::Cash, notes: None, installment_plan: None }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn conversion_creates_completed_sale_once(pool: PgPool) {
        let (org, outlet, product) = seed(&pool).await;
        let svc = service();
        let quotation = svc.create(&pool, org, new_quotation(outlet, product)).await.unwrap();

        let detail = svc.convert(&pool, org, quotation.quotation.id, cash()).await.unwrap();

        assert_eq!(detail.sale.status, SaleStatus::Completed);
        assert_eq!(detail.sale.total_amount, quotation.quotation.total_amount);
        let stock: Decimal = sqlx::query_scalar("SELECT quantity FROM product_stocks WHERE product_id = $1")
            .bind(product)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(stock, dec!(3));
        let converted = svc.detail(&pool, org, quotation.quotation.id).await.unwrap().quotation;
        assert_eq!(converted.status, QuotationStatus::Converted);
        assert_eq!(converted.converted_sale_id, Some(detail.sale.id));

        let err = svc.convert(&pool, org, quotation.quotation.id, cash()).await.unwrap_err();
        assert!(matches!(err, AppError::QuotationClosed(id) if id == quotation.quotation.id));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn expired_quotation_is_closed(pool: PgPool) {
        let (org, outlet, product) = seed(&pool).await;
        let svc = service();
        let quotation = svc.create(&pool, org, new_quotation(outlet, product)).await.unwrap();
        sqlx::query("UPDATE quotations SET valid_until = $2 WHERE id = $1")
            .bind(quotation.quotation.id)
            .bind(Utc::now().date_naive() - chrono::Duration::days(1))
            .execute(&pool)
            .await
            .unwrap();

        let err = svc.convert(&pool, org, quotation.quotation.id, cash()).await.unwrap_err();

        assert!(matches!(err, AppError::QuotationClosed(_)));
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales").fetch_one(&pool).await.unwrap();
        assert_eq!(sales, 0);
    }
}
