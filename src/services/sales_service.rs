// src/services/sales_service.rs

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::{sales_repo::SaleHeader, PromotionRepository, SalesRepository},
    models::{
        inventory::{StockLine, StockMovementReason},
        sales::{PaymentMethod, Sale, SaleDetail, SaleFilter, SaleItem, SaleListResponse, SaleStatus},
    },
    services::{
        entity_validator::EntityValidator,
        installment_service::{split_plan, InstallmentService},
        inventory_service::InventoryService,
        promotion_engine::{EligibleItem, PromotionOutcome, PromotionRef, PromotionService},
        sale_calculator::{compute_totals, price_lines, LineInput, PricedLine},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentPlanInput {
    pub count: u32,
    pub first_due_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub outlet_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub items: Vec<LineInput>,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub promotion: Option<PromotionRef>,
    pub status: SaleStatus,
    pub installment_plan: Option<InstallmentPlanInput>,
}

/// Campos ausentes ficam como estão.
#[derive(Debug, Clone, Default)]
pub struct SaleUpdate {
    pub customer_id: Option<Uuid>,
    pub items: Option<Vec<LineInput>>,
    pub discount_amount: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub status: Option<SaleStatus>,
}

impl SaleUpdate {
    fn reprices(&self) -> bool {
        self.items.is_some() || self.discount_amount.is_some() || self.tax_rate.is_some()
    }
}

fn stock_lines_of_priced(lines: &[PricedLine]) -> Vec<StockLine> {
    lines.iter().map(|l| StockLine { product_id: l.product_id, quantity: l.quantity }).collect()
}

fn stock_lines_of_items(items: &[SaleItem]) -> Vec<StockLine> {
    items.iter().map(|i| StockLine { product_id: i.product_id, quantity: i.quantity }).collect()
}

/// O que fazer com o estoque numa atualização: (estornar o antigo, baixar o novo).
pub fn stock_plan(from: SaleStatus, to: SaleStatus, items_replaced: bool) -> (bool, bool) {
    let (held, will_hold) = (from.holds_stock(), to.holds_stock());
    let restore_old = held && (items_replaced || !will_hold);
    let deduct_new = will_hold && (items_replaced || !held);
    (restore_old, deduct_new)
}

fn invalid_transition(from: SaleStatus, to: SaleStatus) -> AppError {
    AppError::InvalidTransition {
        entity: EntityKind::Sale,
        from: from.as_str().to_string(),
        to: to.as_str().to_string(),
    }
}

#[derive(Clone)]
pub struct SalesService {
    sales_repo: SalesRepository,
    promotion_repo: PromotionRepository,
    validator: EntityValidator,
    inventory: InventoryService,
    promotions: PromotionService,
    installments: InstallmentService,
}

impl SalesService {
    pub fn new(
        sales_repo: SalesRepository,
        promotion_repo: PromotionRepository,
        validator: EntityValidator,
        inventory: InventoryService,
        promotions: PromotionService,
        installments: InstallmentService,
    ) -> Self {
        Self { sales_repo, promotion_repo, validator, inventory, promotions, installments }
    }

    // ---
    // Criação
    // ---

    pub async fn create<'e, E>(&self, executor: E, organization_id: Uuid, input: NewSale) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let detail = self.create_in_tx(&mut tx, organization_id, input).await?;
        tx.commit().await?;

        tracing::info!(
            "🛒 Venda {} registrada: total {} ({})",
            detail.sale.id,
            detail.sale.total_amount,
            detail.sale.status.as_str()
        );
        Ok(detail)
    }

    /// Cabeçalho, itens, resgate, estoque e parcelas na transação de quem chama.
    /// A conversão de orçamento usa este mesmo caminho.
    pub async fn create_in_tx(
        &self,
        conn: &mut PgConnection,
        organization_id: Uuid,
        input: NewSale,
    ) -> Result<SaleDetail, AppError> {
        if input.items.is_empty() {
            return Err(AppError::InvalidField { field: "items", code: "items_required" });
        }
        if input.status == SaleStatus::Voided {
            return Err(AppError::InvalidField { field: "status", code: "sale_status" });
        }
        let (lines, subtotal) = price_lines(&input.items)?;

        // 1. Referências (travadas até o commit)
        self.validator.ensure(&mut *conn, EntityKind::Outlet, organization_id, input.outlet_id).await?;
        self.validator
            .ensure_opt(&mut *conn, EntityKind::Customer, organization_id, input.customer_id)
            .await?;
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let products = self.validator.products(&mut *conn, organization_id, &product_ids).await?;

        // 2. Promoção, avaliada sobre o subtotal antes do imposto
        let (promotion_id, promotion_discount) = match &input.promotion {
            Some(reference) => {
                let items: Vec<EligibleItem> = products
                    .iter()
                    .map(|p| EligibleItem { product_id: p.id, category_id: p.category_id })
                    .collect();
                match self
                    .promotions
                    .evaluate_in_tx(&mut *conn, organization_id, reference, input.customer_id, subtotal, &items)
                    .await?
                {
                    PromotionOutcome::Applied { promotion, discount_amount } => (Some(promotion.id), discount_amount),
                    PromotionOutcome::Rejected(reason) => return Err(AppError::PromotionRejected(reason)),
                }
            }
            None => (None, Decimal::ZERO),
        };

        let totals = compute_totals(subtotal, input.discount_amount, promotion_discount, input.tax_rate)?;
        let plan = match input.installment_plan {
            Some(p) => Some(split_plan(totals.total_amount, p.count, p.first_due_date)?),
            None => None,
        };

        // 3. Gravação
        let header = SaleHeader {
            outlet_id: input.outlet_id,
            customer_id: input.customer_id,
            promotion_id,
            totals,
            payment_method: input.payment_method,
            status: input.status,
            notes: input.notes,
        };
        let sale = self.sales_repo.insert(&mut *conn, organization_id, &header).await?;
        let items = self.sales_repo.insert_items(&mut *conn, sale.id, &lines).await?;

        if let Some(promotion_id) = promotion_id {
            self.promotion_repo
                .record_redemption(&mut *conn, organization_id, promotion_id, sale.customer_id, sale.id, promotion_discount)
                .await?;
        }

        if sale.status.holds_stock() {
            self.inventory
                .deduct(
                    &mut *conn,
                    organization_id,
                    sale.outlet_id,
                    &stock_lines_of_priced(&lines),
                    StockMovementReason::Sale,
                    sale.id,
                )
                .await?;
        }

        if let Some(plan) = plan {
            self.installments
                .create_plan_in_tx(&mut *conn, organization_id, Some(sale.id), sale.customer_id, &plan)
                .await?;
        }

        Ok(SaleDetail { sale, items })
    }

    // ---
    // Atualização
    // ---

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        update: SaleUpdate,
    ) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let mut sale = self
            .sales_repo
            .find_for_update(&mut *tx, organization_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Sale, id })?;

        let from = sale.status;
        let to = update.status.unwrap_or(from);
        if !from.can_transition_to(to) {
            tracing::warn!("Venda {}: transição {} -> {} recusada", id, from.as_str(), to.as_str());
            return Err(invalid_transition(from, to));
        }

        let previous_total = sale.total_amount;
        let previous_customer = sale.customer_id;

        if let Some(customer_id) = update.customer_id {
            if sale.customer_id != Some(customer_id) {
                self.validator.ensure(&mut tx, EntityKind::Customer, organization_id, customer_id).await?;
                sale.customer_id = Some(customer_id);
            }
        }

        let old_items = self.sales_repo.items(&mut *tx, sale.id).await?;
        let new_lines = match &update.items {
            Some(items) if items.is_empty() => {
                return Err(AppError::InvalidField { field: "items", code: "items_required" });
            }
            Some(items) => {
                let (lines, subtotal) = price_lines(items)?;
                let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
                self.validator.products(&mut tx, organization_id, &ids).await?;
                Some((lines, subtotal))
            }
            None => None,
        };

        // Totais só mudam se itens, desconto ou imposto vieram; o desconto da promoção é mantido
        if update.reprices() {
            let subtotal = new_lines.as_ref().map(|(_, s)| *s).unwrap_or(sale.subtotal);
            let header_discount = update
                .discount_amount
                .unwrap_or(sale.discount_amount - sale.promotion_discount);
            let tax_rate = update.tax_rate.unwrap_or(sale.tax_rate);
            let totals = compute_totals(subtotal, header_discount, sale.promotion_discount, tax_rate)?;
            sale.subtotal = totals.subtotal;
            sale.discount_amount = totals.discount_amount;
            sale.tax_rate = totals.tax_rate;
            sale.tax_amount = totals.tax_amount;
            sale.total_amount = totals.total_amount;
        }

        // Estoque: estorna o que estava baixado e baixa o que passa a valer
        let (restore_old, deduct_new) = stock_plan(from, to, new_lines.is_some());
        if restore_old {
            self.inventory
                .receive(
                    &mut tx,
                    organization_id,
                    sale.outlet_id,
                    &stock_lines_of_items(&old_items),
                    StockMovementReason::SaleReversal,
                    sale.id,
                )
                .await?;
        }
        let items = match &new_lines {
            Some((lines, _)) => {
                self.sales_repo.delete_items(&mut *tx, sale.id).await?;
                self.sales_repo.insert_items(&mut *tx, sale.id, lines).await?
            }
            None => old_items,
        };
        if deduct_new {
            self.inventory
                .deduct(
                    &mut tx,
                    organization_id,
                    sale.outlet_id,
                    &stock_lines_of_items(&items),
                    StockMovementReason::Sale,
                    sale.id,
                )
                .await?;
        }

        if let Some(method) = update.payment_method {
            sale.payment_method = method;
        }
        if update.notes.is_some() {
            sale.notes = update.notes;
        }
        sale.status = to;

        let sale = self.sales_repo.update(&mut *tx, &sale, Utc::now()).await?;

        // Parcelas e resgate seguem a venda na mesma transação
        self.installments
            .follow_sale_in_tx(&mut tx, &sale, previous_total, previous_customer)
            .await?;
        if let Some(customer_id) = sale.customer_id.filter(|c| Some(*c) != previous_customer) {
            if sale.promotion_id.is_some() {
                self.promotion_repo.reassign_redemptions(&mut *tx, sale.id, customer_id).await?;
            }
        }
        tx.commit().await?;

        tracing::info!("✏️ Venda {} atualizada ({} -> {})", id, from.as_str(), to.as_str());
        Ok(SaleDetail { sale, items })
    }

    // ---
    // Remoção
    // ---

    /// Remoção física; itens, resgates e parcelas saem em cascata.
    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let sale = self
            .sales_repo
            .find_for_update(&mut *tx, organization_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Sale, id })?;

        if sale.status.holds_stock() {
            let items = self.sales_repo.items(&mut *tx, sale.id).await?;
            self.inventory
                .receive(
                    &mut tx,
                    organization_id,
                    sale.outlet_id,
                    &stock_lines_of_items(&items),
                    StockMovementReason::SaleReversal,
                    sale.id,
                )
                .await?;
        }

        self.sales_repo.delete(&mut *tx, sale.id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Venda {} removida", id);
        Ok(())
    }

    // ---
    // Consulta
    // ---

    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        filter: &SaleFilter,
    ) -> Result<SaleListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sales: Vec<Sale> = self.sales_repo.list(executor, organization_id, filter).await?;
        let total = sales.len() as i64;
        Ok(SaleListResponse { sales, total })
    }

    pub async fn detail<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<SaleDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        let sale = self
            .sales_repo
            .find(&mut *conn, organization_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Sale, id })?;
        let items = self.sales_repo.items(&mut *conn, sale.id).await?;
        Ok(SaleDetail { sale, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SaleStatus::*;

    #[test]
    fn stock_follows_status_changes() {
        // (estorna antigo, baixa novo)
        assert_eq!(stock_plan(Draft, Completed, false), (false, true));
        assert_eq!(stock_plan(Completed, Voided, false), (true, false));
        assert_eq!(stock_plan(Draft, Voided, false), (false, false));
        assert_eq!(stock_plan(Completed, Completed, false), (false, false));
        assert_eq!(stock_plan(Draft, Draft, true), (false, false));
    }

    #[test]
    fn replacing_items_of_completed_sale_swaps_stock() {
        assert_eq!(stock_plan(Completed, Completed, true), (true, true));
        // Itens trocados e venda anulada: só estorna
        assert_eq!(stock_plan(Completed, Voided, true), (true, false));
        assert_eq!(stock_plan(Draft, Completed, true), (false, true));
    }

    #[test]
    fn voided_sale_cannot_change() {
        let err = invalid_transition(Voided, Completed);
        assert!(matches!(err, AppError::InvalidTransition { entity: EntityKind::Sale, .. }));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }
}

// Escrita atômica contra um banco real: rode com `cargo test -- --ignored` e DATABASE_URL definida.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::{CustomerRepository, InstallmentRepository, OwnershipRepository, StockRepository};
    use crate::models::promotion::PromotionRejection;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    fn service() -> SalesService {
        let validator = EntityValidator::new(OwnershipRepository);
        SalesService::new(
            SalesRepository,
            PromotionRepository,
            validator.clone(),
            InventoryService::new(StockRepository),
            PromotionService::new(PromotionRepository, CustomerRepository, validator.clone()),
            InstallmentService::new(InstallmentRepository, validator),
        )
    }

    async fn seed(pool: &PgPool, stock: Decimal) -> (Uuid, Uuid, Uuid) {
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
        sqlx::query("INSERT INTO product_stocks (organization_id, outlet_id, product_id, quantity) VALUES ($1, $2, $3, $4)")
            .bind(org)
            .bind(outlet)
            .bind(product)
            .bind(stock)
            .execute(pool)
            .await
            .unwrap();
        (org, outlet, product)
    }

    fn new_sale(outlet: Uuid, product: Uuid, quantity: Decimal) -> NewSale {
        NewSale {
            outlet_id: outlet,
            customer_id: None,
            items: vec![LineInput { product_id: product, quantity, unit_price: dec!(10), discount_amount: dec!(0) }],
            discount_amount: dec!(0),
            tax_rate: dec!(0.1),
            payment_method: PaymentMethod::Cash,
            notes: None,
            promotion: None,
            status: SaleStatus::Completed,
            installment_plan: None,
        }
    }

    async fn stock_of(pool: &PgPool, product: Uuid) -> Decimal {
        sqlx::query_scalar("SELECT quantity FROM product_stocks WHERE product_id = $1")
            .bind(product)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn completed_sale_deducts_stock_and_writes_movement(pool: PgPool) {
        let (org, outlet, product) = seed(&pool, dec!(5)).await;

        let detail = service().create(&pool, org, new_sale(outlet, product, dec!(2))).await.unwrap();

        assert_eq!(detail.sale.total_amount, dec!(22.00));
        assert_eq!(stock_of(&pool, product).await, dec!(3));
        let movements: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stock_movements WHERE reference_id = $1")
            .bind(detail.sale.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(movements, 1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn insufficient_stock_rolls_back_everything(pool: PgPool) {
        let (org, outlet, product) = seed(&pool, dec!(1)).await;

        let err = service().create(&pool, org, new_sale(outlet, product, dec!(2))).await.unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { .. }));
        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales").fetch_one(&pool).await.unwrap();
        assert_eq!(sales, 0);
        assert_eq!(stock_of(&pool, product).await, dec!(1));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn voiding_restores_stock(pool: PgPool) {
        let (org, outlet, product) = seed(&pool, dec!(5)).await;
        let svc = service();
        let detail = svc.create(&pool, org, new_sale(outlet, product, dec!(2))).await.unwrap();

        let update = SaleUpdate { status: Some(SaleStatus::Voided), ..Default::default() };
        let voided = svc.update(&pool, org, detail.sale.id, update).await.unwrap();

        assert_eq!(voided.sale.status, SaleStatus::Voided);
        assert_eq!(stock_of(&pool, product).await, dec!(5));

        let again = SaleUpdate { status: Some(SaleStatus::Completed), ..Default::default() };
        assert!(matches!(
            svc.update(&pool, org, detail.sale.id, again).await,
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn outlet_of_another_organization_is_not_found(pool: PgPool) {
        let (_, outlet, product) = seed(&pool, dec!(5)).await;
        let other: Uuid = sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ('Outra', 'outra') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

        let err = service().create(&pool, other, new_sale(outlet, product, dec!(1))).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound { entity: EntityKind::Outlet, .. }));
    }

    async fn seed_customer(pool: &PgPool, org: Uuid, name: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO customers (organization_id, name) VALUES ($1, $2) RETURNING id")
            .bind(org)
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_promotion(pool: &PgPool, org: Uuid, code: &str, limit_per_customer: Option<i32>) -> Uuid {
        sqlx::query_scalar(
            r#"
            INSERT INTO promotions (organization_id, name, code, discount, start_date, end_date, limit_per_customer)
            VALUES ($1, 'Cupom', $2, 5, NOW() - INTERVAL '1 day', NOW() + INTERVAL '30 days', $3)
            RETURNING id
            "#,
        )
        .bind(org)
        .bind(code)
        .bind(limit_per_customer)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    async fn installments_of(pool: &PgPool, sale: Uuid) -> Vec<(Decimal, bool, Option<Uuid>)> {
        sqlx::query_as("SELECT amount, paid, customer_id FROM installments WHERE sale_id = $1 ORDER BY sequence")
            .bind(sale)
            .fetch_all(pool)
            .await
            .unwrap()
    }

    fn with_plan(mut sale: NewSale, count: u32) -> NewSale {
        let first_due_date = Utc::now().date_naive() + chrono::Duration::days(30);
        sale.installment_plan = Some(InstallmentPlanInput { count, first_due_date });
        sale
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn promotion_code_is_resolved_and_limit_counts_redemptions(pool: PgPool) {
        let (org, outlet, product) = seed(&pool, dec!(10)).await;
        let customer = seed_customer(&pool, org, "Ana").await;
        let promotion = seed_promotion(&pool, org, "BEMVINDO", Some(1)).await;
        let svc = service();
        let with_code = |code: &str| NewSale {
            customer_id: Some(customer),
            promotion: Some(PromotionRef::Code(code.into())),
            ..new_sale(outlet, product, dec!(2))
        };

        let first = svc.create(&pool, org, with_code("BEMVINDO")).await.unwrap();

        assert_eq!(first.sale.promotion_id, Some(promotion));
        assert_eq!(first.sale.promotion_discount, dec!(5.00));
        assert_eq!(first.sale.total_amount, dec!(16.50));
        let redemptions: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM promotion_redemptions WHERE promotion_id = $1 AND customer_id = $2",
        )
        .bind(promotion)
        .bind(customer)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(redemptions, 1);

        let err = svc.create(&pool, org, with_code("BEMVINDO")).await.unwrap_err();
        assert!(matches!(err, AppError::PromotionRejected(PromotionRejection::UsageLimitReached)));

        let err = svc.create(&pool, org, with_code("NAOEXISTE")).await.unwrap_err();
        assert!(matches!(err, AppError::PromotionCodeNotFound(code) if code == "NAOEXISTE"));
        // Recusas não deixam venda nem baixa de estoque para trás
        assert_eq!(stock_of(&pool, product).await, dec!(8));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn repricing_resplits_open_installments(pool: PgPool) {
        let (org, outlet, product) = seed(&pool, dec!(5)).await;
        let svc = service();
        let detail = svc.create(&pool, org, with_plan(new_sale(outlet, product, dec!(2)), 2)).await.unwrap();
        let amounts: Vec<Decimal> = installments_of(&pool, detail.sale.id).await.iter().map(|i| i.0).collect();
        assert_eq!(amounts, vec![dec!(11.00), dec!(11.00)]);

        let update = SaleUpdate { discount_amount: Some(dec!(2)), ..Default::default() };
        let updated = svc.update(&pool, org, detail.sale.id, update).await.unwrap();

        assert_eq!(updated.sale.total_amount, dec!(19.80));
        let amounts: Vec<Decimal> = installments_of(&pool, detail.sale.id).await.iter().map(|i| i.0).collect();
        assert_eq!(amounts, vec![dec!(9.90), dec!(9.90)]);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn repricing_a_fully_paid_plan_is_a_conflict(pool: PgPool) {
        let (org, outlet, product) = seed(&pool, dec!(5)).await;
        let svc = service();
        let detail = svc.create(&pool, org, with_plan(new_sale(outlet, product, dec!(2)), 1)).await.unwrap();
        sqlx::query("UPDATE installments SET paid = TRUE, paid_date = NOW(), status = 'PAID' WHERE sale_id = $1")
            .bind(detail.sale.id)
            .execute(&pool)
            .await
            .unwrap();

        let update = SaleUpdate { discount_amount: Some(dec!(2)), ..Default::default() };
        let err = svc.update(&pool, org, detail.sale.id, update).await.unwrap_err();

        assert!(matches!(err, AppError::InstallmentPlanSettled(id) if id == detail.sale.id));
        let total: Decimal = sqlx::query_scalar("SELECT total_amount FROM sales WHERE id = $1")
            .bind(detail.sale.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, dec!(22.00));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn voiding_drops_unpaid_installments_and_keeps_paid_ones(pool: PgPool) {
        let (org, outlet, product) = seed(&pool, dec!(5)).await;
        let svc = service();
        let detail = svc.create(&pool, org, with_plan(new_sale(outlet, product, dec!(2)), 2)).await.unwrap();
        sqlx::query(
            "UPDATE installments SET paid = TRUE, paid_date = NOW(), status = 'PAID' WHERE sale_id = $1 AND sequence = 1",
        )
        .bind(detail.sale.id)
        .execute(&pool)
        .await
        .unwrap();

        let update = SaleUpdate { status: Some(SaleStatus::Voided), ..Default::default() };
        svc.update(&pool, org, detail.sale.id, update).await.unwrap();

        let left = installments_of(&pool, detail.sale.id).await;
        assert_eq!(left.len(), 1);
        assert!(left[0].1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn customer_change_moves_installments_and_redemption(pool: PgPool) {
        let (org, outlet, product) = seed(&pool, dec!(5)).await;
        let ana = seed_customer(&pool, org, "Ana").await;
        let bia = seed_customer(&pool, org, "Bia").await;
        seed_promotion(&pool, org, "BEMVINDO", None).await;
        let svc = service();
        let input = NewSale {
            customer_id: Some(ana),
            promotion: Some(PromotionRef::Code("BEMVINDO".into())),
            ..with_plan(new_sale(outlet, product, dec!(2)), 2)
        };
        let detail = svc.create(&pool, org, input).await.unwrap();

        let update = SaleUpdate { customer_id: Some(bia), ..Default::default() };
        let updated = svc.update(&pool, org, detail.sale.id, update).await.unwrap();

        assert_eq!(updated.sale.customer_id, Some(bia));
        assert!(installments_of(&pool, detail.sale.id).await.iter().all(|i| i.2 == Some(bia)));
        let redeemed_by: Option<Uuid> =
            sqlx::query_scalar("SELECT customer_id FROM promotion_redemptions WHERE sale_id = $1")
                .bind(detail.sale.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(redeemed_by, Some(bia));
    }
}
