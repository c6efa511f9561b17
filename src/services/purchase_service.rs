// src/services/purchase_service.rs
//
// Compras, pagamentos a fornecedor, extrato e devoluções.

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::round_money, entity::EntityKind, error::AppError},
    db::SupplierRepository,
    models::{
        inventory::{StockLine, StockMovementReason},
        purchasing::{
            LedgerEntry, LedgerEntryKind, LedgerMovement, Purchase, PurchaseDetail, PurchaseReturnDetail,
            PurchaseReturnListResponse, ReturnableLine, SupplierBalance, SupplierLedger, SupplierPayment,
        },
        sales::PaymentMethod,
    },
    services::{
        entity_validator::EntityValidator,
        inventory_service::{merge_lines, InventoryService},
        sale_calculator::{compute_totals, price_lines, LineInput, PricedLine},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub supplier_id: Uuid,
    pub outlet_id: Uuid,
    pub items: Vec<PurchaseLineInput>,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSupplierPayment {
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub purchase_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
}

/// Extrato com saldo acumulado. Compra soma, pagamento subtrai.
pub fn running_ledger(movements: &[LedgerMovement]) -> (Vec<LedgerEntry>, Decimal) {
    let mut balance = Decimal::ZERO;
    let entries = movements
        .iter()
        .map(|m| {
            let (debit, credit) = match m.kind() {
                LedgerEntryKind::Purchase => (m.amount, Decimal::ZERO),
                LedgerEntryKind::Payment => (Decimal::ZERO, m.amount),
            };
            balance += debit - credit;
            LedgerEntry {
                kind: m.kind(),
                reference_id: m.reference_id,
                occurred_at: m.occurred_at,
                debit,
                credit,
                balance,
            }
        })
        .collect();
    (entries, balance)
}

/// Confere cada linha da devolução contra o que ainda pode voltar e valora
/// pelo custo unitário da compra.
pub fn price_return(
    requested: &[ReturnLineInput],
    returnable: &[ReturnableLine],
) -> Result<(Vec<PricedLine>, Decimal), AppError> {
    let merged = merge_lines(
        &requested
            .iter()
            .map(|r| StockLine { product_id: r.product_id, quantity: r.quantity })
            .collect::<Vec<_>>(),
    );

    let mut lines = Vec::with_capacity(merged.len());
    let mut total = Decimal::ZERO;
    for line in merged {
        let Some(source) = returnable.iter().find(|r| r.product_id == line.product_id) else {
            return Err(AppError::ReturnExceedsPurchased { product_id: line.product_id, returnable: Decimal::ZERO });
        };
        if line.quantity > source.returnable() {
            return Err(AppError::ReturnExceedsPurchased {
                product_id: line.product_id,
                returnable: source.returnable(),
            });
        }
        let line_total = round_money(line.quantity * source.unit_cost);
        total += line_total;
        lines.push(PricedLine {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: source.unit_cost,
            discount_amount: Decimal::ZERO,
            line_total,
        });
    }
    Ok((lines, total))
}

fn stock_lines(lines: &[PricedLine]) -> Vec<StockLine> {
    lines.iter().map(|l| StockLine { product_id: l.product_id, quantity: l.quantity }).collect()
}

#[derive(Clone)]
pub struct PurchaseService {
    supplier_repo: SupplierRepository,
    validator: EntityValidator,
    inventory: InventoryService,
}

impl PurchaseService {
    pub fn new(supplier_repo: SupplierRepository, validator: EntityValidator, inventory: InventoryService) -> Self {
        Self { supplier_repo, validator, inventory }
    }

    // ---
    // Compras
    // ---

    pub async fn create_purchase<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        input: NewPurchase,
    ) -> Result<PurchaseDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if input.items.is_empty() {
            return Err(AppError::InvalidField { field: "items", code: "items_required" });
        }
        let line_inputs: Vec<LineInput> = input
            .items
            .iter()
            .map(|i| LineInput {
                product_id: i.product_id,
                quantity: i.quantity,
                unit_price: i.unit_cost,
                discount_amount: Decimal::ZERO,
            })
            .collect();
        let (lines, subtotal) = price_lines(&line_inputs)?;
        let totals = compute_totals(subtotal, input.discount_amount, Decimal::ZERO, input.tax_rate)?;

        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::Supplier, organization_id, input.supplier_id).await?;
        self.validator.ensure(&mut tx, EntityKind::Outlet, organization_id, input.outlet_id).await?;
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        self.validator.products(&mut tx, organization_id, &product_ids).await?;

        let purchase = self
            .supplier_repo
            .insert_purchase(
                &mut *tx,
                organization_id,
                input.supplier_id,
                input.outlet_id,
                &totals,
                input.notes.as_deref(),
            )
            .await?;
        let items = self.supplier_repo.insert_purchase_items(&mut *tx, purchase.id, &lines).await?;

        self.inventory
            .receive(
                &mut tx,
                organization_id,
                purchase.outlet_id,
                &stock_lines(&lines),
                StockMovementReason::Purchase,
                purchase.id,
            )
            .await?;
        tx.commit().await?;

        tracing::info!("📦 Compra {} registrada: total {}", purchase.id, purchase.total_amount);
        Ok(PurchaseDetail { purchase, items })
    }

    pub async fn list_purchases<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Vec<Purchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.supplier_repo.list_purchases(executor, organization_id, supplier_id).await
    }

    // ---
    // Pagamentos e saldo
    // ---

    /// O fornecedor fica travado durante a conta: dois pagamentos simultâneos
    /// não conseguem, juntos, passar do saldo.
    pub async fn pay_supplier<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        supplier_id: Uuid,
        input: NewSupplierPayment,
    ) -> Result<SupplierPayment, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::InvalidField { field: "amount", code: "positive" });
        }

        let mut tx = executor.begin().await?;
        self.supplier_repo
            .find_for_update(&mut *tx, organization_id, supplier_id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Supplier, id: supplier_id })?;
        if let Some(purchase_id) = input.purchase_id {
            self.supplier_repo
                .find_purchase_for_share(&mut *tx, organization_id, purchase_id)
                .await?
                .filter(|p| p.supplier_id == supplier_id)
                .ok_or(AppError::NotFound { entity: EntityKind::Purchase, id: purchase_id })?;
        }

        let (purchases, payments) = self.supplier_repo.totals(&mut *tx, supplier_id).await?;
        let balance = purchases - payments;
        if input.amount > balance {
            tracing::warn!("Pagamento de {} acima do saldo {} do fornecedor {}", input.amount, balance, supplier_id);
            return Err(AppError::PaymentExceedsBalance { balance });
        }

        let payment = self
            .supplier_repo
            .insert_payment(
                &mut *tx,
                organization_id,
                supplier_id,
                input.purchase_id,
                input.amount,
                input.payment_method,
                input.notes.as_deref(),
            )
            .await?;
        tx.commit().await?;

        tracing::info!("💸 Pagamento de {} ao fornecedor {}", payment.amount, supplier_id);
        Ok(payment)
    }

    pub async fn balance<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<SupplierBalance, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::Supplier, organization_id, supplier_id).await?;
        let (purchases, payments) = self.supplier_repo.totals(&mut *tx, supplier_id).await?;
        tx.commit().await?;
        Ok(SupplierBalance::new(supplier_id, purchases, payments))
    }

    pub async fn ledger<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<SupplierLedger, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::Supplier, organization_id, supplier_id).await?;
        let movements = self.supplier_repo.ledger_movements(&mut *tx, supplier_id).await?;
        tx.commit().await?;

        let (entries, balance) = running_ledger(&movements);
        Ok(SupplierLedger { supplier_id, entries, balance })
    }

    // ---
    // Devoluções
    // ---

    pub async fn create_return<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        purchase_id: Uuid,
        items: Vec<ReturnLineInput>,
        reason: Option<String>,
    ) -> Result<PurchaseReturnDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if items.is_empty() {
            return Err(AppError::InvalidField { field: "items", code: "items_required" });
        }

        let mut tx = executor.begin().await?;
        let purchase = self
            .supplier_repo
            .find_purchase_for_share(&mut *tx, organization_id, purchase_id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Purchase, id: purchase_id })?;

        let returnable = self.supplier_repo.returnable_lines(&mut *tx, purchase.id).await?;
        let (lines, total) = price_return(&items, &returnable).inspect_err(|e| {
            tracing::warn!("Devolução da compra {} recusada: {}", purchase_id, e);
        })?;

        let created = self
            .supplier_repo
            .insert_return(&mut *tx, &purchase, total, reason.as_deref())
            .await?;
        let return_items = self.supplier_repo.insert_return_items(&mut *tx, created.id, &lines).await?;

        self.inventory
            .deduct(
                &mut tx,
                organization_id,
                purchase.outlet_id,
                &stock_lines(&lines),
                StockMovementReason::PurchaseReturn,
                created.id,
            )
            .await?;
        tx.commit().await?;

        tracing::info!("↩️ Devolução {} da compra {}: total {}", created.id, purchase_id, total);
        Ok(PurchaseReturnDetail { purchase_return: created, items: return_items })
    }

    pub async fn list_returns<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        purchase_id: Option<Uuid>,
    ) -> Result<PurchaseReturnListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase_returns = self.supplier_repo.list_returns(executor, organization_id, purchase_id).await?;
        let total = purchase_returns.len() as i64;
        Ok(PurchaseReturnListResponse { purchase_returns, total })
    }

    pub async fn return_detail<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<PurchaseReturnDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        let purchase_return = self
            .supplier_repo
            .find_return(&mut *conn, organization_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Purchase, id })?;
        let items = self.supplier_repo.return_items(&mut *conn, id).await?;
        Ok(PurchaseReturnDetail { purchase_return, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn movement(is_payment: bool, amount: Decimal, minutes: i64) -> LedgerMovement {
        LedgerMovement {
            is_payment,
            reference_id: Uuid::new_v4(),
            amount,
            occurred_at: Utc::now() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn ledger_keeps_running_balance() {
        let movements = vec![
            movement(false, dec!(100), 0),
            movement(true, dec!(30), 1),
            movement(false, dec!(50.50), 2),
            movement(true, dec!(120.50), 3),
        ];

        let (entries, balance) = running_ledger(&movements);

        let balances: Vec<_> = entries.iter().map(|e| e.balance).collect();
        assert_eq!(balances, vec![dec!(100), dec!(70), dec!(120.50), dec!(0)]);
        assert_eq!(balance, Decimal::ZERO);
        assert_eq!(entries[1].credit, dec!(30));
        assert_eq!(entries[1].kind, LedgerEntryKind::Payment);
    }

    #[test]
    fn empty_ledger_has_zero_balance() {
        let (entries, balance) = running_ledger(&[]);
        assert!(entries.is_empty());
        assert_eq!(balance, Decimal::ZERO);
    }

    fn returnable(product_id: Uuid, purchased: Decimal, returned: Decimal) -> ReturnableLine {
        ReturnableLine { product_id, unit_cost: dec!(7.25), purchased, returned }
    }

    #[test]
    fn return_is_bounded_by_what_is_left() {
        let p = Uuid::new_v4();
        let source = [returnable(p, dec!(10), dec!(4))];

        let (lines, total) = price_return(&[ReturnLineInput { product_id: p, quantity: dec!(6) }], &source).unwrap();
        assert_eq!(lines[0].unit_price, dec!(7.25));
        assert_eq!(total, dec!(43.50));

        // Linhas repetidas do mesmo produto contam juntas
        let twice = [
            ReturnLineInput { product_id: p, quantity: dec!(4) },
            ReturnLineInput { product_id: p, quantity: dec!(3) },
        ];
        assert!(matches!(
            price_return(&twice, &source),
            Err(AppError::ReturnExceedsPurchased { returnable, .. }) if returnable == dec!(6)
        ));
    }

    #[test]
    fn product_not_in_purchase_cannot_be_returned() {
        let source = [returnable(Uuid::new_v4(), dec!(1), dec!(0))];
        let other = ReturnLineInput { product_id: Uuid::new_v4(), quantity: dec!(1) };

        assert!(matches!(price_return(&[other], &source), Err(AppError::ReturnExceedsPurchased { .. })));
    }
}

// Escrita atômica contra um banco real: rode com `cargo test -- --ignored` e DATABASE_URL definida.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::{OwnershipRepository, StockRepository};
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    fn service() -> PurchaseService {
        PurchaseService::new(
            SupplierRepository,
            EntityValidator::new(OwnershipRepository),
            InventoryService::new(StockRepository),
        )
    }

    async fn seed(pool: &PgPool) -> (Uuid, Uuid, Uuid, Uuid) {
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
        let supplier: Uuid = sqlx::query_scalar("INSERT INTO suppliers (organization_id, name) VALUES ($1, 'Torrefação') RETURNING id")
            .bind(org)
            .fetch_one(pool)
            .await
            .unwrap();
        (org, outlet, product, supplier)
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
    async fn returns_are_bounded_by_what_is_left_of_the_purchase(pool: PgPool) {
        let (org, outlet, product, supplier) = seed(&pool).await;
        let svc = service();
        let purchase = svc
            .create_purchase(
                &pool,
                org,
                NewPurchase {
                    supplier_id: supplier,
                    outlet_id: outlet,
                    items: vec![PurchaseLineInput { product_id: product, quantity: dec!(5), unit_cost: dec!(4) }],
                    discount_amount: dec!(0),
                    tax_rate: dec!(0),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(stock_of(&pool, product).await, dec!(5));
        let three = vec![ReturnLineInput { product_id: product, quantity: dec!(3) }];

        let first = svc.create_return(&pool, org, purchase.purchase.id, three.clone(), None).await.unwrap();
        assert_eq!(first.purchase_return.total_amount, dec!(12.00));
        assert_eq!(stock_of(&pool, product).await, dec!(2));

        let err = svc.create_return(&pool, org, purchase.purchase.id, three, None).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::ReturnExceedsPurchased { product_id, returnable } if product_id == product && returnable == dec!(2)
        ));
        assert_eq!(stock_of(&pool, product).await, dec!(2));

        let rest = vec![ReturnLineInput { product_id: product, quantity: dec!(2) }];
        svc.create_return(&pool, org, purchase.purchase.id, rest, None).await.unwrap();
        assert_eq!(stock_of(&pool, product).await, dec!(0));
    }
}
