// src/db/supplier_repo.rs
//
// Fornecedores, compras, pagamentos e devoluções.

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        purchasing::{
            LedgerMovement, Purchase, PurchaseItem, PurchaseReturn, PurchaseReturnItem, ReturnableLine,
            Supplier, SupplierPayment,
        },
        sales::PaymentMethod,
    },
    services::sale_calculator::{PricedLine, Totals},
};

#[derive(Clone, Default)]
pub struct SupplierRepository;

impl SupplierRepository {
    // ---
    // Fornecedor
    // ---

    /// Trava o fornecedor: pagamentos concorrentes do mesmo fornecedor ficam em fila.
    pub async fn find_for_update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Supplier>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(supplier)
    }

    /// (Σ compras, Σ pagamentos). Saldo nunca é gravado.
    pub async fn totals<'e, E>(&self, executor: E, supplier_id: Uuid) -> Result<(Decimal, Decimal), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT
                COALESCE((SELECT SUM(total_amount) FROM purchases WHERE supplier_id = $1), 0),
                COALESCE((SELECT SUM(amount) FROM supplier_payments WHERE supplier_id = $1), 0)
            "#,
        )
        .bind(supplier_id)
        .fetch_one(executor)
        .await?;
        Ok(totals)
    }

    /// Compras e pagamentos em ordem cronológica, para o extrato.
    pub async fn ledger_movements<'e, E>(
        &self,
        executor: E,
        supplier_id: Uuid,
    ) -> Result<Vec<LedgerMovement>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movements = sqlx::query_as::<_, LedgerMovement>(
            r#"
            SELECT FALSE AS is_payment, id AS reference_id, total_amount AS amount, created_at AS occurred_at
            FROM purchases WHERE supplier_id = $1
            UNION ALL
            SELECT TRUE, id, amount, paid_at
            FROM supplier_payments WHERE supplier_id = $1
            ORDER BY occurred_at, is_payment
            "#,
        )
        .bind(supplier_id)
        .fetch_all(executor)
        .await?;
        Ok(movements)
    }

    // ---
    // Compras
    // ---

    pub async fn list_purchases<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<Vec<Purchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchases = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE organization_id = $1 AND supplier_id = $2 ORDER BY created_at DESC",
        )
        .bind(organization_id)
        .bind(supplier_id)
        .fetch_all(executor)
        .await?;
        Ok(purchases)
    }

    pub async fn find_purchase_for_share<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Purchase>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE id = $1 AND organization_id = $2 FOR SHARE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(purchase)
    }

    pub async fn insert_purchase<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        supplier_id: Uuid,
        outlet_id: Uuid,
        totals: &Totals,
        notes: Option<&str>,
    ) -> Result<Purchase, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            INSERT INTO purchases (
                organization_id, supplier_id, outlet_id, subtotal, discount_amount,
                tax_rate, tax_amount, total_amount, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(supplier_id)
        .bind(outlet_id)
        .bind(totals.subtotal)
        .bind(totals.discount_amount)
        .bind(totals.tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.total_amount)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(purchase)
    }

    /// `unit_price` da linha precificada é o custo unitário da compra.
    pub async fn insert_purchase_items<'e, E>(
        &self,
        executor: E,
        purchase_id: Uuid,
        lines: &[PricedLine],
    ) -> Result<Vec<PurchaseItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let quantities: Vec<_> = lines.iter().map(|l| l.quantity).collect();
        let unit_costs: Vec<_> = lines.iter().map(|l| l.unit_price).collect();
        let totals: Vec<_> = lines.iter().map(|l| l.line_total).collect();

        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            INSERT INTO purchase_items (purchase_id, product_id, quantity, unit_cost, line_total)
            SELECT $1, * FROM UNNEST($2::uuid[], $3::numeric[], $4::numeric[], $5::numeric[])
            RETURNING *
            "#,
        )
        .bind(purchase_id)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&unit_costs)
        .bind(&totals)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn purchase_items<'e, E>(&self, executor: E, purchase_id: Uuid) -> Result<Vec<PurchaseItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE purchase_id = $1 ORDER BY id",
        )
        .bind(purchase_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    // ---
    // Pagamentos
    // ---

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_payment<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        supplier_id: Uuid,
        purchase_id: Option<Uuid>,
        amount: Decimal,
        payment_method: PaymentMethod,
        notes: Option<&str>,
    ) -> Result<SupplierPayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, SupplierPayment>(
            r#"
            INSERT INTO supplier_payments (organization_id, supplier_id, purchase_id, amount, payment_method, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(supplier_id)
        .bind(purchase_id)
        .bind(amount)
        .bind(payment_method)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(payment)
    }

    // ---
    // Devoluções
    // ---

    /// Por produto da compra: custo, quantidade comprada e quanto já voltou.
    pub async fn returnable_lines<'e, E>(
        &self,
        executor: E,
        purchase_id: Uuid,
    ) -> Result<Vec<ReturnableLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, ReturnableLine>(
            r#"
            SELECT pi.product_id,
                   MAX(pi.unit_cost) AS unit_cost,
                   SUM(pi.quantity) AS purchased,
                   COALESCE((
                       SELECT SUM(ri.quantity)
                       FROM purchase_return_items ri
                       JOIN purchase_returns r ON r.id = ri.purchase_return_id
                       WHERE r.purchase_id = $1 AND ri.product_id = pi.product_id
                   ), 0) AS returned
            FROM purchase_items pi
            WHERE pi.purchase_id = $1
            GROUP BY pi.product_id
            "#,
        )
        .bind(purchase_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn list_returns<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        purchase_id: Option<Uuid>,
    ) -> Result<Vec<PurchaseReturn>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let returns = sqlx::query_as::<_, PurchaseReturn>(
            r#"
            SELECT * FROM purchase_returns
            WHERE organization_id = $1 AND ($2::uuid IS NULL OR purchase_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(purchase_id)
        .fetch_all(executor)
        .await?;
        Ok(returns)
    }

    pub async fn find_return<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PurchaseReturn>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let found = sqlx::query_as::<_, PurchaseReturn>(
            "SELECT * FROM purchase_returns WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(found)
    }

    pub async fn return_items<'e, E>(
        &self,
        executor: E,
        purchase_return_id: Uuid,
    ) -> Result<Vec<PurchaseReturnItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, PurchaseReturnItem>(
            "SELECT * FROM purchase_return_items WHERE purchase_return_id = $1 ORDER BY id",
        )
        .bind(purchase_return_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn insert_return<'e, E>(
        &self,
        executor: E,
        purchase: &Purchase,
        total_amount: Decimal,
        reason: Option<&str>,
    ) -> Result<PurchaseReturn, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, PurchaseReturn>(
            r#"
            INSERT INTO purchase_returns (organization_id, purchase_id, supplier_id, outlet_id, total_amount, reason)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(purchase.organization_id)
        .bind(purchase.id)
        .bind(purchase.supplier_id)
        .bind(purchase.outlet_id)
        .bind(total_amount)
        .bind(reason)
        .fetch_one(executor)
        .await?;
        Ok(created)
    }

    pub async fn insert_return_items<'e, E>(
        &self,
        executor: E,
        purchase_return_id: Uuid,
        lines: &[PricedLine],
    ) -> Result<Vec<PurchaseReturnItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
        let quantities: Vec<_> = lines.iter().map(|l| l.quantity).collect();
        let unit_costs: Vec<_> = lines.iter().map(|l| l.unit_price).collect();
        let totals: Vec<_> = lines.iter().map(|l| l.line_total).collect();

        let items = sqlx::query_as::<_, PurchaseReturnItem>(
            r#"
            INSERT INTO purchase_return_items (purchase_return_id, product_id, quantity, unit_cost, line_total)
            SELECT $1, * FROM UNNEST($2::uuid[], $3::numeric[], $4::numeric[], $5::numeric[])
            RETURNING *
            "#,
        )
        .bind(purchase_return_id)
        .bind(&product_ids)
        .bind(&quantities)
        .bind(&unit_costs)
        .bind(&totals)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }
}
