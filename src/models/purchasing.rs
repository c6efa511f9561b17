// src/models/purchasing.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::sales::PaymentMethod;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub supplier_id: Uuid,
    pub outlet_id: Uuid,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    pub id: Uuid,
    pub purchase_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDetail {
    #[serde(flatten)]
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPayment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub supplier_id: Uuid,
    pub purchase_id: Option<Uuid>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReturn {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub purchase_id: Uuid,
    pub supplier_id: Uuid,
    pub outlet_id: Uuid,
    pub total_amount: Decimal,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReturnItem {
    pub id: Uuid,
    pub purchase_return_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReturnDetail {
    #[serde(flatten)]
    pub purchase_return: PurchaseReturn,
    pub items: Vec<PurchaseReturnItem>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReturnListResponse {
    pub purchase_returns: Vec<PurchaseReturn>,
    pub total: i64,
}

/// Quanto ainda pode ser devolvido de um produto de uma compra.
#[derive(Debug, Clone, FromRow)]
pub struct ReturnableLine {
    pub product_id: Uuid,
    pub unit_cost: Decimal,
    pub purchased: Decimal,
    pub returned: Decimal,
}

impl ReturnableLine {
    pub fn returnable(&self) -> Decimal {
        self.purchased - self.returned
    }
}

// --- Saldo e extrato (sempre derivados) ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierBalance {
    pub supplier_id: Uuid,
    pub total_purchases: Decimal,
    pub total_payments: Decimal,
    pub balance: Decimal,
}

impl SupplierBalance {
    pub fn new(supplier_id: Uuid, total_purchases: Decimal, total_payments: Decimal) -> Self {
        Self {
            supplier_id,
            total_purchases,
            total_payments,
            balance: total_purchases - total_payments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryKind {
    Purchase,
    Payment,
}

/// Movimento cru vindo do banco, antes do saldo acumulado.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerMovement {
    pub is_payment: bool,
    pub reference_id: Uuid,
    pub amount: Decimal,
    pub occurred_at: DateTime<Utc>,
}

impl LedgerMovement {
    pub fn kind(&self) -> LedgerEntryKind {
        if self.is_payment { LedgerEntryKind::Payment } else { LedgerEntryKind::Purchase }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub kind: LedgerEntryKind,
    pub reference_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    // Compra aumenta a dívida, pagamento reduz
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierLedger {
    pub supplier_id: Uuid,
    pub entries: Vec<LedgerEntry>,
    pub balance: Decimal,
}
