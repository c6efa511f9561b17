// src/models/inventory.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Produtos ---
// Só o que o motor de vendas precisa: categoria (promoções) e preço.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub sku: String,
    #[schema(example = "19.90")]
    pub selling_price: Decimal,
    pub created_at: DateTime<Utc>,
}

// --- 2. Saldo por Ponto de Venda ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub outlet_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub updated_at: DateTime<Utc>,
}

// --- 3. Movimentações de Estoque ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_movement_reason", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockMovementReason {
    Sale,           // Baixa por venda
    SaleReversal,   // Estorno (venda anulada ou removida)
    Purchase,       // Entrada por compra
    PurchaseReturn, // Devolução ao fornecedor
}

/// Linha de estoque a movimentar: produto + quantidade (sempre positiva).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
}
