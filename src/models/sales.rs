// src/models/sales.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobilePayment,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "sale_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Draft,
    Completed,
    Voided,
}

impl SaleStatus {
    /// Só vendas concluídas estão com o estoque baixado.
    pub fn holds_stock(self) -> bool {
        self == SaleStatus::Completed
    }

    /// Tabela de transições. Anulada é terminal e concluída não volta a rascunho.
    pub fn can_transition_to(self, next: SaleStatus) -> bool {
        use SaleStatus::*;
        match (self, next) {
            (Voided, _) | (Completed, Draft) => false,
            (Draft, _) | (Completed, Completed) | (Completed, Voided) => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SaleStatus::Draft => "DRAFT",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Voided => "VOIDED",
        }
    }
}

// --- Vendas ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub outlet_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub promotion_id: Option<Uuid>,
    pub subtotal: Decimal,
    // Desconto do cabeçalho + desconto da promoção
    pub discount_amount: Decimal,
    pub promotion_discount: Decimal,
    #[schema(example = "0.10")]
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: Uuid,
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaleListResponse {
    pub sales: Vec<Sale>,
    pub total: i64,
}

// Filtros da listagem de vendas
#[derive(Debug, Default, Clone)]
pub struct SaleFilter {
    pub status: Option<SaleStatus>,
    pub outlet_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// --- Orçamentos ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "quotation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuotationStatus {
    Open,
    Converted,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub outlet_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub status: QuotationStatus,
    pub valid_until: Option<NaiveDate>,
    pub converted_sale_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quotation {
    /// Orçamento aberto e dentro da validade (o último dia ainda vale).
    pub fn is_convertible_on(&self, today: NaiveDate) -> bool {
        self.status == QuotationStatus::Open && self.valid_until.is_none_or(|d| today <= d)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotationItem {
    pub id: Uuid,
    pub quotation_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotationDetail {
    #[serde(flatten)]
    pub quotation: Quotation,
    pub items: Vec<QuotationItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuotationListResponse {
    pub quotations: Vec<Quotation>,
    pub total: i64,
}

// --- Relatório diário ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesByDay {
    pub day: NaiveDate,
    pub sales_count: i64,
    pub total_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use SaleStatus::*;

    #[test]
    fn sale_status_transition_table() {
        assert!(Draft.can_transition_to(Completed));
        assert!(Draft.can_transition_to(Voided));
        assert!(Draft.can_transition_to(Draft));
        assert!(Completed.can_transition_to(Voided));
        assert!(Completed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Draft));
        for next in [Draft, Completed, Voided] {
            assert!(!Voided.can_transition_to(next));
        }
    }

    #[test]
    fn quotation_expires_after_valid_until() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 6, day).unwrap();
        let q = Quotation {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            outlet_id: Uuid::new_v4(),
            customer_id: None,
            subtotal: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            status: QuotationStatus::Open,
            valid_until: Some(d(10)),
            converted_sale_id: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(q.is_convertible_on(d(10)));
        assert!(!q.is_convertible_on(d(11)));
        assert!(!Quotation { status: QuotationStatus::Converted, ..q }.is_convertible_on(d(1)));
    }
}
