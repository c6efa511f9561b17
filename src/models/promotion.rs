// src/models/promotion.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    // Percentual (0-100) ou valor fixo, conforme `is_percentage`
    pub discount: Decimal,
    pub is_percentage: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub min_purchase_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub limit_per_customer: Option<i32>,
    pub product_ids: Vec<Uuid>,
    pub category_ids: Vec<Uuid>,
    pub customer_group_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Promotion {
    /// Ativa entre as datas, bordas inclusas. Nunca é gravado.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.end_date
    }
}

/// Campos graváveis de uma promoção (criação e atualização).
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionInput {
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount: Decimal,
    pub is_percentage: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub min_purchase_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub limit_per_customer: Option<i32>,
    pub product_ids: Vec<Uuid>,
    pub category_ids: Vec<Uuid>,
    pub customer_group_ids: Vec<Uuid>,
}

impl From<Promotion> for PromotionInput {
    fn from(p: Promotion) -> Self {
        Self {
            name: p.name,
            code: p.code,
            description: p.description,
            discount: p.discount,
            is_percentage: p.is_percentage,
            start_date: p.start_date,
            end_date: p.end_date,
            min_purchase_amount: p.min_purchase_amount,
            max_discount_amount: p.max_discount_amount,
            limit_per_customer: p.limit_per_customer,
            product_ids: p.product_ids,
            category_ids: p.category_ids,
            customer_group_ids: p.customer_group_ids,
        }
    }
}

/// Atualização parcial: campo ausente mantém o valor atual.
#[derive(Debug, Clone, Default)]
pub struct PromotionPatch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount: Option<Decimal>,
    pub is_percentage: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub min_purchase_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    pub limit_per_customer: Option<i32>,
    pub product_ids: Option<Vec<Uuid>>,
    pub category_ids: Option<Vec<Uuid>>,
    pub customer_group_ids: Option<Vec<Uuid>>,
}

impl PromotionPatch {
    pub fn apply_to(self, current: Promotion) -> PromotionInput {
        let base = PromotionInput::from(current);
        PromotionInput {
            name: self.name.unwrap_or(base.name),
            code: self.code.or(base.code),
            description: self.description.or(base.description),
            discount: self.discount.unwrap_or(base.discount),
            is_percentage: self.is_percentage.unwrap_or(base.is_percentage),
            start_date: self.start_date.unwrap_or(base.start_date),
            end_date: self.end_date.unwrap_or(base.end_date),
            min_purchase_amount: self.min_purchase_amount.or(base.min_purchase_amount),
            max_discount_amount: self.max_discount_amount.or(base.max_discount_amount),
            limit_per_customer: self.limit_per_customer.or(base.limit_per_customer),
            product_ids: self.product_ids.unwrap_or(base.product_ids),
            category_ids: self.category_ids.unwrap_or(base.category_ids),
            customer_group_ids: self.customer_group_ids.unwrap_or(base.customer_group_ids),
        }
    }
}

/// Promoção como sai na API: com o `isActive` calculado na hora.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionView {
    #[serde(flatten)]
    pub promotion: Promotion,
    pub is_active: bool,
}

impl PromotionView {
    pub fn at(promotion: Promotion, now: DateTime<Utc>) -> Self {
        let is_active = promotion.is_active_at(now);
        Self { promotion, is_active }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PromotionListResponse {
    pub promotions: Vec<PromotionView>,
    pub total: i64,
}

/// Motivo de recusa de uma promoção. Vai para o cliente como código estável.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionRejection {
    InvalidScope,
    NotActive,
    BelowMinimumPurchase,
    ProductNotEligible,
    CustomerRequired,
    CustomerGroupNotEligible,
    UsageLimitReached,
}

impl PromotionRejection {
    pub fn message_key(self) -> &'static str {
        match self {
            PromotionRejection::InvalidScope => "promotion.invalidScope",
            PromotionRejection::NotActive => "promotion.notActive",
            PromotionRejection::BelowMinimumPurchase => "promotion.belowMinimumPurchase",
            PromotionRejection::ProductNotEligible => "promotion.productNotEligible",
            PromotionRejection::CustomerRequired => "promotion.customerRequired",
            PromotionRejection::CustomerGroupNotEligible => "promotion.customerGroupNotEligible",
            PromotionRejection::UsageLimitReached => "promotion.usageLimitReached",
        }
    }
}

/// Resposta do endpoint de validação. Sempre HTTP 200; `valid` diz o resultado.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<PromotionRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PromotionValidation {
    pub fn accepted(promotion_id: Uuid, discount: Decimal, discount_amount: Decimal) -> Self {
        Self {
            valid: true,
            promotion_id: Some(promotion_id),
            discount_amount: Some(discount_amount),
            discount: Some(discount),
            reason: None,
            message: None,
        }
    }

    pub fn rejected(reason: PromotionRejection, message: String) -> Self {
        Self {
            valid: false,
            promotion_id: None,
            discount_amount: None,
            discount: None,
            reason: Some(reason),
            message: Some(message),
        }
    }
}
