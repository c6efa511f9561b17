// src/models/delivery.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "delivery_partner_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryPartnerStatus {
    Active,
    Inactive,
    Pending,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "delivery_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    Standard,
    Express,
    SameDay,
    NextDay,
    International,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "shipment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Pending,
    Processing,
    InTransit,
    OutForDelivery,
    Delivered,
    Failed,
    Returned,
    Cancelled,
}

impl ShipmentStatus {
    /// Entrega na rua (ou já entregue) não pode ser apagada.
    pub fn blocks_deletion(self) -> bool {
        matches!(
            self,
            ShipmentStatus::InTransit | ShipmentStatus::OutForDelivery | ShipmentStatus::Delivered
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Pending => "PENDING",
            ShipmentStatus::Processing => "PROCESSING",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            ShipmentStatus::Delivered => "DELIVERED",
            ShipmentStatus::Failed => "FAILED",
            ShipmentStatus::Returned => "RETURNED",
            ShipmentStatus::Cancelled => "CANCELLED",
        }
    }
}

// --- Parceiros de Entrega ---

#[derive(Debug, Clone, FromRow)]
pub struct DeliveryPartner {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: DeliveryPartnerStatus,
    pub supported_methods: Vec<DeliveryMethod>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeliveryPartner {
    pub fn supports(&self, method: DeliveryMethod) -> bool {
        self.supported_methods.contains(&method)
    }
}

/// Mostra só os 4 últimos caracteres de uma credencial.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("****{}", tail)
}

/// O parceiro como sai na API: credenciais mascaradas.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPartnerView {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: DeliveryPartnerStatus,
    pub supported_methods: Vec<DeliveryMethod>,
    #[schema(example = "****a1b2")]
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DeliveryPartner> for DeliveryPartnerView {
    fn from(p: DeliveryPartner) -> Self {
        Self {
            id: p.id,
            organization_id: p.organization_id,
            name: p.name,
            contact_email: p.contact_email,
            contact_phone: p.contact_phone,
            status: p.status,
            supported_methods: p.supported_methods,
            api_key: p.api_key.as_deref().map(mask_secret),
            api_secret: p.api_secret.as_deref().map(mask_secret),
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPartnerListResponse {
    pub delivery_partners: Vec<DeliveryPartnerView>,
    pub total: i64,
}

// --- Tabelas de Frete ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRate {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub delivery_partner_id: Uuid,
    pub name: String,
    pub method: DeliveryMethod,
    pub base_rate: Decimal,
    pub per_kg_rate: Option<Decimal>,
    pub min_weight: Option<Decimal>,
    pub max_weight: Option<Decimal>,
    pub from_location: Option<String>,
    pub to_location: Option<String>,
    pub estimated_delivery_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRateListResponse {
    pub shipping_rates: Vec<ShippingRate>,
    pub total: i64,
}

/// Tarifa candidata + nome do parceiro (para desempate e exibição).
#[derive(Debug, Clone, FromRow)]
pub struct RateCandidate {
    #[sqlx(flatten)]
    pub rate: ShippingRate,
    pub partner_name: String,
}

/// Uma cotação calculada.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub rate_id: Uuid,
    pub delivery_partner_id: Uuid,
    pub partner_name: String,
    pub rate_name: String,
    pub method: DeliveryMethod,
    #[schema(example = "27.50")]
    pub cost: Decimal,
    pub estimated_delivery_days: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RateQuoteListResponse {
    pub rates: Vec<RateQuote>,
    pub total: i64,
}

// --- Entregas ---

/// Uma linha do histórico de rastreio. Só cresce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    pub status: ShipmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Vazio quando o parceiro já foi removido.
    pub delivery_partner_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub tracking_number: String,
    pub method: DeliveryMethod,
    pub from_location: Option<String>,
    pub to_location: String,
    pub weight: Decimal,
    pub shipping_cost: Option<Decimal>,
    pub status: ShipmentStatus,
    #[schema(value_type = Vec<TrackingEvent>)]
    pub tracking_history: Json<Vec<TrackingEvent>>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Única porta de mudança de status: grava o evento no histórico e,
    /// na primeira entrega, a data de entrega efetiva.
    pub fn record_status(
        &mut self,
        status: ShipmentStatus,
        location: Option<String>,
        description: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.status = status;
        self.tracking_history.0.push(TrackingEvent { timestamp: now, status, location, description });
        if status == ShipmentStatus::Delivered && self.actual_delivery.is_none() {
            self.actual_delivery = Some(now);
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentListResponse {
    pub shipments: Vec<Shipment>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_masked_to_last_four() {
        assert_eq!(mask_secret("sk_live_123456789"), "****6789");
        assert_eq!(mask_secret("abc"), "****abc");
        assert_eq!(mask_secret(""), "****");
    }

    #[test]
    fn view_never_exposes_raw_secret() {
        let partner = DeliveryPartner {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            name: "Rápido Entregas".into(),
            contact_email: None,
            contact_phone: None,
            status: DeliveryPartnerStatus::Active,
            supported_methods: vec![DeliveryMethod::Express],
            api_key: Some("key-000011112222".into()),
            api_secret: Some("secret-abcdefgh".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(DeliveryPartnerView::from(partner)).unwrap();

        assert_eq!(json["apiKey"], "****2222");
        assert_eq!(json["apiSecret"], "****efgh");
        assert!(!json.to_string().contains("secret-abcdefgh"));
    }

    fn shipment() -> Shipment {
        let now = Utc::now();
        Shipment {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            delivery_partner_id: Some(Uuid::new_v4()),
            sale_id: None,
            tracking_number: "TRK-1".into(),
            method: DeliveryMethod::Standard,
            from_location: None,
            to_location: "Curitiba".into(),
            weight: rust_decimal::Decimal::ONE,
            shipping_cost: None,
            status: ShipmentStatus::Pending,
            tracking_history: Json(vec![]),
            estimated_delivery: None,
            actual_delivery: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn second_delivered_keeps_first_delivery_date() {
        let mut s = shipment();
        let t1 = Utc::now();
        let t2 = t1 + chrono::Duration::hours(2);

        s.record_status(ShipmentStatus::Delivered, Some("Portaria".into()), None, t1);
        s.record_status(ShipmentStatus::Delivered, None, Some("Reenvio do aviso".into()), t2);

        assert_eq!(s.actual_delivery, Some(t1));
        assert_eq!(s.tracking_history.0.len(), 2);
        assert_eq!(s.tracking_history.0[1].timestamp, t2);
        assert_eq!(s.updated_at, t2);
    }

    #[test]
    fn any_status_change_is_appended() {
        let mut s = shipment();
        let now = Utc::now();

        s.record_status(ShipmentStatus::InTransit, None, None, now);
        s.record_status(ShipmentStatus::Returned, None, None, now);
        s.record_status(ShipmentStatus::Processing, None, None, now);

        let statuses: Vec<_> = s.tracking_history.0.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![ShipmentStatus::InTransit, ShipmentStatus::Returned, ShipmentStatus::Processing]
        );
        assert_eq!(s.actual_delivery, None);
    }

    #[test]
    fn deletion_guards_by_status() {
        assert!(ShipmentStatus::InTransit.blocks_deletion());
        assert!(ShipmentStatus::Delivered.blocks_deletion());
        assert!(!ShipmentStatus::Pending.blocks_deletion());
    }
}
