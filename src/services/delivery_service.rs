// src/services/delivery_service.rs
//
// Parceiros de entrega, tabelas de frete e entregas.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::{
        delivery_repo::{NewDeliveryPartner, NewShipment, NewShippingRate},
        DeliveryRepository,
    },
    models::delivery::{
        DeliveryMethod, DeliveryPartner, DeliveryPartnerListResponse, DeliveryPartnerStatus,
        DeliveryPartnerView, RateQuote, RateQuoteListResponse, Shipment, ShipmentListResponse, ShipmentStatus,
        ShippingRate, ShippingRateListResponse, TrackingEvent,
    },
    services::{
        entity_validator::EntityValidator,
        rate_engine::{self, RateQuery},
    },
};

#[derive(Debug, Clone)]
pub struct NewShipmentInput {
    pub delivery_partner_id: Uuid,
    pub sale_id: Option<Uuid>,
    pub tracking_number: Option<String>,
    pub method: DeliveryMethod,
    pub from_location: Option<String>,
    pub to_location: String,
    pub weight: Decimal,
    pub shipping_cost: Option<Decimal>,
    pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ShipmentStatusChange {
    pub status: ShipmentStatus,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Código de rastreio gerado quando o cliente não manda um.
pub fn generate_tracking_number() -> String {
    let id = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("TRK-{}", &id[..12])
}

pub fn ensure_rate_window(min_weight: Option<Decimal>, max_weight: Option<Decimal>) -> Result<(), AppError> {
    if min_weight.is_some_and(|w| w < Decimal::ZERO) || max_weight.is_some_and(|w| w < Decimal::ZERO) {
        return Err(AppError::InvalidField { field: "minWeight", code: "not_negative" });
    }
    if let (Some(min), Some(max)) = (min_weight, max_weight) {
        if min > max {
            return Err(AppError::InvalidField { field: "maxWeight", code: "weight_window" });
        }
    }
    Ok(())
}

fn ensure_positive_weight(weight: Decimal) -> Result<(), AppError> {
    if weight <= Decimal::ZERO {
        return Err(AppError::InvalidField { field: "weight", code: "positive" });
    }
    Ok(())
}

fn ensure_supports(partner: &DeliveryPartner, method: DeliveryMethod) -> Result<(), AppError> {
    if !partner.supports(method) {
        tracing::warn!("Parceiro {} não atende o método {:?}", partner.id, method);
        return Err(AppError::InvalidField { field: "method", code: "method_not_supported" });
    }
    Ok(())
}

#[derive(Clone)]
pub struct DeliveryService {
    delivery_repo: DeliveryRepository,
    validator: EntityValidator,
}

impl DeliveryService {
    pub fn new(delivery_repo: DeliveryRepository, validator: EntityValidator) -> Self {
        Self { delivery_repo, validator }
    }

    // =========================================================================
    //  PARCEIROS
    // =========================================================================

    pub async fn list_partners<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<DeliveryPartnerListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let partners = self.delivery_repo.list_partners(executor, organization_id).await?;
        let delivery_partners: Vec<DeliveryPartnerView> = partners.into_iter().map(Into::into).collect();
        let total = delivery_partners.len() as i64;
        Ok(DeliveryPartnerListResponse { delivery_partners, total })
    }

    pub async fn get_partner<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<DeliveryPartnerView, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.delivery_repo
            .find_partner(executor, organization_id, id)
            .await?
            .map(Into::into)
            .ok_or(AppError::NotFound { entity: EntityKind::DeliveryPartner, id })
    }

    pub async fn create_partner<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        new: NewDeliveryPartner,
    ) -> Result<DeliveryPartnerView, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if new.supported_methods.is_empty() {
            return Err(AppError::InvalidField { field: "supportedMethods", code: "required" });
        }
        let partner = self.delivery_repo.create_partner(executor, organization_id, &new).await?;
        tracing::info!("🚚 Parceiro de entrega '{}' cadastrado ({})", partner.name, partner.id);
        Ok(partner.into())
    }

    pub async fn change_partner_status<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        status: DeliveryPartnerStatus,
    ) -> Result<DeliveryPartnerView, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let current = self
            .delivery_repo
            .lock_partner(&mut *tx, organization_id, id, true)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::DeliveryPartner, id })?;
        let updated = self.delivery_repo.update_partner_status(&mut *tx, id, status).await?;
        tx.commit().await?;

        tracing::info!("🔄 Parceiro {}: {:?} -> {:?}", id, current.status, updated.status);
        Ok(updated.into())
    }

    /// O parceiro fica travado `FOR UPDATE` enquanto as entregas abertas são
    /// contadas; uma entrega nova (que trava `FOR SHARE`) espera.
    pub async fn delete_partner<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.delivery_repo
            .lock_partner(&mut *tx, organization_id, id, true)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::DeliveryPartner, id })?;

        let open = self.delivery_repo.count_open_shipments(&mut *tx, id).await?;
        if open > 0 {
            tracing::warn!("Parceiro {} tem {} entregas em aberto", id, open);
            return Err(AppError::PartnerHasActiveShipments(id));
        }

        self.delivery_repo.delete_partner(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Parceiro de entrega {} removido", id);
        Ok(())
    }

    // =========================================================================
    //  TARIFAS
    // =========================================================================

    pub async fn create_rate<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        new: NewShippingRate,
    ) -> Result<ShippingRate, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_rate_window(new.min_weight, new.max_weight)?;

        let mut tx = executor.begin().await?;
        let partner = self
            .delivery_repo
            .lock_partner(&mut *tx, organization_id, new.delivery_partner_id, false)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::DeliveryPartner, id: new.delivery_partner_id })?;
        ensure_supports(&partner, new.method)?;

        let rate = self.delivery_repo.create_rate(&mut *tx, organization_id, &new).await?;
        tx.commit().await?;

        tracing::info!("💲 Tarifa '{}' criada para o parceiro {}", rate.name, partner.id);
        Ok(rate)
    }

    pub async fn list_rates<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        partner_id: Option<Uuid>,
    ) -> Result<ShippingRateListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let shipping_rates = self.delivery_repo.list_rates(executor, organization_id, partner_id).await?;
        let total = shipping_rates.len() as i64;
        Ok(ShippingRateListResponse { shipping_rates, total })
    }

    pub async fn delete_rate<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        partner_id: Uuid,
        rate_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let deleted = self.delivery_repo.delete_rate(executor, organization_id, partner_id, rate_id).await?;
        if !deleted {
            return Err(AppError::NotFound { entity: EntityKind::ShippingRate, id: rate_id });
        }
        tracing::info!("🗑️ Tarifa {} removida", rate_id);
        Ok(())
    }

    pub async fn calculate_rates<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        query: &RateQuery,
    ) -> Result<RateQuoteListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        ensure_positive_weight(query.weight)?;
        let candidates = self.delivery_repo.rate_candidates(executor, organization_id).await?;
        let rates = rate_engine::quote(candidates, query);
        let total = rates.len() as i64;
        Ok(RateQuoteListResponse { rates, total })
    }

    // =========================================================================
    //  ENTREGAS
    // =========================================================================

    pub async fn create_shipment<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        input: NewShipmentInput,
    ) -> Result<Shipment, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_positive_weight(input.weight)?;
        if input.shipping_cost.is_some_and(|c| c < Decimal::ZERO) {
            return Err(AppError::InvalidField { field: "shippingCost", code: "not_negative" });
        }

        let mut tx = executor.begin().await?;

        // 1. Parceiro ativo e que atende o método (travado até o commit)
        let partner = self
            .delivery_repo
            .lock_partner(&mut *tx, organization_id, input.delivery_partner_id, false)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::DeliveryPartner, id: input.delivery_partner_id })?;
        if partner.status != DeliveryPartnerStatus::Active {
            tracing::warn!("Parceiro {} não está ativo ({:?})", partner.id, partner.status);
            return Err(AppError::PartnerNotActive(partner.id));
        }
        ensure_supports(&partner, input.method)?;
        self.validator.ensure_opt(&mut tx, EntityKind::Sale, organization_id, input.sale_id).await?;

        // 2. Frete padrão = cotação mais barata do próprio parceiro
        let now = Utc::now();
        let cheapest: Option<RateQuote> = if input.shipping_cost.is_none() || input.estimated_delivery.is_none() {
            let query = RateQuery {
                to_location: input.to_location.clone(),
                weight: input.weight,
                delivery_partner_id: Some(partner.id),
                from_location: input.from_location.clone(),
                method: Some(input.method),
            };
            let candidates = self.delivery_repo.rate_candidates(&mut *tx, organization_id).await?;
            rate_engine::quote(candidates, &query).into_iter().next()
        } else {
            None
        };
        let shipping_cost = input.shipping_cost.or(cheapest.as_ref().map(|q| q.cost));
        let estimated_delivery = input
            .estimated_delivery
            .or(cheapest.as_ref().map(|q| now + Duration::days(q.estimated_delivery_days.into())));

        // 3. Grava com o primeiro evento do histórico
        let new = NewShipment {
            delivery_partner_id: partner.id,
            sale_id: input.sale_id,
            tracking_number: input.tracking_number.unwrap_or_else(generate_tracking_number),
            method: input.method,
            from_location: input.from_location,
            to_location: input.to_location,
            weight: input.weight,
            shipping_cost,
            estimated_delivery,
            initial_event: TrackingEvent {
                timestamp: now,
                status: ShipmentStatus::Pending,
                location: None,
                description: Some("Entrega criada".into()),
            },
        };
        let shipment = self.delivery_repo.create_shipment(&mut *tx, organization_id, &new).await?;
        tx.commit().await?;

        tracing::info!("📦 Entrega {} criada ({})", shipment.id, shipment.tracking_number);
        Ok(shipment)
    }

    pub async fn update_shipment_status<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        change: ShipmentStatusChange,
    ) -> Result<Shipment, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let mut shipment = self
            .delivery_repo
            .find_shipment(&mut *tx, organization_id, id, true)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Shipment, id })?;

        let previous = shipment.status;
        shipment.record_status(change.status, change.location, change.description, Utc::now());
        let saved = self.delivery_repo.save_shipment_status(&mut *tx, &shipment).await?;
        tx.commit().await?;

        tracing::info!("📍 Entrega {}: {:?} -> {:?}", id, previous, saved.status);
        Ok(saved)
    }

    pub async fn list_shipments<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        status: Option<ShipmentStatus>,
        partner_id: Option<Uuid>,
    ) -> Result<ShipmentListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let shipments = self
            .delivery_repo
            .list_shipments(executor, organization_id, status, partner_id)
            .await?;
        let total = shipments.len() as i64;
        Ok(ShipmentListResponse { shipments, total })
    }

    pub async fn get_shipment<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<Shipment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.delivery_repo
            .find_shipment(executor, organization_id, id, false)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Shipment, id })
    }

    pub async fn delete_shipment<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let shipment = self
            .delivery_repo
            .find_shipment(&mut *tx, organization_id, id, true)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Shipment, id })?;
        if shipment.status.blocks_deletion() {
            tracing::warn!("Entrega {} em {:?} não pode ser removida", id, shipment.status);
            return Err(AppError::ShipmentNotDeletable { id, status: shipment.status.as_str().to_string() });
        }

        self.delivery_repo.delete_shipment(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("🗑️ Entrega {} removida", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn generated_tracking_numbers_are_unique_and_prefixed() {
        let a = generate_tracking_number();
        let b = generate_tracking_number();

        assert!(a.starts_with("TRK-"));
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn rate_window_must_be_ordered() {
        assert!(ensure_rate_window(Some(dec!(5)), Some(dec!(20))).is_ok());
        assert!(ensure_rate_window(Some(dec!(5)), Some(dec!(5))).is_ok());
        assert!(ensure_rate_window(None, Some(dec!(1))).is_ok());
        assert!(matches!(
            ensure_rate_window(Some(dec!(21)), Some(dec!(20))),
            Err(AppError::InvalidField { code: "weight_window", .. })
        ));
        assert!(ensure_rate_window(Some(dec!(-1)), None).is_err());
    }

    #[test]
    fn weight_must_be_positive() {
        assert!(ensure_positive_weight(dec!(0.1)).is_ok());
        assert!(ensure_positive_weight(Decimal::ZERO).is_err());
    }
}

// Escrita atômica contra um banco real: rode com `cargo test -- --ignored` e DATABASE_URL definida.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::OwnershipRepository;
    use sqlx::PgPool;

    fn service() -> DeliveryService {
        DeliveryService::new(DeliveryRepository, EntityValidator::new(OwnershipRepository))
    }

    async fn seed_partner(pool: &PgPool) -> (Uuid, Uuid) {
        let org: Uuid = sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ('Loja', 'loja') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
        let partner: Uuid = sqlx::query_scalar(
            "INSERT INTO delivery_partners (organization_id, name, status) VALUES ($1, 'Rápido', 'ACTIVE') RETURNING id",
        )
        .bind(org)
        .fetch_one(pool)
        .await
        .unwrap();
        (org, partner)
    }

    async fn seed_shipment(pool: &PgPool, org: Uuid, partner: Uuid, status: ShipmentStatus) -> Uuid {
        sqlx::query_scalar(
            r#"
            INSERT INTO shipments (organization_id, delivery_partner_id, tracking_number, method, to_location, weight, status)
            VALUES ($1, $2, $3, 'STANDARD', 'Curitiba', 1, $4)
            RETURNING id
            "#,
        )
        .bind(org)
        .bind(partner)
        .bind(generate_tracking_number())
        .bind(status)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn partner_with_only_settled_shipments_can_be_deleted(pool: PgPool) {
        let (org, partner) = seed_partner(&pool).await;
        let delivered = seed_shipment(&pool, org, partner, ShipmentStatus::Delivered).await;
        seed_shipment(&pool, org, partner, ShipmentStatus::Cancelled).await;

        service().delete_partner(&pool, org, partner).await.unwrap();

        let partners: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM delivery_partners")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(partners, 0);
        // O histórico da entrega fica, sem parceiro
        let kept: Option<Uuid> = sqlx::query_scalar("SELECT delivery_partner_id FROM shipments WHERE id = $1")
            .bind(delivered)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(kept, None);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn partner_with_open_shipment_is_kept(pool: PgPool) {
        let (org, partner) = seed_partner(&pool).await;
        seed_shipment(&pool, org, partner, ShipmentStatus::Delivered).await;
        seed_shipment(&pool, org, partner, ShipmentStatus::Pending).await;

        let err = service().delete_partner(&pool, org, partner).await.unwrap_err();

        assert!(matches!(err, AppError::PartnerHasActiveShipments(id) if id == partner));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
        let partners: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM delivery_partners")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(partners, 1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn unknown_partner_is_not_found(pool: PgPool) {
        let (org, _) = seed_partner(&pool).await;

        let err = service().delete_partner(&pool, org, Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, AppError::NotFound { entity: EntityKind::DeliveryPartner, .. }));
    }
}
