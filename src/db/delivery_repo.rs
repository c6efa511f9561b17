// src/db/delivery_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_foreign_key_violation, is_unique_violation},
        error::AppError,
    },
    models::delivery::{
        DeliveryMethod, DeliveryPartner, DeliveryPartnerStatus, RateCandidate, Shipment,
        ShipmentStatus, ShippingRate, TrackingEvent,
    },
};

/// Dados de um parceiro novo.
#[derive(Debug, Clone)]
pub struct NewDeliveryPartner {
    pub name: String,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: DeliveryPartnerStatus,
    pub supported_methods: Vec<DeliveryMethod>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewShippingRate {
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
}

#[derive(Debug, Clone)]
pub struct NewShipment {
    pub delivery_partner_id: Uuid,
    pub sale_id: Option<Uuid>,
    pub tracking_number: String,
    pub method: DeliveryMethod,
    pub from_location: Option<String>,
    pub to_location: String,
    pub weight: Decimal,
    pub shipping_cost: Option<Decimal>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub initial_event: TrackingEvent,
}

#[derive(Clone, Default)]
pub struct DeliveryRepository;

impl DeliveryRepository {
    // ===
    // Parceiros
    // ===

    pub async fn list_partners<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<Vec<DeliveryPartner>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let partners = sqlx::query_as::<_, DeliveryPartner>(
            "SELECT * FROM delivery_partners WHERE organization_id = $1 ORDER BY name",
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(partners)
    }

    pub async fn find_partner<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DeliveryPartner>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let partner = sqlx::query_as::<_, DeliveryPartner>(
            "SELECT * FROM delivery_partners WHERE id = $1 AND organization_id = $2",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(executor)
        .await?;
        Ok(partner)
    }

    /// `FOR UPDATE` na remoção e na troca de status; `FOR SHARE` na criação de entregas.
    pub async fn lock_partner<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        exclusive: bool,
    ) -> Result<Option<DeliveryPartner>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if exclusive {
            "SELECT * FROM delivery_partners WHERE id = $1 AND organization_id = $2 FOR UPDATE"
        } else {
            "SELECT * FROM delivery_partners WHERE id = $1 AND organization_id = $2 FOR SHARE"
        };
        let partner = sqlx::query_as::<_, DeliveryPartner>(sql)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(partner)
    }

    pub async fn create_partner<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        new: &NewDeliveryPartner,
    ) -> Result<DeliveryPartner, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, DeliveryPartner>(
            r#"
            INSERT INTO delivery_partners
                (organization_id, name, contact_email, contact_phone, status, supported_methods, api_key, api_secret)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(&new.name)
        .bind(&new.contact_email)
        .bind(&new.contact_phone)
        .bind(new.status)
        .bind(&new.supported_methods)
        .bind(&new.api_key)
        .bind(&new.api_secret)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::UniqueConstraintViolation(format!("delivery partner {}", new.name));
            }
            e.into()
        })
    }

    pub async fn update_partner_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        status: DeliveryPartnerStatus,
    ) -> Result<DeliveryPartner, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let partner = sqlx::query_as::<_, DeliveryPartner>(
            "UPDATE delivery_partners SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(partner)
    }

    /// Entregas ainda não encerradas (nem entregues nem canceladas).
    pub async fn count_open_shipments<'e, E>(&self, executor: E, partner_id: Uuid) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM shipments
            WHERE delivery_partner_id = $1 AND status NOT IN ('DELIVERED', 'CANCELLED')
            "#,
        )
        .bind(partner_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    /// Entregas encerradas ficam com `delivery_partner_id` nulo; qualquer
    /// outra referência que sobrar vira conflito.
    pub async fn delete_partner<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM delivery_partners WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::PartnerHasActiveShipments(id);
                }
                AppError::from(e)
            })?;
        Ok(())
    }

    // ===
    // Tarifas
    // ===

    pub async fn list_rates<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        partner_id: Option<Uuid>,
    ) -> Result<Vec<ShippingRate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rates = sqlx::query_as::<_, ShippingRate>(
            r#"
            SELECT * FROM shipping_rates
            WHERE organization_id = $1 AND ($2::uuid IS NULL OR delivery_partner_id = $2)
            ORDER BY name
            "#,
        )
        .bind(organization_id)
        .bind(partner_id)
        .fetch_all(executor)
        .await?;
        Ok(rates)
    }

    /// Tarifas ativas de parceiros ATIVOS, com o nome do parceiro.
    pub async fn rate_candidates<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<Vec<RateCandidate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let candidates = sqlx::query_as::<_, RateCandidate>(
            r#"
            SELECT r.*, p.name AS partner_name
            FROM shipping_rates r
            JOIN delivery_partners p ON p.id = r.delivery_partner_id
            WHERE r.organization_id = $1 AND r.is_active AND p.status = 'ACTIVE'
            "#,
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(candidates)
    }

    pub async fn create_rate<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        new: &NewShippingRate,
    ) -> Result<ShippingRate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rate = sqlx::query_as::<_, ShippingRate>(
            r#"
            INSERT INTO shipping_rates (
                organization_id, delivery_partner_id, name, method, base_rate, per_kg_rate,
                min_weight, max_weight, from_location, to_location, estimated_delivery_days
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(new.delivery_partner_id)
        .bind(&new.name)
        .bind(new.method)
        .bind(new.base_rate)
        .bind(new.per_kg_rate)
        .bind(new.min_weight)
        .bind(new.max_weight)
        .bind(&new.from_location)
        .bind(&new.to_location)
        .bind(new.estimated_delivery_days)
        .fetch_one(executor)
        .await?;
        Ok(rate)
    }

    pub async fn delete_rate<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        partner_id: Uuid,
        rate_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM shipping_rates WHERE id = $1 AND delivery_partner_id = $2 AND organization_id = $3",
        )
        .bind(rate_id)
        .bind(partner_id)
        .bind(organization_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ===
    // Entregas
    // ===

    pub async fn list_shipments<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        status: Option<ShipmentStatus>,
        partner_id: Option<Uuid>,
    ) -> Result<Vec<Shipment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let shipments = sqlx::query_as::<_, Shipment>(
            r#"
            SELECT * FROM shipments
            WHERE organization_id = $1
              AND ($2::shipment_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR delivery_partner_id = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(organization_id)
        .bind(status)
        .bind(partner_id)
        .fetch_all(executor)
        .await?;
        Ok(shipments)
    }

    pub async fn find_shipment<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<Shipment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if for_update {
            "SELECT * FROM shipments WHERE id = $1 AND organization_id = $2 FOR UPDATE"
        } else {
            "SELECT * FROM shipments WHERE id = $1 AND organization_id = $2"
        };
        let shipment = sqlx::query_as::<_, Shipment>(sql)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(shipment)
    }

    pub async fn create_shipment<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        new: &NewShipment,
    ) -> Result<Shipment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Shipment>(
            r#"
            INSERT INTO shipments (
                organization_id, delivery_partner_id, sale_id, tracking_number, method,
                from_location, to_location, weight, shipping_cost, status, tracking_history,
                estimated_delivery
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(new.delivery_partner_id)
        .bind(new.sale_id)
        .bind(&new.tracking_number)
        .bind(new.method)
        .bind(&new.from_location)
        .bind(&new.to_location)
        .bind(new.weight)
        .bind(new.shipping_cost)
        .bind(new.initial_event.status)
        .bind(Json(vec![new.initial_event.clone()]))
        .bind(new.estimated_delivery)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::UniqueConstraintViolation(format!(
                    "tracking number {}",
                    new.tracking_number
                ));
            }
            e.into()
        })
    }

    /// Grava o estado da máquina: status, histórico e entrega efetiva juntos.
    pub async fn save_shipment_status<'e, E>(&self, executor: E, shipment: &Shipment) -> Result<Shipment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let saved = sqlx::query_as::<_, Shipment>(
            r#"
            UPDATE shipments
            SET status = $2, tracking_history = $3, actual_delivery = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(shipment.id)
        .bind(shipment.status)
        .bind(&shipment.tracking_history)
        .bind(shipment.actual_delivery)
        .bind(shipment.updated_at)
        .fetch_one(executor)
        .await?;
        Ok(saved)
    }

    pub async fn delete_shipment<'e, E>(&self, executor: E, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM shipments WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
