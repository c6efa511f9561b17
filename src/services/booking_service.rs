// src/services/booking_service.rs

use chrono::{DateTime, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::BookingRepository,
    models::bookings::{BookingDetail, BookingListResponse, BookingStatus},
    services::entity_validator::EntityValidator,
};

#[derive(Clone)]
pub struct BookingService {
    booking_repo: BookingRepository,
    validator: EntityValidator,
}

impl BookingService {
    pub fn new(booking_repo: BookingRepository, validator: EntityValidator) -> Self {
        Self { booking_repo, validator }
    }

    /// Agendamento nasce `pending`, já com a primeira linha de histórico.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        customer_id: Uuid,
        booking_date: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<BookingDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::Customer, organization_id, customer_id).await?;

        let booking = self
            .booking_repo
            .insert(&mut *tx, organization_id, customer_id, booking_date, notes.as_deref())
            .await?;
        let first = self
            .booking_repo
            .record_change(&mut *tx, booking.id, None, booking.status, None, user_id)
            .await?;
        tx.commit().await?;

        tracing::info!("📅 Agendamento {} criado para {}", booking.id, booking.booking_date);
        Ok(BookingDetail { booking, history: vec![first] })
    }

    /// Transições livres; cada uma vira uma linha de auditoria.
    pub async fn transition<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        status: BookingStatus,
        note: Option<String>,
    ) -> Result<BookingDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let current = self
            .booking_repo
            .find(&mut *tx, organization_id, id, true)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Booking, id })?;

        let booking = self.booking_repo.set_status(&mut *tx, id, status).await?;
        self.booking_repo
            .record_change(&mut *tx, id, Some(current.status), status, note.as_deref(), user_id)
            .await?;
        let history = self.booking_repo.history(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!("🔄 Agendamento {}: {:?} -> {:?}", id, current.status, status);
        Ok(BookingDetail { booking, history })
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<BookingListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bookings = self.booking_repo.list(executor, organization_id, status).await?;
        let total = bookings.len() as i64;
        Ok(BookingListResponse { bookings, total })
    }

    pub async fn detail<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<BookingDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;
        let booking = self
            .booking_repo
            .find(&mut *conn, organization_id, id, false)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Booking, id })?;
        let history = self.booking_repo.history(&mut *conn, id).await?;
        Ok(BookingDetail { booking, history })
    }
}
