// src/db/booking_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::bookings::{Booking, BookingStatus, BookingStatusChange},
};

#[derive(Clone, Default)]
pub struct BookingRepository;

impl BookingRepository {
    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE organization_id = $1 AND ($2::booking_status IS NULL OR status = $2)
            ORDER BY booking_date
            "#,
        )
        .bind(organization_id)
        .bind(status)
        .fetch_all(executor)
        .await?;
        Ok(bookings)
    }

    pub async fn find<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        for_update: bool,
    ) -> Result<Option<Booking>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = if for_update {
            "SELECT * FROM bookings WHERE id = $1 AND organization_id = $2 FOR UPDATE"
        } else {
            "SELECT * FROM bookings WHERE id = $1 AND organization_id = $2"
        };
        let booking = sqlx::query_as::<_, Booking>(sql)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(executor)
            .await?;
        Ok(booking)
    }

    pub async fn history<'e, E>(&self, executor: E, booking_id: Uuid) -> Result<Vec<BookingStatusChange>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let history = sqlx::query_as::<_, BookingStatusChange>(
            "SELECT * FROM booking_status_changes WHERE booking_id = $1 ORDER BY changed_at, id",
        )
        .bind(booking_id)
        .fetch_all(executor)
        .await?;
        Ok(history)
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        customer_id: Uuid,
        booking_date: DateTime<Utc>,
        notes: Option<&str>,
    ) -> Result<Booking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (organization_id, customer_id, booking_date, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(customer_id)
        .bind(booking_date)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(booking)
    }

    pub async fn set_status<'e, E>(&self, executor: E, id: Uuid, status: BookingStatus) -> Result<Booking, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(booking)
    }

    pub async fn record_change<'e, E>(
        &self,
        executor: E,
        booking_id: Uuid,
        from: Option<BookingStatus>,
        to: BookingStatus,
        note: Option<&str>,
        changed_by: Uuid,
    ) -> Result<BookingStatusChange, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let change = sqlx::query_as::<_, BookingStatusChange>(
            r#"
            INSERT INTO booking_status_changes (booking_id, from_status, to_status, note, changed_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(booking_id)
        .bind(from)
        .bind(to)
        .bind(note)
        .bind(changed_by)
        .fetch_one(executor)
        .await?;
        Ok(change)
    }
}
