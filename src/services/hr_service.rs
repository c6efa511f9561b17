// src/services/hr_service.rs

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::HrRepository,
    models::hr::{Attendance, AttendanceListResponse, AttendanceStatus},
    services::entity_validator::EntityValidator,
};

#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct HrService {
    hr_repo: HrRepository,
    validator: EntityValidator,
}

impl HrService {
    pub fn new(hr_repo: HrRepository, validator: EntityValidator) -> Self {
        Self { hr_repo, validator }
    }

    /// Um registro por funcionário por dia. A constraint única decide.
    pub async fn record_attendance<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        employee_id: Uuid,
        input: NewAttendance,
    ) -> Result<Attendance, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if let (Some(check_in), Some(check_out)) = (input.check_in, input.check_out) {
            if check_out < check_in {
                return Err(AppError::InvalidField { field: "checkOut", code: "date_range" });
            }
        }

        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::Employee, organization_id, employee_id).await?;
        let attendance = self
            .hr_repo
            .insert_attendance(
                &mut *tx,
                organization_id,
                employee_id,
                input.attendance_date,
                input.status,
                input.check_in,
                input.check_out,
            )
            .await
            .inspect_err(|e| {
                if matches!(e, AppError::DuplicateAttendance { .. }) {
                    tracing::warn!("Ponto duplicado: funcionário {} em {}", employee_id, input.attendance_date);
                }
            })?;
        tx.commit().await?;

        tracing::info!("🕘 Ponto de {} registrado ({:?})", attendance.attendance_date, attendance.status);
        Ok(attendance)
    }

    pub async fn list_attendance<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        employee_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AttendanceListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::Employee, organization_id, employee_id).await?;
        let attendances = self.hr_repo.list_attendance(&mut *tx, organization_id, employee_id, from, to).await?;
        tx.commit().await?;

        let total = attendances.len() as i64;
        Ok(AttendanceListResponse { attendances, total })
    }
}
