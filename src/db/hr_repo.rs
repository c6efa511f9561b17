// src/db/hr_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{constraint_name, is_unique_violation},
        error::AppError,
    },
    models::hr::{Attendance, AttendanceStatus},
};

#[derive(Clone, Default)]
pub struct HrRepository;

impl HrRepository {
    pub async fn list_attendance<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        employee_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Attendance>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, Attendance>(
            r#"
            SELECT * FROM attendances
            WHERE organization_id = $1 AND employee_id = $2
              AND ($3::date IS NULL OR attendance_date >= $3)
              AND ($4::date IS NULL OR attendance_date <= $4)
            ORDER BY attendance_date
            "#,
        )
        .bind(organization_id)
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(rows)
    }

    /// A unicidade (funcionário, data) é garantida pelo banco; aqui só traduzimos.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_attendance<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
        status: AttendanceStatus,
        check_in: Option<DateTime<Utc>>,
        check_out: Option<DateTime<Utc>>,
    ) -> Result<Attendance, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Attendance>(
            r#"
            INSERT INTO attendances (organization_id, employee_id, attendance_date, status, check_in, check_out)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(employee_id)
        .bind(date)
        .bind(status)
        .bind(check_in)
        .bind(check_out)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) && constraint_name(&e) == Some("attendances_employee_date_key") {
                return AppError::DuplicateAttendance { employee_id, date };
            }
            e.into()
        })
    }
}
