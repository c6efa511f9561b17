// src/handlers/hr.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError},
    config::AppState,
    handlers::finance::PeriodParams,
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationQuery},
    models::hr::{Attendance, AttendanceListResponse, AttendanceStatus},
    services::hr_service::NewAttendance,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendancePayload {
    pub organization_id: Option<Uuid>,

    #[schema(example = "2025-03-10")]
    pub attendance_date: NaiveDate,
    pub status: AttendanceStatus,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
}

// POST /api/employees/{id}/attendance
#[utoipa::path(
    post,
    path = "/api/employees/{id}/attendance",
    tag = "HR",
    request_body = AttendancePayload,
    responses(
        (status = 201, description = "Ponto registrado", body = Attendance),
        (status = 404, description = "Funcionário não encontrado"),
        (status = 409, description = "Ponto já registrado nesse dia")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do funcionário"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_attendance(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(employee_id): Path<Uuid>,
    Json(payload): Json<AttendancePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewAttendance {
        attendance_date: payload.attendance_date,
        status: payload.status,
        check_in: payload.check_in,
        check_out: payload.check_out,
    };

    let attendance = app_state
        .hr_service
        .record_attendance(&mut *rls_conn, organization_id, employee_id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(attendance)))
}

// GET /api/employees/{id}/attendance
#[utoipa::path(
    get,
    path = "/api/employees/{id}/attendance",
    tag = "HR",
    responses(
        (status = 200, description = "Registros de ponto do funcionário", body = AttendanceListResponse),
        (status = 404, description = "Funcionário não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do funcionário"),
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        PeriodParams
    ),
    security(("api_jwt" = []))
)]
pub async fn list_attendance(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(employee_id): Path<Uuid>,
    Query(params): Query<PeriodParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let attendances = app_state
        .hr_service
        .list_attendance(&mut *rls_conn, organization_id, employee_id, params.from, params.to)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(attendances)))
}
