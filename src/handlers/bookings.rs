// src/handlers/bookings.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::{db_utils::get_rls_connection, error::ApiError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationQuery},
    models::bookings::{BookingDetail, BookingListResponse, BookingStatus},
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingPayload {
    pub organization_id: Option<Uuid>,
    pub customer_id: Uuid,
    #[schema(example = "2025-05-20T14:00:00Z")]
    pub booking_date: DateTime<Utc>,
    pub notes: Option<String>,
}

// POST /api/bookings
#[utoipa::path(
    post,
    path = "/api/bookings",
    tag = "Bookings",
    request_body = CreateBookingPayload,
    responses(
        (status = 201, description = "Agendamento criado como PENDING", body = BookingDetail),
        (status = 404, description = "Cliente não encontrado")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_booking(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreateBookingPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let booking = app_state
        .booking_service
        .create(
            &mut *rls_conn,
            organization_id,
            user.id(),
            payload.customer_id,
            payload.booking_date,
            payload.notes,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(booking)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListBookingsParams {
    pub status: Option<BookingStatus>,
}

// GET /api/bookings
#[utoipa::path(
    get,
    path = "/api/bookings",
    tag = "Bookings",
    responses((status = 200, description = "Agendamentos", body = BookingListResponse)),
    params(
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        ListBookingsParams
    ),
    security(("api_jwt" = []))
)]
pub async fn list_bookings(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Query(params): Query<ListBookingsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let bookings = app_state
        .booking_service
        .list(&mut *rls_conn, organization_id, params.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(bookings)))
}

// GET /api/bookings/{id}
#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    tag = "Bookings",
    responses(
        (status = 200, description = "Agendamento com histórico de status", body = BookingDetail),
        (status = 404, description = "Agendamento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do agendamento"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_booking(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let booking = app_state
        .booking_service
        .detail(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(booking)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusPayload {
    pub organization_id: Option<Uuid>,
    pub status: BookingStatus,
    pub note: Option<String>,
}

// PATCH /api/bookings/{id}/status
#[utoipa::path(
    patch,
    path = "/api/bookings/{id}/status",
    tag = "Bookings",
    request_body = BookingStatusPayload,
    responses(
        (status = 200, description = "Status alterado e registrado no histórico", body = BookingDetail),
        (status = 404, description = "Agendamento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do agendamento"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_booking_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
    Json(payload): Json<BookingStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let booking = app_state
        .booking_service
        .transition(&mut *rls_conn, organization_id, user.id(), id, payload.status, payload.note)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(booking)))
}
