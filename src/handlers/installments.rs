// src/handlers/installments.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::get_rls_connection, error::{ApiError, AppError}},
    config::AppState,
    handlers::validation::validate_positive,
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationQuery},
    models::installments::{Installment, InstallmentListResponse, InstallmentStatus},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallmentPlanPayload {
    pub organization_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub sale_id: Option<Uuid>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "1000.00")]
    pub total_amount: Decimal,

    #[validate(range(min = 1, max = 60, message = "installment_count"))]
    #[schema(example = 3)]
    pub count: u32,

    #[schema(example = "2025-04-10")]
    pub first_due_date: NaiveDate,
}

// POST /api/installments
#[utoipa::path(
    post,
    path = "/api/installments",
    tag = "Installments",
    request_body = CreateInstallmentPlanPayload,
    responses(
        (status = 201, description = "Parcelas geradas; a soma é igual ao total", body = InstallmentListResponse),
        (status = 404, description = "Cliente ou venda não encontrado")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_plan(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreateInstallmentPlanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let plan = app_state
        .installment_service
        .create_plan(
            &mut *rls_conn,
            organization_id,
            payload.customer_id,
            payload.sale_id,
            payload.total_amount,
            payload.count,
            payload.first_due_date,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(plan)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListInstallmentsParams {
    pub sale_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub status: Option<InstallmentStatus>,
}

// GET /api/installments
#[utoipa::path(
    get,
    path = "/api/installments",
    tag = "Installments",
    responses((status = 200, description = "Parcelas, com vencidas já marcadas como OVERDUE", body = InstallmentListResponse)),
    params(
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        ListInstallmentsParams
    ),
    security(("api_jwt" = []))
)]
pub async fn list_installments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Query(params): Query<ListInstallmentsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let installments = app_state
        .installment_service
        .list(&mut *rls_conn, organization_id, params.sale_id, params.customer_id, params.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(installments)))
}

// POST /api/installments/{id}/pay
#[utoipa::path(
    post,
    path = "/api/installments/{id}/pay",
    tag = "Installments",
    responses(
        (status = 200, description = "Parcela paga", body = Installment),
        (status = 404, description = "Parcela não encontrada"),
        (status = 409, description = "Parcela já paga")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da parcela"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn pay_installment(
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

    let installment = app_state
        .installment_service
        .pay(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(installment)))
}
