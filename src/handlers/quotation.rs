// src/handlers/quotation.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::get_rls_connection, error::{ApiError, AppError}},
    config::AppState,
    handlers::{
        sales::{line_inputs, InstallmentPlanPayload, SaleItemPayload},
        validation::{validate_not_negative, validate_tax_rate},
    },
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationQuery},
    models::sales::{PaymentMethod, QuotationDetail, QuotationListResponse, SaleDetail},
    services::quotation_service::{NewQuotation, QuotationConversion},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuotationPayload {
    pub organization_id: Option<Uuid>,
    pub outlet_id: Uuid,
    pub customer_id: Option<Uuid>,

    #[validate(length(min = 1, message = "items_required"), nested)]
    pub items: Vec<SaleItemPayload>,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub discount_amount: Decimal,

    #[validate(custom(function = "validate_tax_rate"))]
    #[serde(default)]
    #[schema(example = "0.10")]
    pub tax_rate: Decimal,

    #[schema(example = "2025-12-31")]
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
}

// POST /api/quotation
#[utoipa::path(
    post,
    path = "/api/quotation",
    tag = "Quotations",
    request_body = CreateQuotationPayload,
    responses(
        (status = 201, description = "Orçamento criado (sem mexer no estoque)", body = QuotationDetail),
        (status = 404, description = "Ponto de venda, cliente ou produto não encontrado")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_quotation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreateQuotationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewQuotation {
        outlet_id: payload.outlet_id,
        customer_id: payload.customer_id,
        items: line_inputs(&payload.items),
        discount_amount: payload.discount_amount,
        tax_rate: payload.tax_rate,
        valid_until: payload.valid_until,
        notes: payload.notes,
    };

    let quotation = app_state
        .quotation_service
        .create(&mut *rls_conn, organization_id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(quotation)))
}

// GET /api/quotation
#[utoipa::path(
    get,
    path = "/api/quotation",
    tag = "Quotations",
    responses((status = 200, description = "Orçamentos da organização", body = QuotationListResponse)),
    params(("organizationId" = Uuid, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn list_quotations(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let quotations = app_state
        .quotation_service
        .list(&mut *rls_conn, organization_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quotations)))
}

// GET /api/quotation/{id}
#[utoipa::path(
    get,
    path = "/api/quotation/{id}",
    tag = "Quotations",
    responses(
        (status = 200, description = "Orçamento com itens", body = QuotationDetail),
        (status = 404, description = "Orçamento não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_quotation(
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

    let quotation = app_state
        .quotation_service
        .detail(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quotation)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConvertQuotationPayload {
    pub organization_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,

    #[validate(nested)]
    pub installment_plan: Option<InstallmentPlanPayload>,
}

// POST /api/quotation/{id}/convert
#[utoipa::path(
    post,
    path = "/api/quotation/{id}/convert",
    tag = "Quotations",
    request_body = ConvertQuotationPayload,
    responses(
        (status = 201, description = "Venda concluída gerada a partir do orçamento", body = SaleDetail),
        (status = 404, description = "Orçamento não encontrado"),
        (status = 409, description = "Orçamento já convertido, vencido ou sem estoque")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn convert_quotation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConvertQuotationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let conversion = QuotationConversion {
        payment_method: payload.payment_method,
        notes: payload.notes,
        installment_plan: payload.installment_plan.map(Into::into),
    };

    let sale = app_state
        .quotation_service
        .convert(&mut *rls_conn, organization_id, id, conversion)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(sale)))
}
