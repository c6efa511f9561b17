// src/handlers/sales.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::get_rls_connection, error::{ApiError, AppError}},
    config::AppState,
    handlers::validation::{validate_not_negative, validate_positive, validate_tax_rate},
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationQuery},
    models::sales::{PaymentMethod, SaleDetail, SaleFilter, SaleListResponse, SaleStatus},
    services::{
        promotion_engine::PromotionRef,
        report_service::SalesByDayReport,
        sale_calculator::LineInput,
        sales_service::{InstallmentPlanInput, NewSale, SaleUpdate},
    },
};

// ---
// Payloads compartilhados (venda e orçamento)
// ---

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaleItemPayload {
    pub product_id: Uuid,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "2")]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "10.00")]
    pub unit_price: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub discount_amount: Decimal,
}

impl From<&SaleItemPayload> for LineInput {
    fn from(p: &SaleItemPayload) -> Self {
        LineInput {
            product_id: p.product_id,
            quantity: p.quantity,
            unit_price: p.unit_price,
            discount_amount: p.discount_amount,
        }
    }
}

pub fn line_inputs(items: &[SaleItemPayload]) -> Vec<LineInput> {
    items.iter().map(LineInput::from).collect()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentPlanPayload {
    #[validate(range(min = 1, max = 60, message = "installment_count"))]
    #[schema(example = 3)]
    pub count: u32,
    pub first_due_date: NaiveDate,
}

impl From<InstallmentPlanPayload> for InstallmentPlanInput {
    fn from(p: InstallmentPlanPayload) -> Self {
        InstallmentPlanInput { count: p.count, first_due_date: p.first_due_date }
    }
}

// ---
// Payload: CreateSale
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSalePayload {
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

    pub payment_method: PaymentMethod,
    pub notes: Option<String>,

    // Id ou código, nunca os dois
    pub promotion_id: Option<Uuid>,
    pub promotion_code: Option<String>,

    /// DRAFT ou COMPLETED (padrão).
    pub status: Option<SaleStatus>,

    #[validate(nested)]
    pub installment_plan: Option<InstallmentPlanPayload>,
}

// POST /api/sales
#[utoipa::path(
    post,
    path = "/api/sales",
    tag = "Sales",
    request_body = CreateSalePayload,
    responses(
        (status = 201, description = "Venda registrada", body = SaleDetail),
        (status = 400, description = "Dados inválidos ou promoção recusada"),
        (status = 404, description = "Ponto de venda, cliente, produto ou promoção não encontrado"),
        (status = 409, description = "Estoque insuficiente")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreateSalePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    let promotion = PromotionRef::from_parts(payload.promotion_id, payload.promotion_code.clone())
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewSale {
        outlet_id: payload.outlet_id,
        customer_id: payload.customer_id,
        items: line_inputs(&payload.items),
        discount_amount: payload.discount_amount,
        tax_rate: payload.tax_rate,
        payment_method: payload.payment_method,
        notes: payload.notes,
        promotion,
        status: payload.status.unwrap_or(SaleStatus::Completed),
        installment_plan: payload.installment_plan.map(Into::into),
    };

    let sale = app_state
        .sales_service
        .create(&mut *rls_conn, organization_id, input)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(sale)))
}

// ---
// Listagem
// ---
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListSalesParams {
    pub status: Option<SaleStatus>,
    pub outlet_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// GET /api/sales
#[utoipa::path(
    get,
    path = "/api/sales",
    tag = "Sales",
    responses((status = 200, description = "Vendas da organização", body = SaleListResponse)),
    params(
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        ListSalesParams
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sales(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Query(params): Query<ListSalesParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let filter = SaleFilter { status: params.status, outlet_id: params.outlet_id, from: params.from, to: params.to };
    let sales = app_state
        .sales_service
        .list(&mut *rls_conn, organization_id, &filter)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(sales)))
}

// GET /api/sales/{id}
#[utoipa::path(
    get,
    path = "/api/sales/{id}",
    tag = "Sales",
    responses(
        (status = 200, description = "Venda com itens", body = SaleDetail),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da venda"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_sale(
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

    let sale = app_state
        .sales_service
        .detail(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(sale)))
}

// ---
// Payload: UpdateSale (todos os campos opcionais)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSalePayload {
    pub organization_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,

    #[validate(length(min = 1, message = "items_required"), nested)]
    pub items: Option<Vec<SaleItemPayload>>,

    #[validate(custom(function = "validate_not_negative"))]
    pub discount_amount: Option<Decimal>,

    #[validate(custom(function = "validate_tax_rate"))]
    pub tax_rate: Option<Decimal>,

    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub status: Option<SaleStatus>,
}

// PUT /api/sales/{id}
#[utoipa::path(
    put,
    path = "/api/sales/{id}",
    tag = "Sales",
    request_body = UpdateSalePayload,
    responses(
        (status = 200, description = "Venda atualizada", body = SaleDetail),
        (status = 404, description = "Venda não encontrada"),
        (status = 409, description = "Transição inválida ou estoque insuficiente")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da venda"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_sale(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSalePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let update = SaleUpdate {
        customer_id: payload.customer_id,
        items: payload.items.as_deref().map(line_inputs),
        discount_amount: payload.discount_amount,
        tax_rate: payload.tax_rate,
        payment_method: payload.payment_method,
        notes: payload.notes,
        status: payload.status,
    };

    let sale = app_state
        .sales_service
        .update(&mut *rls_conn, organization_id, id, update)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(sale)))
}

// DELETE /api/sales/{id}
#[utoipa::path(
    delete,
    path = "/api/sales/{id}",
    tag = "Sales",
    responses(
        (status = 204, description = "Venda removida (estoque devolvido se estava concluída)"),
        (status = 404, description = "Venda não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da venda"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_sale(
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

    app_state
        .sales_service
        .delete(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// ---
// Relatório: vendas por dia
// ---
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SalesByDayParams {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

// GET /api/sales/reports/by-day
#[utoipa::path(
    get,
    path = "/api/sales/reports/by-day",
    tag = "Sales",
    responses(
        (status = 200, description = "Um balde por dia do intervalo", body = SalesByDayReport),
        (status = 400, description = "Intervalo inválido (máx. 366 dias)")
    ),
    params(
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        SalesByDayParams
    ),
    security(("api_jwt" = []))
)]
pub async fn sales_by_day(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Query(params): Query<SalesByDayParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .report_service
        .sales_by_day(&mut *rls_conn, organization_id, params.from, params.to)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}
