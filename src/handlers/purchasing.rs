// src/handlers/purchasing.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
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
    models::{
        purchasing::{
            Purchase, PurchaseDetail, PurchaseReturnDetail, PurchaseReturnListResponse, SupplierBalance,
            SupplierLedger, SupplierPayment,
        },
        sales::PaymentMethod,
    },
    services::purchase_service::{NewPurchase, NewSupplierPayment, PurchaseLineInput, ReturnLineInput},
};

// =============================================================================
//  1. COMPRAS
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemPayload {
    pub product_id: Uuid,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "10")]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "4.20")]
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchasePayload {
    pub organization_id: Option<Uuid>,
    pub outlet_id: Uuid,

    #[validate(length(min = 1, message = "items_required"), nested)]
    pub items: Vec<PurchaseItemPayload>,

    #[validate(custom(function = "validate_not_negative"))]
    #[serde(default)]
    pub discount_amount: Decimal,

    #[validate(custom(function = "validate_tax_rate"))]
    #[serde(default)]
    #[schema(example = "0.10")]
    pub tax_rate: Decimal,

    pub notes: Option<String>,
}

// POST /api/suppliers/{id}/purchases
#[utoipa::path(
    post,
    path = "/api/suppliers/{id}/purchases",
    tag = "Purchasing",
    request_body = CreatePurchasePayload,
    responses(
        (status = 201, description = "Compra registrada e estoque recebido", body = PurchaseDetail),
        (status = 404, description = "Fornecedor, ponto de venda ou produto não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do fornecedor"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_purchase(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(supplier_id): Path<Uuid>,
    Json(payload): Json<CreatePurchasePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewPurchase {
        supplier_id,
        outlet_id: payload.outlet_id,
        items: payload
            .items
            .iter()
            .map(|i| PurchaseLineInput { product_id: i.product_id, quantity: i.quantity, unit_cost: i.unit_cost })
            .collect(),
        discount_amount: payload.discount_amount,
        tax_rate: payload.tax_rate,
        notes: payload.notes,
    };

    let purchase = app_state
        .purchase_service
        .create_purchase(&mut *rls_conn, organization_id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(purchase)))
}

// GET /api/suppliers/{id}/purchases
#[utoipa::path(
    get,
    path = "/api/suppliers/{id}/purchases",
    tag = "Purchasing",
    responses((status = 200, description = "Compras do fornecedor", body = Vec<Purchase>)),
    params(
        ("id" = Uuid, Path, description = "ID do fornecedor"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_purchases(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let purchases = app_state
        .purchase_service
        .list_purchases(&mut *rls_conn, organization_id, supplier_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(purchases)))
}

// =============================================================================
//  2. PAGAMENTOS E EXTRATO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPaymentPayload {
    pub organization_id: Option<Uuid>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "500.00")]
    pub amount: Decimal,

    pub payment_method: PaymentMethod,

    /// Compra quitada por este pagamento, se houver.
    pub purchase_id: Option<Uuid>,
    pub notes: Option<String>,
}

// POST /api/suppliers/{id}/payments
#[utoipa::path(
    post,
    path = "/api/suppliers/{id}/payments",
    tag = "Purchasing",
    request_body = SupplierPaymentPayload,
    responses(
        (status = 201, description = "Pagamento registrado", body = SupplierPayment),
        (status = 404, description = "Fornecedor ou compra não encontrado"),
        (status = 409, description = "Pagamento maior que o saldo devedor")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do fornecedor"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn pay_supplier(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(supplier_id): Path<Uuid>,
    Json(payload): Json<SupplierPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewSupplierPayment {
        amount: payload.amount,
        payment_method: payload.payment_method,
        purchase_id: payload.purchase_id,
        notes: payload.notes,
    };

    let payment = app_state
        .purchase_service
        .pay_supplier(&mut *rls_conn, organization_id, supplier_id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(payment)))
}

// GET /api/suppliers/{id}/balance
#[utoipa::path(
    get,
    path = "/api/suppliers/{id}/balance",
    tag = "Purchasing",
    responses(
        (status = 200, description = "Saldo devedor do fornecedor", body = SupplierBalance),
        (status = 404, description = "Fornecedor não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do fornecedor"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn supplier_balance(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let balance = app_state
        .purchase_service
        .balance(&mut *rls_conn, organization_id, supplier_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(balance)))
}

// GET /api/suppliers/{id}/ledger
#[utoipa::path(
    get,
    path = "/api/suppliers/{id}/ledger",
    tag = "Purchasing",
    responses(
        (status = 200, description = "Extrato com saldo acumulado", body = SupplierLedger),
        (status = 404, description = "Fornecedor não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do fornecedor"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn supplier_ledger(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let ledger = app_state
        .purchase_service
        .ledger(&mut *rls_conn, organization_id, supplier_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(ledger)))
}

// =============================================================================
//  3. DEVOLUÇÕES
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnItemPayload {
    pub product_id: Uuid,

    #[validate(custom(function = "validate_positive"))]
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReturnPayload {
    pub organization_id: Option<Uuid>,
    pub purchase_id: Uuid,

    #[validate(length(min = 1, message = "items_required"), nested)]
    pub items: Vec<ReturnItemPayload>,

    #[schema(example = "Lote com avaria")]
    pub reason: Option<String>,
}

// POST /api/purchase-returns
#[utoipa::path(
    post,
    path = "/api/purchase-returns",
    tag = "Purchasing",
    request_body = CreateReturnPayload,
    responses(
        (status = 201, description = "Devolução registrada e estoque baixado", body = PurchaseReturnDetail),
        (status = 404, description = "Compra não encontrada"),
        (status = 409, description = "Quantidade maior que a comprada ou estoque insuficiente")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_return(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreateReturnPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let items = payload
        .items
        .iter()
        .map(|i| ReturnLineInput { product_id: i.product_id, quantity: i.quantity })
        .collect();

    let created = app_state
        .purchase_service
        .create_return(&mut *rls_conn, organization_id, payload.purchase_id, items, payload.reason)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListReturnsParams {
    pub purchase_id: Option<Uuid>,
}

// GET /api/purchase-returns
#[utoipa::path(
    get,
    path = "/api/purchase-returns",
    tag = "Purchasing",
    responses((status = 200, description = "Devoluções", body = PurchaseReturnListResponse)),
    params(
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        ListReturnsParams
    ),
    security(("api_jwt" = []))
)]
pub async fn list_returns(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Query(params): Query<ListReturnsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let returns = app_state
        .purchase_service
        .list_returns(&mut *rls_conn, organization_id, params.purchase_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(returns)))
}

// GET /api/purchase-returns/{id}
#[utoipa::path(
    get,
    path = "/api/purchase-returns/{id}",
    tag = "Purchasing",
    responses(
        (status = 200, description = "Devolução com itens", body = PurchaseReturnDetail),
        (status = 404, description = "Devolução não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da devolução"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_return(
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

    let detail = app_state
        .purchase_service
        .return_detail(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}
