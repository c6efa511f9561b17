// src/handlers/delivery.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::get_rls_connection, error::{ApiError, AppError}},
    config::AppState,
    db::delivery_repo::{NewDeliveryPartner, NewShippingRate},
    handlers::validation::{validate_not_negative, validate_positive},
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationQuery},
    models::delivery::{
        DeliveryMethod, DeliveryPartnerListResponse, DeliveryPartnerStatus, DeliveryPartnerView,
        RateQuoteListResponse, Shipment, ShipmentListResponse, ShipmentStatus, ShippingRate,
        ShippingRateListResponse,
    },
    services::{
        delivery_service::{NewShipmentInput, ShipmentStatusChange},
        rate_engine::RateQuery,
    },
};

// =============================================================================
//  1. PARCEIROS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartnerPayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Rápido Entregas")]
    pub name: String,

    #[validate(email(message = "email"))]
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,

    /// Padrão: ACTIVE.
    pub status: Option<DeliveryPartnerStatus>,

    #[validate(length(min = 1, message = "required"))]
    pub supported_methods: Vec<DeliveryMethod>,

    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

// POST /api/delivery-partners
#[utoipa::path(
    post,
    path = "/api/delivery-partners",
    tag = "Delivery",
    request_body = CreatePartnerPayload,
    responses(
        (status = 201, description = "Parceiro cadastrado (credenciais mascaradas)", body = DeliveryPartnerView),
        (status = 409, description = "Nome já usado na organização")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_partner(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreatePartnerPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let new = NewDeliveryPartner {
        name: payload.name,
        contact_email: payload.contact_email,
        contact_phone: payload.contact_phone,
        status: payload.status.unwrap_or(DeliveryPartnerStatus::Active),
        supported_methods: payload.supported_methods,
        api_key: payload.api_key,
        api_secret: payload.api_secret,
    };

    let partner = app_state
        .delivery_service
        .create_partner(&mut *rls_conn, organization_id, new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(partner)))
}

// GET /api/delivery-partners
#[utoipa::path(
    get,
    path = "/api/delivery-partners",
    tag = "Delivery",
    responses((status = 200, description = "Parceiros da organização", body = DeliveryPartnerListResponse)),
    params(("organizationId" = Uuid, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn list_partners(
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

    let partners = app_state
        .delivery_service
        .list_partners(&mut *rls_conn, organization_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(partners)))
}

// GET /api/delivery-partners/{id}
#[utoipa::path(
    get,
    path = "/api/delivery-partners/{id}",
    tag = "Delivery",
    responses(
        (status = 200, description = "Parceiro", body = DeliveryPartnerView),
        (status = 404, description = "Parceiro não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do parceiro"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_partner(
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

    let partner = app_state
        .delivery_service
        .get_partner(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(partner)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PartnerStatusPayload {
    pub organization_id: Option<Uuid>,
    pub status: DeliveryPartnerStatus,
}

// PATCH /api/delivery-partners/{id}/status
#[utoipa::path(
    patch,
    path = "/api/delivery-partners/{id}/status",
    tag = "Delivery",
    request_body = PartnerStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = DeliveryPartnerView),
        (status = 404, description = "Parceiro não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do parceiro"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_partner_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
    Json(payload): Json<PartnerStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let partner = app_state
        .delivery_service
        .change_partner_status(&mut *rls_conn, organization_id, id, payload.status)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(partner)))
}

// DELETE /api/delivery-partners/{id}
#[utoipa::path(
    delete,
    path = "/api/delivery-partners/{id}",
    tag = "Delivery",
    responses(
        (status = 204, description = "Parceiro removido"),
        (status = 404, description = "Parceiro não encontrado"),
        (status = 409, description = "Parceiro com entregas em aberto")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do parceiro"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_partner(
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
        .delivery_service
        .delete_partner(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  2. TARIFAS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatePayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Expresso capital")]
    pub name: String,

    pub method: DeliveryMethod,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "15.00")]
    pub base_rate: Decimal,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "2.50")]
    pub per_kg_rate: Option<Decimal>,

    #[validate(custom(function = "validate_not_negative"))]
    pub min_weight: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub max_weight: Option<Decimal>,

    pub from_location: Option<String>,
    pub to_location: Option<String>,

    #[validate(range(min = 0, message = "not_negative"))]
    #[schema(example = 2)]
    pub estimated_delivery_days: i32,
}

// POST /api/delivery-partners/{id}/rates
#[utoipa::path(
    post,
    path = "/api/delivery-partners/{id}/rates",
    tag = "Delivery",
    request_body = CreateRatePayload,
    responses(
        (status = 201, description = "Tarifa criada", body = ShippingRate),
        (status = 400, description = "Método não atendido ou faixa de peso inválida"),
        (status = 404, description = "Parceiro não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do parceiro"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_rate(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(partner_id): Path<Uuid>,
    Json(payload): Json<CreateRatePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let new = NewShippingRate {
        delivery_partner_id: partner_id,
        name: payload.name,
        method: payload.method,
        base_rate: payload.base_rate,
        per_kg_rate: payload.per_kg_rate,
        min_weight: payload.min_weight,
        max_weight: payload.max_weight,
        from_location: payload.from_location,
        to_location: payload.to_location,
        estimated_delivery_days: payload.estimated_delivery_days,
    };

    let rate = app_state
        .delivery_service
        .create_rate(&mut *rls_conn, organization_id, new)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(rate)))
}

// GET /api/delivery-partners/{id}/rates
#[utoipa::path(
    get,
    path = "/api/delivery-partners/{id}/rates",
    tag = "Delivery",
    responses((status = 200, description = "Tarifas do parceiro", body = ShippingRateListResponse)),
    params(
        ("id" = Uuid, Path, description = "ID do parceiro"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_rates(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(partner_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let rates = app_state
        .delivery_service
        .list_rates(&mut *rls_conn, organization_id, Some(partner_id))
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(rates)))
}

// DELETE /api/delivery-partners/{id}/rates/{rate_id}
#[utoipa::path(
    delete,
    path = "/api/delivery-partners/{id}/rates/{rate_id}",
    tag = "Delivery",
    responses(
        (status = 204, description = "Tarifa removida"),
        (status = 404, description = "Tarifa não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do parceiro"),
        ("rate_id" = Uuid, Path, description = "ID da tarifa"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_rate(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path((partner_id, rate_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state
        .delivery_service
        .delete_rate(&mut *rls_conn, organization_id, partner_id, rate_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Dimensões são aceitas e ignoradas no cálculo.
#[derive(Debug, Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct DimensionsPayload {
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRatesPayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Curitiba")]
    pub to_location: String,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "3.5")]
    pub weight: Decimal,

    pub delivery_partner_id: Option<Uuid>,
    pub from_location: Option<String>,
    pub method: Option<DeliveryMethod>,

    #[allow(dead_code)]
    pub dimensions: Option<DimensionsPayload>,
}

// POST /api/delivery-partners/rates/calculate
#[utoipa::path(
    post,
    path = "/api/delivery-partners/rates/calculate",
    tag = "Delivery",
    request_body = CalculateRatesPayload,
    responses((status = 200, description = "Cotações ordenadas por custo (lista vazia é válida)", body = RateQuoteListResponse)),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn calculate_rates(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CalculateRatesPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let query = RateQuery {
        to_location: payload.to_location,
        weight: payload.weight,
        delivery_partner_id: payload.delivery_partner_id,
        from_location: payload.from_location,
        method: payload.method,
    };

    let quotes = app_state
        .delivery_service
        .calculate_rates(&mut *rls_conn, organization_id, &query)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(quotes)))
}

// =============================================================================
//  3. ENTREGAS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentPayload {
    pub organization_id: Option<Uuid>,
    pub delivery_partner_id: Uuid,
    pub sale_id: Option<Uuid>,

    /// Gerado quando ausente.
    #[validate(length(min = 1, message = "required"))]
    pub tracking_number: Option<String>,

    pub method: DeliveryMethod,
    pub from_location: Option<String>,

    #[validate(length(min = 1, message = "required"))]
    pub to_location: String,

    #[validate(custom(function = "validate_positive"))]
    pub weight: Decimal,

    /// Padrão: a cotação mais barata do parceiro.
    #[validate(custom(function = "validate_not_negative"))]
    pub shipping_cost: Option<Decimal>,

    pub estimated_delivery: Option<DateTime<Utc>>,
}

// POST /api/shipments
#[utoipa::path(
    post,
    path = "/api/shipments",
    tag = "Delivery",
    request_body = CreateShipmentPayload,
    responses(
        (status = 201, description = "Entrega criada com o evento PENDING", body = Shipment),
        (status = 400, description = "Método não atendido pelo parceiro"),
        (status = 404, description = "Parceiro ou venda não encontrado"),
        (status = 409, description = "Parceiro inativo ou código de rastreio repetido")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_shipment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreateShipmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let input = NewShipmentInput {
        delivery_partner_id: payload.delivery_partner_id,
        sale_id: payload.sale_id,
        tracking_number: payload.tracking_number,
        method: payload.method,
        from_location: payload.from_location,
        to_location: payload.to_location,
        weight: payload.weight,
        shipping_cost: payload.shipping_cost,
        estimated_delivery: payload.estimated_delivery,
    };

    let shipment = app_state
        .delivery_service
        .create_shipment(&mut *rls_conn, organization_id, input)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(shipment)))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListShipmentsParams {
    pub status: Option<ShipmentStatus>,
    pub delivery_partner_id: Option<Uuid>,
}

// GET /api/shipments
#[utoipa::path(
    get,
    path = "/api/shipments",
    tag = "Delivery",
    responses((status = 200, description = "Entregas da organização", body = ShipmentListResponse)),
    params(
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        ListShipmentsParams
    ),
    security(("api_jwt" = []))
)]
pub async fn list_shipments(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Query(params): Query<ListShipmentsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let shipments = app_state
        .delivery_service
        .list_shipments(&mut *rls_conn, organization_id, params.status, params.delivery_partner_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(shipments)))
}

// GET /api/shipments/{id}
#[utoipa::path(
    get,
    path = "/api/shipments/{id}",
    tag = "Delivery",
    responses(
        (status = 200, description = "Entrega com histórico de rastreio", body = Shipment),
        (status = 404, description = "Entrega não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da entrega"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_shipment(
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

    let shipment = app_state
        .delivery_service
        .get_shipment(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(shipment)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentStatusPayload {
    pub organization_id: Option<Uuid>,
    pub status: ShipmentStatus,
    #[schema(example = "Centro de distribuição - Curitiba")]
    pub location: Option<String>,
    pub description: Option<String>,
}

// PATCH /api/shipments/{id}/status
#[utoipa::path(
    patch,
    path = "/api/shipments/{id}/status",
    tag = "Delivery",
    request_body = ShipmentStatusPayload,
    responses(
        (status = 200, description = "Status alterado e evento anexado ao histórico", body = Shipment),
        (status = 404, description = "Entrega não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da entrega"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_shipment_status(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
    Json(payload): Json<ShipmentStatusPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let change = ShipmentStatusChange {
        status: payload.status,
        location: payload.location,
        description: payload.description,
    };

    let shipment = app_state
        .delivery_service
        .update_shipment_status(&mut *rls_conn, organization_id, id, change)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(shipment)))
}

// DELETE /api/shipments/{id}
#[utoipa::path(
    delete,
    path = "/api/shipments/{id}",
    tag = "Delivery",
    responses(
        (status = 204, description = "Entrega removida"),
        (status = 404, description = "Entrega não encontrada"),
        (status = 409, description = "Entrega em trânsito ou entregue")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da entrega"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_shipment(
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
        .delivery_service
        .delete_shipment(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
