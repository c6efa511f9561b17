// src/handlers/promotions.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::get_rls_connection, error::{ApiError, AppError}},
    config::AppState,
    handlers::validation::{validate_not_negative, validate_positive},
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationQuery},
    models::promotion::{PromotionInput, PromotionListResponse, PromotionPatch, PromotionValidation, PromotionView},
    services::promotion_engine::{PromotionOutcome, PromotionRef},
};

// =============================================================================
//  1. CRUD
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePromotionPayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "Black Friday")]
    pub name: String,

    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "BLACK10")]
    pub code: Option<String>,
    pub description: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "10")]
    pub discount: Decimal,
    #[serde(default)]
    pub is_percentage: bool,

    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    #[validate(custom(function = "validate_not_negative"))]
    pub min_purchase_amount: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub max_discount_amount: Option<Decimal>,
    #[validate(range(min = 1, message = "positive"))]
    pub limit_per_customer: Option<i32>,

    #[serde(default)]
    pub product_ids: Vec<Uuid>,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    #[serde(default)]
    pub customer_group_ids: Vec<Uuid>,
}

impl From<CreatePromotionPayload> for PromotionInput {
    fn from(p: CreatePromotionPayload) -> Self {
        PromotionInput {
            name: p.name,
            code: p.code,
            description: p.description,
            discount: p.discount,
            is_percentage: p.is_percentage,
            start_date: p.start_date,
            end_date: p.end_date,
            min_purchase_amount: p.min_purchase_amount,
            max_discount_amount: p.max_discount_amount,
            limit_per_customer: p.limit_per_customer,
            product_ids: p.product_ids,
            category_ids: p.category_ids,
            customer_group_ids: p.customer_group_ids,
        }
    }
}

// POST /api/promotions
#[utoipa::path(
    post,
    path = "/api/promotions",
    tag = "Promotions",
    request_body = CreatePromotionPayload,
    responses(
        (status = 201, description = "Promoção criada", body = PromotionView),
        (status = 400, description = "Janela de datas ou porcentagem inválida"),
        (status = 409, description = "Código já usado na organização")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreatePromotionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let promotion = app_state
        .promotion_service
        .create(&mut *rls_conn, organization_id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(promotion)))
}

// GET /api/promotions
#[utoipa::path(
    get,
    path = "/api/promotions",
    tag = "Promotions",
    responses((status = 200, description = "Promoções com o indicador isActive", body = PromotionListResponse)),
    params(("organizationId" = Uuid, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn list_promotions(
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

    let promotions = app_state
        .promotion_service
        .list(&mut *rls_conn, organization_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(promotions)))
}

// GET /api/promotions/{id}
#[utoipa::path(
    get,
    path = "/api/promotions/{id}",
    tag = "Promotions",
    responses(
        (status = 200, description = "Promoção", body = PromotionView),
        (status = 404, description = "Promoção não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da promoção"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_promotion(
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

    let promotion = app_state
        .promotion_service
        .get(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(promotion)))
}

// Campo presente sobrescreve; campo ausente mantém o valor atual
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePromotionPayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "required"))]
    pub code: Option<String>,
    pub description: Option<String>,

    #[validate(custom(function = "validate_not_negative"))]
    pub discount: Option<Decimal>,
    pub is_percentage: Option<bool>,

    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,

    #[validate(custom(function = "validate_not_negative"))]
    pub min_purchase_amount: Option<Decimal>,
    #[validate(custom(function = "validate_not_negative"))]
    pub max_discount_amount: Option<Decimal>,
    #[validate(range(min = 1, message = "positive"))]
    pub limit_per_customer: Option<i32>,

    pub product_ids: Option<Vec<Uuid>>,
    pub category_ids: Option<Vec<Uuid>>,
    pub customer_group_ids: Option<Vec<Uuid>>,
}

impl From<UpdatePromotionPayload> for PromotionPatch {
    fn from(p: UpdatePromotionPayload) -> Self {
        PromotionPatch {
            name: p.name,
            code: p.code,
            description: p.description,
            discount: p.discount,
            is_percentage: p.is_percentage,
            start_date: p.start_date,
            end_date: p.end_date,
            min_purchase_amount: p.min_purchase_amount,
            max_discount_amount: p.max_discount_amount,
            limit_per_customer: p.limit_per_customer,
            product_ids: p.product_ids,
            category_ids: p.category_ids,
            customer_group_ids: p.customer_group_ids,
        }
    }
}

// PUT /api/promotions/{id}
#[utoipa::path(
    put,
    path = "/api/promotions/{id}",
    tag = "Promotions",
    request_body = UpdatePromotionPayload,
    responses(
        (status = 200, description = "Promoção atualizada", body = PromotionView),
        (status = 400, description = "Janela de datas inválida"),
        (status = 404, description = "Promoção não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da promoção"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePromotionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let promotion = app_state
        .promotion_service
        .update(&mut *rls_conn, organization_id, id, payload.into())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(promotion)))
}

// DELETE /api/promotions/{id}
#[utoipa::path(
    delete,
    path = "/api/promotions/{id}",
    tag = "Promotions",
    responses(
        (status = 204, description = "Promoção removida"),
        (status = 404, description = "Promoção não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da promoção"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_promotion(
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
        .promotion_service
        .delete(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  2. VALIDAÇÃO
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromotionItemPayload {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValidatePromotionPayload {
    pub organization_id: Option<Uuid>,
    pub promotion_id: Option<Uuid>,
    pub promotion_code: Option<String>,
    pub customer_id: Option<Uuid>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "150.00")]
    pub total_amount: Decimal,

    #[serde(default)]
    pub items: Vec<PromotionItemPayload>,
}

// POST /api/promotions/validate
// Recusa é resposta normal (200, valid = false); só erro de entrada vira 4xx.
#[utoipa::path(
    post,
    path = "/api/promotions/validate",
    tag = "Promotions",
    request_body = ValidatePromotionPayload,
    responses(
        (status = 200, description = "Resultado da validação", body = PromotionValidation),
        (status = 404, description = "Promoção não encontrada")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn validate_promotion(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<ValidatePromotionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    let reference = PromotionRef::from_parts(payload.promotion_id, payload.promotion_code)
        .and_then(|r| r.ok_or(AppError::InvalidField { field: "promotionId", code: "required" }))
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let product_ids: Vec<Uuid> = payload.items.iter().map(|i| i.product_id).collect();
    let outcome = app_state
        .promotion_service
        .validate(&mut *rls_conn, organization_id, reference, payload.customer_id, payload.total_amount, &product_ids)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let body = match outcome {
        PromotionOutcome::Applied { promotion, discount_amount } => {
            PromotionValidation::accepted(promotion.id, promotion.discount, discount_amount)
        }
        PromotionOutcome::Rejected(reason) => {
            let message = app_state.i18n_store.translate(&locale.0, reason.message_key(), &[]);
            PromotionValidation::rejected(reason, message)
        }
    };

    Ok((StatusCode::OK, Json(body)))
}
