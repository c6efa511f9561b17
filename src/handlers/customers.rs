// src/handlers/customers.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::get_rls_connection, error::{ApiError, AppError}},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale, organization::OrganizationQuery},
    models::customers::{Customer, CustomerGroup, CustomerGroupDeleted, CustomerGroupListResponse},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerGroupPayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, max = 120, message = "length"))]
    #[schema(example = "Atacado")]
    pub name: String,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerGroupPayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, max = 120, message = "length"))]
    pub name: Option<String>,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignMembersPayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, message = "required"))]
    pub customer_ids: Vec<Uuid>,
}

// POST /api/customer-groups
#[utoipa::path(
    post,
    path = "/api/customer-groups",
    tag = "Customers",
    request_body = CustomerGroupPayload,
    responses(
        (status = 201, description = "Grupo criado", body = CustomerGroup),
        (status = 409, description = "Nome já usado na organização")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_group(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CustomerGroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let group = app_state
        .customer_service
        .create_group(&mut *rls_conn, organization_id, &payload.name, payload.description.as_deref())
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(group)))
}

// GET /api/customer-groups
#[utoipa::path(
    get,
    path = "/api/customer-groups",
    tag = "Customers",
    responses((status = 200, description = "Grupos com a contagem de membros", body = CustomerGroupListResponse)),
    params(("organizationId" = Uuid, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn list_groups(
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

    let groups = app_state
        .customer_service
        .list_groups(&mut *rls_conn, organization_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(groups)))
}

// GET /api/customer-groups/{id}
#[utoipa::path(
    get,
    path = "/api/customer-groups/{id}",
    tag = "Customers",
    responses(
        (status = 200, description = "Grupo", body = CustomerGroup),
        (status = 404, description = "Grupo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do grupo"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_group(
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

    let group = app_state
        .customer_service
        .get_group(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(group)))
}

// PUT /api/customer-groups/{id}
#[utoipa::path(
    put,
    path = "/api/customer-groups/{id}",
    tag = "Customers",
    request_body = UpdateCustomerGroupPayload,
    responses(
        (status = 200, description = "Grupo atualizado", body = CustomerGroup),
        (status = 404, description = "Grupo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do grupo"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_group(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerGroupPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let group = app_state
        .customer_service
        .update_group(
            &mut *rls_conn,
            organization_id,
            id,
            payload.name.as_deref(),
            payload.description.as_deref(),
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(group)))
}

// DELETE /api/customer-groups/{id}
#[utoipa::path(
    delete,
    path = "/api/customer-groups/{id}",
    tag = "Customers",
    responses(
        (status = 200, description = "Grupo removido; membros ficam sem grupo", body = CustomerGroupDeleted),
        (status = 404, description = "Grupo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do grupo"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_group(
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

    let deleted = app_state
        .customer_service
        .delete_group(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(deleted)))
}

// GET /api/customer-groups/{id}/members
#[utoipa::path(
    get,
    path = "/api/customer-groups/{id}/members",
    tag = "Customers",
    responses(
        (status = 200, description = "Clientes do grupo", body = Vec<Customer>),
        (status = 404, description = "Grupo não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do grupo"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_members(
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

    let members = app_state
        .customer_service
        .members(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(members)))
}

// POST /api/customer-groups/{id}/members
#[utoipa::path(
    post,
    path = "/api/customer-groups/{id}/members",
    tag = "Customers",
    request_body = AssignMembersPayload,
    responses(
        (status = 200, description = "Membros atuais do grupo", body = Vec<Customer>),
        (status = 404, description = "Grupo ou cliente não encontrado")
    ),
    params(
        ("id" = Uuid, Path, description = "ID do grupo"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_members(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignMembersPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let members = app_state
        .customer_service
        .assign_members(&mut *rls_conn, organization_id, id, &payload.customer_ids)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(members)))
}
