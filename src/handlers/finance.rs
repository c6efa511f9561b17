// src/handlers/finance.rs

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
    models::finance::{
        Expense, ExpenseCategory, ExpenseCategoryListResponse, Income, IncomeItem, IncomeItemListResponse,
        IncomeListResponse,
    },
    services::report_service::IncomeByItemReport,
};

/// Cadastro simples por nome (item de receita, categoria de despesa).
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamedPayload {
    pub organization_id: Option<Uuid>,

    #[validate(length(min = 1, max = 120, message = "length"))]
    #[schema(example = "Serviços")]
    pub name: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PeriodParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// =============================================================================
//  RECEITAS
// =============================================================================

// POST /api/income-items
#[utoipa::path(
    post,
    path = "/api/income-items",
    tag = "Finance",
    request_body = NamedPayload,
    responses(
        (status = 201, description = "Item de receita criado", body = IncomeItem),
        (status = 409, description = "Nome já usado")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_income_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<NamedPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let item = app_state
        .finance_service
        .create_income_item(&mut *rls_conn, organization_id, &payload.name)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(item)))
}

// GET /api/income-items
#[utoipa::path(
    get,
    path = "/api/income-items",
    tag = "Finance",
    responses((status = 200, description = "Itens de receita", body = IncomeItemListResponse)),
    params(("organizationId" = Uuid, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn list_income_items(
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

    let items = app_state
        .finance_service
        .list_income_items(&mut *rls_conn, organization_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(items)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIncomePayload {
    pub organization_id: Option<Uuid>,
    pub income_item_id: Uuid,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "1200.00")]
    pub amount: Decimal,

    #[schema(example = "2025-03-10")]
    pub income_date: NaiveDate,
    pub notes: Option<String>,
}

// POST /api/income
#[utoipa::path(
    post,
    path = "/api/income",
    tag = "Finance",
    request_body = CreateIncomePayload,
    responses(
        (status = 201, description = "Receita lançada", body = Income),
        (status = 404, description = "Item de receita não encontrado")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_income(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<CreateIncomePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let income = app_state
        .finance_service
        .create_income(
            &mut *rls_conn,
            organization_id,
            payload.income_item_id,
            payload.amount,
            payload.income_date,
            payload.notes,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(income)))
}

// GET /api/income
#[utoipa::path(
    get,
    path = "/api/income",
    tag = "Finance",
    responses((status = 200, description = "Receitas do período", body = IncomeListResponse)),
    params(
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        PeriodParams
    ),
    security(("api_jwt" = []))
)]
pub async fn list_incomes(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Query(params): Query<PeriodParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let incomes = app_state
        .finance_service
        .list_incomes(&mut *rls_conn, organization_id, params.from, params.to)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(incomes)))
}

// GET /api/income/by-item
#[utoipa::path(
    get,
    path = "/api/income/by-item",
    tag = "Finance",
    responses((status = 200, description = "Total por item; itens sem lançamento aparecem zerados", body = IncomeByItemReport)),
    params(
        ("organizationId" = Uuid, Query, description = "ID da organização"),
        PeriodParams
    ),
    security(("api_jwt" = []))
)]
pub async fn income_by_item(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Query(params): Query<PeriodParams>,
) -> Result<impl IntoResponse, ApiError> {
    let organization_id = org.require(&user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let report = app_state
        .report_service
        .income_by_item(&mut *rls_conn, organization_id, params.from, params.to)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(report)))
}

// =============================================================================
//  DESPESAS
// =============================================================================

// POST /api/expense-categories
#[utoipa::path(
    post,
    path = "/api/expense-categories",
    tag = "Finance",
    request_body = NamedPayload,
    responses(
        (status = 201, description = "Categoria criada", body = ExpenseCategory),
        (status = 409, description = "Nome já usado")
    ),
    params(("organizationId" = Option<Uuid>, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn create_expense_category(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Json(payload): Json<NamedPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let category = app_state
        .finance_service
        .create_expense_category(&mut *rls_conn, organization_id, &payload.name)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(category)))
}

// GET /api/expense-categories
#[utoipa::path(
    get,
    path = "/api/expense-categories",
    tag = "Finance",
    responses((status = 200, description = "Categorias de despesa", body = ExpenseCategoryListResponse)),
    params(("organizationId" = Uuid, Query, description = "ID da organização")),
    security(("api_jwt" = []))
)]
pub async fn list_expense_categories(
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

    let categories = app_state
        .finance_service
        .list_expense_categories(&mut *rls_conn, organization_id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(categories)))
}

// DELETE /api/expense-categories/{id}
#[utoipa::path(
    delete,
    path = "/api/expense-categories/{id}",
    tag = "Finance",
    responses(
        (status = 204, description = "Categoria removida"),
        (status = 404, description = "Categoria não encontrada"),
        (status = 409, description = "Categoria com despesas lançadas")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da categoria"),
        ("organizationId" = Uuid, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_expense_category(
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
        .finance_service
        .delete_expense_category(&mut *rls_conn, organization_id, id)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpensePayload {
    pub organization_id: Option<Uuid>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "350.00")]
    pub amount: Decimal,

    pub expense_date: NaiveDate,
    pub notes: Option<String>,
}

// POST /api/expense-categories/{id}/expenses
#[utoipa::path(
    post,
    path = "/api/expense-categories/{id}/expenses",
    tag = "Finance",
    request_body = CreateExpensePayload,
    responses(
        (status = 201, description = "Despesa lançada", body = Expense),
        (status = 404, description = "Categoria não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da categoria"),
        ("organizationId" = Option<Uuid>, Query, description = "ID da organização")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_expense(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    org: OrganizationQuery,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<CreateExpensePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let organization_id = org.resolve(payload.organization_id, &user)
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let mut rls_conn = get_rls_connection(&app_state, organization_id, &user)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let expense = app_state
        .finance_service
        .create_expense(
            &mut *rls_conn,
            organization_id,
            category_id,
            payload.amount,
            payload.expense_date,
            payload.notes,
        )
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(expense)))
}
