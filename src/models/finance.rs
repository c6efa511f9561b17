// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Receitas ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeItem {
    pub id: Uuid,
    pub organization_id: Uuid,
    #[schema(example = "Aluguel de espaço")]
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Income {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub income_item_id: Uuid,
    pub amount: Decimal,
    pub income_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeItemListResponse {
    pub income_items: Vec<IncomeItem>,
    pub total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IncomeListResponse {
    pub incomes: Vec<Income>,
    pub total: i64,
}

/// Um balde do relatório "receita por item". Item sem lançamento = zero.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeByItem {
    pub income_item_id: Uuid,
    pub name: String,
    pub total_amount: Decimal,
    pub entries: i64,
}

// --- Despesas ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategory {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub category_id: Uuid,
    pub amount: Decimal,
    pub expense_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategoryListResponse {
    pub expense_categories: Vec<ExpenseCategory>,
    pub total: i64,
}
