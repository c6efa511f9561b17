// src/db/finance_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, FromRow, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{is_foreign_key_violation, is_unique_violation},
        error::AppError,
    },
    models::finance::{Expense, ExpenseCategory, Income, IncomeItem},
};

/// Soma dos lançamentos de um item no período (só itens com movimento).
#[derive(Debug, Clone, FromRow)]
pub struct IncomeTotal {
    pub income_item_id: Uuid,
    pub total_amount: Decimal,
    pub entries: i64,
}

#[derive(Clone, Default)]
pub struct FinanceRepository;

impl FinanceRepository {
    // =========================================================================
    //  ITENS DE RECEITA
    // =========================================================================

    pub async fn list_income_items<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<Vec<IncomeItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, IncomeItem>(
            "SELECT * FROM income_items WHERE organization_id = $1 ORDER BY name ASC",
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(items)
    }

    pub async fn create_income_item<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        name: &str,
    ) -> Result<IncomeItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, IncomeItem>(
            "INSERT INTO income_items (organization_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(organization_id)
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::UniqueConstraintViolation(format!("income item {}", name));
            }
            e.into()
        })
    }

    // =========================================================================
    //  RECEITAS
    // =========================================================================

    pub async fn list_incomes<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<Income>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let incomes = sqlx::query_as::<_, Income>(
            r#"
            SELECT * FROM incomes
            WHERE organization_id = $1
              AND ($2::date IS NULL OR income_date >= $2)
              AND ($3::date IS NULL OR income_date <= $3)
            ORDER BY income_date DESC
            "#,
        )
        .bind(organization_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(incomes)
    }

    pub async fn create_income<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        income_item_id: Uuid,
        amount: Decimal,
        income_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<Income, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let income = sqlx::query_as::<_, Income>(
            r#"
            INSERT INTO incomes (organization_id, income_item_id, amount, income_date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(income_item_id)
        .bind(amount)
        .bind(income_date)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(income)
    }

    pub async fn income_totals<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<IncomeTotal>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let totals = sqlx::query_as::<_, IncomeTotal>(
            r#"
            SELECT income_item_id, SUM(amount) AS total_amount, COUNT(*) AS entries
            FROM incomes
            WHERE organization_id = $1
              AND ($2::date IS NULL OR income_date >= $2)
              AND ($3::date IS NULL OR income_date <= $3)
            GROUP BY income_item_id
            "#,
        )
        .bind(organization_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;
        Ok(totals)
    }

    // =========================================================================
    //  CATEGORIAS DE DESPESA
    // =========================================================================

    pub async fn list_expense_categories<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<Vec<ExpenseCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let categories = sqlx::query_as::<_, ExpenseCategory>(
            "SELECT * FROM expense_categories WHERE organization_id = $1 ORDER BY name ASC",
        )
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(categories)
    }

    pub async fn create_expense_category<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        name: &str,
    ) -> Result<ExpenseCategory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ExpenseCategory>(
            "INSERT INTO expense_categories (organization_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(organization_id)
        .bind(name)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::UniqueConstraintViolation(format!("expense category {}", name));
            }
            e.into()
        })
    }

    /// `ON DELETE RESTRICT` em `expenses` é quem barra a remoção de categoria em uso.
    pub async fn delete_expense_category<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM expense_categories WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(executor)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    return AppError::CategoryInUse(id);
                }
                AppError::from(e)
            })?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  DESPESAS
    // =========================================================================

    pub async fn create_expense<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        category_id: Uuid,
        amount: Decimal,
        expense_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<Expense, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expense = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (organization_id, category_id, amount, expense_date, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(organization_id)
        .bind(category_id)
        .bind(amount)
        .bind(expense_date)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(expense)
    }
}
