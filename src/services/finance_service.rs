// src/services/finance_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::FinanceRepository,
    models::finance::{
        Expense, ExpenseCategory, ExpenseCategoryListResponse, Income, IncomeItem, IncomeItemListResponse,
        IncomeListResponse,
    },
    services::entity_validator::EntityValidator,
};

fn ensure_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), AppError> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(AppError::InvalidField { field: "from", code: "date_range" }),
        _ => Ok(()),
    }
}

fn ensure_positive(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO {
        return Err(AppError::InvalidField { field: "amount", code: "positive" });
    }
    Ok(())
}

#[derive(Clone)]
pub struct FinanceService {
    repo: FinanceRepository,
    validator: EntityValidator,
}

impl FinanceService {
    pub fn new(repo: FinanceRepository, validator: EntityValidator) -> Self {
        Self { repo, validator }
    }

    // --- Receitas ---

    pub async fn list_income_items<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<IncomeItemListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let income_items = self.repo.list_income_items(executor, organization_id).await?;
        let total = income_items.len() as i64;
        Ok(IncomeItemListResponse { income_items, total })
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
        let item = self.repo.create_income_item(executor, organization_id, name).await?;
        tracing::info!("💰 Item de receita '{}' criado", item.name);
        Ok(item)
    }

    pub async fn list_incomes<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<IncomeListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        ensure_date_range(from, to)?;
        let incomes = self.repo.list_incomes(executor, organization_id, from, to).await?;
        let total = incomes.len() as i64;
        Ok(IncomeListResponse { incomes, total })
    }

    pub async fn create_income<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        income_item_id: Uuid,
        amount: Decimal,
        income_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Income, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_positive(amount)?;

        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::IncomeItem, organization_id, income_item_id).await?;
        let income = self
            .repo
            .create_income(&mut *tx, organization_id, income_item_id, amount, income_date, notes.as_deref())
            .await?;
        tx.commit().await?;

        tracing::info!("💰 Receita de {} lançada em {}", income.amount, income.income_date);
        Ok(income)
    }

    // --- Despesas ---

    pub async fn list_expense_categories<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
    ) -> Result<ExpenseCategoryListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expense_categories = self.repo.list_expense_categories(executor, organization_id).await?;
        let total = expense_categories.len() as i64;
        Ok(ExpenseCategoryListResponse { expense_categories, total })
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
        let category = self.repo.create_expense_category(executor, organization_id, name).await?;
        tracing::info!("🏷️ Categoria de despesa '{}' criada", category.name);
        Ok(category)
    }

    /// A FK `ON DELETE RESTRICT` é quem barra a remoção de categoria em uso.
    pub async fn delete_expense_category<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let deleted = self
            .repo
            .delete_expense_category(executor, organization_id, id)
            .await
            .inspect_err(|e| {
                if matches!(e, AppError::CategoryInUse(_)) {
                    tracing::warn!("Categoria {} ainda tem despesas", id);
                }
            })?;
        if !deleted {
            return Err(AppError::NotFound { entity: EntityKind::ExpenseCategory, id });
        }
        tracing::info!("🗑️ Categoria de despesa {} removida", id);
        Ok(())
    }

    pub async fn create_expense<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        category_id: Uuid,
        amount: Decimal,
        expense_date: NaiveDate,
        notes: Option<String>,
    ) -> Result<Expense, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ensure_positive(amount)?;

        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::ExpenseCategory, organization_id, category_id).await?;
        let expense = self
            .repo
            .create_expense(&mut *tx, organization_id, category_id, amount, expense_date, notes.as_deref())
            .await?;
        tx.commit().await?;

        tracing::info!("🧾 Despesa de {} lançada em {}", expense.amount, expense.expense_date);
        Ok(expense)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn date_range_must_be_ordered() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        assert!(ensure_date_range(Some(d(1)), Some(d(31))).is_ok());
        assert!(ensure_date_range(Some(d(1)), Some(d(1))).is_ok());
        assert!(ensure_date_range(None, Some(d(1))).is_ok());
        assert!(ensure_date_range(Some(d(2)), Some(d(1))).is_err());
    }

    #[test]
    fn amounts_must_be_positive() {
        assert!(ensure_positive(dec!(0.01)).is_ok());
        assert!(ensure_positive(dec!(0)).is_err());
        assert!(ensure_positive(dec!(-5)).is_err());
    }
}
