// src/services/report_service.rs
//
// Relatórios agrupados. Todo valor da dimensão aparece, mesmo sem movimento.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Acquire, Executor, Postgres};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{finance_repo::IncomeTotal, FinanceRepository, SalesRepository},
    models::{
        finance::{IncomeByItem, IncomeItem},
        sales::SalesByDay,
    },
};

pub const MAX_REPORT_DAYS: i64 = 366;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeByItemReport {
    pub items: Vec<IncomeByItem>,
    pub total_amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalesByDayReport {
    pub days: Vec<SalesByDay>,
    pub sales_count: i64,
    pub total_amount: Decimal,
}

/// Um balde zerado por item, depois soma os totais encontrados.
pub fn income_buckets(items: &[IncomeItem], totals: &[IncomeTotal]) -> Vec<IncomeByItem> {
    let mut buckets: Vec<IncomeByItem> = items
        .iter()
        .map(|item| IncomeByItem {
            income_item_id: item.id,
            name: item.name.clone(),
            total_amount: Decimal::ZERO,
            entries: 0,
        })
        .collect();

    for total in totals {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.income_item_id == total.income_item_id) {
            bucket.total_amount += total.total_amount;
            bucket.entries += total.entries;
        }
    }
    buckets
}

/// Um dia por linha, do `from` ao `to` inclusive; dia sem venda sai zerado.
pub fn day_buckets(from: NaiveDate, to: NaiveDate, rows: &[SalesByDay]) -> Result<Vec<SalesByDay>, AppError> {
    let span = (to - from).num_days();
    if span < 0 || span >= MAX_REPORT_DAYS {
        return Err(AppError::InvalidField { field: "from", code: "date_range" });
    }

    let days = (0..=span)
        .map(|offset| {
            let day = from + Duration::days(offset);
            rows.iter().find(|r| r.day == day).cloned().unwrap_or(SalesByDay {
                day,
                sales_count: 0,
                total_amount: Decimal::ZERO,
            })
        })
        .collect();
    Ok(days)
}

#[derive(Clone)]
pub struct ReportService {
    finance_repo: FinanceRepository,
    sales_repo: SalesRepository,
}

impl ReportService {
    pub fn new(finance_repo: FinanceRepository, sales_repo: SalesRepository) -> Self {
        Self { finance_repo, sales_repo }
    }

    pub async fn income_by_item<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<IncomeByItemReport, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(AppError::InvalidField { field: "from", code: "date_range" });
            }
        }

        let mut conn = executor.acquire().await?;
        let items = self.finance_repo.list_income_items(&mut *conn, organization_id).await?;
        let totals = self.finance_repo.income_totals(&mut *conn, organization_id, from, to).await?;

        let items = income_buckets(&items, &totals);
        let total_amount = items.iter().map(|i| i.total_amount).sum();
        Ok(IncomeByItemReport { items, total_amount })
    }

    pub async fn sales_by_day<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<SalesByDayReport, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Valida o intervalo antes de ir ao banco
        day_buckets(from, to, &[])?;
        let rows = self.sales_repo.completed_by_day(executor, organization_id, from, to).await?;

        let days = day_buckets(from, to, &rows)?;
        let sales_count = days.iter().map(|d| d.sales_count).sum();
        let total_amount = days.iter().map(|d| d.total_amount).sum();
        Ok(SalesByDayReport { days, sales_count, total_amount })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn item(name: &str) -> IncomeItem {
        IncomeItem { id: Uuid::new_v4(), organization_id: Uuid::new_v4(), name: name.into(), created_at: Utc::now() }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, d).unwrap()
    }

    #[test]
    fn items_without_income_still_get_a_zero_row() {
        let items = [item("Aluguel"), item("Eventos"), item("Serviços")];

        let buckets = income_buckets(&items, &[]);

        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(|b| b.total_amount == Decimal::ZERO && b.entries == 0));
        assert_eq!(buckets[1].name, "Eventos");
    }

    #[test]
    fn totals_land_in_their_item_bucket() {
        let items = [item("Aluguel"), item("Eventos")];
        let totals = [IncomeTotal { income_item_id: items[1].id, total_amount: dec!(350.75), entries: 2 }];

        let buckets = income_buckets(&items, &totals);

        assert_eq!(buckets[0].total_amount, Decimal::ZERO);
        assert_eq!(buckets[1].total_amount, dec!(350.75));
        assert_eq!(buckets[1].entries, 2);
    }

    #[test]
    fn every_day_of_the_range_is_present() {
        let rows = [SalesByDay { day: day(3), sales_count: 4, total_amount: dec!(120) }];

        let days = day_buckets(day(1), day(5), &rows).unwrap();

        assert_eq!(days.len(), 5);
        assert_eq!(days[2].total_amount, dec!(120));
        assert_eq!(days[0].sales_count, 0);
        assert_eq!(days[4].day, day(5));
    }

    #[test]
    fn range_is_bounded() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(day_buckets(from, from + Duration::days(365), &[]).unwrap().len(), 366);
        assert!(day_buckets(from, from + Duration::days(366), &[]).is_err());
        assert!(day_buckets(day(2), day(1), &[]).is_err());
    }
}
