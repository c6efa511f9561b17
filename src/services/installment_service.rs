// src/services/installment_service.rs

use chrono::{Months, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::InstallmentRepository,
    models::{
        installments::{Installment, InstallmentListResponse, InstallmentStatus, PlannedInstallment},
        sales::{Sale, SaleStatus},
    },
    services::entity_validator::EntityValidator,
};

pub const MAX_INSTALLMENTS: u32 = 60;

/// Divide `total` em `count` valores truncados no centavo; o último absorve
/// a sobra, então a soma é sempre exatamente `total`.
fn split_amounts(total: Decimal, count: u32) -> Result<Vec<Decimal>, AppError> {
    if count == 0 || count > MAX_INSTALLMENTS {
        return Err(AppError::InvalidField { field: "installmentPlan", code: "installment_count" });
    }
    let n = Decimal::from(count);
    let base = (total / n).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    // Toda parcela precisa de pelo menos um centavo
    if base <= Decimal::ZERO {
        return Err(AppError::InvalidAmount("valor insuficiente para o número de parcelas".into()));
    }
    let last = total - base * (n - Decimal::ONE);
    Ok((0..count).map(|i| if i + 1 == count { last } else { base }).collect())
}

/// Divide `total` em `count` parcelas mensais a partir de `first_due_date`.
pub fn split_plan(
    total: Decimal,
    count: u32,
    first_due_date: NaiveDate,
) -> Result<Vec<PlannedInstallment>, AppError> {
    let amounts = split_amounts(total, count)?;

    let mut plan = Vec::with_capacity(amounts.len());
    for (i, amount) in amounts.into_iter().enumerate() {
        let due_date = first_due_date
            .checked_add_months(Months::new(i as u32))
            .ok_or(AppError::InvalidField { field: "firstDueDate", code: "date_range" })?;
        plan.push(PlannedInstallment { sequence: i as i32 + 1, due_date, amount });
    }
    Ok(plan)
}

/// Redistribui o que falta pagar (`new_total` menos o já pago) entre as
/// parcelas em aberto. Vencimentos e sequência não mudam.
pub fn resplit_open(
    sale_id: Uuid,
    installments: &[Installment],
    new_total: Decimal,
) -> Result<Vec<(Uuid, Decimal)>, AppError> {
    let paid: Decimal = installments.iter().filter(|i| i.paid).map(|i| i.amount).sum();
    let open: Vec<&Installment> = installments.iter().filter(|i| !i.paid).collect();
    let remaining = new_total - paid;

    if open.is_empty() {
        return if remaining == Decimal::ZERO { Ok(vec![]) } else { Err(AppError::InstallmentPlanSettled(sale_id)) };
    }
    let amounts = split_amounts(remaining, open.len() as u32).map_err(|_| AppError::InstallmentPlanSettled(sale_id))?;
    Ok(open.iter().map(|i| i.id).zip(amounts).collect())
}

#[derive(Clone)]
pub struct InstallmentService {
    installment_repo: InstallmentRepository,
    validator: EntityValidator,
}

impl InstallmentService {
    pub fn new(installment_repo: InstallmentRepository, validator: EntityValidator) -> Self {
        Self { installment_repo, validator }
    }

    /// Grava um plano dentro da transação de quem chama (a venda usa este caminho).
    pub async fn create_plan_in_tx(
        &self,
        conn: &mut PgConnection,
        organization_id: Uuid,
        sale_id: Option<Uuid>,
        customer_id: Option<Uuid>,
        plan: &[PlannedInstallment],
    ) -> Result<Vec<Installment>, AppError> {
        let installments = self
            .installment_repo
            .insert_plan(&mut *conn, organization_id, sale_id, customer_id, plan)
            .await?;
        tracing::info!(
            "🧾 Plano de {} parcelas criado (venda {:?}, cliente {:?})",
            installments.len(),
            sale_id,
            customer_id
        );
        Ok(installments)
    }

    /// Acompanha uma venda alterada: cliente novo, total novo ou anulação.
    /// Roda na transação da própria alteração.
    pub async fn follow_sale_in_tx(
        &self,
        conn: &mut PgConnection,
        sale: &Sale,
        previous_total: Decimal,
        previous_customer: Option<Uuid>,
    ) -> Result<(), AppError> {
        let installments = self.installment_repo.for_sale_for_update(&mut *conn, sale.id).await?;
        if installments.is_empty() {
            return Ok(());
        }

        if let Some(customer_id) = sale.customer_id.filter(|c| Some(*c) != previous_customer) {
            self.installment_repo
                .reassign_customer_for_sale(&mut *conn, sale.id, customer_id)
                .await?;
        }

        if sale.status == SaleStatus::Voided {
            let removed = self.installment_repo.delete_unpaid_for_sale(&mut *conn, sale.id).await?;
            tracing::info!("🧾 Venda {} anulada: {} parcelas em aberto removidas", sale.id, removed);
            return Ok(());
        }

        if sale.total_amount != previous_total {
            let resplit = resplit_open(sale.id, &installments, sale.total_amount).inspect_err(|_| {
                tracing::warn!("Venda {}: parcelas em aberto não comportam o total {}", sale.id, sale.total_amount);
            })?;
            let (ids, amounts): (Vec<Uuid>, Vec<Decimal>) = resplit.into_iter().unzip();
            self.installment_repo.update_amounts(&mut *conn, &ids, &amounts).await?;
            tracing::info!("🧾 Venda {}: {} parcelas recalculadas", sale.id, ids.len());
        }
        Ok(())
    }

    /// Crediário avulso, ligado a um cliente (e opcionalmente a uma venda).
    #[allow(clippy::too_many_arguments)]
    pub async fn create_plan<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        customer_id: Uuid,
        sale_id: Option<Uuid>,
        total: Decimal,
        count: u32,
        first_due_date: NaiveDate,
    ) -> Result<InstallmentListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let plan = split_plan(total, count, first_due_date)?;

        let mut tx = executor.begin().await?;
        self.validator.ensure(&mut tx, EntityKind::Customer, organization_id, customer_id).await?;
        self.validator.ensure_opt(&mut tx, EntityKind::Sale, organization_id, sale_id).await?;

        let installments = self
            .create_plan_in_tx(&mut tx, organization_id, sale_id, Some(customer_id), &plan)
            .await?;
        tx.commit().await?;

        let total = installments.len() as i64;
        Ok(InstallmentListResponse { installments, total })
    }

    /// Normaliza as vencidas e lista, na mesma transação.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        sale_id: Option<Uuid>,
        customer_id: Option<Uuid>,
        status: Option<InstallmentStatus>,
    ) -> Result<InstallmentListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let today = Utc::now().date_naive();
        let changed = self.installment_repo.normalize_overdue(&mut *tx, organization_id, today).await?;
        if changed > 0 {
            tracing::info!("⏰ {} parcelas marcadas como vencidas", changed);
        }

        let installments = self
            .installment_repo
            .list(&mut *tx, organization_id, sale_id, customer_id, status)
            .await?;
        tx.commit().await?;

        let total = installments.len() as i64;
        Ok(InstallmentListResponse { installments, total })
    }

    pub async fn pay<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<Installment, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .installment_repo
            .find_for_update(&mut *tx, organization_id, id)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Installment, id })?;
        if current.paid {
            tracing::warn!("Parcela {} já estava paga", id);
            return Err(AppError::InstallmentAlreadyPaid(id));
        }

        let paid = self.installment_repo.mark_paid(&mut *tx, id, Utc::now()).await?;
        tx.commit().await?;

        tracing::info!("💰 Parcela {} paga", id);
        Ok(paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn last_installment_absorbs_rounding() {
        let plan = split_plan(dec!(100), 3, day(2025, 1, 10)).unwrap();

        let amounts: Vec<_> = plan.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
        assert_eq!(amounts.iter().sum::<Decimal>(), dec!(100));
    }

    #[test]
    fn due_dates_are_monthly_and_clamped_to_month_end() {
        let plan = split_plan(dec!(90), 3, day(2025, 1, 31)).unwrap();

        let dates: Vec<_> = plan.iter().map(|p| p.due_date).collect();
        assert_eq!(dates, vec![day(2025, 1, 31), day(2025, 2, 28), day(2025, 3, 31)]);
        assert_eq!(plan.iter().map(|p| p.sequence).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn sum_matches_total_for_awkward_amounts() {
        for (total, count) in [(dec!(10.01), 7), (dec!(0.05), 5), (dec!(1234.56), 12), (dec!(99.99), 60)] {
            let plan = split_plan(total, count, day(2025, 6, 1)).unwrap();
            assert_eq!(plan.len(), count as usize);
            assert_eq!(plan.iter().map(|p| p.amount).sum::<Decimal>(), total);
            assert!(plan.iter().all(|p| p.amount > Decimal::ZERO));
        }
    }

    fn stored(amount: Decimal, paid: bool, sequence: i32) -> Installment {
        let now = Utc::now();
        Installment {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            sale_id: None,
            customer_id: None,
            sequence,
            due_date: day(2025, sequence as u32, 10),
            amount,
            paid,
            paid_date: paid.then_some(now),
            status: if paid { InstallmentStatus::Paid } else { InstallmentStatus::Pending },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn repricing_spreads_the_rest_over_open_installments() {
        let sale = Uuid::new_v4();
        let plan = vec![stored(dec!(11.00), true, 1), stored(dec!(5.50), false, 2), stored(dec!(5.50), false, 3)];

        let resplit = resplit_open(sale, &plan, dec!(19.80)).unwrap();

        let ids: Vec<_> = resplit.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![plan[1].id, plan[2].id]);
        let amounts: Vec<_> = resplit.iter().map(|(_, a)| *a).collect();
        assert_eq!(amounts, vec![dec!(4.40), dec!(4.40)]);
    }

    #[test]
    fn fully_paid_plan_cannot_absorb_a_new_total() {
        let sale = Uuid::new_v4();
        let plan = vec![stored(dec!(11.00), true, 1), stored(dec!(11.00), true, 2)];

        assert!(resplit_open(sale, &plan, dec!(22.00)).unwrap().is_empty());
        assert!(matches!(resplit_open(sale, &plan, dec!(19.80)), Err(AppError::InstallmentPlanSettled(id)) if id == sale));
        // Total abaixo do já pago também não cabe
        let partly = vec![stored(dec!(11.00), true, 1), stored(dec!(11.00), false, 2)];
        assert!(matches!(resplit_open(sale, &partly, dec!(10.00)), Err(AppError::InstallmentPlanSettled(_))));
    }

    #[test]
    fn rejects_bad_counts_and_tiny_totals() {
        assert!(matches!(
            split_plan(dec!(100), 0, day(2025, 1, 1)),
            Err(AppError::InvalidField { code: "installment_count", .. })
        ));
        assert!(split_plan(dec!(100), 61, day(2025, 1, 1)).is_err());
        assert!(matches!(split_plan(dec!(0.02), 3, day(2025, 1, 1)), Err(AppError::InvalidAmount(_))));
    }
}

// Escrita atômica contra um banco real: rode com `cargo test -- --ignored` e DATABASE_URL definida.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::OwnershipRepository;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    fn service() -> InstallmentService {
        InstallmentService::new(InstallmentRepository, EntityValidator::new(OwnershipRepository))
    }

    async fn seed(pool: &PgPool) -> (Uuid, Uuid) {
        let org: Uuid = sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ('Loja', 'loja') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
        let customer: Uuid = sqlx::query_scalar("INSERT INTO customers (organization_id, name) VALUES ($1, 'Ana') RETURNING id")
            .bind(org)
            .fetch_one(pool)
            .await
            .unwrap();
        (org, customer)
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn listing_marks_past_due_installments_overdue(pool: PgPool) {
        let (org, customer) = seed(&pool).await;
        let svc = service();
        let first_due_date = Utc::now().date_naive() - chrono::Duration::days(45);
        let plan = svc.create_plan(&pool, org, customer, None, dec!(90), 3, first_due_date).await.unwrap();
        assert!(plan.installments.iter().all(|i| i.status == InstallmentStatus::Pending));
        let first = plan.installments.iter().find(|i| i.sequence == 1).unwrap();
        svc.pay(&pool, org, first.id).await.unwrap();

        let listed = svc.list(&pool, org, None, Some(customer), None).await.unwrap();

        let statuses: Vec<_> = listed.installments.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![InstallmentStatus::Paid, InstallmentStatus::Overdue, InstallmentStatus::Pending]
        );

        let overdue = svc.list(&pool, org, None, None, Some(InstallmentStatus::Overdue)).await.unwrap();
        assert_eq!(overdue.total, 1);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn overdue_installment_can_still_be_paid_once(pool: PgPool) {
        let (org, customer) = seed(&pool).await;
        let svc = service();
        let first_due_date = Utc::now().date_naive() - chrono::Duration::days(10);
        let plan = svc.create_plan(&pool, org, customer, None, dec!(50), 1, first_due_date).await.unwrap();
        svc.list(&pool, org, None, None, None).await.unwrap();
        let id = plan.installments[0].id;

        let paid = svc.pay(&pool, org, id).await.unwrap();

        assert!(paid.paid);
        assert_eq!(paid.status, InstallmentStatus::Paid);
        assert!(paid.paid_date.is_some());
        assert!(matches!(svc.pay(&pool, org, id).await, Err(AppError::InstallmentAlreadyPaid(i)) if i == id));
    }
}
