// src/services/promotion_engine.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{db_utils::round_money, entity::EntityKind, error::AppError},
    db::{CustomerRepository, PromotionRepository},
    models::promotion::{
        Promotion, PromotionInput, PromotionListResponse, PromotionPatch, PromotionRejection,
        PromotionView,
    },
    services::entity_validator::EntityValidator,
};

// ===
// Avaliação pura
// ===

/// Item da transação visto pela promoção: produto e sua categoria.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibleItem {
    pub product_id: Uuid,
    pub category_id: Option<Uuid>,
}

/// O que se sabe do cliente na hora de avaliar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomerFacts {
    pub customer_id: Uuid,
    pub group_id: Option<Uuid>,
    pub redemptions: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluation<'a> {
    pub organization_id: Uuid,
    pub now: DateTime<Utc>,
    pub total_amount: Decimal,
    pub items: &'a [EligibleItem],
    pub customer: Option<CustomerFacts>,
}

/// Percentual sobre o total ou valor fixo; limitado ao teto e ao próprio total.
pub fn discount_amount(promotion: &Promotion, total_amount: Decimal) -> Decimal {
    let raw = if promotion.is_percentage {
        promotion.discount / Decimal::ONE_HUNDRED * total_amount
    } else {
        promotion.discount
    };

    let capped = match promotion.max_discount_amount {
        Some(max) => raw.min(max),
        None => raw,
    };

    round_money(capped.min(total_amount).max(Decimal::ZERO))
}

/// Regras na ordem: escopo, vigência, compra mínima, produtos/categorias,
/// grupo de clientes, limite por cliente. A primeira que falhar é a reportada.
pub fn evaluate(promotion: &Promotion, ev: &Evaluation<'_>) -> Result<Decimal, PromotionRejection> {
    if promotion.organization_id != ev.organization_id {
        return Err(PromotionRejection::InvalidScope);
    }

    if !promotion.is_active_at(ev.now) {
        return Err(PromotionRejection::NotActive);
    }

    if let Some(min) = promotion.min_purchase_amount {
        if ev.total_amount < min {
            return Err(PromotionRejection::BelowMinimumPurchase);
        }
    }

    if !promotion.product_ids.is_empty() || !promotion.category_ids.is_empty() {
        let eligible = ev.items.iter().any(|item| {
            promotion.product_ids.contains(&item.product_id)
                || item.category_id.is_some_and(|c| promotion.category_ids.contains(&c))
        });
        if !eligible {
            return Err(PromotionRejection::ProductNotEligible);
        }
    }

    if !promotion.customer_group_ids.is_empty() {
        let customer = ev.customer.ok_or(PromotionRejection::CustomerRequired)?;
        let in_group = customer
            .group_id
            .is_some_and(|g| promotion.customer_group_ids.contains(&g));
        if !in_group {
            return Err(PromotionRejection::CustomerGroupNotEligible);
        }
    }

    if let Some(limit) = promotion.limit_per_customer {
        let customer = ev.customer.ok_or(PromotionRejection::CustomerRequired)?;
        if customer.redemptions >= i64::from(limit) {
            return Err(PromotionRejection::UsageLimitReached);
        }
    }

    Ok(discount_amount(promotion, ev.total_amount))
}

/// Janela de datas e faixa do percentual.
pub fn check_promotion_input(input: &PromotionInput) -> Result<(), AppError> {
    if input.start_date >= input.end_date {
        return Err(AppError::InvalidField { field: "endDate", code: "date_window" });
    }
    if input.discount < Decimal::ZERO {
        return Err(AppError::InvalidField { field: "discount", code: "not_negative" });
    }
    if input.is_percentage && input.discount > Decimal::ONE_HUNDRED {
        return Err(AppError::InvalidField { field: "discount", code: "percentage_range" });
    }
    Ok(())
}

// ===
// Serviço (banco)
// ===

/// Como a promoção foi referenciada na requisição.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromotionRef {
    Id(Uuid),
    Code(String),
}

impl PromotionRef {
    /// Aceita id ou código, nunca os dois.
    pub fn from_parts(id: Option<Uuid>, code: Option<String>) -> Result<Option<Self>, AppError> {
        match (id, code) {
            (Some(_), Some(_)) => Err(AppError::InvalidField { field: "promotionCode", code: "promotion_ref" }),
            (Some(id), None) => Ok(Some(PromotionRef::Id(id))),
            (None, Some(code)) => Ok(Some(PromotionRef::Code(code))),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PromotionOutcome {
    Applied { promotion: Promotion, discount_amount: Decimal },
    Rejected(PromotionRejection),
}

#[derive(Clone)]
pub struct PromotionService {
    promotion_repo: PromotionRepository,
    customer_repo: CustomerRepository,
    validator: EntityValidator,
}

impl PromotionService {
    pub fn new(
        promotion_repo: PromotionRepository,
        customer_repo: CustomerRepository,
        validator: EntityValidator,
    ) -> Self {
        Self { promotion_repo, customer_repo, validator }
    }

    // --- CRUD ---

    pub async fn create<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        input: PromotionInput,
    ) -> Result<PromotionView, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        check_promotion_input(&input)?;

        let mut tx = executor.begin().await?;
        self.validator
            .ensure_all(&mut tx, EntityKind::Product, organization_id, &input.product_ids)
            .await?;
        self.validator
            .ensure_all(&mut tx, EntityKind::ProductCategory, organization_id, &input.category_ids)
            .await?;
        self.validator
            .ensure_all(&mut tx, EntityKind::CustomerGroup, organization_id, &input.customer_group_ids)
            .await?;

        let promotion = self.promotion_repo.create(&mut *tx, organization_id, &input).await?;
        tx.commit().await?;

        tracing::info!("🏷️ Promoção '{}' criada ({})", promotion.name, promotion.id);
        Ok(PromotionView::at(promotion, Utc::now()))
    }

    pub async fn list<'e, E>(&self, executor: E, organization_id: Uuid) -> Result<PromotionListResponse, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let now = Utc::now();
        let promotions: Vec<PromotionView> = self
            .promotion_repo
            .list(executor, organization_id)
            .await?
            .into_iter()
            .map(|p| PromotionView::at(p, now))
            .collect();
        let total = promotions.len() as i64;
        Ok(PromotionListResponse { promotions, total })
    }

    pub async fn get<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<PromotionView, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.promotion_repo
            .find(executor, organization_id, id)
            .await?
            .map(|p| PromotionView::at(p, Utc::now()))
            .ok_or(AppError::NotFound { entity: EntityKind::Promotion, id })
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        id: Uuid,
        patch: PromotionPatch,
    ) -> Result<PromotionView, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .promotion_repo
            .find_any_for_update(&mut *tx, id)
            .await?
            .filter(|p| p.organization_id == organization_id)
            .ok_or(AppError::NotFound { entity: EntityKind::Promotion, id })?;

        // Revalida a janela com os valores finais (campo novo + campo antigo)
        let input = patch.apply_to(current);
        check_promotion_input(&input)?;
        self.validator
            .ensure_all(&mut tx, EntityKind::Product, organization_id, &input.product_ids)
            .await?;
        self.validator
            .ensure_all(&mut tx, EntityKind::ProductCategory, organization_id, &input.category_ids)
            .await?;
        self.validator
            .ensure_all(&mut tx, EntityKind::CustomerGroup, organization_id, &input.customer_group_ids)
            .await?;

        let promotion = self
            .promotion_repo
            .update(&mut *tx, organization_id, id, &input)
            .await?
            .ok_or(AppError::NotFound { entity: EntityKind::Promotion, id })?;
        tx.commit().await?;

        tracing::info!("🏷️ Promoção {} atualizada", id);
        Ok(PromotionView::at(promotion, Utc::now()))
    }

    pub async fn delete<'e, E>(&self, executor: E, organization_id: Uuid, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.promotion_repo.delete(executor, organization_id, id).await? {
            return Err(AppError::NotFound { entity: EntityKind::Promotion, id });
        }
        tracing::info!("🗑️ Promoção {} removida", id);
        Ok(())
    }

    // --- MOTOR ---

    /// Resolve a promoção (travada `FOR UPDATE`) e avalia contra a transação proposta.
    /// Roda dentro da transação de quem chama; a venda usa o mesmo caminho.
    pub async fn evaluate_in_tx(
        &self,
        conn: &mut PgConnection,
        organization_id: Uuid,
        reference: &PromotionRef,
        customer_id: Option<Uuid>,
        total_amount: Decimal,
        items: &[EligibleItem],
    ) -> Result<PromotionOutcome, AppError> {
        let promotion = match reference {
            PromotionRef::Id(id) => self
                .promotion_repo
                .find_any_for_update(&mut *conn, *id)
                .await?
                .ok_or(AppError::NotFound { entity: EntityKind::Promotion, id: *id })?,
            PromotionRef::Code(code) => self
                .promotion_repo
                .find_by_code_for_update(&mut *conn, organization_id, code)
                .await?
                .ok_or_else(|| AppError::PromotionCodeNotFound(code.clone()))?,
        };

        // Promoção de outra organização: não olhamos cliente nenhum
        if promotion.organization_id != organization_id {
            return Ok(PromotionOutcome::Rejected(PromotionRejection::InvalidScope));
        }

        let customer = match customer_id {
            Some(customer_id) => {
                let customer = self
                    .customer_repo
                    .find(&mut *conn, organization_id, customer_id)
                    .await?
                    .ok_or(AppError::NotFound { entity: EntityKind::Customer, id: customer_id })?;
                let redemptions = match promotion.limit_per_customer {
                    Some(_) => {
                        self.promotion_repo
                            .count_redemptions(&mut *conn, promotion.id, customer_id)
                            .await?
                    }
                    None => 0,
                };
                Some(CustomerFacts { customer_id, group_id: customer.group_id, redemptions })
            }
            None => None,
        };

        let ev = Evaluation { organization_id, now: Utc::now(), total_amount, items, customer };
        match evaluate(&promotion, &ev) {
            Ok(discount_amount) => Ok(PromotionOutcome::Applied { promotion, discount_amount }),
            Err(reason) => {
                tracing::warn!("Promoção {} recusada: {:?}", promotion.id, reason);
                Ok(PromotionOutcome::Rejected(reason))
            }
        }
    }

    /// Endpoint de validação: só consulta, nada é gravado.
    pub async fn validate<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        reference: PromotionRef,
        customer_id: Option<Uuid>,
        total_amount: Decimal,
        product_ids: &[Uuid],
    ) -> Result<PromotionOutcome, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let products = self.validator.products(&mut tx, organization_id, product_ids).await?;
        let items: Vec<EligibleItem> = products
            .iter()
            .map(|p| EligibleItem { product_id: p.id, category_id: p.category_id })
            .collect();

        let outcome = self
            .evaluate_in_tx(&mut tx, organization_id, &reference, customer_id, total_amount, &items)
            .await?;

        // Só leitura: solta as travas sem gravar nada
        tx.rollback().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn promotion(org: Uuid) -> Promotion {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Promotion {
            id: Uuid::new_v4(),
            organization_id: org,
            name: "Verão".into(),
            code: Some("VERAO".into()),
            description: None,
            discount: dec!(10),
            is_percentage: true,
            start_date: start,
            end_date: start + Duration::days(30),
            min_purchase_amount: None,
            max_discount_amount: None,
            limit_per_customer: None,
            product_ids: vec![],
            category_ids: vec![],
            customer_group_ids: vec![],
            created_at: start,
            updated_at: start,
        }
    }

    fn eval<'a>(p: &Promotion, total: Decimal, items: &'a [EligibleItem], customer: Option<CustomerFacts>) -> Evaluation<'a> {
        Evaluation {
            organization_id: p.organization_id,
            now: p.start_date + Duration::days(1),
            total_amount: total,
            items,
            customer,
        }
    }

    fn item(category_id: Option<Uuid>) -> EligibleItem {
        EligibleItem { product_id: Uuid::new_v4(), category_id }
    }

    #[test]
    fn activity_window_is_inclusive() {
        let p = promotion(Uuid::new_v4());
        let one_sec = Duration::seconds(1);

        assert!(p.is_active_at(p.start_date));
        assert!(p.is_active_at(p.end_date));
        assert!(!p.is_active_at(p.start_date - one_sec));
        assert!(!p.is_active_at(p.end_date + one_sec));
    }

    #[test]
    fn percentage_discount_is_capped() {
        let p = Promotion { discount: dec!(20), max_discount_amount: Some(dec!(15)), ..promotion(Uuid::new_v4()) };
        assert_eq!(discount_amount(&p, dec!(1000)), dec!(15));
    }

    #[test]
    fn fixed_discount_never_exceeds_total() {
        let p = Promotion { discount: dec!(50), is_percentage: false, ..promotion(Uuid::new_v4()) };
        assert_eq!(discount_amount(&p, dec!(30)), dec!(30));
        assert_eq!(discount_amount(&p, dec!(80)), dec!(50));
    }

    #[test]
    fn percentage_discount_rounds_to_cents() {
        let p = Promotion { discount: dec!(12.5), ..promotion(Uuid::new_v4()) };
        // 12.5% de 10.03 = 1.25375
        assert_eq!(discount_amount(&p, dec!(10.03)), dec!(1.25));
    }

    #[test]
    fn other_organization_is_invalid_scope() {
        let p = promotion(Uuid::new_v4());
        let ev = Evaluation { organization_id: Uuid::new_v4(), ..eval(&p, dec!(100), &[], None) };
        assert_eq!(evaluate(&p, &ev), Err(PromotionRejection::InvalidScope));
    }

    #[test]
    fn expired_promotion_is_not_active() {
        let p = promotion(Uuid::new_v4());
        let ev = Evaluation { now: p.end_date + Duration::seconds(1), ..eval(&p, dec!(100), &[], None) };
        assert_eq!(evaluate(&p, &ev), Err(PromotionRejection::NotActive));
    }

    #[test]
    fn minimum_purchase_is_enforced() {
        let p = Promotion { min_purchase_amount: Some(dec!(50)), ..promotion(Uuid::new_v4()) };
        assert_eq!(evaluate(&p, &eval(&p, dec!(49.99), &[], None)), Err(PromotionRejection::BelowMinimumPurchase));
        assert_eq!(evaluate(&p, &eval(&p, dec!(50), &[], None)), Ok(dec!(5)));
    }

    #[test]
    fn product_or_category_scope_needs_one_matching_item() {
        let category = Uuid::new_v4();
        let p = Promotion { category_ids: vec![category], ..promotion(Uuid::new_v4()) };

        let unrelated = [item(None), item(Some(Uuid::new_v4()))];
        assert_eq!(evaluate(&p, &eval(&p, dec!(100), &unrelated, None)), Err(PromotionRejection::ProductNotEligible));

        let one_match = [item(None), item(Some(category))];
        assert_eq!(evaluate(&p, &eval(&p, dec!(100), &one_match, None)), Ok(dec!(10)));

        let target = item(None);
        let by_product = Promotion { product_ids: vec![target.product_id], ..promotion(p.organization_id) };
        assert_eq!(evaluate(&by_product, &eval(&by_product, dec!(100), &[target], None)), Ok(dec!(10)));
    }

    #[test]
    fn customer_group_scope() {
        let group = Uuid::new_v4();
        let p = Promotion { customer_group_ids: vec![group], ..promotion(Uuid::new_v4()) };
        let facts = |group_id| CustomerFacts { customer_id: Uuid::new_v4(), group_id, redemptions: 0 };

        assert_eq!(evaluate(&p, &eval(&p, dec!(100), &[], None)), Err(PromotionRejection::CustomerRequired));
        assert_eq!(
            evaluate(&p, &eval(&p, dec!(100), &[], Some(facts(None)))),
            Err(PromotionRejection::CustomerGroupNotEligible)
        );
        assert_eq!(evaluate(&p, &eval(&p, dec!(100), &[], Some(facts(Some(group))))), Ok(dec!(10)));
    }

    #[test]
    fn usage_limit_per_customer() {
        let p = Promotion { limit_per_customer: Some(2), ..promotion(Uuid::new_v4()) };
        let facts = |redemptions| CustomerFacts { customer_id: Uuid::new_v4(), group_id: None, redemptions };

        assert_eq!(evaluate(&p, &eval(&p, dec!(100), &[], None)), Err(PromotionRejection::CustomerRequired));
        assert_eq!(evaluate(&p, &eval(&p, dec!(100), &[], Some(facts(1)))), Ok(dec!(10)));
        assert_eq!(
            evaluate(&p, &eval(&p, dec!(100), &[], Some(facts(2)))),
            Err(PromotionRejection::UsageLimitReached)
        );
    }

    #[test]
    fn input_window_and_percentage_are_checked() {
        let base = PromotionInput::from(promotion(Uuid::new_v4()));

        let inverted = PromotionInput { end_date: base.start_date, ..base.clone() };
        assert!(matches!(
            check_promotion_input(&inverted),
            Err(AppError::InvalidField { code: "date_window", .. })
        ));

        let too_much = PromotionInput { discount: dec!(101), ..base.clone() };
        assert!(matches!(
            check_promotion_input(&too_much),
            Err(AppError::InvalidField { code: "percentage_range", .. })
        ));

        let fixed = PromotionInput { discount: dec!(250), is_percentage: false, ..base.clone() };
        assert!(check_promotion_input(&fixed).is_ok());
    }

    #[test]
    fn patch_keeps_untouched_fields() {
        let current = promotion(Uuid::new_v4());
        let input = PromotionPatch { discount: Some(dec!(15)), ..Default::default() }.apply_to(current.clone());

        assert_eq!(input.discount, dec!(15));
        assert_eq!(input.name, current.name);
        assert_eq!(input.end_date, current.end_date);
    }

    #[test]
    fn reference_accepts_id_or_code_not_both() {
        let id = Uuid::new_v4();
        assert_eq!(PromotionRef::from_parts(Some(id), None).unwrap(), Some(PromotionRef::Id(id)));
        assert_eq!(PromotionRef::from_parts(None, None).unwrap(), None);
        assert!(PromotionRef::from_parts(Some(id), Some("X".into())).is_err());
    }
}

// Escrita atômica contra um banco real: rode com `cargo test -- --ignored` e DATABASE_URL definida.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::OwnershipRepository;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use sqlx::PgPool;

    fn service() -> PromotionService {
        PromotionService::new(PromotionRepository, CustomerRepository, EntityValidator::new(OwnershipRepository))
    }

    async fn seed_org(pool: &PgPool, slug: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO organizations (name, slug) VALUES ($1, $1) RETURNING id")
            .bind(slug)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_category(pool: &PgPool, org: Uuid) -> Uuid {
        sqlx::query_scalar("INSERT INTO product_categories (organization_id, name) VALUES ($1, 'Bebidas') RETURNING id")
            .bind(org)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn input(code: &str, category_ids: Vec<Uuid>) -> PromotionInput {
        let now = Utc::now();
        PromotionInput {
            name: "Semana da bebida".into(),
            code: Some(code.into()),
            description: None,
            discount: dec!(10),
            is_percentage: true,
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(7),
            min_purchase_amount: None,
            max_discount_amount: None,
            limit_per_customer: None,
            product_ids: vec![],
            category_ids,
            customer_group_ids: vec![],
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn categories_must_belong_to_the_organization(pool: PgPool) {
        let org = seed_org(&pool, "loja").await;
        let other = seed_org(&pool, "outra").await;
        let own = seed_category(&pool, org).await;
        let foreign = seed_category(&pool, other).await;
        let svc = service();

        let err = svc.create(&pool, org, input("BEBIDA", vec![own, foreign])).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: EntityKind::ProductCategory, id } if id == foreign));

        let made_up = Uuid::new_v4();
        let err = svc.create(&pool, org, input("BEBIDA", vec![made_up])).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: EntityKind::ProductCategory, id } if id == made_up));

        let created = svc.create(&pool, org, input("BEBIDA", vec![own])).await.unwrap();
        let patch = PromotionPatch { category_ids: Some(vec![foreign]), ..Default::default() };
        let err = svc.update(&pool, org, created.promotion.id, patch).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { entity: EntityKind::ProductCategory, .. }));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn validation_finds_promotion_by_code(pool: PgPool) {
        let org = seed_org(&pool, "loja").await;
        let category = seed_category(&pool, org).await;
        let product: Uuid = sqlx::query_scalar(
            "INSERT INTO products (organization_id, category_id, name, sku, selling_price) VALUES ($1, $2, 'Suco', 'SUC-1', 8) RETURNING id",
        )
        .bind(org)
        .bind(category)
        .fetch_one(&pool)
        .await
        .unwrap();
        let svc = service();
        svc.create(&pool, org, input("BEBIDA", vec![category])).await.unwrap();

        let outcome = svc
            .validate(&pool, org, PromotionRef::Code("BEBIDA".into()), None, dec!(80), &[product])
            .await
            .unwrap();
        assert!(matches!(outcome, PromotionOutcome::Applied { discount_amount, .. } if discount_amount == dec!(8.00)));

        let err = svc
            .validate(&pool, org, PromotionRef::Code("OUTRO".into()), None, dec!(80), &[product])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PromotionCodeNotFound(_)));
    }
}
