// src/db/ownership_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    models::inventory::Product,
};

/// Confere a posse de uma linha: existe e é da organização pedida.
/// Linha de outra organização é indistinguível de linha inexistente.
pub fn check_owner(
    kind: EntityKind,
    id: Uuid,
    owner: Option<Uuid>,
    organization_id: Uuid,
) -> Result<(), AppError> {
    match owner {
        Some(owner) if owner == organization_id => Ok(()),
        _ => Err(AppError::NotFound { entity: kind, id }),
    }
}

/// Primeiro id pedido que não voltou da consulta (a ordem do pedido manda).
pub fn first_missing(requested: &[Uuid], found: &[Uuid]) -> Option<Uuid> {
    requested.iter().copied().find(|id| !found.contains(id))
}

#[derive(Clone, Default)]
pub struct OwnershipRepository;

impl OwnershipRepository {
    /// Dono da linha, com trava `FOR SHARE` até o fim da transação.
    pub async fn owner_for_share<'e, E>(
        &self,
        executor: E,
        kind: EntityKind,
        id: Uuid,
    ) -> Result<Option<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Tabela e coluna vêm do enum, nunca da requisição
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1 FOR SHARE",
            kind.owner_column(),
            kind.table()
        );
        let owner = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(owner)
    }

    /// Ids (dentre os pedidos) que existem e são da organização, travados `FOR SHARE`.
    pub async fn owned_ids_for_share<'e, E>(
        &self,
        executor: E,
        kind: EntityKind,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Uuid>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT id FROM {} WHERE id = ANY($1) AND {} = $2 FOR SHARE",
            kind.table(),
            kind.owner_column()
        );
        let found = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(ids)
            .bind(organization_id)
            .fetch_all(executor)
            .await?;
        Ok(found)
    }

    /// Produtos em lote (a categoria é usada pelas promoções).
    pub async fn products_for_share<'e, E>(
        &self,
        executor: E,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE id = ANY($1) AND organization_id = $2
            FOR SHARE
            "#,
        )
        .bind(ids)
        .bind(organization_id)
        .fetch_all(executor)
        .await?;
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_owner_is_not_found() {
        let (org_a, org_b, id) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert!(check_owner(EntityKind::Customer, id, Some(org_a), org_a).is_ok());
        match check_owner(EntityKind::Customer, id, Some(org_b), org_a) {
            Err(AppError::NotFound { entity, id: missing }) => {
                assert_eq!(entity, EntityKind::Customer);
                assert_eq!(missing, id);
            }
            other => panic!("esperado NotFound, veio {:?}", other),
        }
        assert!(matches!(
            check_owner(EntityKind::Outlet, id, None, org_a),
            Err(AppError::NotFound { entity: EntityKind::Outlet, .. })
        ));
    }

    #[test]
    fn reports_first_missing_in_request_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(first_missing(&[a, b, c], &[c, a]), Some(b));
        assert_eq!(first_missing(&[a, b], &[b, a]), None);
    }
}
