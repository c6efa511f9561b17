// src/services/entity_validator.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::AppError},
    db::{
        ownership_repo::{check_owner, first_missing},
        OwnershipRepository,
    },
    models::inventory::Product,
};

/// Confere, dentro da transação de escrita, que toda entidade referenciada
/// existe e é da organização. As linhas ficam travadas `FOR SHARE` até o commit.
#[derive(Clone)]
pub struct EntityValidator {
    ownership_repo: OwnershipRepository,
}

impl EntityValidator {
    pub fn new(ownership_repo: OwnershipRepository) -> Self {
        Self { ownership_repo }
    }

    pub async fn ensure(
        &self,
        conn: &mut PgConnection,
        kind: EntityKind,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<(), AppError> {
        let owner = self.ownership_repo.owner_for_share(&mut *conn, kind, id).await?;
        check_owner(kind, id, owner, organization_id)
    }

    pub async fn ensure_opt(
        &self,
        conn: &mut PgConnection,
        kind: EntityKind,
        organization_id: Uuid,
        id: Option<Uuid>,
    ) -> Result<(), AppError> {
        match id {
            Some(id) => self.ensure(conn, kind, organization_id, id).await,
            None => Ok(()),
        }
    }

    /// Valida um lote numa consulta só; o primeiro id faltante é o reportado.
    pub async fn ensure_all(
        &self,
        conn: &mut PgConnection,
        kind: EntityKind,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), AppError> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self
            .ownership_repo
            .owned_ids_for_share(&mut *conn, kind, organization_id, ids)
            .await?;
        match first_missing(ids, &found) {
            Some(id) => Err(AppError::NotFound { entity: kind, id }),
            None => Ok(()),
        }
    }

    pub async fn products(
        &self,
        conn: &mut PgConnection,
        organization_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<Product>, AppError> {
        let products = self
            .ownership_repo
            .products_for_share(&mut *conn, organization_id, ids)
            .await?;
        let found: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        match first_missing(ids, &found) {
            Some(id) => Err(AppError::NotFound { entity: EntityKind::Product, id }),
            None => Ok(products),
        }
    }
}
