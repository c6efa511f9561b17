// src/middleware/organization.rs

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, error::{ApiError, AppError}},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationParam {
    organization_id: Option<Uuid>,
}

// O `organizationId` vindo da query string (opcional aqui).
// Quem decide se ele é obrigatório é o handler, via `require` ou `resolve`.
#[derive(Debug, Clone, Copy)]
pub struct OrganizationQuery(pub Option<Uuid>);

impl OrganizationQuery {
    /// Rotas sem corpo: a organização tem de vir na query.
    pub fn require(&self, user: &AuthenticatedUser) -> Result<Uuid, AppError> {
        self.resolve(None, user)
    }

    /// Rotas com corpo: aceita query ou corpo; os dois presentes têm de coincidir.
    pub fn resolve(&self, body: Option<Uuid>, user: &AuthenticatedUser) -> Result<Uuid, AppError> {
        let organization_id = match (self.0, body) {
            (Some(q), Some(b)) if q != b => return Err(AppError::OrganizationMismatch),
            (Some(id), _) | (None, Some(id)) => id,
            (None, None) => return Err(AppError::MissingOrganization),
        };

        // Organização fora do token é tratada como inexistente
        if !user.can_access(organization_id) {
            return Err(AppError::NotFound { entity: EntityKind::Organization, id: organization_id });
        }
        Ok(organization_id)
    }
}

impl FromRequestParts<AppState> for OrganizationQuery {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(param) = Query::<OrganizationParam>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                AppError::InvalidField { field: "organizationId", code: "uuid" }
                    .to_api_error(&Locale::from_headers(&parts.headers), &state.i18n_store)
            })?;

        Ok(OrganizationQuery(param.organization_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::Claims;

    fn user_of(orgs: Vec<Uuid>) -> AuthenticatedUser {
        AuthenticatedUser(Claims { sub: Uuid::new_v4(), exp: 0, iat: 0, organizations: orgs })
    }

    #[test]
    fn query_and_body_must_agree() {
        let org = Uuid::new_v4();
        let user = user_of(vec![org]);

        assert_eq!(OrganizationQuery(Some(org)).resolve(Some(org), &user).unwrap(), org);
        assert_eq!(OrganizationQuery(None).resolve(Some(org), &user).unwrap(), org);
        assert!(matches!(
            OrganizationQuery(Some(org)).resolve(Some(Uuid::new_v4()), &user),
            Err(AppError::OrganizationMismatch)
        ));
    }

    #[test]
    fn missing_organization_is_rejected() {
        let user = user_of(vec![Uuid::new_v4()]);
        assert!(matches!(OrganizationQuery(None).require(&user), Err(AppError::MissingOrganization)));
    }

    #[test]
    fn organization_outside_token_is_not_found() {
        let user = user_of(vec![Uuid::new_v4()]);
        let other = Uuid::new_v4();

        match OrganizationQuery(Some(other)).require(&user) {
            Err(AppError::NotFound { entity, id }) => {
                assert_eq!(entity, EntityKind::Organization);
                assert_eq!(id, other);
            }
            other => panic!("esperado NotFound, veio {:?}", other),
        }
    }
}
