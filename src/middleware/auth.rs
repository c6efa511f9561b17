use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::i18n::Locale,
};

/// Claims emitidas pelo serviço externo de autenticação.
/// Aqui só verificamos; login e emissão de token não são deste serviço.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    // Organizações às quais o usuário tem acesso
    #[serde(default)]
    pub organizations: Vec<Uuid>,
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })
}

// O middleware em si
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let claims = match token {
        Some(token) => decode_token(token, &app_state.jwt_secret),
        None => Err(AppError::InvalidToken),
    };

    match claims {
        Ok(claims) => {
            // Insere as claims nos "extensions" da requisição
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(e) => {
            let locale = Locale::from_headers(request.headers());
            Err(e.to_api_error(&locale, &app_state.i18n_store))
        }
    }
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }

    pub fn can_access(&self, organization_id: Uuid) -> bool {
        self.0.organizations.contains(&organization_id)
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or_else(|| {
                AppError::InvalidToken
                    .to_api_error(&Locale::from_headers(&parts.headers), &state.i18n_store)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
            .unwrap()
    }

    fn claims(exp_offset: i64) -> Claims {
        let now = chrono::Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4(),
            exp: (now + exp_offset) as usize,
            iat: now as usize,
            organizations: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn accepts_token_signed_with_the_same_secret() {
        let original = claims(3600);
        let decoded = decode_token(&token_for(&original, "segredo"), "segredo").unwrap();

        assert_eq!(decoded.sub, original.sub);
        assert_eq!(decoded.organizations, original.organizations);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_token() {
        assert!(matches!(
            decode_token(&token_for(&claims(3600), "outro"), "segredo"),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            decode_token(&token_for(&claims(-3600), "segredo"), "segredo"),
            Err(AppError::InvalidToken)
        ));
    }
}
