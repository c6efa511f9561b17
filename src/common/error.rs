use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    common::{entity::EntityKind, i18n::I18nStore},
    middleware::i18n::Locale,
    models::promotion::PromotionRejection,
};

// Nosso tipo de erro de domínio. Os serviços e repositórios só conhecem ele;
// quem traduz para HTTP é o handler, via `to_api_error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Campo inválido: {field} ({code})")]
    InvalidField { field: &'static str, code: &'static str },

    #[error("Valor inválido: {0}")]
    InvalidAmount(String),

    #[error("organizationId ausente")]
    MissingOrganization,

    #[error("organizationId diferente na query e no corpo")]
    OrganizationMismatch,

    #[error("{entity} {id} não encontrado")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("Código de promoção {0} não encontrado")]
    PromotionCodeNotFound(String),

    #[error("Promoção recusada: {0:?}")]
    PromotionRejected(PromotionRejection),

    #[error("Estoque insuficiente do produto {product_id}")]
    InsufficientStock {
        product_id: Uuid,
        available: Decimal,
        requested: Decimal,
    },

    #[error("Parceiro {0} possui entregas em andamento")]
    PartnerHasActiveShipments(Uuid),

    #[error("Entrega {id} não pode ser removida no status {status}")]
    ShipmentNotDeletable { id: Uuid, status: String },

    #[error("Transição inválida de {entity}: {from} -> {to}")]
    InvalidTransition {
        entity: EntityKind,
        from: String,
        to: String,
    },

    #[error("Parceiro {0} não está ativo")]
    PartnerNotActive(Uuid),

    #[error("Ponto do funcionário {employee_id} já registrado em {date}")]
    DuplicateAttendance { employee_id: Uuid, date: NaiveDate },

    #[error("Categoria {0} está em uso")]
    CategoryInUse(Uuid),

    #[error("Parcela {0} já está paga")]
    InstallmentAlreadyPaid(Uuid),

    #[error("Venda {0} não tem parcelas em aberto para absorver o novo total")]
    InstallmentPlanSettled(Uuid),

    #[error("Orçamento {0} não pode mais ser convertido")]
    QuotationClosed(Uuid),

    #[error("Pagamento acima do saldo devedor ({balance})")]
    PaymentExceedsBalance { balance: Decimal },

    #[error("Devolução acima do comprado para o produto {product_id}")]
    ReturnExceedsPurchased { product_id: Uuid, returnable: Decimal },

    #[error("Registro duplicado: {0}")]
    UniqueConstraintViolation(String),

    #[error("Token inválido")]
    InvalidToken,

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

// ---
// O erro "de fio": exatamente o que vai no corpo da resposta.
// ---
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    /// Status HTTP de cada variante. 409 para qualquer violação de estado ou unicidade.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidField { .. }
            | AppError::InvalidAmount(_)
            | AppError::MissingOrganization
            | AppError::OrganizationMismatch
            | AppError::PromotionRejected(_) => StatusCode::BAD_REQUEST,

            AppError::NotFound { .. } | AppError::PromotionCodeNotFound(_) => StatusCode::NOT_FOUND,

            AppError::InsufficientStock { .. }
            | AppError::PartnerHasActiveShipments(_)
            | AppError::ShipmentNotDeletable { .. }
            | AppError::InvalidTransition { .. }
            | AppError::PartnerNotActive(_)
            | AppError::DuplicateAttendance { .. }
            | AppError::CategoryInUse(_)
            | AppError::InstallmentAlreadyPaid(_)
            | AppError::InstallmentPlanSettled(_)
            | AppError::QuotationClosed(_)
            | AppError::PaymentExceedsBalance { .. }
            | AppError::ReturnExceedsPurchased { .. }
            | AppError::UniqueConstraintViolation(_) => StatusCode::CONFLICT,

            AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte o erro de domínio na resposta, já no idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status_code();

        let (error, details) = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            let code = e
                                .message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string());
                            store.validation_message(lang, &code)
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                (store.translate(lang, "error.validation", &[]), Some(json!(details)))
            }
            AppError::InvalidField { field, code } => (
                store.translate(lang, "error.validation", &[]),
                Some(json!({ *field: [store.validation_message(lang, code)] })),
            ),
            AppError::InvalidAmount(reason) => (
                store.translate(lang, "error.invalidAmount", &[]),
                Some(json!({ "reason": reason })),
            ),
            AppError::MissingOrganization => {
                (store.translate(lang, "error.missingOrganization", &[]), None)
            }
            AppError::OrganizationMismatch => {
                (store.translate(lang, "error.organizationMismatch", &[]), None)
            }
            AppError::NotFound { entity, id } => {
                let entity_name = store.translate(lang, entity.message_key(), &[]);
                (
                    store.translate(lang, "error.notFound", &[("entity", entity_name)]),
                    Some(json!({ "entity": entity, "id": id })),
                )
            }
            AppError::PromotionCodeNotFound(code) => (
                store.translate(lang, "error.promotionCodeNotFound", &[("code", code.clone())]),
                Some(json!({ "entity": EntityKind::Promotion, "code": code })),
            ),
            AppError::PromotionRejected(reason) => (
                store.translate(lang, reason.message_key(), &[]),
                Some(json!({ "reason": reason })),
            ),
            AppError::InsufficientStock { product_id, available, requested } => (
                store.translate(lang, "error.insufficientStock", &[]),
                Some(json!({
                    "productId": product_id,
                    "available": available,
                    "requested": requested,
                })),
            ),
            AppError::PartnerHasActiveShipments(id) => (
                store.translate(lang, "error.partnerHasActiveShipments", &[]),
                Some(json!({ "deliveryPartnerId": id })),
            ),
            AppError::ShipmentNotDeletable { id, status } => (
                store.translate(lang, "error.shipmentNotDeletable", &[("status", status.clone())]),
                Some(json!({ "shipmentId": id, "status": status })),
            ),
            AppError::InvalidTransition { entity, from, to } => (
                store.translate(
                    lang,
                    "error.invalidTransition",
                    &[("from", from.clone()), ("to", to.clone())],
                ),
                Some(json!({ "entity": entity, "from": from, "to": to })),
            ),
            AppError::PartnerNotActive(id) => (
                store.translate(lang, "error.partnerNotActive", &[]),
                Some(json!({ "deliveryPartnerId": id })),
            ),
            AppError::DuplicateAttendance { employee_id, date } => (
                store.translate(lang, "error.duplicateAttendance", &[("date", date.to_string())]),
                Some(json!({ "employeeId": employee_id, "date": date })),
            ),
            AppError::CategoryInUse(id) => (
                store.translate(lang, "error.categoryInUse", &[]),
                Some(json!({ "categoryId": id })),
            ),
            AppError::InstallmentAlreadyPaid(id) => (
                store.translate(lang, "error.installmentAlreadyPaid", &[]),
                Some(json!({ "installmentId": id })),
            ),
            AppError::InstallmentPlanSettled(id) => (
                store.translate(lang, "error.installmentPlanSettled", &[]),
                Some(json!({ "saleId": id })),
            ),
            AppError::QuotationClosed(id) => (
                store.translate(lang, "error.quotationClosed", &[]),
                Some(json!({ "quotationId": id })),
            ),
            AppError::PaymentExceedsBalance { balance } => (
                store.translate(lang, "error.paymentExceedsBalance", &[]),
                Some(json!({ "balance": balance })),
            ),
            AppError::ReturnExceedsPurchased { product_id, returnable } => (
                store.translate(lang, "error.returnExceedsPurchased", &[]),
                Some(json!({ "productId": product_id, "returnable": returnable })),
            ),
            AppError::UniqueConstraintViolation(what) => (
                store.translate(lang, "error.duplicate", &[]),
                Some(json!({ "conflict": what })),
            ),
            AppError::InvalidToken => (store.translate(lang, "error.invalidToken", &[]), None),

            // Erros internos: o detalhe vai para o log, nunca para o cliente.
            AppError::DatabaseError(e) => {
                tracing::error!("Erro de banco de dados: {:?}", e);
                (store.translate(lang, "error.internal", &[]), None)
            }
            AppError::InternalServerError(e) => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (store.translate(lang, "error.internal", &[]), None)
            }
        };

        ApiError { status, error, details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> I18nStore {
        I18nStore::load().expect("catálogos embutidos válidos")
    }

    #[test]
    fn not_found_names_the_entity() {
        let id = Uuid::new_v4();
        let err = AppError::NotFound { entity: EntityKind::Product, id };

        let api = err.to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert!(api.error.contains("Product"), "mensagem: {}", api.error);
        let details = api.details.expect("details");
        assert_eq!(details["entity"], "product");
        assert_eq!(details["id"], json!(id));
    }

    #[test]
    fn conflicts_map_to_409() {
        let err = AppError::PartnerHasActiveShipments(Uuid::new_v4());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let err = AppError::DuplicateAttendance {
            employee_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        };
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("senha do banco: hunter2"));

        let api = err.to_api_error(&Locale("pt".into()), &store());

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.details.is_none());
        assert!(!api.error.contains("hunter2"));
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = validator::ValidationErrors::new();
        let mut field_err = validator::ValidationError::new("range");
        field_err.message = Some("not_negative".into());
        errors.add("unitPrice", field_err);

        let api = AppError::ValidationError(errors).to_api_error(&Locale("en".into()), &store());

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        let details = api.details.expect("details");
        assert!(details["unitPrice"].is_array());
    }
}
