// src/models/installments.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "installment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
}

impl InstallmentStatus {
    /// Status coerente com o flag de pagamento e o vencimento.
    pub fn derive(paid: bool, due_date: NaiveDate, today: NaiveDate) -> Self {
        if paid {
            InstallmentStatus::Paid
        } else if due_date < today {
            InstallmentStatus::Overdue
        } else {
            InstallmentStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub sale_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub sequence: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
    pub paid: bool,
    pub paid_date: Option<DateTime<Utc>>,
    pub status: InstallmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InstallmentListResponse {
    pub installments: Vec<Installment>,
    pub total: i64,
}

/// Uma parcela ainda não gravada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInstallment {
    pub sequence: i32,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_paid_flag_and_due_date() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let yesterday = today.pred_opt().unwrap();

        assert_eq!(InstallmentStatus::derive(false, yesterday, today), InstallmentStatus::Overdue);
        assert_eq!(InstallmentStatus::derive(false, today, today), InstallmentStatus::Pending);
        assert_eq!(InstallmentStatus::derive(true, yesterday, today), InstallmentStatus::Paid);
    }
}
