use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Adquire uma conexão da pool e define as variáveis RLS da organização e do usuário.
///
/// As variáveis são de sessão (`is_local = false`): a conexão ainda não está numa
/// transação aqui, e toda requisição passa por este helper antes de usar o banco,
/// então o valor anterior é sempre sobrescrito.
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    organization_id: Uuid,
    user: &AuthenticatedUser,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, AppError> {
    let mut conn = app_state.db_pool.acquire().await?;

    sqlx::query("SELECT set_config('app.organization_id', $1, false), set_config('app.user_id', $2, false)")
        .bind(organization_id.to_string())
        .bind(user.id().to_string())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}

// ---
// Classificação de erros do Postgres
// ---
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}

/// Nome da constraint violada, quando o Postgres informa.
pub(crate) fn constraint_name(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

/// Arredondamento monetário: 2 casas, meio para longe do zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_money(dec!(2.345)), dec!(2.35));
        assert_eq!(round_money(dec!(-2.345)), dec!(-2.35));
        assert_eq!(round_money(dec!(23.1000)), dec!(23.10));
    }
}
