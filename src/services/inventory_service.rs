// src/services/inventory_service.rs

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::StockRepository,
    models::inventory::{StockLine, StockMovementReason},
};

/// Soma linhas do mesmo produto e ordena pelo id do produto.
/// A ordem fixa das travas evita deadlock entre vendas concorrentes.
pub fn merge_lines(lines: &[StockLine]) -> Vec<StockLine> {
    let mut merged: Vec<StockLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(*line),
        }
    }
    merged.sort_by_key(|l| l.product_id);
    merged
}

#[derive(Clone)]
pub struct InventoryService {
    stock_repo: StockRepository,
}

impl InventoryService {
    pub fn new(stock_repo: StockRepository) -> Self {
        Self { stock_repo }
    }

    // --- SAÍDA (venda, devolução ao fornecedor) ---
    // Roda dentro da transação de quem chama.
    pub async fn deduct(
        &self,
        conn: &mut PgConnection,
        organization_id: Uuid,
        outlet_id: Uuid,
        lines: &[StockLine],
        reason: StockMovementReason,
        reference_id: Uuid,
    ) -> Result<(), AppError> {
        for line in merge_lines(lines) {
            // 1. Trava e confere o saldo (sem linha de estoque = saldo zero)
            let available = self
                .stock_repo
                .get_for_update(&mut *conn, outlet_id, line.product_id)
                .await?
                .map(|s| s.quantity)
                .unwrap_or(Decimal::ZERO);

            if available < line.quantity {
                tracing::warn!(
                    "Estoque insuficiente: produto {} no ponto {} (disponível {}, pedido {})",
                    line.product_id, outlet_id, available, line.quantity
                );
                return Err(AppError::InsufficientStock {
                    product_id: line.product_id,
                    available,
                    requested: line.quantity,
                });
            }

            // 2. Baixa
            self.stock_repo
                .apply_delta(&mut *conn, organization_id, outlet_id, line.product_id, -line.quantity)
                .await?;

            // 3. Histórico
            self.stock_repo
                .record_movement(
                    &mut *conn, organization_id, outlet_id, line.product_id,
                    -line.quantity, reason, reference_id,
                )
                .await?;
        }
        Ok(())
    }

    // --- ENTRADA (compra, estorno de venda) ---
    pub async fn receive(
        &self,
        conn: &mut PgConnection,
        organization_id: Uuid,
        outlet_id: Uuid,
        lines: &[StockLine],
        reason: StockMovementReason,
        reference_id: Uuid,
    ) -> Result<(), AppError> {
        for line in merge_lines(lines) {
            self.stock_repo
                .apply_delta(&mut *conn, organization_id, outlet_id, line.product_id, line.quantity)
                .await?;

            self.stock_repo
                .record_movement(
                    &mut *conn, organization_id, outlet_id, line.product_id,
                    line.quantity, reason, reference_id,
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn merges_repeated_products_and_orders_by_id() {
        let mut ids = [Uuid::new_v4(), Uuid::new_v4()];
        ids.sort();
        let (low, high) = (ids[0], ids[1]);

        let merged = merge_lines(&[
            StockLine { product_id: high, quantity: dec!(1) },
            StockLine { product_id: low, quantity: dec!(2) },
            StockLine { product_id: high, quantity: dec!(3.5) },
        ]);

        assert_eq!(
            merged,
            vec![
                StockLine { product_id: low, quantity: dec!(2) },
                StockLine { product_id: high, quantity: dec!(4.5) },
            ]
        );
    }
}
