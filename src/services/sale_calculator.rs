// src/services/sale_calculator.rs
//
// Cálculo de linhas e totais. Usado por venda, orçamento e compra.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::common::{db_utils::round_money, error::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_amount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    pub subtotal: Decimal,
    // Desconto do cabeçalho + desconto da promoção
    pub discount_amount: Decimal,
    pub promotion_discount: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// line = qty × unitPrice − desconto do item. Linha negativa é recusada.
pub fn price_lines(items: &[LineInput]) -> Result<(Vec<PricedLine>, Decimal), AppError> {
    let mut lines = Vec::with_capacity(items.len());
    let mut subtotal = Decimal::ZERO;

    for item in items {
        let line_total = round_money(item.quantity * item.unit_price - item.discount_amount);
        if line_total < Decimal::ZERO {
            return Err(AppError::InvalidAmount(format!(
                "desconto maior que o valor da linha do produto {}",
                item.product_id
            )));
        }
        subtotal += line_total;
        lines.push(PricedLine {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
            discount_amount: item.discount_amount,
            line_total,
        });
    }

    Ok((lines, subtotal))
}

/// Aplica descontos sobre o subtotal e o imposto por último:
/// `total = (subtotal − descontos) × (1 + taxRate)`.
pub fn compute_totals(
    subtotal: Decimal,
    header_discount: Decimal,
    promotion_discount: Decimal,
    tax_rate: Decimal,
) -> Result<Totals, AppError> {
    let discount_amount = round_money(header_discount + promotion_discount);
    let taxable = subtotal - discount_amount;
    if taxable < Decimal::ZERO {
        return Err(AppError::InvalidAmount("descontos maiores que o subtotal".into()));
    }

    let tax_amount = round_money(taxable * tax_rate);

    Ok(Totals {
        subtotal,
        discount_amount,
        promotion_discount: round_money(promotion_discount),
        tax_rate,
        tax_amount,
        total_amount: round_money(taxable + tax_amount),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: Decimal, unit_price: Decimal, discount_amount: Decimal) -> LineInput {
        LineInput { product_id: Uuid::new_v4(), quantity, unit_price, discount_amount }
    }

    #[test]
    fn total_is_discounted_subtotal_plus_tax() {
        let (lines, subtotal) =
            price_lines(&[line(dec!(2), dec!(10), dec!(0)), line(dec!(1), dec!(5), dec!(2))]).unwrap();
        let totals = compute_totals(subtotal, dec!(2), Decimal::ZERO, dec!(0.1)).unwrap();

        assert_eq!(lines[0].line_total, dec!(20));
        assert_eq!(lines[1].line_total, dec!(3));
        assert_eq!(totals.subtotal, dec!(23));
        assert_eq!(totals.subtotal - totals.discount_amount, dec!(21));
        assert_eq!(totals.tax_amount, dec!(2.10));
        assert_eq!(totals.total_amount, dec!(23.10));
    }

    #[test]
    fn formula_holds_with_item_and_header_discounts() {
        let (_, subtotal) =
            price_lines(&[line(dec!(2), dec!(10), dec!(0)), line(dec!(1), dec!(5), dec!(1))]).unwrap();
        let totals = compute_totals(subtotal, dec!(2), Decimal::ZERO, dec!(0.1)).unwrap();

        // (20 + 4 − 2) × 1.1
        assert_eq!(totals.subtotal, dec!(24));
        assert_eq!(totals.total_amount, dec!(24.20));
    }

    #[test]
    fn promotion_discount_is_part_of_stored_discount() {
        let totals = compute_totals(dec!(100), dec!(5), dec!(15), dec!(0)).unwrap();

        assert_eq!(totals.discount_amount, dec!(20));
        assert_eq!(totals.promotion_discount, dec!(15));
        assert_eq!(totals.total_amount, dec!(80));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(matches!(
            price_lines(&[line(dec!(1), dec!(5), dec!(6))]),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            compute_totals(dec!(10), dec!(11), Decimal::ZERO, dec!(0.2)),
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[test]
    fn discount_equal_to_subtotal_yields_zero_total() {
        let totals = compute_totals(dec!(10), dec!(10), Decimal::ZERO, dec!(0.2)).unwrap();
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }

    #[test]
    fn tax_is_rounded_half_away_from_zero() {
        // 0.05 × 0.1 = 0.005 → 0.01
        let totals = compute_totals(dec!(0.05), Decimal::ZERO, Decimal::ZERO, dec!(0.1)).unwrap();
        assert_eq!(totals.tax_amount, dec!(0.01));
        assert_eq!(totals.total_amount, dec!(0.06));
    }
}
