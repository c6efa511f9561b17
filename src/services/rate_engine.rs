// src/services/rate_engine.rs
//
// Cotação de frete: filtra as tarifas candidatas, calcula o custo e ordena.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::db_utils::round_money,
    models::delivery::{DeliveryMethod, RateCandidate, RateQuote, ShippingRate},
};

#[derive(Debug, Clone, PartialEq)]
pub struct RateQuery {
    pub to_location: String,
    pub weight: Decimal,
    pub delivery_partner_id: Option<Uuid>,
    pub from_location: Option<String>,
    pub method: Option<DeliveryMethod>,
}

fn same_location(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Faixa de peso com bordas inclusas; borda ausente não limita.
pub fn weight_in_window(rate: &ShippingRate, weight: Decimal) -> bool {
    rate.min_weight.is_none_or(|min| weight >= min) && rate.max_weight.is_none_or(|max| weight <= max)
}

pub fn matches(rate: &ShippingRate, query: &RateQuery) -> bool {
    if query.delivery_partner_id.is_some_and(|p| p != rate.delivery_partner_id) {
        return false;
    }
    if query.method.is_some_and(|m| m != rate.method) {
        return false;
    }
    // Destino da tarifa ausente = atende qualquer destino
    if rate.to_location.as_deref().is_some_and(|to| !same_location(to, &query.to_location)) {
        return false;
    }
    // Origem só filtra quando a consulta informa uma
    if let (Some(wanted), Some(from)) = (query.from_location.as_deref(), rate.from_location.as_deref()) {
        if !same_location(wanted, from) {
            return false;
        }
    }
    weight_in_window(rate, query.weight)
}

/// custo = base + (por kg × peso)
pub fn cost(rate: &ShippingRate, weight: Decimal) -> Decimal {
    round_money(rate.base_rate + rate.per_kg_rate.unwrap_or(Decimal::ZERO) * weight)
}

/// Cotações ordenadas por custo, depois prazo, depois nome do parceiro.
/// Lista vazia é resposta válida.
pub fn quote(candidates: Vec<RateCandidate>, query: &RateQuery) -> Vec<RateQuote> {
    let mut quotes: Vec<RateQuote> = candidates
        .into_iter()
        .filter(|c| c.rate.is_active && matches(&c.rate, query))
        .map(|c| RateQuote {
            rate_id: c.rate.id,
            delivery_partner_id: c.rate.delivery_partner_id,
            cost: cost(&c.rate, query.weight),
            partner_name: c.partner_name,
            rate_name: c.rate.name,
            method: c.rate.method,
            estimated_delivery_days: c.rate.estimated_delivery_days,
        })
        .collect();

    quotes.sort_by(|a, b| {
        a.cost
            .cmp(&b.cost)
            .then(a.estimated_delivery_days.cmp(&b.estimated_delivery_days))
            .then_with(|| a.partner_name.cmp(&b.partner_name))
    });
    quotes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn rate(base: Decimal, per_kg: Option<Decimal>) -> ShippingRate {
        ShippingRate {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            delivery_partner_id: Uuid::new_v4(),
            name: "Padrão".into(),
            method: DeliveryMethod::Standard,
            base_rate: base,
            per_kg_rate: per_kg,
            min_weight: None,
            max_weight: None,
            from_location: None,
            to_location: None,
            estimated_delivery_days: 3,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn query(weight: Decimal) -> RateQuery {
        RateQuery {
            to_location: "São Paulo".into(),
            weight,
            delivery_partner_id: None,
            from_location: None,
            method: None,
        }
    }

    fn candidate(rate: ShippingRate, partner: &str) -> RateCandidate {
        RateCandidate { rate, partner_name: partner.into() }
    }

    #[test]
    fn weight_window_is_inclusive_and_optional() {
        let bounded = ShippingRate { min_weight: Some(dec!(5)), max_weight: Some(dec!(20)), ..rate(dec!(10), None) };

        assert!(weight_in_window(&bounded, dec!(10)));
        assert!(weight_in_window(&bounded, dec!(5)));
        assert!(weight_in_window(&bounded, dec!(20)));
        assert!(!weight_in_window(&bounded, dec!(4)));
        assert!(!weight_in_window(&bounded, dec!(21)));

        let open = rate(dec!(10), None);
        for w in [dec!(0.1), dec!(4), dec!(1000)] {
            assert!(weight_in_window(&open, w));
        }
    }

    #[test]
    fn destination_match_ignores_case_and_spaces() {
        let scoped = ShippingRate { to_location: Some("  são paulo ".into()), ..rate(dec!(10), None) };
        assert!(matches(&scoped, &query(dec!(1))));

        let elsewhere = ShippingRate { to_location: Some("Recife".into()), ..rate(dec!(10), None) };
        assert!(!matches(&elsewhere, &query(dec!(1))));
    }

    #[test]
    fn origin_filters_only_when_given() {
        let from_curitiba = ShippingRate { from_location: Some("Curitiba".into()), ..rate(dec!(10), None) };

        assert!(matches(&from_curitiba, &query(dec!(1))));
        assert!(matches(&from_curitiba, &RateQuery { from_location: Some("curitiba".into()), ..query(dec!(1)) }));
        assert!(!matches(&from_curitiba, &RateQuery { from_location: Some("Londrina".into()), ..query(dec!(1)) }));
    }

    #[test]
    fn partner_and_method_filters() {
        let r = rate(dec!(10), None);
        assert!(!matches(&r, &RateQuery { delivery_partner_id: Some(Uuid::new_v4()), ..query(dec!(1)) }));
        assert!(matches(&r, &RateQuery { delivery_partner_id: Some(r.delivery_partner_id), ..query(dec!(1)) }));
        assert!(!matches(&r, &RateQuery { method: Some(DeliveryMethod::Express), ..query(dec!(1)) }));
    }

    #[test]
    fn cost_is_base_plus_weight_times_per_kg() {
        assert_eq!(cost(&rate(dec!(10), Some(dec!(2.5))), dec!(3)), dec!(17.50));
        assert_eq!(cost(&rate(dec!(12), None), dec!(30)), dec!(12));
        assert_eq!(cost(&rate(dec!(0), Some(dec!(1.333))), dec!(1)), dec!(1.33));
    }

    #[test]
    fn quotes_sorted_by_cost_then_days_then_partner() {
        let cheap_slow = ShippingRate { estimated_delivery_days: 5, ..rate(dec!(10), None) };
        let cheap_fast = ShippingRate { estimated_delivery_days: 2, ..rate(dec!(10), None) };
        let cheap_fast_b = ShippingRate { estimated_delivery_days: 2, ..rate(dec!(10), None) };
        let pricey = rate(dec!(30), None);
        let inactive = ShippingRate { is_active: false, ..rate(dec!(1), None) };

        let quotes = quote(
            vec![
                candidate(pricey, "Alfa"),
                candidate(cheap_slow, "Alfa"),
                candidate(cheap_fast_b, "Zeta"),
                candidate(cheap_fast, "Beta"),
                candidate(inactive, "Alfa"),
            ],
            &query(dec!(1)),
        );

        let order: Vec<(&str, i32)> =
            quotes.iter().map(|q| (q.partner_name.as_str(), q.estimated_delivery_days)).collect();
        assert_eq!(order, vec![("Beta", 2), ("Zeta", 2), ("Alfa", 5), ("Alfa", 3)]);
        assert_eq!(quotes[3].cost, dec!(30));
    }

    #[test]
    fn no_match_is_an_empty_list() {
        let heavy_only = ShippingRate { min_weight: Some(dec!(100)), ..rate(dec!(10), None) };
        assert!(quote(vec![candidate(heavy_only, "Alfa")], &query(dec!(1))).is_empty());
    }
}
