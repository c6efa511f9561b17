// src/handlers/validation.rs
//
// Validadores customizados dos payloads. O código do erro é a chave de
// tradução em locales/*.json (validation.<código>).

use rust_decimal::Decimal;
use validator::ValidationError;

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() && !val.is_zero() {
        let mut err = ValidationError::new("not_negative");
        err.add_param("min".into(), &0.0);
        return Err(err);
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        return Err(ValidationError::new("positive"));
    }
    Ok(())
}

/// Alíquota como fração (0.1 = 10%).
pub fn validate_tax_rate(val: &Decimal) -> Result<(), ValidationError> {
    if *val < Decimal::ZERO || *val > Decimal::ONE {
        return Err(ValidationError::new("tax_rate_range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_validators() {
        assert!(validate_not_negative(&dec!(0)).is_ok());
        assert!(validate_not_negative(&dec!(-0.01)).is_err());
        assert!(validate_positive(&dec!(0.01)).is_ok());
        assert!(validate_positive(&dec!(0)).is_err());
        assert!(validate_tax_rate(&dec!(0.1)).is_ok());
        assert_eq!(validate_tax_rate(&dec!(10)).unwrap_err().code, "tax_rate_range");
    }
}
