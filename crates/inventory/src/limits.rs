use serde::{Deserialize, Serialize};

use labinv_core::{DomainError, DomainResult};

/// Optional upper bounds applied on top of the hard rules.
///
/// Non-negativity of the price is always enforced; the bounds here are off
/// unless configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub max_price: Option<f64>,
    pub max_number: Option<u32>,
}

impl Limits {
    /// No bounds beyond the hard rules.
    pub const fn unbounded() -> Self {
        Self {
            max_price: None,
            max_number: None,
        }
    }

    pub fn check_name(&self, field: &str, name: &str) -> DomainResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation(format!("{field} cannot be empty")));
        }
        Ok(trimmed.to_string())
    }

    pub fn check_price(&self, price: f64) -> DomainResult<f64> {
        if !price.is_finite() {
            return Err(DomainError::validation("price must be a finite number"));
        }
        if price < 0.0 {
            return Err(DomainError::validation("price must be non-negative"));
        }
        if let Some(max) = self.max_price {
            if price > max {
                return Err(DomainError::validation(format!("price must not exceed {max}")));
            }
        }
        Ok(price)
    }

    pub fn check_number(&self, number: Option<u32>) -> DomainResult<Option<u32>> {
        match (number, self.max_number) {
            (Some(n), Some(max)) if n > max => Err(DomainError::validation(format!(
                "number must not exceed {max}"
            ))),
            _ => Ok(number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_accepts_zero_and_large_values() {
        let limits = Limits::unbounded();
        assert_eq!(limits.check_price(0.0).unwrap(), 0.0);
        assert_eq!(limits.check_price(1e9).unwrap(), 1e9);
        assert_eq!(limits.check_number(Some(u32::MAX)).unwrap(), Some(u32::MAX));
    }

    #[test]
    fn negative_and_non_finite_prices_are_rejected() {
        let limits = Limits::unbounded();
        assert!(matches!(limits.check_price(-0.01), Err(DomainError::Validation(_))));
        assert!(matches!(limits.check_price(f64::NAN), Err(DomainError::Validation(_))));
        assert!(matches!(limits.check_price(f64::INFINITY), Err(DomainError::Validation(_))));
    }

    #[test]
    fn configured_bounds_apply() {
        let limits = Limits {
            max_price: Some(100.0),
            max_number: Some(10),
        };
        assert!(limits.check_price(100.0).is_ok());
        assert!(limits.check_price(100.5).is_err());
        assert!(limits.check_number(Some(10)).is_ok());
        assert!(limits.check_number(Some(11)).is_err());
        assert!(limits.check_number(None).is_ok());
    }

    #[test]
    fn names_are_trimmed() {
        let limits = Limits::unbounded();
        assert_eq!(limits.check_name("name", "  Bench ").unwrap(), "Bench");
        assert!(limits.check_name("name", "   ").is_err());
    }
}
