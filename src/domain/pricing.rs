use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;

/// Money is stored as `NUMERIC(12, 2)`: two fractional digits and an
/// absolute value below 10^10.
const MONEY_SCALE: i64 = 2;
const MONEY_CEILING: i64 = 10_000_000_000;
const NAME_MAX_CHARS: usize = 255;
const UNIT_MAX_CHARS: usize = 50;

fn has_money_scale(value: &BigDecimal) -> bool {
    let (_, scale) = value.normalized().as_bigint_and_exponent();
    scale <= MONEY_SCALE
}

fn within_money_ceiling(value: &BigDecimal) -> bool {
    value.abs() < BigDecimal::from(MONEY_CEILING)
}

/// Template item in a catalog package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub unit: String,
}

/// Subscription tier as seen by checkout. Owned by the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub id: Uuid,
    pub name: String,
    pub base_price: BigDecimal,
    /// Catalog benchmark value of the stock item list. When absent no
    /// discount or surcharge is ever applied.
    pub value_price: Option<BigDecimal>,
    pub items: Vec<PackageItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasketLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub unit: String,
    pub image_url: Option<String>,
}

impl BasketLine {
    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }

    fn validate(&self, index: usize) -> Result<(), DomainError> {
        if self.quantity < 0 {
            return Err(DomainError::InvalidBasketLine {
                index,
                reason: format!("quantity {} is negative", self.quantity),
            });
        }
        if self.unit_price < BigDecimal::from(0) {
            return Err(DomainError::InvalidBasketLine {
                index,
                reason: format!("unit price {} is negative", self.unit_price),
            });
        }
        if !has_money_scale(&self.unit_price) {
            return Err(DomainError::InvalidBasketLine {
                index,
                reason: format!(
                    "unit price {} has more than {} decimal places",
                    self.unit_price, MONEY_SCALE
                ),
            });
        }
        if !within_money_ceiling(&self.line_total()) {
            return Err(DomainError::InvalidBasketLine {
                index,
                reason: format!(
                    "line total {} x {} is too large",
                    self.unit_price, self.quantity
                ),
            });
        }
        if self.name.chars().count() > NAME_MAX_CHARS {
            return Err(DomainError::InvalidBasketLine {
                index,
                reason: format!("name is longer than {} characters", NAME_MAX_CHARS),
            });
        }
        if self.unit.chars().count() > UNIT_MAX_CHARS {
            return Err(DomainError::InvalidBasketLine {
                index,
                reason: format!("unit is longer than {} characters", UNIT_MAX_CHARS),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Discount,
    Surcharge,
    ExactMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReconciliation {
    pub items_total_value: BigDecimal,
    pub package_base_price: BigDecimal,
    pub package_value_price: Option<BigDecimal>,
    pub price_adjustment: BigDecimal,
    pub final_price: BigDecimal,
    /// Set when `base + adjustment` went below zero and was clamped.
    pub floored: bool,
}

impl PriceReconciliation {
    pub fn kind(&self) -> AdjustmentKind {
        let zero = BigDecimal::from(0);
        if self.price_adjustment < zero {
            AdjustmentKind::Discount
        } else if self.price_adjustment > zero {
            AdjustmentKind::Surcharge
        } else {
            AdjustmentKind::ExactMatch
        }
    }
}

/// Price a basket against its package.
///
/// Every line is validated before anything is summed, so the error names
/// the first bad line. Lines with quantity 0 contribute nothing.
pub fn reconcile(
    package: &Package,
    lines: &[BasketLine],
) -> Result<PriceReconciliation, DomainError> {
    for (index, line) in lines.iter().enumerate() {
        line.validate(index)?;
    }

    let zero = BigDecimal::from(0);
    let items_total_value = lines
        .iter()
        .filter(|l| l.quantity > 0)
        .fold(zero.clone(), |acc, l| acc + l.line_total());

    let price_adjustment = match &package.value_price {
        Some(value) => &items_total_value - value,
        None => zero.clone(),
    };

    let raw_final = &package.base_price + &price_adjustment;
    for (label, amount) in [
        ("items total", &items_total_value),
        ("price adjustment", &price_adjustment),
        ("final price", &raw_final),
    ] {
        if !within_money_ceiling(amount) {
            return Err(DomainError::InvalidInput(format!(
                "{} {} is too large",
                label, amount
            )));
        }
    }

    let floored = raw_final < zero;
    let final_price = if floored {
        log::warn!(
            "package {}: final price {} clamped to 0 (items total {}, adjustment {})",
            package.id,
            raw_final,
            items_total_value,
            price_adjustment
        );
        zero
    } else {
        raw_final
    };

    Ok(PriceReconciliation {
        items_total_value,
        package_base_price: package.base_price.clone(),
        package_value_price: package.value_price.clone(),
        price_adjustment,
        final_price,
        floored,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn package(base: &str, value: Option<&str>) -> Package {
        Package {
            id: Uuid::new_v4(),
            name: "Family Box".to_string(),
            base_price: dec(base),
            value_price: value.map(dec),
            items: vec![],
        }
    }

    fn line(name: &str, price: &str, quantity: i32) -> BasketLine {
        BasketLine {
            product_id: Uuid::new_v4(),
            name: name.to_string(),
            unit_price: dec(price),
            quantity,
            unit: "kg".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn surcharge_when_basket_exceeds_benchmark() {
        let pkg = package("100", Some("120"));
        let basket = vec![line("apples", "50", 2), line("pears", "25", 2)];

        let r = reconcile(&pkg, &basket).unwrap();

        assert_eq!(r.items_total_value, dec("150"));
        assert_eq!(r.price_adjustment, dec("30"));
        assert_eq!(r.final_price, dec("130"));
        assert_eq!(r.kind(), AdjustmentKind::Surcharge);
        assert!(!r.floored);
    }

    #[test]
    fn discount_when_basket_below_benchmark() {
        let pkg = package("100", Some("120"));
        let basket = vec![line("milk", "30", 3)];

        let r = reconcile(&pkg, &basket).unwrap();

        assert_eq!(r.items_total_value, dec("90"));
        assert_eq!(r.price_adjustment, dec("-30"));
        assert_eq!(r.final_price, dec("70"));
        assert_eq!(r.kind(), AdjustmentKind::Discount);
    }

    #[test]
    fn no_value_price_means_no_adjustment() {
        let pkg = package("100", None);
        let basket = vec![line("eggs", "3.20", 12), line("bread", "2.10", 1)];

        let r = reconcile(&pkg, &basket).unwrap();

        assert_eq!(r.price_adjustment, dec("0"));
        assert_eq!(r.final_price, dec("100"));
        assert_eq!(r.package_value_price, None);
        assert_eq!(r.kind(), AdjustmentKind::ExactMatch);
    }

    #[test]
    fn exact_match_when_basket_equals_benchmark() {
        let pkg = package("100", Some("120"));
        let r = reconcile(&pkg, &[line("cheese", "40", 3)]).unwrap();
        assert_eq!(r.kind(), AdjustmentKind::ExactMatch);
        assert_eq!(r.final_price, dec("100"));
    }

    #[test]
    fn zero_quantity_lines_do_not_count() {
        let pkg = package("10", Some("10"));
        let basket = vec![line("rice", "4.00", 0), line("beans", "2.50", 2)];

        let r = reconcile(&pkg, &basket).unwrap();

        assert_eq!(r.items_total_value, dec("5.00"));
    }

    #[test]
    fn total_is_independent_of_line_order() {
        let pkg = package("40", Some("35"));
        let mut basket = vec![
            line("a", "1.15", 3),
            line("b", "7.99", 1),
            line("c", "0.33", 9),
        ];
        let forward = reconcile(&pkg, &basket).unwrap();
        basket.reverse();
        let backward = reconcile(&pkg, &basket).unwrap();

        assert_eq!(forward.items_total_value, backward.items_total_value);
        assert_eq!(forward.final_price, backward.final_price);
    }

    #[test]
    fn final_price_is_floored_at_zero() {
        let pkg = package("20", Some("200"));
        let r = reconcile(&pkg, &[line("lettuce", "1", 1)]).unwrap();

        assert_eq!(r.price_adjustment, dec("-199"));
        assert_eq!(r.final_price, dec("0"));
        assert!(r.floored);
    }

    #[test]
    fn empty_basket_prices_as_full_discount() {
        let pkg = package("100", Some("120"));
        let r = reconcile(&pkg, &[]).unwrap();
        assert_eq!(r.items_total_value, dec("0"));
        assert_eq!(r.final_price, dec("0"));
        assert!(r.floored);
    }

    #[test]
    fn reconcile_is_deterministic() {
        let pkg = package("55.50", Some("60.25"));
        let basket = vec![line("tomatoes", "2.75", 4), line("onions", "0.95", 6)];

        let first = reconcile(&pkg, &basket).unwrap();
        let second = reconcile(&pkg, &basket).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn negative_quantity_is_rejected_with_line_index() {
        let pkg = package("100", Some("120"));
        let basket = vec![line("ok", "1", 1), line("bad", "1", -2)];

        let err = reconcile(&pkg, &basket).unwrap_err();

        assert!(matches!(err, DomainError::InvalidBasketLine { index: 1, .. }));
    }

    #[test]
    fn unit_price_with_sub_cent_precision_is_rejected() {
        let pkg = package("100", Some("120"));
        let basket = vec![line("ok", "2.50", 1), line("cheese", "40.0049", 3)];

        let err = reconcile(&pkg, &basket).unwrap_err();

        assert!(matches!(err, DomainError::InvalidBasketLine { index: 1, .. }));
    }

    #[test]
    fn trailing_zeros_do_not_count_as_precision() {
        let pkg = package("100", Some("120"));
        let r = reconcile(&pkg, &[line("cheese", "40.0000", 3)]).unwrap();
        assert_eq!(r.items_total_value, dec("120"));
    }

    #[test]
    fn line_total_beyond_storable_range_is_rejected() {
        let pkg = package("100", None);
        let err = reconcile(&pkg, &[line("gold", "99999999999", 1)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidBasketLine { index: 0, .. }));

        let err = reconcile(&pkg, &[line("gold", "9999999999.99", 2)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidBasketLine { index: 0, .. }));
    }

    #[test]
    fn basket_total_beyond_storable_range_is_rejected() {
        let pkg = package("100", None);
        let basket = vec![
            line("a", "6000000000", 1),
            line("b", "6000000000", 1),
        ];
        let err = reconcile(&pkg, &basket).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(msg) if msg.contains("items total")));
    }

    #[test]
    fn over_long_line_text_is_rejected() {
        let pkg = package("100", None);
        let mut bad = line("x", "1", 1);
        bad.unit = "u".repeat(51);
        let err = reconcile(&pkg, &[bad]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidBasketLine { index: 0, .. }));
    }

    #[test]
    fn negative_unit_price_is_rejected() {
        let pkg = package("100", None);
        let err = reconcile(&pkg, &[line("refund hack", "-5", 1)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidBasketLine { index: 0, .. }));
    }
}
