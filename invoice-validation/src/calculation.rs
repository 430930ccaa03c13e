//! Financial calculations
//!
//! Pure functions used by the rule evaluators. Every monetary result goes
//! through [`round_amount`], so all evaluators round the same way.
//!
//! Negative amounts are passed through arithmetically; only negative rates
//! and arithmetic overflow are rejected.

use crate::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Percentage reported when the expected value is zero but the actual is not
pub const ZERO_BASE_PERCENTAGE: Decimal = Decimal::ONE_HUNDRED;

/// Rounding method for monetary results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMethod {
    /// Midpoint away from zero (1.005 -> 1.01)
    #[default]
    HalfUp,
    /// Banker's rounding (1.005 -> 1.00)
    HalfEven,
    /// Truncate toward zero
    Down,
    /// Away from zero
    Up,
}

impl RoundingMethod {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMethod::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMethod::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMethod::Down => RoundingStrategy::ToZero,
            RoundingMethod::Up => RoundingStrategy::AwayFromZero,
        }
    }
}

/// Precision and rounding applied to calculated amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationOptions {
    /// Decimal places
    pub precision: u32,

    /// Rounding method
    pub rounding: RoundingMethod,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            precision: 2,
            rounding: RoundingMethod::HalfUp,
        }
    }
}

/// How a discount is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountMode {
    /// Percentage of the amount (0-100)
    Percentage(Decimal),
    /// Fixed amount
    Fixed(Decimal),
}

/// Round `value` to `precision` decimal places
pub fn round_amount(value: Decimal, precision: u32, method: RoundingMethod) -> Decimal {
    value.round_dp_with_strategy(precision, method.strategy())
}

fn rounded(value: Decimal, opts: &CalculationOptions) -> Decimal {
    round_amount(value, opts.precision, opts.rounding)
}

fn overflow(operation: &str) -> Error {
    Error::Calculation(format!("{} overflowed", operation))
}

fn percent_of(amount: Decimal, rate: Decimal, operation: &str) -> Result<Decimal> {
    amount
        .checked_mul(rate)
        .and_then(|value| value.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow(operation))
}

/// Tax on `amount` at `tax_rate` percent
pub fn calculate_tax(amount: Decimal, tax_rate: Decimal, opts: &CalculationOptions) -> Result<Decimal> {
    if tax_rate < Decimal::ZERO {
        return Err(Error::Calculation(format!("negative tax rate {}", tax_rate)));
    }

    percent_of(amount, tax_rate, "tax calculation").map(|tax| rounded(tax, opts))
}

/// Invoice total: amount + tax - discount
pub fn calculate_total(
    amount: Decimal,
    tax_amount: Decimal,
    discount_amount: Decimal,
    opts: &CalculationOptions,
) -> Result<Decimal> {
    amount
        .checked_add(tax_amount)
        .and_then(|value| value.checked_sub(discount_amount))
        .map(|total| rounded(total, opts))
        .ok_or_else(|| overflow("total calculation"))
}

/// Discount on `amount`
pub fn calculate_discount(amount: Decimal, mode: DiscountMode, opts: &CalculationOptions) -> Result<Decimal> {
    match mode {
        DiscountMode::Percentage(rate) => {
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                return Err(Error::Calculation(format!(
                    "discount rate {}% outside 0-100",
                    rate
                )));
            }
            discount_at_rate(amount, rate, opts)
        }
        DiscountMode::Fixed(value) => {
            if value < Decimal::ZERO {
                return Err(Error::Calculation(format!("negative discount {}", value)));
            }
            Ok(rounded(value, opts))
        }
    }
}

/// Discount at `rate` percent of `amount`, rounded
///
/// No range check: inferred rates may be negative (credit notes) or above 100.
pub fn discount_at_rate(amount: Decimal, rate: Decimal, opts: &CalculationOptions) -> Result<Decimal> {
    percent_of(amount, rate, "discount calculation").map(|discount| rounded(discount, opts))
}

/// Discount rate implied by a stated discount, at full precision
///
/// Rounding the rate would scale its error by the amount.
pub fn implied_discount_rate(amount: Decimal, discount_amount: Decimal) -> Result<Decimal> {
    if amount.is_zero() {
        return Err(Error::Calculation(
            "cannot infer a discount rate from a zero amount".to_string(),
        ));
    }

    discount_amount
        .checked_div(amount)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("discount rate inference"))
}

/// Line total: quantity * unit price
pub fn calculate_line_item_total(
    quantity: Decimal,
    unit_price: Decimal,
    opts: &CalculationOptions,
) -> Result<Decimal> {
    quantity
        .checked_mul(unit_price)
        .map(|total| rounded(total, opts))
        .ok_or_else(|| overflow("line item calculation"))
}

/// `|actual - expected| / |expected| * 100`
///
/// A zero `expected` never divides: the result is 0 when `actual` is also
/// zero and [`ZERO_BASE_PERCENTAGE`] otherwise.
pub fn calculate_percentage_difference(actual: Decimal, expected: Decimal) -> Result<Decimal> {
    let difference = actual
        .checked_sub(expected)
        .ok_or_else(|| overflow("percentage difference"))?
        .abs();

    if expected.is_zero() {
        return Ok(if difference.is_zero() {
            Decimal::ZERO
        } else {
            ZERO_BASE_PERCENTAGE
        });
    }

    difference
        .checked_div(expected.abs())
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("percentage difference"))
}
