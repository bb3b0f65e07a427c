//! Money helpers shared by the aggregator and the liability calculator.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to paisa (two decimal places), halves away from zero.
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::round_half_up;
///
/// assert_eq!(round_half_up(dec!(84999.995)), dec!(85000.00));
/// assert_eq!(round_half_up(dec!(12.344)), dec!(12.34));
/// ```
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Floors a value at zero.
///
/// # Arguments
///
/// * `value` - Any amount, possibly negative
///
/// # Returns
///
/// `value` when it is zero or positive, otherwise zero.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::non_negative;
///
/// assert_eq!(non_negative(dec!(-50000)), dec!(0));
/// assert_eq!(non_negative(dec!(30000)), dec!(30000));
/// ```
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Adds `values`, returning `None` on overflow instead of panicking.
///
/// # Arguments
///
/// * `values` - The amounts to add, in any order
///
/// # Returns
///
/// The exact sum, or `None` if any partial sum leaves the range of
/// [`Decimal`]. The sum of no values is zero.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::checked_sum;
///
/// assert_eq!(checked_sum([dec!(1200000), dec!(-50000)]), Some(dec!(1150000)));
/// assert_eq!(checked_sum([Decimal::MAX, dec!(1)]), None);
/// ```
pub fn checked_sum<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
}

/// Adds `values`, clamping each partial sum to the range of [`Decimal`].
///
/// An overflow in the positive direction sticks at [`Decimal::MAX`] and one in
/// the negative direction at [`Decimal::MIN`].
///
/// # Arguments
///
/// * `values` - The amounts to add
///
/// # Returns
///
/// The sum, saturated at whichever bound it ran past.
///
/// # Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use rust_decimal_macros::dec;
/// use tax_core::calculations::common::saturating_sum;
///
/// assert_eq!(saturating_sum([dec!(100), dec!(-40)]), dec!(60));
/// assert_eq!(saturating_sum([Decimal::MAX, dec!(1)]), Decimal::MAX);
/// assert_eq!(saturating_sum([Decimal::MIN, dec!(-1)]), Decimal::MIN);
/// ```
pub fn saturating_sum<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, v| acc.saturating_add(v))
}
