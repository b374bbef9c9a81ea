//! Delta and percentage formatting shared by the dashboard metrics.
//!
//! Some metrics report their month-over-month change as a number, others as
//! a display string such as `"+2"`, `"+100%"` or `"1.5×"`. The strings are
//! part of the consumer contract and are reproduced exactly.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::types::Percentage;

// ---------------------------------------------------------------------------
// Helpers — rounding
// ---------------------------------------------------------------------------

/// Round half away from zero to `dp` decimal places.
pub fn round_half_away(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

pub fn round_to_two_decimals(value: Decimal) -> Decimal {
    round_half_away(value, 2)
}

// ---------------------------------------------------------------------------
// Function: print_float_value
// ---------------------------------------------------------------------------

/// Values below 100 keep two decimals, larger ones are rounded to integers.
/// Trailing zeros are dropped; `with_sign` prefixes positive values with `+`.
pub fn print_float_value(value: Decimal, with_sign: bool) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    let rounded = if value < dec!(100) {
        round_to_two_decimals(value)
    } else {
        round_half_away(value, 0)
    };
    let text = rounded.normalize().to_string();
    if with_sign && value > Decimal::ZERO {
        format!("+{text}")
    } else {
        text
    }
}

// ---------------------------------------------------------------------------
// Function: compute_numbers_display
// ---------------------------------------------------------------------------

/// Delta string between two consecutive values of a monetary or count series.
///
/// From zero any rise is shown as the absolute increase (`"+2"`, `"+0.5"`).
/// Otherwise changes up to ±100% are shown as a signed percentage and larger
/// rises as a multiplier (`"1.5×"`).
pub fn compute_numbers_display(previous: Decimal, current: Decimal) -> String {
    if previous.is_zero() {
        if current.is_zero() {
            return "0%".to_string();
        }
        return print_float_value(current, true);
    }

    let pct = round_half_away((current - previous) / previous * dec!(100), 0);
    if pct.abs() > dec!(100) {
        return format!("{}×", print_float_value(pct.abs() / dec!(100), false));
    }
    format!("{}%", print_float_value(pct, true))
}

// ---------------------------------------------------------------------------
// Function: compute_percentages_display
// ---------------------------------------------------------------------------

/// Percentage-point difference between two rates, clamped to ±100.
pub fn compute_percentages_display(previous: Percentage, current: Percentage) -> String {
    let diff = (current - previous).clamp(dec!(-100), dec!(100));
    print_float_value(diff, true)
}

// ---------------------------------------------------------------------------
// Function: percentage_change
// ---------------------------------------------------------------------------

/// Relative change from `previous` to `current` in percent, one decimal.
///
/// From zero the change is measured against the current value, so any rise
/// from nothing reads as +100.
pub fn percentage_change(previous: Decimal, current: Decimal) -> Percentage {
    if previous.is_zero() && current.is_zero() {
        return Decimal::ZERO;
    }
    let base = if previous.is_zero() { current } else { previous };
    round_half_away((current - previous) / base * dec!(1000), 0) / dec!(10)
}
