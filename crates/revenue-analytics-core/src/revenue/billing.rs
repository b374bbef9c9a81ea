use rust_decimal::Decimal;

use crate::entities::{BilledType, ServiceLineItem};
use crate::types::Money;

/// Monthly-equivalent value of one billing line.
///
/// Recurring billing is spread evenly over its period (quarterly / 3,
/// annually / 12). One-off and usage billing carry no recurring value.
/// No rounding is applied here.
pub fn monthly_value(billed_type: BilledType, price: Money, quantity: Decimal) -> Money {
    match billed_type.months() {
        Some(months) => price * quantity / Decimal::from(months),
        None => Decimal::ZERO,
    }
}

pub fn sli_monthly_value(item: &ServiceLineItem) -> Money {
    monthly_value(item.billed_type, item.price, item.quantity)
}
