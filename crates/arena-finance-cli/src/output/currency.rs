use arena_finance_core::types::Currency;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Compact money display: `R$ 1.25M`, `€ 85K`, `AED 12.50`.
pub fn format_currency(value: Decimal, currency: Currency) -> String {
    let symbol = currency.symbol();
    let magnitude = value.abs();
    if magnitude >= dec!(1000000) {
        format!("{symbol} {:.2}M", value / dec!(1000000))
    } else if magnitude >= dec!(1000) {
        format!("{symbol} {:.0}K", value / dec!(1000))
    } else {
        format!("{symbol} {:.2}", value)
    }
}
