use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

/// Share of revenue carried as inventory cost.
pub const INVENTORY_COST_SHARE: Rate = dec!(0.15);
/// Share of revenue bought from suppliers on terms.
pub const PAYABLE_COST_SHARE: Rate = dec!(0.20);

const DAYS_PER_MONTH: Decimal = dec!(30);

/// Net working-capital need for one month of revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NcgBreakdown {
    pub receivables: Money,
    pub inventory: Money,
    pub payables: Money,
    /// `receivables + inventory - payables`
    pub ncg: Money,
    /// `ncg / revenue`; `None` when there is no revenue
    pub ncg_pct: Option<Rate>,
}

/// Receivables, inventory and payables implied by monthly `revenue` and
/// the day terms.
pub fn ncg(
    revenue: Money,
    receivables_days: Decimal,
    inventory_days: Decimal,
    payables_days: Decimal,
) -> NcgBreakdown {
    let receivables = revenue * receivables_days / DAYS_PER_MONTH;
    let inventory = revenue * INVENTORY_COST_SHARE * inventory_days / DAYS_PER_MONTH;
    let payables = revenue * PAYABLE_COST_SHARE * payables_days / DAYS_PER_MONTH;
    let ncg = receivables + inventory - payables;

    NcgBreakdown {
        receivables,
        inventory,
        payables,
        ncg,
        ncg_pct: ncg.checked_div(revenue),
    }
}
