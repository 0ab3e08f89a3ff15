use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ArenaFinanceError;
use crate::types::Money;
use crate::ArenaFinanceResult;

use super::profile::MarketProfile;

/// Start-up capital needed to open a facility with `num_fields` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentRequirements {
    pub num_fields: u32,
    pub field_construction: Money,
    pub equipment: Money,
    pub facility_setup: Money,
    pub working_capital: Money,
    pub licensing_permits: Money,
    pub total: Money,
}

/// Scale the market's cost base to the number of fields.
pub fn investment_requirements(
    profile: &MarketProfile,
    num_fields: u32,
) -> ArenaFinanceResult<InvestmentRequirements> {
    if num_fields == 0 {
        return Err(ArenaFinanceError::InvalidInput {
            field: "num_fields".into(),
            reason: "At least one field is required".into(),
        });
    }

    let costs = &profile.investment_costs;
    let fields = Decimal::from(num_fields);
    let field_construction = costs.field_construction_per_field * fields;
    let equipment = costs.equipment_per_field * fields;
    let total = field_construction
        + equipment
        + costs.facility_setup
        + costs.working_capital
        + costs.licensing_permits;

    Ok(InvestmentRequirements {
        num_fields,
        field_construction,
        equipment,
        facility_setup: costs.facility_setup,
        working_capital: costs.working_capital,
        licensing_permits: costs.licensing_permits,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use rust_decimal_macros::dec;

    #[test]
    fn test_brazil_two_fields() {
        let req = investment_requirements(&Market::Brazil.profile(), 2).unwrap();
        assert_eq!(req.field_construction, dec!(240000));
        assert_eq!(req.equipment, dec!(50000));
        // 240k + 50k + 80k + 50k + 15k
        assert_eq!(req.total, dec!(435000));
    }

    #[test]
    fn test_zero_fields_rejected() {
        assert!(investment_requirements(&Market::Uae.profile(), 0).is_err());
    }
}
