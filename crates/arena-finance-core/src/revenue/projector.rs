use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ArenaFinanceError;
use crate::market::MarketProfile;
use crate::time_value::compound_factor;
use crate::types::{Money, Rate};
use crate::ArenaFinanceResult;

/// Average days of operation per month.
pub const DAYS_PER_MONTH: Decimal = dec!(30);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A kind of field offered by the facility (e.g. "Society 7x7").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldType {
    pub name: String,
    pub hourly_rate: Money,
    pub hours_per_day: Decimal,
    pub occupancy: Rate,
}

/// Revenue sources of a facility. Ancillary amounts are monthly base values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueMix {
    pub field_types: Vec<FieldType>,
    /// Total fields, split evenly across field types
    pub num_fields: u32,
    pub monthly_tournaments: Money,
    pub monthly_cafeteria: Money,
    pub monthly_events: Money,
    /// Sponsorship grows but has no seasonality
    pub monthly_sponsorship: Money,
    pub annual_growth: Rate,
}

/// Revenue of one month, broken down by source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    pub year_index: u32,
    pub month: u32,
    pub fields: Money,
    pub tournaments: Money,
    pub cafeteria: Money,
    pub events: Money,
    pub sponsorship: Money,
    pub total: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `hours_per_day × 30 × occupancy × hourly_rate × seasonal × growth`
pub fn monthly_revenue(
    hourly_rate: Money,
    hours_per_day: Decimal,
    occupancy: Rate,
    seasonal_factor: Decimal,
    growth_factor: Decimal,
) -> Money {
    hours_per_day * DAYS_PER_MONTH * occupancy * hourly_rate * seasonal_factor * growth_factor
}

/// Discrete annual compounding: `(1 + annual_growth)^year_index`.
pub fn growth_factor(annual_growth: Rate, year_index: u32) -> ArenaFinanceResult<Decimal> {
    compound_factor(annual_growth, year_index)
}

impl RevenueMix {
    /// Two society field types at the market's hourly rate and occupancy,
    /// with the standard ancillary revenue lines.
    pub fn for_profile(profile: &MarketProfile, num_fields: u32) -> Self {
        let field_type = |name: &str| FieldType {
            name: name.to_string(),
            hourly_rate: profile.avg_hourly_rate,
            hours_per_day: profile.hours_per_day,
            occupancy: profile.expected_occupancy,
        };
        RevenueMix {
            field_types: vec![field_type("Society 5x5"), field_type("Society 7x7")],
            num_fields,
            monthly_tournaments: dec!(5000),
            monthly_cafeteria: dec!(3000),
            monthly_events: dec!(2000),
            monthly_sponsorship: dec!(4000),
            annual_growth: profile.growth_potential,
        }
    }

    pub fn validate(&self) -> ArenaFinanceResult<()> {
        if self.field_types.is_empty() {
            return Err(ArenaFinanceError::InsufficientData(
                "At least one field type is required".into(),
            ));
        }
        if self.num_fields == 0 {
            return Err(ArenaFinanceError::InvalidInput {
                field: "num_fields".into(),
                reason: "At least one field is required".into(),
            });
        }
        for ft in &self.field_types {
            if ft.occupancy < Decimal::ZERO || ft.occupancy > Decimal::ONE {
                return Err(ArenaFinanceError::InvalidInput {
                    field: format!("field_types[{}].occupancy", ft.name),
                    reason: "Occupancy must be between 0 and 1".into(),
                });
            }
            if ft.hourly_rate < Decimal::ZERO || ft.hours_per_day < Decimal::ZERO {
                return Err(ArenaFinanceError::InvalidInput {
                    field: format!("field_types[{}]", ft.name),
                    reason: "Hourly rate and hours per day cannot be negative".into(),
                });
            }
            if ft.hours_per_day > dec!(24) {
                return Err(ArenaFinanceError::InvalidInput {
                    field: format!("field_types[{}].hours_per_day", ft.name),
                    reason: "A day has at most 24 hours".into(),
                });
            }
        }
        let ancillary = [
            self.monthly_tournaments,
            self.monthly_cafeteria,
            self.monthly_events,
            self.monthly_sponsorship,
        ];
        if ancillary.iter().any(|v| *v < Decimal::ZERO) {
            return Err(ArenaFinanceError::InvalidInput {
                field: "revenue_mix".into(),
                reason: "Ancillary revenues cannot be negative".into(),
            });
        }
        if self.annual_growth <= dec!(-1) {
            return Err(ArenaFinanceError::InvalidInput {
                field: "annual_growth".into(),
                reason: "Growth must be greater than -100%".into(),
            });
        }
        Ok(())
    }
}

/// Revenue by source for calendar `month` of projection year `year_index`.
pub fn project_month(
    profile: &MarketProfile,
    mix: &RevenueMix,
    year_index: u32,
    month: u32,
) -> ArenaFinanceResult<MonthlyRevenue> {
    let seasonal = profile.seasonal_factor(month)?;
    let growth = growth_factor(mix.annual_growth, year_index)?;
    let fields_per_type =
        Decimal::from(mix.num_fields) / Decimal::from(mix.field_types.len().max(1) as u64);

    let fields: Money = mix
        .field_types
        .iter()
        .map(|ft| {
            monthly_revenue(ft.hourly_rate, ft.hours_per_day, ft.occupancy, seasonal, growth)
                * fields_per_type
        })
        .sum();

    let tournaments = mix.monthly_tournaments * seasonal * growth;
    let cafeteria = mix.monthly_cafeteria * seasonal * growth;
    let events = mix.monthly_events * seasonal * growth;
    let sponsorship = mix.monthly_sponsorship * growth;

    Ok(MonthlyRevenue {
        year_index,
        month,
        fields,
        tournaments,
        cafeteria,
        events,
        sponsorship,
        total: fields + tournaments + cafeteria + events + sponsorship,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;

    #[test]
    fn test_monthly_revenue_formula() {
        // 12h × 30 × 0.65 × 80 = 18,720
        let rev = monthly_revenue(dec!(80), dec!(12), dec!(0.65), Decimal::ONE, Decimal::ONE);
        assert_eq!(rev, dec!(18720));
    }

    #[test]
    fn test_growth_factor_is_annual() {
        assert_eq!(growth_factor(dec!(0.10), 0).unwrap(), Decimal::ONE);
        assert_eq!(growth_factor(dec!(0.10), 2).unwrap(), dec!(1.21));
        assert!(growth_factor(dec!(1000), 20).is_err());
    }

    #[test]
    fn test_project_month_applies_seasonality() {
        let profile = Market::Brazil.profile();
        let mix = RevenueMix::for_profile(&profile, 2);
        // February carries a 1.3 factor in Brazil
        let feb = project_month(&profile, &mix, 0, 2).unwrap();
        assert_eq!(feb.fields, dec!(18720) * dec!(1.3) * dec!(2));
        assert_eq!(feb.tournaments, dec!(6500));
        assert_eq!(feb.sponsorship, dec!(4000));
        assert_eq!(
            feb.total,
            feb.fields + feb.tournaments + feb.cafeteria + feb.events + feb.sponsorship
        );
    }

    #[test]
    fn test_invalid_month_rejected() {
        let profile = Market::Uae.profile();
        let mix = RevenueMix::for_profile(&profile, 1);
        assert!(project_month(&profile, &mix, 0, 13).is_err());
    }

    #[test]
    fn test_mix_validation() {
        let profile = Market::Europe.profile();
        let mut mix = RevenueMix::for_profile(&profile, 2);
        assert!(mix.validate().is_ok());
        mix.field_types[0].occupancy = dec!(1.2);
        assert!(mix.validate().is_err());
    }
}
