use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::ArenaFinanceError;
use crate::types::{Currency, Money, Rate, Years};
use crate::ArenaFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Operating market of the facility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    Brazil,
    Europe,
    Uae,
}

/// Qualitative intensity used for competition and regulatory burden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

/// Reference operating figures for an established facility in the market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndustryBenchmarks {
    /// Annual revenue per field
    pub revenue_per_field: Money,
    pub ebitda_margin: Rate,
    pub occupancy_rate: Rate,
    pub payback_years: Years,
    pub roi: Rate,
}

/// Start-up cost base. Field and equipment costs are per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentBaseCosts {
    pub field_construction_per_field: Money,
    pub equipment_per_field: Money,
    pub facility_setup: Money,
    pub working_capital: Money,
    pub licensing_permits: Money,
}

/// Statutory tax rates of a market, one variant per tax system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "system", rename_all = "snake_case")]
pub enum MarketTaxRates {
    Brazil {
        simples_rate: Rate,
        iss_rate: Rate,
        pis_cofins_rate: Rate,
        /// IRPJ
        corporate_tax_rate: Rate,
        /// CSLL
        social_contribution_rate: Rate,
    },
    Europe {
        vat_rate: Rate,
        corporate_tax_rate: Rate,
        social_security_rate: Rate,
    },
    Uae {
        vat_rate: Rate,
        corporate_tax_rate: Rate,
    },
}

/// Acceptable total tax burden (taxes / revenue) for the market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxBurdenBand {
    pub low: Rate,
    pub high: Rate,
}

/// Complete parameter set of a market. Every engine reads its defaults here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketProfile {
    pub market: Market,
    pub name: String,
    pub currency: Currency,
    /// Flat effective tax rate used by the cash-flow model
    pub tax_rate: Rate,
    pub inflation_rate: Rate,
    pub discount_rate: Rate,
    pub avg_hourly_rate: Money,
    pub expected_occupancy: Rate,
    pub hours_per_day: Decimal,
    pub days_per_week: u32,
    /// Payroll charges as a share of gross salaries
    pub salary_burden: Rate,
    pub rent_per_sqm: Money,
    pub utility_cost_factor: Rate,
    pub maintenance_factor: Rate,
    pub marketing_factor: Rate,
    pub working_capital_days: u32,
    pub depreciation_rate: Rate,
    pub growth_potential: Rate,
    pub market_size_factor: Decimal,
    pub competition_level: Intensity,
    pub regulatory_complexity: Intensity,
    /// Monthly demand multipliers, January first
    pub seasonal_factors: [Decimal; 12],
    pub benchmarks: IndustryBenchmarks,
    pub investment_costs: InvestmentBaseCosts,
    pub tax_rates: MarketTaxRates,
    pub tax_burden_band: TaxBurdenBand,
}

/// One row of the cross-market comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketComparison {
    pub market: Market,
    pub name: String,
    pub currency: Currency,
    pub tax_rate: Rate,
    pub avg_hourly_rate: Money,
    pub expected_occupancy: Rate,
    pub growth_potential: Rate,
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

impl Market {
    pub const ALL: [Market; 3] = [Market::Brazil, Market::Europe, Market::Uae];

    pub fn display_name(&self) -> &'static str {
        match self {
            Market::Brazil => "Brazil",
            Market::Europe => "Europe",
            Market::Uae => "UAE",
        }
    }

    pub fn currency(&self) -> Currency {
        match self {
            Market::Brazil => Currency::BRL,
            Market::Europe => Currency::EUR,
            Market::Uae => Currency::AED,
        }
    }

    /// Built-in parameter set for this market.
    pub fn profile(&self) -> MarketProfile {
        match self {
            Market::Brazil => brazil_profile(),
            Market::Europe => europe_profile(),
            Market::Uae => uae_profile(),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Market {
    type Err = ArenaFinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "brazil" | "brasil" | "br" | "brl" => Ok(Market::Brazil),
            "europe" | "europa" | "eu" | "eur" => Ok(Market::Europe),
            "uae" | "emirates" | "emirados árabes" | "emirados arabes" | "aed" => Ok(Market::Uae),
            _ => Err(ArenaFinanceError::UnknownMarket(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Look up a market profile by name. Unknown names are an error.
pub fn get_market_profile(name: &str) -> ArenaFinanceResult<MarketProfile> {
    Ok(name.parse::<Market>()?.profile())
}

/// Look up a market profile, falling back to Brazil for unknown names.
pub fn get_market_profile_or_default(name: &str) -> MarketProfile {
    match name.parse::<Market>() {
        Ok(market) => market.profile(),
        Err(_) => {
            warn!(market = name, "unknown market, falling back to Brazil");
            Market::Brazil.profile()
        }
    }
}

/// Headline figures of every market side by side.
pub fn compare_markets() -> Vec<MarketComparison> {
    Market::ALL
        .iter()
        .map(|m| {
            let p = m.profile();
            MarketComparison {
                market: p.market,
                name: p.name,
                currency: p.currency,
                tax_rate: p.tax_rate,
                avg_hourly_rate: p.avg_hourly_rate,
                expected_occupancy: p.expected_occupancy,
                growth_potential: p.growth_potential,
            }
        })
        .collect()
}

impl MarketProfile {
    /// Seasonal multiplier for a calendar month (1 = January).
    pub fn seasonal_factor(&self, month: u32) -> ArenaFinanceResult<Decimal> {
        if !(1..=12).contains(&month) {
            return Err(ArenaFinanceError::InvalidInput {
                field: "month".into(),
                reason: format!("Month must be between 1 and 12, got {month}"),
            });
        }
        Ok(self.seasonal_factors[(month - 1) as usize])
    }
}

impl MarketTaxRates {
    /// Taxes levied on gross revenue (PIS/COFINS in Brazil, VAT elsewhere).
    pub fn sales_taxes(&self, revenue: Money) -> Money {
        match self {
            MarketTaxRates::Brazil {
                pis_cofins_rate, ..
            } => revenue * pis_cofins_rate,
            MarketTaxRates::Europe { vat_rate, .. } | MarketTaxRates::Uae { vat_rate, .. } => {
                revenue * vat_rate
            }
        }
    }

    /// Corporate income tax on profit (IRPJ in Brazil). Zero for losses.
    pub fn income_taxes(&self, profit: Money) -> Money {
        if profit <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let rate = match self {
            MarketTaxRates::Brazil {
                corporate_tax_rate, ..
            }
            | MarketTaxRates::Europe {
                corporate_tax_rate, ..
            }
            | MarketTaxRates::Uae {
                corporate_tax_rate, ..
            } => *corporate_tax_rate,
        };
        profit * rate
    }
}

// ---------------------------------------------------------------------------
// Built-in profiles
// ---------------------------------------------------------------------------

fn brazil_profile() -> MarketProfile {
    MarketProfile {
        market: Market::Brazil,
        name: "Brazil".into(),
        currency: Currency::BRL,
        tax_rate: dec!(0.163),
        inflation_rate: dec!(0.065),
        discount_rate: dec!(0.12),
        avg_hourly_rate: dec!(80),
        expected_occupancy: dec!(0.65),
        hours_per_day: dec!(12),
        days_per_week: 7,
        salary_burden: dec!(0.70),
        rent_per_sqm: dec!(25),
        utility_cost_factor: dec!(0.08),
        maintenance_factor: dec!(0.05),
        marketing_factor: dec!(0.03),
        working_capital_days: 30,
        depreciation_rate: dec!(0.10),
        growth_potential: dec!(0.15),
        market_size_factor: dec!(1.0),
        competition_level: Intensity::High,
        regulatory_complexity: Intensity::High,
        seasonal_factors: [
            dec!(1.2),
            dec!(1.3),
            dec!(1.1),
            dec!(0.9),
            dec!(0.8),
            dec!(0.7),
            dec!(0.8),
            dec!(0.9),
            dec!(1.0),
            dec!(1.1),
            dec!(1.2),
            dec!(1.0),
        ],
        benchmarks: IndustryBenchmarks {
            revenue_per_field: dec!(150000),
            ebitda_margin: dec!(0.15),
            occupancy_rate: dec!(0.60),
            payback_years: dec!(3.5),
            roi: dec!(0.25),
        },
        investment_costs: InvestmentBaseCosts {
            field_construction_per_field: dec!(120000),
            equipment_per_field: dec!(25000),
            facility_setup: dec!(80000),
            working_capital: dec!(50000),
            licensing_permits: dec!(15000),
        },
        tax_rates: MarketTaxRates::Brazil {
            simples_rate: dec!(0.08),
            iss_rate: dec!(0.05),
            pis_cofins_rate: dec!(0.0365),
            corporate_tax_rate: dec!(0.25),
            social_contribution_rate: dec!(0.09),
        },
        tax_burden_band: TaxBurdenBand {
            low: dec!(0.20),
            high: dec!(0.35),
        },
    }
}

fn europe_profile() -> MarketProfile {
    MarketProfile {
        market: Market::Europe,
        name: "Europe".into(),
        currency: Currency::EUR,
        tax_rate: dec!(0.25),
        inflation_rate: dec!(0.03),
        discount_rate: dec!(0.08),
        avg_hourly_rate: dec!(45),
        expected_occupancy: dec!(0.75),
        hours_per_day: dec!(14),
        days_per_week: 7,
        salary_burden: dec!(0.45),
        rent_per_sqm: dec!(18),
        utility_cost_factor: dec!(0.12),
        maintenance_factor: dec!(0.06),
        marketing_factor: dec!(0.04),
        working_capital_days: 45,
        depreciation_rate: dec!(0.08),
        growth_potential: dec!(0.08),
        market_size_factor: dec!(2.5),
        competition_level: Intensity::Medium,
        regulatory_complexity: Intensity::Medium,
        seasonal_factors: [
            dec!(0.6),
            dec!(0.7),
            dec!(0.9),
            dec!(1.1),
            dec!(1.3),
            dec!(1.4),
            dec!(1.2),
            dec!(1.1),
            dec!(1.0),
            dec!(0.9),
            dec!(0.7),
            dec!(0.6),
        ],
        benchmarks: IndustryBenchmarks {
            revenue_per_field: dec!(85000),
            ebitda_margin: dec!(0.18),
            occupancy_rate: dec!(0.70),
            payback_years: dec!(4.0),
            roi: dec!(0.20),
        },
        investment_costs: InvestmentBaseCosts {
            field_construction_per_field: dec!(75000),
            equipment_per_field: dec!(18000),
            facility_setup: dec!(55000),
            working_capital: dec!(35000),
            licensing_permits: dec!(12000),
        },
        tax_rates: MarketTaxRates::Europe {
            vat_rate: dec!(0.20),
            corporate_tax_rate: dec!(0.25),
            social_security_rate: dec!(0.15),
        },
        tax_burden_band: TaxBurdenBand {
            low: dec!(0.25),
            high: dec!(0.40),
        },
    }
}

fn uae_profile() -> MarketProfile {
    MarketProfile {
        market: Market::Uae,
        name: "UAE".into(),
        currency: Currency::AED,
        tax_rate: dec!(0.05),
        inflation_rate: dec!(0.02),
        discount_rate: dec!(0.06),
        avg_hourly_rate: dec!(180),
        expected_occupancy: dec!(0.80),
        hours_per_day: dec!(16),
        days_per_week: 7,
        salary_burden: dec!(0.15),
        rent_per_sqm: dec!(35),
        utility_cost_factor: dec!(0.15),
        maintenance_factor: dec!(0.08),
        marketing_factor: dec!(0.05),
        working_capital_days: 60,
        depreciation_rate: dec!(0.12),
        growth_potential: dec!(0.12),
        market_size_factor: dec!(1.8),
        competition_level: Intensity::Low,
        regulatory_complexity: Intensity::Low,
        seasonal_factors: [
            dec!(1.1),
            dec!(1.2),
            dec!(1.3),
            dec!(1.1),
            dec!(0.8),
            dec!(0.6),
            dec!(0.5),
            dec!(0.6),
            dec!(0.9),
            dec!(1.2),
            dec!(1.3),
            dec!(1.1),
        ],
        benchmarks: IndustryBenchmarks {
            revenue_per_field: dec!(220000),
            ebitda_margin: dec!(0.22),
            occupancy_rate: dec!(0.75),
            payback_years: dec!(3.0),
            roi: dec!(0.30),
        },
        investment_costs: InvestmentBaseCosts {
            field_construction_per_field: dec!(180000),
            equipment_per_field: dec!(35000),
            facility_setup: dec!(120000),
            working_capital: dec!(80000),
            licensing_permits: dec!(25000),
        },
        tax_rates: MarketTaxRates::Uae {
            vat_rate: dec!(0.05),
            corporate_tax_rate: dec!(0.09),
        },
        tax_burden_band: TaxBurdenBand {
            low: dec!(0.05),
            high: dec!(0.15),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_market_aliases() {
        assert_eq!("Brasil".parse::<Market>().unwrap(), Market::Brazil);
        assert_eq!(" europe ".parse::<Market>().unwrap(), Market::Europe);
        assert_eq!("Emirados Árabes".parse::<Market>().unwrap(), Market::Uae);
        assert_eq!("UAE".parse::<Market>().unwrap(), Market::Uae);
    }

    #[test]
    fn test_unknown_market_is_error() {
        assert!(matches!(
            get_market_profile("Brasill"),
            Err(ArenaFinanceError::UnknownMarket(_))
        ));
    }

    #[test]
    fn test_lenient_lookup_falls_back_to_brazil() {
        let profile = get_market_profile_or_default("Atlantis");
        assert_eq!(profile.market, Market::Brazil);
    }

    #[test]
    fn test_profile_currencies() {
        for market in Market::ALL {
            assert_eq!(market.profile().currency, market.currency());
        }
    }

    #[test]
    fn test_seasonal_factor_bounds() {
        let profile = Market::Europe.profile();
        assert_eq!(profile.seasonal_factor(6).unwrap(), dec!(1.4));
        assert!(profile.seasonal_factor(0).is_err());
        assert!(profile.seasonal_factor(13).is_err());
    }

    #[test]
    fn test_sales_and_income_taxes() {
        let brazil = Market::Brazil.profile().tax_rates;
        assert_eq!(brazil.sales_taxes(dec!(100000)), dec!(3650));
        assert_eq!(brazil.income_taxes(dec!(100000)), dec!(25000));
        assert_eq!(brazil.income_taxes(dec!(-5000)), Decimal::ZERO);

        let uae = Market::Uae.profile().tax_rates;
        assert_eq!(uae.sales_taxes(dec!(100000)), dec!(5000));
        assert_eq!(uae.income_taxes(dec!(100000)), dec!(9000));
    }

    #[test]
    fn test_compare_markets_covers_all() {
        let rows = compare_markets();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].avg_hourly_rate, dec!(180));
    }
}
