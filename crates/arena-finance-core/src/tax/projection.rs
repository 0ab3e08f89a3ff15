use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ArenaFinanceError;
use crate::market::{Market, MarketProfile, TaxBurdenBand};
use crate::time_value::{cagr, compound_factor};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ArenaFinanceResult;

use super::regime::{BrazilRegime, TaxBreakdown, TaxRateOverrides, TaxRegime, TAX_PLANNING_FACTOR};

const MAX_PROJECTION_YEARS: u32 = 12;
const PLANNING_HORIZON_YEARS: u32 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Parameters of a tax-planning engagement to evaluate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningSavingsInput {
    /// Expected reduction of the tax bill (0.10 = 10%)
    pub savings_rate: Rate,
    pub implementation_cost: Money,
}

/// Multi-year tax projection input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxProjectionInput {
    pub market: Market,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regime: Option<BrazilRegime>,
    #[serde(default)]
    pub overrides: TaxRateOverrides,
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_projection_years")]
    pub projection_years: u32,
    /// First-year gross revenue
    pub annual_revenue: Money,
    /// Defaults to the market's growth potential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth: Option<Rate>,
    /// Operating profit as a share of revenue
    pub profit_margin: Rate,
    /// Deductible expenses as a share of revenue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduction_rate: Option<Rate>,
    #[serde(default)]
    pub tax_planning: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planning: Option<PlanningSavingsInput>,
}

fn default_start_year() -> i32 {
    2024
}

fn default_projection_years() -> u32 {
    5
}

/// Taxes of one projected year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxYear {
    pub year: i32,
    pub gross_revenue: Money,
    pub deductions: Money,
    pub taxable_revenue: Money,
    pub taxable_profit: Money,
    pub taxes: TaxBreakdown,
    pub total_taxes: Money,
    /// Taxes over gross revenue; `None` for zero revenue
    pub tax_burden: Option<Rate>,
    pub net_revenue: Money,
    /// Taxable profit less direct taxes, see [`TaxBreakdown::direct_taxes`]
    pub net_profit: Money,
}

/// Where the average burden falls relative to the market's band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchmarkPosition {
    Below,
    Within,
    Above,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxSummary {
    pub total_revenue: Money,
    pub total_taxes: Money,
    pub average_burden: Option<Rate>,
    /// `1 - average_burden`
    pub fiscal_efficiency: Option<Rate>,
    pub tax_cagr: Option<Rate>,
    pub benchmark_band: TaxBurdenBand,
    pub benchmark_position: Option<BenchmarkPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeComparisonRow {
    pub regime: BrazilRegime,
    pub name: String,
    pub total_taxes: Money,
    pub tax_burden: Option<Rate>,
    pub net_revenue: Money,
}

/// The three Brazilian regimes at the same revenue and profit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeComparison {
    pub rows: Vec<RegimeComparisonRow>,
    /// Regime with the lowest tax bill
    pub recommended: BrazilRegime,
    /// Difference between the highest and the lowest tax bill
    pub savings_vs_worst: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningSavings {
    pub annual_savings: Money,
    pub five_year_savings: Money,
    pub net_savings: Money,
    /// Net savings over implementation cost; `None` when the cost is zero
    pub roi: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxProjectionOutput {
    pub regime: String,
    pub years: Vec<TaxYear>,
    pub summary: TaxSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regime_comparison: Option<RegimeComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning_savings: Option<PlanningSavings>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project taxes year by year under a compounding revenue path.
pub fn project_taxes(
    input: &TaxProjectionInput,
) -> ArenaFinanceResult<ComputationOutput<TaxProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_projection_input(input)?;

    let profile = input.market.profile();
    let regime = TaxRegime::for_profile(&profile, input.regime, &input.overrides)?;
    let growth = input.revenue_growth.unwrap_or(profile.growth_potential);
    let deduction_rate = input.deduction_rate.unwrap_or(Decimal::ZERO);

    let mut years = Vec::with_capacity(input.projection_years as usize);
    for i in 0..input.projection_years {
        let gross_revenue = input
            .annual_revenue
            .checked_mul(compound_factor(growth, i)?)
            .ok_or_else(|| {
                ArenaFinanceError::FinancialImpossibility(format!(
                    "projected revenue overflows in year {}",
                    i + 1
                ))
            })?;
        let gross_profit = gross_revenue * input.profit_margin;
        let deductions = gross_revenue * deduction_rate;
        let taxable_revenue = gross_revenue - deductions;
        let taxable_profit = gross_profit - deductions;

        let mut taxes = regime.compute(taxable_revenue, taxable_profit);
        if input.tax_planning {
            taxes = taxes.with_planning(TAX_PLANNING_FACTOR);
        }
        let total_taxes = taxes.total;
        let net_profit = taxable_profit - taxes.direct_taxes();

        years.push(TaxYear {
            year: input.start_year + i as i32,
            gross_revenue,
            deductions,
            taxable_revenue,
            taxable_profit,
            total_taxes,
            tax_burden: total_taxes.checked_div(gross_revenue),
            net_revenue: gross_revenue - total_taxes,
            net_profit,
            taxes,
        });
    }

    let summary = summarize(&years, &profile);
    if summary.benchmark_position == Some(BenchmarkPosition::Above) {
        warnings.push(format!(
            "Average tax burden is above the {} benchmark band",
            profile.name
        ));
    }

    let regime_comparison = if input.market == Market::Brazil {
        Some(compare_brazil_regimes(
            &profile,
            input.annual_revenue,
            input.annual_revenue * input.profit_margin,
            &input.overrides,
        )?)
    } else {
        None
    };

    let planning_savings = match &input.planning {
        Some(p) => {
            let first_year_tax = years.first().map(|y| y.total_taxes).unwrap_or(Decimal::ZERO);
            Some(planning_savings(first_year_tax, p.savings_rate, p.implementation_cost)?)
        }
        None => None,
    };

    let output = TaxProjectionOutput {
        regime: regime.name().to_string(),
        years,
        summary,
        regime_comparison,
        planning_savings,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Multi-year tax projection ({})", profile.name),
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Compare Simples Nacional, Lucro Presumido and Lucro Real.
pub fn compare_brazil_regimes(
    profile: &MarketProfile,
    revenue: Money,
    profit: Money,
    overrides: &TaxRateOverrides,
) -> ArenaFinanceResult<RegimeComparison> {
    let mut rows = Vec::with_capacity(BrazilRegime::ALL.len());
    for regime in BrazilRegime::ALL {
        let taxes = TaxRegime::for_profile(profile, Some(regime), overrides)?.compute(revenue, profit);
        rows.push(RegimeComparisonRow {
            regime,
            name: regime.display_name().to_string(),
            total_taxes: taxes.total,
            tax_burden: taxes.total.checked_div(revenue),
            net_revenue: revenue - taxes.total,
        });
    }

    let best = rows
        .iter()
        .min_by_key(|r| r.total_taxes)
        .ok_or_else(|| ArenaFinanceError::InsufficientData("No regimes to compare".into()))?;
    let worst = rows.iter().map(|r| r.total_taxes).max().unwrap_or(best.total_taxes);

    Ok(RegimeComparison {
        recommended: best.regime,
        savings_vs_worst: worst - best.total_taxes,
        rows,
    })
}

/// Savings of a tax-planning engagement over five years.
pub fn planning_savings(
    first_year_tax: Money,
    savings_rate: Rate,
    implementation_cost: Money,
) -> ArenaFinanceResult<PlanningSavings> {
    if savings_rate < Decimal::ZERO || savings_rate > Decimal::ONE {
        return Err(ArenaFinanceError::InvalidInput {
            field: "savings_rate".into(),
            reason: "Savings rate must be between 0 and 1".into(),
        });
    }
    if implementation_cost < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "implementation_cost".into(),
            reason: "Implementation cost cannot be negative".into(),
        });
    }

    let annual_savings = first_year_tax * savings_rate;
    let five_year_savings = annual_savings * Decimal::from(PLANNING_HORIZON_YEARS);
    let net_savings = five_year_savings - implementation_cost;

    Ok(PlanningSavings {
        annual_savings,
        five_year_savings,
        net_savings,
        roi: net_savings.checked_div(implementation_cost),
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_projection_input(input: &TaxProjectionInput) -> ArenaFinanceResult<()> {
    if input.projection_years == 0 || input.projection_years > MAX_PROJECTION_YEARS {
        return Err(ArenaFinanceError::InvalidInput {
            field: "projection_years".into(),
            reason: format!("Must be between 1 and {MAX_PROJECTION_YEARS}"),
        });
    }
    if input.annual_revenue < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "annual_revenue".into(),
            reason: "Revenue cannot be negative".into(),
        });
    }
    if input.profit_margin < dec!(-1) || input.profit_margin > Decimal::ONE {
        return Err(ArenaFinanceError::InvalidInput {
            field: "profit_margin".into(),
            reason: "Profit margin must be between -1 and 1".into(),
        });
    }
    if let Some(d) = input.deduction_rate {
        if d < Decimal::ZERO || d > Decimal::ONE {
            return Err(ArenaFinanceError::InvalidInput {
                field: "deduction_rate".into(),
                reason: "Deduction rate must be between 0 and 1".into(),
            });
        }
    }
    if let Some(g) = input.revenue_growth {
        if g <= dec!(-1) {
            return Err(ArenaFinanceError::InvalidInput {
                field: "revenue_growth".into(),
                reason: "Growth must be greater than -100%".into(),
            });
        }
    }
    Ok(())
}

fn summarize(years: &[TaxYear], profile: &MarketProfile) -> TaxSummary {
    let total_revenue: Money = years.iter().map(|y| y.gross_revenue).sum();
    let total_taxes: Money = years.iter().map(|y| y.total_taxes).sum();
    let average_burden = total_taxes.checked_div(total_revenue);

    let tax_cagr = match (years.first(), years.last()) {
        (Some(first), Some(last)) if years.len() > 1 => {
            cagr(first.total_taxes, last.total_taxes, (years.len() - 1) as u32)
        }
        _ => None,
    };

    let band = profile.tax_burden_band.clone();
    let benchmark_position = average_burden.map(|b| {
        if b < band.low {
            BenchmarkPosition::Below
        } else if b > band.high {
            BenchmarkPosition::Above
        } else {
            BenchmarkPosition::Within
        }
    });

    TaxSummary {
        total_revenue,
        total_taxes,
        average_burden,
        fiscal_efficiency: average_burden.map(|b| Decimal::ONE - b),
        tax_cagr,
        benchmark_band: band,
        benchmark_position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> TaxProjectionInput {
        TaxProjectionInput {
            market: Market::Brazil,
            regime: Some(BrazilRegime::LucroPresumido),
            overrides: TaxRateOverrides::default(),
            start_year: 2024,
            projection_years: 5,
            annual_revenue: dec!(1200000),
            revenue_growth: Some(dec!(0.10)),
            profit_margin: dec!(0.20),
            deduction_rate: None,
            tax_planning: false,
            planning: None,
        }
    }

    #[test]
    fn test_first_year_matches_single_period() {
        let out = project_taxes(&sample_input()).unwrap().result;
        assert_eq!(out.years.len(), 5);
        assert_eq!(out.years[0].year, 2024);
        assert_eq!(out.years[0].total_taxes, dec!(210360));
        assert_eq!(out.years[1].gross_revenue, dec!(1320000));
    }

    #[test]
    fn test_deductions_reduce_taxable_bases() {
        let mut input = sample_input();
        input.deduction_rate = Some(dec!(0.10));
        let out = project_taxes(&input).unwrap().result;
        let y0 = &out.years[0];
        assert_eq!(y0.deductions, dec!(120000));
        assert_eq!(y0.taxable_revenue, dec!(1080000));
        assert_eq!(y0.taxable_profit, dec!(120000));
        assert!(y0.total_taxes < dec!(210360));
    }

    #[test]
    fn test_summary_burden_and_efficiency() {
        let out = project_taxes(&sample_input()).unwrap().result;
        let burden = out.summary.average_burden.unwrap();
        assert_eq!(out.summary.fiscal_efficiency.unwrap(), Decimal::ONE - burden);
        assert!(out.summary.tax_cagr.unwrap() > Decimal::ZERO);
    }

    #[test]
    fn test_regime_comparison_recommends_cheapest() {
        let out = project_taxes(&sample_input()).unwrap().result;
        let cmp = out.regime_comparison.unwrap();
        let min = cmp.rows.iter().map(|r| r.total_taxes).min().unwrap();
        let best = cmp.rows.iter().find(|r| r.regime == cmp.recommended).unwrap();
        assert_eq!(best.total_taxes, min);
    }

    #[test]
    fn test_no_regime_comparison_outside_brazil() {
        let mut input = sample_input();
        input.market = Market::Europe;
        input.regime = None;
        let out = project_taxes(&input).unwrap().result;
        assert!(out.regime_comparison.is_none());
    }

    #[test]
    fn test_planning_savings() {
        let s = planning_savings(dec!(100000), dec!(0.10), dec!(20000)).unwrap();
        assert_eq!(s.annual_savings, dec!(10000));
        assert_eq!(s.five_year_savings, dec!(50000));
        assert_eq!(s.net_savings, dec!(30000));
        assert_eq!(s.roi, Some(dec!(1.5)));
        assert_eq!(planning_savings(dec!(1), dec!(0.1), Decimal::ZERO).unwrap().roi, None);
    }

    #[test]
    fn test_projection_years_bounds() {
        let mut input = sample_input();
        input.projection_years = 13;
        assert!(project_taxes(&input).is_err());
    }

    #[test]
    fn test_net_profit_deducts_social_security_in_europe() {
        let mut input = sample_input();
        input.market = Market::Europe;
        input.regime = None;
        let out = project_taxes(&input).unwrap().result;
        let y0 = &out.years[0];
        let direct = y0.taxes.component("corporate_tax") + y0.taxes.component("social_security");
        assert!(y0.taxes.component("social_security") > Decimal::ZERO);
        assert_eq!(y0.net_profit, y0.taxable_profit - direct);
    }

    #[test]
    fn test_net_profit_deducts_profit_taxes_in_brazil() {
        let out = project_taxes(&sample_input()).unwrap().result;
        let y0 = &out.years[0];
        assert_eq!(y0.net_profit, y0.taxable_profit - y0.taxes.income_taxes());
    }

    #[test]
    fn test_runaway_growth_is_an_error() {
        let mut input = sample_input();
        input.annual_revenue = dec!(1000);
        input.revenue_growth = Some(dec!(999999));
        input.projection_years = 6;
        assert!(matches!(
            project_taxes(&input),
            Err(ArenaFinanceError::FinancialImpossibility(_))
        ));
    }
}
