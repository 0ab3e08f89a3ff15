use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ArenaFinanceError;
use crate::market::MarketProfile;
use crate::scenarios::SensitivityOutput;
use crate::time_value::cagr;
use crate::types::{with_metadata, ComputationOutput, Currency, Money, Multiple, Rate};
use crate::valuation::{dcf_sensitivity, run_valuation, ValuationInput, ValuationResult};
use crate::ArenaFinanceResult;

const MAX_PROJECTION_YEARS: u32 = 20;
const GROWTH_FLOOR: Decimal = dec!(0.02);
const CYCLE_YEARS: Decimal = dec!(7);
const EXPANSION_REALIZED_SHARE: Decimal = dec!(0.8);
const TECH_CAP: Decimal = dec!(0.15);
const SUSTAINABILITY_CAP: Decimal = dec!(0.10);
const MARGIN_CAP: Decimal = dec!(0.50);
const VARIABLE_COST_SHARE: Decimal = dec!(0.30);
/// Variable plus fixed costs, as a share of revenue, before margin gains
const OPERATING_COST_SHARE: Decimal = dec!(0.70);
const DEPRECIATION_RATE: Decimal = dec!(0.10);
const HIGH_MARGIN: Decimal = dec!(0.30);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Growth and cyclical volatility preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "snake_case")]
pub enum ScenarioPreset {
    /// 60% of the market's growth potential, volatility 0.20
    Conservative,
    /// The market's growth potential, volatility 0.15
    #[default]
    Base,
    /// 140% of the market's growth potential, volatility 0.25
    Optimistic,
    Custom { growth: Rate, volatility: Rate },
}

impl ScenarioPreset {
    /// `(growth, volatility)` for a market with the given growth potential.
    pub fn resolve(&self, growth_potential: Rate) -> (Rate, Rate) {
        match self {
            ScenarioPreset::Conservative => (growth_potential * dec!(0.6), dec!(0.20)),
            ScenarioPreset::Base => (growth_potential, dec!(0.15)),
            ScenarioPreset::Optimistic => (growth_potential * dec!(1.4), dec!(0.25)),
            ScenarioPreset::Custom { growth, volatility } => (*growth, *volatility),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongRangeParams {
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_end_year")]
    pub end_year: i32,
    #[serde(default)]
    pub scenario: ScenarioPreset,
    #[serde(default = "default_initial_revenue")]
    pub initial_annual_revenue: Money,
    #[serde(default = "default_base_margin")]
    pub base_ebitda_margin: Rate,
    /// Capex as a share of revenue
    #[serde(default = "default_capex_rate")]
    pub capex_rate: Rate,
    /// Margin gain per year, capped at 50%
    #[serde(default = "default_margin_improvement")]
    pub margin_improvement: Rate,
    /// Defaults to `start_year + 3` and `start_year + 7`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion_years: Option<Vec<i32>>,
    #[serde(default = "default_expansion_capacity")]
    pub expansion_capacity: Rate,
    #[serde(default = "default_digitalization")]
    pub digitalization_impact: Rate,
    #[serde(default = "default_sustainability")]
    pub sustainability_bonus: Rate,
    /// Yearly slowdown of organic growth
    #[serde(default = "default_maturation")]
    pub maturation_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    #[serde(default = "default_terminal_growth")]
    pub terminal_growth: Rate,
    #[serde(default = "default_residual_multiple")]
    pub residual_multiple: Multiple,
}

fn default_start_year() -> i32 {
    2024
}

fn default_end_year() -> i32 {
    2035
}

fn default_initial_revenue() -> Money {
    dec!(600000)
}

fn default_base_margin() -> Rate {
    dec!(0.25)
}

fn default_capex_rate() -> Rate {
    dec!(0.05)
}

fn default_margin_improvement() -> Rate {
    dec!(0.005)
}

fn default_expansion_capacity() -> Rate {
    dec!(0.50)
}

fn default_digitalization() -> Rate {
    dec!(0.05)
}

fn default_sustainability() -> Rate {
    dec!(0.03)
}

fn default_maturation() -> Rate {
    dec!(0.005)
}

fn default_terminal_growth() -> Rate {
    dec!(0.02)
}

fn default_residual_multiple() -> Multiple {
    dec!(8)
}

impl Default for LongRangeParams {
    fn default() -> Self {
        LongRangeParams {
            start_year: default_start_year(),
            end_year: default_end_year(),
            scenario: ScenarioPreset::default(),
            initial_annual_revenue: default_initial_revenue(),
            base_ebitda_margin: default_base_margin(),
            capex_rate: default_capex_rate(),
            margin_improvement: default_margin_improvement(),
            expansion_years: None,
            expansion_capacity: default_expansion_capacity(),
            digitalization_impact: default_digitalization(),
            sustainability_bonus: default_sustainability(),
            maturation_rate: default_maturation(),
            tax_rate: None,
            discount_rate: None,
            terminal_growth: default_terminal_growth(),
            residual_multiple: default_residual_multiple(),
        }
    }
}

impl LongRangeParams {
    pub fn num_years(&self) -> u32 {
        (self.end_year - self.start_year + 1).max(0) as u32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongRangeYear {
    pub year: i32,
    pub revenue: Money,
    /// Total growth applied this year
    pub growth: Rate,
    /// Capacity relative to the starting facility
    pub capacity: Decimal,
    pub ebitda_margin: Rate,
    pub ebitda: Money,
    pub variable_costs: Money,
    pub fixed_costs: Money,
    pub capex: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub taxes: Money,
    pub net_income: Money,
    pub free_cash_flow: Money,
    pub cumulative_fcf: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongRangeSummary {
    pub final_revenue: Money,
    pub revenue_cagr: Option<Rate>,
    pub total_fcf: Money,
    pub total_capex: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    FirstPositiveFcf,
    CapacityExpansion,
    RevenueThreshold,
    HighMargin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub year: i32,
    pub kind: MilestoneKind,
    /// FCF, capacity added, revenue or margin, depending on the kind
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusinessPhase {
    /// Years 1-3
    Establishment,
    /// Years 4-7
    Growth,
    /// Years 8+
    Maturity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: BusinessPhase,
    pub first_year: i32,
    pub last_year: i32,
    pub average_growth: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlternativeScenario {
    pub name: String,
    pub years: Vec<LongRangeYear>,
    pub final_revenue: Money,
    pub total_fcf: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongRangeValuation {
    pub dcf: ValuationResult,
    pub sensitivity: SensitivityOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongRangeOutput {
    pub growth: Rate,
    pub volatility: Rate,
    pub years: Vec<LongRangeYear>,
    pub summary: LongRangeSummary,
    pub milestones: Vec<Milestone>,
    pub phases: Vec<PhaseSummary>,
    pub alternatives: Vec<AlternativeScenario>,
    pub valuation: LongRangeValuation,
}

/// Fully resolved inputs of one projector run.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct Drivers {
    pub(crate) growth: Rate,
    pub(crate) volatility: Rate,
    pub(crate) base_margin: Rate,
    pub(crate) margin_improvement: Rate,
    pub(crate) expansion_years: Vec<i32>,
    pub(crate) expansion_capacity: Rate,
    pub(crate) capex_rate: Rate,
    pub(crate) digitalization: Rate,
    pub(crate) sustainability: Rate,
    pub(crate) maturation: Rate,
    pub(crate) tax_rate: Rate,
}

impl Drivers {
    pub(crate) fn resolve(profile: &MarketProfile, params: &LongRangeParams) -> Self {
        let (growth, volatility) = params.scenario.resolve(profile.growth_potential);
        Drivers {
            growth,
            volatility,
            base_margin: params.base_ebitda_margin,
            margin_improvement: params.margin_improvement,
            expansion_years: params
                .expansion_years
                .clone()
                .unwrap_or_else(|| vec![params.start_year + 3, params.start_year + 7]),
            expansion_capacity: params.expansion_capacity,
            capex_rate: params.capex_rate,
            digitalization: params.digitalization_impact,
            sustainability: params.sustainability_bonus,
            maturation: params.maturation_rate,
            tax_rate: params.tax_rate.unwrap_or(profile.tax_rate),
        }
    }

    fn conservative(&self) -> Self {
        Drivers {
            growth: self.growth * dec!(0.6),
            volatility: self.volatility * dec!(1.5),
            base_margin: self.base_margin * dec!(0.8),
            margin_improvement: self.margin_improvement * dec!(0.5),
            expansion_years: Vec::new(),
            expansion_capacity: Decimal::ZERO,
            ..self.clone()
        }
    }

    fn optimistic(&self) -> Self {
        Drivers {
            growth: self.growth * dec!(1.4),
            volatility: self.volatility * dec!(0.8),
            base_margin: self.base_margin * dec!(1.1),
            margin_improvement: self.margin_improvement * dec!(1.5),
            expansion_capacity: self.expansion_capacity * dec!(1.5),
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Year-by-year projection to `end_year` with milestones, business phases,
/// alternative scenarios and a DCF of the free cash flows.
pub fn project_long_range(
    profile: &MarketProfile,
    params: &LongRangeParams,
) -> ArenaFinanceResult<ComputationOutput<LongRangeOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_params(params)?;
    let drivers = Drivers::resolve(profile, params);
    let discount_rate = params.discount_rate.unwrap_or(profile.discount_rate);

    let years = project_years(params, &drivers);
    let summary = summarize(&years);
    if summary.total_fcf < Decimal::ZERO {
        warnings.push("Cumulative free cash flow is negative over the horizon".into());
    }

    let threshold = match profile.currency {
        Currency::BRL => dec!(1000000),
        _ => dec!(500000),
    };
    let milestones = find_milestones(&years, &drivers, threshold);
    let phases = business_phases(&years);

    let alternatives = vec![
        alternative("conservative", params, &drivers.conservative()),
        alternative("optimistic", params, &drivers.optimistic()),
    ];

    let valuation_input = ValuationInput {
        initial_investment: Decimal::ZERO,
        cash_flows: years.iter().map(|y| y.free_cash_flow).collect(),
        discount_rate,
        terminal_growth: params.terminal_growth,
        residual_multiple: Some(params.residual_multiple),
        terminal_ebitda: years.last().map(|y| y.ebitda),
    };
    let dcf = run_valuation(&valuation_input)?;
    warnings.extend(dcf.warnings);
    let sensitivity = dcf_sensitivity(&valuation_input)?;

    let output = LongRangeOutput {
        growth: drivers.growth,
        volatility: drivers.volatility,
        years,
        summary,
        milestones,
        phases,
        alternatives,
        valuation: LongRangeValuation {
            dcf: dcf.result,
            sensitivity: sensitivity.result,
        },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!(
            "Long-range projection {}-{}, {}",
            params.start_year, params.end_year, profile.name
        ),
        &serde_json::json!({
            "market": profile.market,
            "params": params,
            "drivers": drivers,
            "discount_rate": discount_rate,
        }),
        warnings,
        elapsed,
        output,
    ))
}

pub(crate) fn validate_params(params: &LongRangeParams) -> ArenaFinanceResult<()> {
    let n = params.num_years();
    if params.end_year < params.start_year || n == 0 || n > MAX_PROJECTION_YEARS {
        return Err(ArenaFinanceError::InvalidInput {
            field: "end_year".into(),
            reason: format!("Horizon must span 1 to {MAX_PROJECTION_YEARS} years"),
        });
    }
    if params.initial_annual_revenue <= Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "initial_annual_revenue".into(),
            reason: "Revenue must be positive".into(),
        });
    }
    for (field, rate) in [
        ("base_ebitda_margin", params.base_ebitda_margin),
        ("capex_rate", params.capex_rate),
    ] {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(ArenaFinanceError::InvalidInput {
                field: field.into(),
                reason: "Must be between 0 and 1".into(),
            });
        }
    }
    if let ScenarioPreset::Custom { volatility, .. } = params.scenario {
        if volatility < Decimal::ZERO {
            return Err(ArenaFinanceError::InvalidInput {
                field: "scenario.volatility".into(),
                reason: "Volatility cannot be negative".into(),
            });
        }
    }
    if params.expansion_capacity < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "expansion_capacity".into(),
            reason: "Expansion cannot be negative".into(),
        });
    }
    Ok(())
}

/// The projector loop itself.
pub(crate) fn project_years(params: &LongRangeParams, drivers: &Drivers) -> Vec<LongRangeYear> {
    let n = params.num_years();
    let mut years = Vec::with_capacity(n as usize);
    let mut revenue = params.initial_annual_revenue;
    let mut capacity = Decimal::ONE;
    let mut cumulative_fcf = Decimal::ZERO;

    for i in 0..n {
        let year = params.start_year + i as i32;
        let t = Decimal::from(i);

        let maturation = (drivers.growth - drivers.maturation * t).max(GROWTH_FLOOR);
        let cycle = Decimal::ONE
            + drivers.volatility * dec!(0.5) * (Decimal::TWO_PI * t / CYCLE_YEARS).sin();
        let organic = maturation * cycle;

        let expansion_boost = if drivers.expansion_years.contains(&year) {
            capacity *= Decimal::ONE + drivers.expansion_capacity;
            drivers.expansion_capacity * EXPANSION_REALIZED_SHARE
        } else {
            Decimal::ZERO
        };

        let tech = (drivers.digitalization * t / dec!(5)).min(TECH_CAP);
        let sustainability = (drivers.sustainability * t / dec!(3)).min(SUSTAINABILITY_CAP);

        let growth = organic + expansion_boost + tech + sustainability;
        revenue *= Decimal::ONE + growth;

        let margin = (drivers.base_margin + drivers.margin_improvement * t).min(MARGIN_CAP);
        let ebitda = revenue * margin;
        let variable_costs = revenue * VARIABLE_COST_SHARE;
        let fixed_costs = revenue * (OPERATING_COST_SHARE - margin);

        let capex = revenue * drivers.capex_rate;
        // Asset base approximated as two years of capex per year elapsed
        let depreciation = capex * Decimal::from(i + 1) * dec!(2) * DEPRECIATION_RATE;

        let ebit = ebitda - depreciation;
        let taxes = (ebit * drivers.tax_rate).max(Decimal::ZERO);
        let net_income = ebit - taxes;
        let free_cash_flow = net_income + depreciation - capex;
        cumulative_fcf += free_cash_flow;

        years.push(LongRangeYear {
            year,
            revenue,
            growth,
            capacity,
            ebitda_margin: margin,
            ebitda,
            variable_costs,
            fixed_costs,
            capex,
            depreciation,
            ebit,
            taxes,
            net_income,
            free_cash_flow,
            cumulative_fcf,
        });
    }
    years
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn summarize(years: &[LongRangeYear]) -> LongRangeSummary {
    let first = years.first().map(|y| y.revenue).unwrap_or(Decimal::ZERO);
    let final_revenue = years.last().map(|y| y.revenue).unwrap_or(Decimal::ZERO);
    LongRangeSummary {
        final_revenue,
        revenue_cagr: cagr(first, final_revenue, years.len().saturating_sub(1) as u32),
        total_fcf: years.iter().map(|y| y.free_cash_flow).sum(),
        total_capex: years.iter().map(|y| y.capex).sum(),
    }
}

fn find_milestones(years: &[LongRangeYear], drivers: &Drivers, threshold: Money) -> Vec<Milestone> {
    let mut milestones = Vec::new();

    if let Some(y) = years.iter().find(|y| y.free_cash_flow > Decimal::ZERO) {
        milestones.push(Milestone {
            year: y.year,
            kind: MilestoneKind::FirstPositiveFcf,
            value: y.free_cash_flow,
        });
    }
    for y in years.iter().filter(|y| drivers.expansion_years.contains(&y.year)) {
        milestones.push(Milestone {
            year: y.year,
            kind: MilestoneKind::CapacityExpansion,
            value: drivers.expansion_capacity,
        });
    }
    if let Some(y) = years.iter().find(|y| y.revenue >= threshold) {
        milestones.push(Milestone {
            year: y.year,
            kind: MilestoneKind::RevenueThreshold,
            value: y.revenue,
        });
    }
    if let Some(y) = years.iter().find(|y| y.ebitda_margin >= HIGH_MARGIN) {
        milestones.push(Milestone {
            year: y.year,
            kind: MilestoneKind::HighMargin,
            value: y.ebitda_margin,
        });
    }
    milestones
}

fn business_phases(years: &[LongRangeYear]) -> Vec<PhaseSummary> {
    let bounds = [
        (BusinessPhase::Establishment, 0, 3),
        (BusinessPhase::Growth, 3, 7),
        (BusinessPhase::Maturity, 7, years.len()),
    ];
    bounds
        .into_iter()
        .filter_map(|(phase, from, to)| {
            let slice = years.get(from..to.min(years.len()))?;
            let (first, last) = (slice.first()?, slice.last()?);
            let average_growth = slice.iter().map(|y| y.growth).sum::<Decimal>()
                / Decimal::from(slice.len() as u64);
            Some(PhaseSummary {
                phase,
                first_year: first.year,
                last_year: last.year,
                average_growth,
            })
        })
        .collect()
}

fn alternative(name: &str, params: &LongRangeParams, drivers: &Drivers) -> AlternativeScenario {
    let years = project_years(params, drivers);
    AlternativeScenario {
        name: name.to_string(),
        final_revenue: years.last().map(|y| y.revenue).unwrap_or(Decimal::ZERO),
        total_fcf: years.iter().map(|y| y.free_cash_flow).sum(),
        years,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use rust_decimal_macros::dec;

    fn flat_params() -> LongRangeParams {
        LongRangeParams {
            scenario: ScenarioPreset::Custom {
                growth: dec!(0.10),
                volatility: Decimal::ZERO,
            },
            expansion_years: Some(vec![]),
            digitalization_impact: Decimal::ZERO,
            sustainability_bonus: Decimal::ZERO,
            maturation_rate: Decimal::ZERO,
            tax_rate: Some(dec!(0.20)),
            ..Default::default()
        }
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            ScenarioPreset::Conservative.resolve(dec!(0.15)),
            (dec!(0.09), dec!(0.20))
        );
        assert_eq!(
            ScenarioPreset::Optimistic.resolve(dec!(0.15)),
            (dec!(0.21), dec!(0.25))
        );
    }

    #[test]
    fn test_first_year_without_cycle() {
        let params = flat_params();
        let drivers = Drivers::resolve(&Market::Brazil.profile(), &params);
        let years = project_years(&params, &drivers);
        assert_eq!(years.len(), 12);
        let y0 = &years[0];
        // Growth applies in year 0 too: 600,000 × 1.10
        assert_eq!(y0.revenue, dec!(660000));
        assert_eq!(y0.ebitda, dec!(165000));
        assert_eq!(y0.capex, dec!(33000));
        // 33,000 × 1 × 2 × 10%
        assert_eq!(y0.depreciation, dec!(6600));
        assert_eq!(y0.ebit, dec!(158400));
        assert_eq!(y0.taxes, dec!(31680));
        assert_eq!(y0.free_cash_flow, dec!(126720) + dec!(6600) - dec!(33000));
        assert_eq!(y0.fixed_costs, dec!(660000) * dec!(0.45));
    }

    #[test]
    fn test_expansion_boost_applies_once() {
        let params = LongRangeParams {
            expansion_years: Some(vec![2025]),
            ..flat_params()
        };
        let drivers = Drivers::resolve(&Market::Brazil.profile(), &params);
        let years = project_years(&params, &drivers);
        assert_eq!(years[1].growth, dec!(0.10) + dec!(0.40));
        assert_eq!(years[1].capacity, dec!(1.5));
        assert_eq!(years[2].growth, dec!(0.10));
        assert_eq!(years[2].capacity, dec!(1.5));
    }

    #[test]
    fn test_growth_floor_and_margin_cap() {
        let params = LongRangeParams {
            scenario: ScenarioPreset::Custom {
                growth: dec!(0.03),
                volatility: Decimal::ZERO,
            },
            maturation_rate: dec!(0.01),
            margin_improvement: dec!(0.05),
            ..flat_params()
        };
        let drivers = Drivers::resolve(&Market::Brazil.profile(), &params);
        let years = project_years(&params, &drivers);
        assert_eq!(years[5].growth, dec!(0.02));
        assert_eq!(years[11].ebitda_margin, dec!(0.50));
    }

    #[test]
    fn test_phases_and_milestones() {
        let out = project_long_range(&Market::Brazil.profile(), &LongRangeParams::default())
            .unwrap()
            .result;
        assert_eq!(out.phases.len(), 3);
        assert_eq!(out.phases[0].first_year, 2024);
        assert_eq!(out.phases[1].first_year, 2027);
        assert_eq!(out.phases[2].last_year, 2035);
        let expansions = out
            .milestones
            .iter()
            .filter(|m| m.kind == MilestoneKind::CapacityExpansion)
            .count();
        assert_eq!(expansions, 2);
        assert!(out
            .milestones
            .iter()
            .any(|m| m.kind == MilestoneKind::RevenueThreshold));
    }

    #[test]
    fn test_alternatives_bracket_base() {
        let out = project_long_range(&Market::Europe.profile(), &LongRangeParams::default())
            .unwrap()
            .result;
        assert_eq!(out.alternatives.len(), 2);
        assert!(out.alternatives[0].final_revenue < out.summary.final_revenue);
        assert!(out.alternatives[1].final_revenue > out.summary.final_revenue);
    }

    #[test]
    fn test_valuation_is_attached() {
        let out = project_long_range(&Market::Brazil.profile(), &LongRangeParams::default())
            .unwrap()
            .result;
        let dcf = &out.valuation.dcf;
        assert_eq!(
            dcf.enterprise_value,
            dcf.pv_explicit_flows + dcf.pv_terminal_value
        );
        let last = out.years.last().unwrap();
        assert_eq!(dcf.residual_value, Some(last.ebitda * dec!(8)));
        assert_eq!(out.valuation.sensitivity.base_case_value, Some(dcf.enterprise_value));
    }

    #[test]
    fn test_terminal_growth_above_discount_rejected() {
        let params = LongRangeParams {
            terminal_growth: dec!(0.15),
            ..Default::default()
        };
        assert!(project_long_range(&Market::Brazil.profile(), &params).is_err());
    }

    #[test]
    fn test_horizon_validation() {
        let params = LongRangeParams {
            end_year: 2050,
            ..Default::default()
        };
        assert!(project_long_range(&Market::Brazil.profile(), &params).is_err());
    }
}
