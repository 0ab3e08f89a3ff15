use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ArenaFinanceError;
use crate::market::{investment_requirements, MarketProfile};
use crate::scenarios::{one_way_sensitivity, OneWaySensitivity};
use crate::time_value::{compound_factor, irr, npv, payback_period};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate, Years};
use crate::ArenaFinanceResult;

const MIN_ANALYSIS_YEARS: u32 = 3;
const MAX_ANALYSIS_YEARS: u32 = 15;
/// Share of the investment that is depreciable, written off over ten years
const DEPRECIABLE_SHARE: Decimal = dec!(0.6);
const DEPRECIATION_YEARS: Decimal = dec!(10);
const MAINTENANCE_CAPEX_RATE: Decimal = dec!(0.03);
const INITIAL_WORKING_CAPITAL_RATE: Decimal = dec!(0.05);
const WORKING_CAPITAL_GROWTH_RATE: Decimal = dec!(0.03);
const MARGIN_RAMP_YEARS: Decimal = dec!(5);
const SENSITIVITY_STEP: Decimal = dec!(0.05);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViabilityParams {
    /// First operating year; the investment is made the year before
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_analysis_years")]
    pub analysis_years: u32,
    #[serde(default = "default_num_fields")]
    pub num_fields: u32,
    /// Defaults to the market's investment requirements for `num_fields`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_investment: Option<Money>,
    #[serde(default = "default_monthly_revenue")]
    pub initial_monthly_revenue: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<Rate>,
    #[serde(default = "default_initial_margin")]
    pub initial_ebitda_margin: Rate,
    /// Reached linearly after five years
    #[serde(default = "default_mature_margin")]
    pub mature_ebitda_margin: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
    /// EV/EBITDA applied to the final year's EBITDA
    #[serde(default = "default_residual_multiple")]
    pub residual_multiple: Multiple,
}

fn default_start_year() -> i32 {
    2024
}

fn default_analysis_years() -> u32 {
    10
}

fn default_num_fields() -> u32 {
    2
}

fn default_monthly_revenue() -> Money {
    dec!(45000)
}

fn default_initial_margin() -> Rate {
    dec!(0.20)
}

fn default_mature_margin() -> Rate {
    dec!(0.30)
}

fn default_residual_multiple() -> Multiple {
    dec!(6)
}

impl Default for ViabilityParams {
    fn default() -> Self {
        ViabilityParams {
            start_year: default_start_year(),
            analysis_years: default_analysis_years(),
            num_fields: default_num_fields(),
            initial_investment: None,
            initial_monthly_revenue: default_monthly_revenue(),
            growth_rate: None,
            initial_ebitda_margin: default_initial_margin(),
            mature_ebitda_margin: default_mature_margin(),
            tax_rate: None,
            discount_rate: None,
            residual_multiple: default_residual_multiple(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViabilityYear {
    pub year: i32,
    pub revenue: Money,
    /// `None` for the investment year
    pub ebitda_margin: Option<Rate>,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub taxes: Money,
    pub net_income: Money,
    pub capex: Money,
    pub working_capital_change: Money,
    pub free_cash_flow: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViabilityIndicators {
    pub npv: Money,
    pub irr: Option<Rate>,
    pub payback_years: Option<Years>,
    /// Σ FCF after year 0 over the investment
    pub roi: Option<Rate>,
    pub terminal_value: Money,
    pub pv_terminal_value: Money,
    pub pv_free_cash_flows: Money,
    pub enterprise_value: Money,
    pub value_multiple: Option<Multiple>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCriterion {
    pub criterion: String,
    pub points: u32,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViabilityClass {
    HighlyViable,
    Viable,
    Questionable,
    NotViable,
}

impl ViabilityClass {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => ViabilityClass::HighlyViable,
            60..=79 => ViabilityClass::Viable,
            40..=59 => ViabilityClass::Questionable,
            _ => ViabilityClass::NotViable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViabilityScenario {
    Pessimistic,
    Base,
    Optimistic,
}

impl ViabilityScenario {
    /// Revenue, growth, initial margin and investment factors.
    fn factors(&self) -> (Decimal, Decimal, Decimal, Decimal) {
        match self {
            ViabilityScenario::Pessimistic => (dec!(0.7), dec!(0.5), dec!(0.8), dec!(1.2)),
            ViabilityScenario::Base => (Decimal::ONE, Decimal::ONE, Decimal::ONE, Decimal::ONE),
            ViabilityScenario::Optimistic => (dec!(1.3), dec!(1.5), dec!(1.2), dec!(0.9)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub scenario: ViabilityScenario,
    pub investment: Money,
    pub npv: Money,
    pub irr: Option<Rate>,
    pub payback_years: Option<Years>,
    pub roi: Option<Rate>,
    /// Positive NPV and IRR above the discount rate
    pub viable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViabilityOutput {
    pub initial_investment: Money,
    pub rows: Vec<ViabilityYear>,
    pub indicators: ViabilityIndicators,
    pub score: u32,
    pub criteria: Vec<ScoreCriterion>,
    pub classification: ViabilityClass,
    pub scenarios: Vec<ScenarioOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViabilityDriver {
    InitialRevenue,
    GrowthRate,
    EbitdaMargin,
    Investment,
    DiscountRate,
}

impl ViabilityDriver {
    pub fn label(&self) -> &'static str {
        match self {
            ViabilityDriver::InitialRevenue => "Initial revenue",
            ViabilityDriver::GrowthRate => "Growth rate",
            ViabilityDriver::EbitdaMargin => "EBITDA margin",
            ViabilityDriver::Investment => "Initial investment",
            ViabilityDriver::DiscountRate => "Discount rate",
        }
    }
}

/// The assumptions a single run of the model needs.
#[derive(Debug, Clone, Serialize)]
struct Case {
    investment: Money,
    monthly_revenue: Money,
    growth: Rate,
    initial_margin: Rate,
    mature_margin: Rate,
    tax_rate: Rate,
    discount_rate: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Investment appraisal: yearly FCF, indicators, a 0-100 score and
/// pessimistic/base/optimistic scenarios.
pub fn analyze_viability(
    profile: &MarketProfile,
    params: &ViabilityParams,
) -> ArenaFinanceResult<ComputationOutput<ViabilityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_params(params)?;
    let case = base_case(profile, params)?;

    let rows = build_rows(params, &case)?;
    let indicators = compute_indicators(&rows, &case, params)?;
    if indicators.irr.is_none() {
        warnings.push("IRR did not converge for the free cash flows".into());
    }

    let criteria = score_criteria(&indicators, case.discount_rate);
    let score: u32 = criteria.iter().filter(|c| c.passed).map(|c| c.points).sum();

    let mut scenarios = Vec::with_capacity(3);
    for scenario in [
        ViabilityScenario::Pessimistic,
        ViabilityScenario::Base,
        ViabilityScenario::Optimistic,
    ] {
        scenarios.push(run_scenario(params, &case, scenario)?);
    }

    let output = ViabilityOutput {
        initial_investment: case.investment,
        rows,
        indicators,
        score,
        criteria,
        classification: ViabilityClass::from_score(score),
        scenarios,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Investment viability analysis, {}", profile.name),
        &serde_json::json!({
            "market": profile.market,
            "params": params,
            "case": case,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// NPV as one driver moves from `-range` to `+range` in 5% steps. Growth is
/// floored at 0, the initial margin at 5% and the discount rate at 1%.
pub fn viability_sensitivity(
    profile: &MarketProfile,
    params: &ViabilityParams,
    driver: ViabilityDriver,
    range: Rate,
) -> ArenaFinanceResult<ComputationOutput<OneWaySensitivity>> {
    let start = Instant::now();

    validate_params(params)?;
    let case = base_case(profile, params)?;

    let base_value = match driver {
        ViabilityDriver::InitialRevenue => case.monthly_revenue,
        ViabilityDriver::GrowthRate => case.growth,
        ViabilityDriver::EbitdaMargin => case.initial_margin,
        ViabilityDriver::Investment => case.investment,
        ViabilityDriver::DiscountRate => case.discount_rate,
    };

    let table = one_way_sensitivity(driver.label(), base_value, range, SENSITIVITY_STEP, |value| {
        let mut c = case.clone();
        match driver {
            ViabilityDriver::InitialRevenue => c.monthly_revenue = value,
            ViabilityDriver::GrowthRate => c.growth = value.max(Decimal::ZERO),
            ViabilityDriver::EbitdaMargin => c.initial_margin = value.max(dec!(0.05)),
            ViabilityDriver::Investment => c.investment = value,
            ViabilityDriver::DiscountRate => c.discount_rate = value.max(dec!(0.01)),
        }
        let rows = build_rows(params, &c)?;
        let fcf: Vec<Money> = rows.iter().map(|r| r.free_cash_flow).collect();
        npv(c.discount_rate, &fcf)
    })?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Viability NPV sensitivity to {}", driver.label()),
        &serde_json::json!({
            "market": profile.market,
            "driver": driver,
            "range": range,
        }),
        Vec::new(),
        elapsed,
        table,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_params(params: &ViabilityParams) -> ArenaFinanceResult<()> {
    if params.analysis_years < MIN_ANALYSIS_YEARS || params.analysis_years > MAX_ANALYSIS_YEARS {
        return Err(ArenaFinanceError::InvalidInput {
            field: "analysis_years".into(),
            reason: format!("Must be between {MIN_ANALYSIS_YEARS} and {MAX_ANALYSIS_YEARS}"),
        });
    }
    for (field, margin) in [
        ("initial_ebitda_margin", params.initial_ebitda_margin),
        ("mature_ebitda_margin", params.mature_ebitda_margin),
    ] {
        if margin < Decimal::ZERO || margin > Decimal::ONE {
            return Err(ArenaFinanceError::InvalidInput {
                field: field.into(),
                reason: "Must be between 0 and 1".into(),
            });
        }
    }
    if params.initial_monthly_revenue < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "initial_monthly_revenue".into(),
            reason: "Revenue cannot be negative".into(),
        });
    }
    if params.residual_multiple < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "residual_multiple".into(),
            reason: "Multiple cannot be negative".into(),
        });
    }
    if params.initial_investment.is_some_and(|i| i < Decimal::ZERO) {
        return Err(ArenaFinanceError::InvalidInput {
            field: "initial_investment".into(),
            reason: "Investment cannot be negative".into(),
        });
    }
    Ok(())
}

fn base_case(profile: &MarketProfile, params: &ViabilityParams) -> ArenaFinanceResult<Case> {
    let investment = match params.initial_investment {
        Some(v) => v,
        None => investment_requirements(profile, params.num_fields)?.total,
    };
    Ok(Case {
        investment,
        monthly_revenue: params.initial_monthly_revenue,
        growth: params.growth_rate.unwrap_or(profile.growth_potential),
        initial_margin: params.initial_ebitda_margin,
        mature_margin: params.mature_ebitda_margin,
        tax_rate: params.tax_rate.unwrap_or(profile.tax_rate),
        discount_rate: params.discount_rate.unwrap_or(profile.discount_rate),
    })
}

fn build_rows(params: &ViabilityParams, case: &Case) -> ArenaFinanceResult<Vec<ViabilityYear>> {
    let mut rows = Vec::with_capacity(params.analysis_years as usize + 1);
    rows.push(ViabilityYear {
        year: params.start_year - 1,
        revenue: Decimal::ZERO,
        ebitda_margin: None,
        ebitda: Decimal::ZERO,
        depreciation: Decimal::ZERO,
        ebit: Decimal::ZERO,
        taxes: Decimal::ZERO,
        net_income: Decimal::ZERO,
        capex: case.investment,
        working_capital_change: Decimal::ZERO,
        free_cash_flow: -case.investment,
    });

    let depreciable = case.investment * DEPRECIABLE_SHARE;
    let annual_depreciation = depreciable / DEPRECIATION_YEARS;
    let mut accumulated = Decimal::ZERO;
    let annual_base = case.monthly_revenue * dec!(12);
    let mut prior_revenue = Decimal::ZERO;

    for i in 0..params.analysis_years {
        let revenue = annual_base
            .checked_mul(compound_factor(case.growth, i)?)
            .ok_or_else(|| {
                ArenaFinanceError::FinancialImpossibility(format!(
                    "projected revenue overflows in year {}",
                    i + 1
                ))
            })?;
        let ramp = (Decimal::from(i) / MARGIN_RAMP_YEARS).min(Decimal::ONE);
        let margin = case.initial_margin + (case.mature_margin - case.initial_margin) * ramp;
        let ebitda = revenue * margin;

        let depreciation = if accumulated < depreciable {
            annual_depreciation
        } else {
            Decimal::ZERO
        };
        accumulated += depreciation;

        let ebit = ebitda - depreciation;
        let taxes = (ebit * case.tax_rate).max(Decimal::ZERO);
        let net_income = ebit - taxes;
        let capex = revenue * MAINTENANCE_CAPEX_RATE;
        let working_capital_change = if i == 0 {
            revenue * INITIAL_WORKING_CAPITAL_RATE
        } else {
            (revenue - prior_revenue) * WORKING_CAPITAL_GROWTH_RATE
        };
        prior_revenue = revenue;

        rows.push(ViabilityYear {
            year: params.start_year + i as i32,
            revenue,
            ebitda_margin: Some(margin),
            ebitda,
            depreciation,
            ebit,
            taxes,
            net_income,
            capex,
            working_capital_change,
            free_cash_flow: net_income + depreciation - capex - working_capital_change,
        });
    }
    Ok(rows)
}

fn compute_indicators(
    rows: &[ViabilityYear],
    case: &Case,
    params: &ViabilityParams,
) -> ArenaFinanceResult<ViabilityIndicators> {
    let fcf: Vec<Money> = rows.iter().map(|r| r.free_cash_flow).collect();
    let npv_value = npv(case.discount_rate, &fcf)?;
    let irr_value = irr(&fcf).ok();
    let payback_years = payback_period(&fcf);
    let returns: Money = fcf.iter().skip(1).copied().sum();
    let roi = returns.checked_div(case.investment);

    let final_ebitda = rows.last().map(|r| r.ebitda).unwrap_or(Decimal::ZERO);
    let terminal_value = final_ebitda * params.residual_multiple;
    let discount = compound_factor(case.discount_rate, params.analysis_years)?;
    let pv_terminal_value = terminal_value.checked_div(discount).ok_or_else(|| {
        ArenaFinanceError::DivisionByZero {
            context: "terminal value discount factor".into(),
        }
    })?;

    let mut operating = fcf.clone();
    if let Some(first) = operating.first_mut() {
        *first = Decimal::ZERO;
    }
    let pv_free_cash_flows = npv(case.discount_rate, &operating)?;
    let enterprise_value = pv_free_cash_flows + pv_terminal_value;

    Ok(ViabilityIndicators {
        npv: npv_value,
        irr: irr_value,
        payback_years,
        roi,
        terminal_value,
        pv_terminal_value,
        pv_free_cash_flows,
        enterprise_value,
        value_multiple: enterprise_value.checked_div(case.investment),
    })
}

fn score_criteria(ind: &ViabilityIndicators, discount_rate: Rate) -> Vec<ScoreCriterion> {
    let criterion = |name: &str, points: u32, passed: bool| ScoreCriterion {
        criterion: name.to_string(),
        points,
        passed,
    };
    vec![
        criterion("Positive NPV", 25, ind.npv > Decimal::ZERO),
        criterion(
            "IRR above the discount rate",
            25,
            ind.irr.is_some_and(|r| r > discount_rate),
        ),
        criterion(
            "Payback within 5 years",
            20,
            ind.payback_years.is_some_and(|p| p <= dec!(5)),
        ),
        criterion("ROI above 50%", 15, ind.roi.is_some_and(|r| r > dec!(0.5))),
        criterion(
            "Value multiple above 2x",
            15,
            ind.value_multiple.is_some_and(|m| m > dec!(2)),
        ),
    ]
}

fn run_scenario(
    params: &ViabilityParams,
    base: &Case,
    scenario: ViabilityScenario,
) -> ArenaFinanceResult<ScenarioOutcome> {
    let (revenue_f, growth_f, margin_f, investment_f) = scenario.factors();
    let case = Case {
        investment: base.investment * investment_f,
        monthly_revenue: base.monthly_revenue * revenue_f,
        growth: base.growth * growth_f,
        initial_margin: base.initial_margin * margin_f,
        ..base.clone()
    };
    let rows = build_rows(params, &case)?;
    let fcf: Vec<Money> = rows.iter().map(|r| r.free_cash_flow).collect();
    let npv_value = npv(case.discount_rate, &fcf)?;
    let irr_value = irr(&fcf).ok();
    let returns: Money = fcf.iter().skip(1).copied().sum();

    Ok(ScenarioOutcome {
        scenario,
        investment: case.investment,
        npv: npv_value,
        irr: irr_value,
        payback_years: payback_period(&fcf),
        roi: returns.checked_div(case.investment),
        viable: npv_value > Decimal::ZERO && irr_value.is_some_and(|r| r > case.discount_rate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use rust_decimal_macros::dec;

    fn run(params: &ViabilityParams) -> ViabilityOutput {
        analyze_viability(&Market::Brazil.profile(), params)
            .unwrap()
            .result
    }

    #[test]
    fn test_year_zero_is_the_investment() {
        let out = run(&ViabilityParams::default());
        assert_eq!(out.rows.len(), 11);
        assert_eq!(out.rows[0].year, 2023);
        assert_eq!(out.rows[0].free_cash_flow, dec!(-435000));
        assert_eq!(out.rows[0].ebitda_margin, None);
    }

    #[test]
    fn test_first_operating_year() {
        let params = ViabilityParams {
            tax_rate: Some(dec!(0.20)),
            ..Default::default()
        };
        let out = run(&params);
        let y1 = &out.rows[1];
        assert_eq!(y1.revenue, dec!(540000));
        assert_eq!(y1.ebitda, dec!(108000));
        // 435,000 × 0.6 / 10
        assert_eq!(y1.depreciation, dec!(26100));
        assert_eq!(y1.ebit, dec!(81900));
        assert_eq!(y1.taxes, dec!(16380));
        assert_eq!(y1.capex, dec!(16200));
        assert_eq!(y1.working_capital_change, dec!(27000));
        assert_eq!(y1.free_cash_flow, dec!(65520) + dec!(26100) - dec!(16200) - dec!(27000));
    }

    #[test]
    fn test_margin_ramp_reaches_mature_level() {
        let out = run(&ViabilityParams::default());
        assert_eq!(out.rows[1].ebitda_margin, Some(dec!(0.20)));
        assert_eq!(out.rows[6].ebitda_margin, Some(dec!(0.30)));
        assert_eq!(out.rows[10].ebitda_margin, Some(dec!(0.30)));
    }

    #[test]
    fn test_depreciation_stops_after_ten_years() {
        let params = ViabilityParams {
            analysis_years: 12,
            ..Default::default()
        };
        let out = run(&params);
        assert_eq!(out.rows[10].depreciation, dec!(26100));
        assert_eq!(out.rows[11].depreciation, Decimal::ZERO);
    }

    #[test]
    fn test_score_and_class_agree() {
        let out = run(&ViabilityParams::default());
        let expected: u32 = out
            .criteria
            .iter()
            .filter(|c| c.passed)
            .map(|c| c.points)
            .sum();
        assert_eq!(out.score, expected);
        assert_eq!(out.classification, ViabilityClass::from_score(out.score));
    }

    #[test]
    fn test_classification_thresholds() {
        assert_eq!(ViabilityClass::from_score(100), ViabilityClass::HighlyViable);
        assert_eq!(ViabilityClass::from_score(80), ViabilityClass::HighlyViable);
        assert_eq!(ViabilityClass::from_score(65), ViabilityClass::Viable);
        assert_eq!(ViabilityClass::from_score(40), ViabilityClass::Questionable);
        assert_eq!(ViabilityClass::from_score(25), ViabilityClass::NotViable);
    }

    #[test]
    fn test_scenarios_are_ordered() {
        let out = run(&ViabilityParams::default());
        assert_eq!(out.scenarios.len(), 3);
        assert!(out.scenarios[0].npv < out.scenarios[1].npv);
        assert!(out.scenarios[1].npv < out.scenarios[2].npv);
        assert_eq!(out.scenarios[1].npv, out.indicators.npv);
    }

    #[test]
    fn test_sensitivity_to_discount_rate() {
        let profile = Market::Brazil.profile();
        let table = viability_sensitivity(
            &profile,
            &ViabilityParams::default(),
            ViabilityDriver::DiscountRate,
            dec!(0.20),
        )
        .unwrap()
        .result;
        let outputs: Vec<Decimal> = table.rows.iter().map(|r| r.output.unwrap()).collect();
        assert!(outputs.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_rejects_short_horizon() {
        let params = ViabilityParams {
            analysis_years: 2,
            ..Default::default()
        };
        assert!(analyze_viability(&Market::Brazil.profile(), &params).is_err());
    }

    #[test]
    fn test_runaway_growth_is_an_error() {
        let params = ViabilityParams {
            growth_rate: Some(dec!(999)),
            ..Default::default()
        };
        assert!(matches!(
            analyze_viability(&Market::Brazil.profile(), &params),
            Err(ArenaFinanceError::FinancialImpossibility(_))
        ));
    }
}
