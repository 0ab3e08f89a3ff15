use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::error::ArenaFinanceError;
use crate::market::{investment_requirements, MarketProfile};
use crate::scenarios::{one_way_sensitivity, OneWaySensitivity};
use crate::time_value::{
    break_even_units, compound_factor, fractional_compound_factor, irr, loan_payment, npv,
    payback_period,
};
use crate::types::{with_metadata, ComputationOutput, Money, Rate, Years};
use crate::ArenaFinanceResult;

const MAX_PROJECTION_YEARS: u32 = 12;
const PAYBACK_TARGET_YEARS: Decimal = dec!(4);
const SENSITIVITY_STEP: Decimal = dec!(0.05);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowParams {
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_projection_years")]
    pub projection_years: u32,
    /// Used to size the default initial investment
    #[serde(default = "default_num_fields")]
    pub num_fields: u32,
    #[serde(default = "default_monthly_revenue")]
    pub monthly_revenue_year1: Money,
    /// Defaults to the market's growth potential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_growth: Option<Rate>,
    #[serde(default = "default_variable_cost_rate")]
    pub variable_cost_rate: Rate,
    #[serde(default = "default_monthly_fixed_costs")]
    pub monthly_fixed_costs: Money,
    /// Defaults to the market's inflation rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_inflation: Option<Rate>,
    /// Defaults to the market's investment requirements for `num_fields`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_investment: Option<Money>,
    #[serde(default = "default_annual_capex")]
    pub annual_capex: Money,
    /// Share of the initial investment funded with equity; the rest is debt
    #[serde(default = "default_equity_share")]
    pub equity_share: Rate,
    #[serde(default = "default_loan_term_years")]
    pub loan_term_years: u32,
    #[serde(default = "default_annual_interest_rate")]
    pub annual_interest_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<Rate>,
}

fn default_start_year() -> i32 {
    2024
}

fn default_projection_years() -> u32 {
    5
}

fn default_num_fields() -> u32 {
    2
}

fn default_monthly_revenue() -> Money {
    dec!(60000)
}

fn default_variable_cost_rate() -> Rate {
    dec!(0.25)
}

fn default_monthly_fixed_costs() -> Money {
    dec!(35000)
}

fn default_annual_capex() -> Money {
    dec!(15000)
}

fn default_equity_share() -> Rate {
    dec!(0.7)
}

fn default_loan_term_years() -> u32 {
    5
}

fn default_annual_interest_rate() -> Rate {
    dec!(0.12)
}

impl Default for CashFlowParams {
    fn default() -> Self {
        CashFlowParams {
            start_year: default_start_year(),
            projection_years: default_projection_years(),
            num_fields: default_num_fields(),
            monthly_revenue_year1: default_monthly_revenue(),
            revenue_growth: None,
            variable_cost_rate: default_variable_cost_rate(),
            monthly_fixed_costs: default_monthly_fixed_costs(),
            cost_inflation: None,
            initial_investment: None,
            annual_capex: default_annual_capex(),
            equity_share: default_equity_share(),
            loan_term_years: default_loan_term_years(),
            annual_interest_rate: default_annual_interest_rate(),
            tax_rate: None,
            discount_rate: None,
        }
    }
}

/// How the initial investment is funded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Financing {
    pub initial_investment: Money,
    pub equity_amount: Money,
    pub debt_amount: Money,
    pub monthly_payment: Money,
    pub loan_months: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowPeriod {
    /// First day of the month
    pub date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub revenue: Money,
    pub variable_costs: Money,
    pub fixed_costs: Money,
    pub taxes: Money,
    pub operating_cf: Money,
    pub investment_cf: Money,
    pub financing_cf: Money,
    pub loan_payment: Money,
    pub net_cf: Money,
    pub cumulative_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualCashFlow {
    pub year: i32,
    pub revenue: Money,
    pub variable_costs: Money,
    pub fixed_costs: Money,
    pub taxes: Money,
    pub operating_cf: Money,
    pub investment_cf: Money,
    pub financing_cf: Money,
    pub net_cf: Money,
    /// Cumulative balance at the last month of the year
    pub closing_balance: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViabilityCriterion {
    pub criterion: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashFlowVerdict {
    Viable,
    Questionable,
    NotViable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowIndicators {
    /// Annual net flows with the equity outlay taken in year one
    pub project_flows: Vec<Money>,
    pub npv: Money,
    pub irr: Option<Rate>,
    pub payback_years: Option<Years>,
    pub roi: Option<Rate>,
    pub break_even_monthly_revenue: Option<Money>,
    pub min_cumulative_balance: Money,
    /// 0-100, 25 points per criterion met
    pub viability_score: u32,
    pub criteria: Vec<ViabilityCriterion>,
    pub verdict: CashFlowVerdict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowOutput {
    pub financing: Financing,
    pub periods: Vec<CashFlowPeriod>,
    pub annual: Vec<AnnualCashFlow>,
    pub indicators: CashFlowIndicators,
    pub recommendations: Vec<String>,
}

/// Input varied by [`cash_flow_sensitivity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashFlowDriver {
    Revenue,
    FixedCosts,
    VariableCosts,
    GrowthRate,
}

impl CashFlowDriver {
    pub fn label(&self) -> &'static str {
        match self {
            CashFlowDriver::Revenue => "Revenue",
            CashFlowDriver::FixedCosts => "Fixed costs",
            CashFlowDriver::VariableCosts => "Variable cost rate",
            CashFlowDriver::GrowthRate => "Revenue growth",
        }
    }
}

/// Profile-dependent assumptions after defaults are applied.
#[derive(Debug, Clone, Serialize)]
struct Resolved {
    growth: Rate,
    inflation: Rate,
    tax_rate: Rate,
    discount_rate: Rate,
    initial_investment: Money,
}

struct OperatingMonth {
    revenue: Money,
    variable_costs: Money,
    fixed_costs: Money,
    taxes: Money,
    operating_cf: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Monthly operating, investment and financing cash flow with annual totals
/// and project indicators.
pub fn project_cash_flow(
    profile: &MarketProfile,
    params: &CashFlowParams,
) -> ArenaFinanceResult<ComputationOutput<CashFlowOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_params(params)?;
    let resolved = resolve(profile, params)?;
    let financing = financing(params, resolved.initial_investment)?;

    let periods = monthly_periods(profile, params, &resolved, &financing)?;
    let annual = aggregate_annual(&periods);
    let indicators = compute_indicators(params, &resolved, &financing, &periods, &annual)?;

    if indicators.irr.is_none() {
        warnings.push("IRR did not converge for the project flows".into());
    }
    if indicators.break_even_monthly_revenue.is_none() {
        warnings.push("Variable costs and taxes absorb all revenue: no break-even".into());
    }

    let recommendations = recommend(params, &financing, &periods, &indicators);

    let output = CashFlowOutput {
        financing,
        periods,
        annual,
        indicators,
        recommendations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Monthly cash flow projection, {}", profile.name),
        &serde_json::json!({
            "market": profile.market,
            "params": params,
            "resolved": resolved,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// NPV of annual operating flows (initial investment taken in year one) as
/// one driver moves from `-range` to `+range` in 5% steps.
pub fn cash_flow_sensitivity(
    profile: &MarketProfile,
    params: &CashFlowParams,
    driver: CashFlowDriver,
    range: Rate,
) -> ArenaFinanceResult<ComputationOutput<OneWaySensitivity>> {
    let start = Instant::now();

    validate_params(params)?;
    let resolved = resolve(profile, params)?;

    let base_value = match driver {
        CashFlowDriver::Revenue => params.monthly_revenue_year1,
        CashFlowDriver::FixedCosts => params.monthly_fixed_costs,
        CashFlowDriver::VariableCosts => params.variable_cost_rate,
        CashFlowDriver::GrowthRate => resolved.growth,
    };

    let table = one_way_sensitivity(driver.label(), base_value, range, SENSITIVITY_STEP, |value| {
        let mut adjusted = params.clone();
        let mut r = resolved.clone();
        match driver {
            CashFlowDriver::Revenue => adjusted.monthly_revenue_year1 = value,
            CashFlowDriver::FixedCosts => adjusted.monthly_fixed_costs = value,
            CashFlowDriver::VariableCosts => adjusted.variable_cost_rate = value,
            CashFlowDriver::GrowthRate => r.growth = value,
        }
        operating_project_npv(profile, &adjusted, &r)
    })?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Cash flow NPV sensitivity to {}", driver.label()),
        &serde_json::json!({
            "market": profile.market,
            "driver": driver,
            "range": range,
            "discount_rate": resolved.discount_rate,
        }),
        Vec::new(),
        elapsed,
        table,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_params(params: &CashFlowParams) -> ArenaFinanceResult<()> {
    if params.projection_years == 0 || params.projection_years > MAX_PROJECTION_YEARS {
        return Err(ArenaFinanceError::InvalidInput {
            field: "projection_years".into(),
            reason: format!("Must be between 1 and {MAX_PROJECTION_YEARS}"),
        });
    }
    let unit_rates = [
        ("variable_cost_rate", params.variable_cost_rate),
        ("equity_share", params.equity_share),
    ];
    for (field, rate) in unit_rates {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(ArenaFinanceError::InvalidInput {
                field: field.into(),
                reason: "Must be between 0 and 1".into(),
            });
        }
    }
    if params.monthly_revenue_year1 < Decimal::ZERO
        || params.monthly_fixed_costs < Decimal::ZERO
        || params.annual_capex < Decimal::ZERO
    {
        return Err(ArenaFinanceError::InvalidInput {
            field: "monthly_revenue_year1".into(),
            reason: "Revenue, fixed costs and capex cannot be negative".into(),
        });
    }
    if params.annual_interest_rate < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "annual_interest_rate".into(),
            reason: "Interest rate cannot be negative".into(),
        });
    }
    if params.equity_share < Decimal::ONE && params.loan_term_years == 0 {
        return Err(ArenaFinanceError::InvalidInput {
            field: "loan_term_years".into(),
            reason: "A debt-funded investment needs a loan term".into(),
        });
    }
    Ok(())
}

fn resolve(profile: &MarketProfile, params: &CashFlowParams) -> ArenaFinanceResult<Resolved> {
    let initial_investment = match params.initial_investment {
        Some(v) if v < Decimal::ZERO => {
            return Err(ArenaFinanceError::InvalidInput {
                field: "initial_investment".into(),
                reason: "Investment cannot be negative".into(),
            })
        }
        Some(v) => v,
        None => investment_requirements(profile, params.num_fields)?.total,
    };
    Ok(Resolved {
        growth: params.revenue_growth.unwrap_or(profile.growth_potential),
        inflation: params.cost_inflation.unwrap_or(profile.inflation_rate),
        tax_rate: params.tax_rate.unwrap_or(profile.tax_rate),
        discount_rate: params.discount_rate.unwrap_or(profile.discount_rate),
        initial_investment,
    })
}

fn financing(params: &CashFlowParams, initial_investment: Money) -> ArenaFinanceResult<Financing> {
    let equity_amount = initial_investment * params.equity_share;
    let debt_amount = initial_investment - equity_amount;
    let (monthly_payment, loan_months) = if debt_amount > Decimal::ZERO {
        (
            loan_payment(debt_amount, params.annual_interest_rate, params.loan_term_years)?,
            params.loan_term_years * 12,
        )
    } else {
        (Decimal::ZERO, 0)
    };
    Ok(Financing {
        initial_investment,
        equity_amount,
        debt_amount,
        monthly_payment,
        loan_months,
    })
}

/// Operating result of `month` in projection year `year_index`. Growth and
/// inflation compound on elapsed fractional years.
fn operating_month(
    profile: &MarketProfile,
    params: &CashFlowParams,
    resolved: &Resolved,
    year_index: u32,
    month: u32,
) -> ArenaFinanceResult<OperatingMonth> {
    let elapsed = Decimal::from(year_index) + Decimal::from(month - 1) / dec!(12);
    let growth = fractional_compound_factor(resolved.growth, elapsed)?;
    let inflation = fractional_compound_factor(resolved.inflation, elapsed)?;
    let seasonal = profile.seasonal_factor(month)?;

    let revenue = params.monthly_revenue_year1 * growth * seasonal;
    let variable_costs = revenue * params.variable_cost_rate;
    let fixed_costs = params.monthly_fixed_costs * inflation;
    let taxes = revenue * resolved.tax_rate;

    Ok(OperatingMonth {
        revenue,
        variable_costs,
        fixed_costs,
        taxes,
        operating_cf: revenue - variable_costs - fixed_costs - taxes,
    })
}

fn monthly_periods(
    profile: &MarketProfile,
    params: &CashFlowParams,
    resolved: &Resolved,
    financing: &Financing,
) -> ArenaFinanceResult<Vec<CashFlowPeriod>> {
    let mut periods = Vec::with_capacity(params.projection_years as usize * 12);
    let mut cumulative_balance = -financing.equity_amount;

    for year_index in 0..params.projection_years {
        let year = params.start_year + year_index as i32;
        for month in 1..=12u32 {
            let op = operating_month(profile, params, resolved, year_index, month)?;

            let investment_cf = match (year_index, month) {
                (0, 1) => -financing.initial_investment,
                (_, 1) => -params.annual_capex * compound_factor(resolved.inflation, year_index)?,
                _ => Decimal::ZERO,
            };

            let mut financing_cf = if year_index == 0 && month == 1 {
                financing.debt_amount
            } else {
                Decimal::ZERO
            };
            let months_elapsed = year_index * 12 + month;
            let payment = if months_elapsed <= financing.loan_months {
                financing.monthly_payment
            } else {
                Decimal::ZERO
            };
            financing_cf -= payment;

            let net_cf = op.operating_cf + investment_cf + financing_cf;
            cumulative_balance += net_cf;

            let date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
                ArenaFinanceError::DateError(format!("invalid period {year}-{month:02}"))
            })?;

            periods.push(CashFlowPeriod {
                date,
                year,
                month,
                revenue: op.revenue,
                variable_costs: op.variable_costs,
                fixed_costs: op.fixed_costs,
                taxes: op.taxes,
                operating_cf: op.operating_cf,
                investment_cf,
                financing_cf,
                loan_payment: payment,
                net_cf,
                cumulative_balance,
            });
        }
    }
    Ok(periods)
}

fn aggregate_annual(periods: &[CashFlowPeriod]) -> Vec<AnnualCashFlow> {
    let mut annual: Vec<AnnualCashFlow> = Vec::new();
    for p in periods {
        match annual.last_mut() {
            Some(a) if a.year == p.year => {
                a.revenue += p.revenue;
                a.variable_costs += p.variable_costs;
                a.fixed_costs += p.fixed_costs;
                a.taxes += p.taxes;
                a.operating_cf += p.operating_cf;
                a.investment_cf += p.investment_cf;
                a.financing_cf += p.financing_cf;
                a.net_cf += p.net_cf;
                a.closing_balance = p.cumulative_balance;
            }
            _ => annual.push(AnnualCashFlow {
                year: p.year,
                revenue: p.revenue,
                variable_costs: p.variable_costs,
                fixed_costs: p.fixed_costs,
                taxes: p.taxes,
                operating_cf: p.operating_cf,
                investment_cf: p.investment_cf,
                financing_cf: p.financing_cf,
                net_cf: p.net_cf,
                closing_balance: p.cumulative_balance,
            }),
        }
    }
    annual
}

fn compute_indicators(
    params: &CashFlowParams,
    resolved: &Resolved,
    financing: &Financing,
    periods: &[CashFlowPeriod],
    annual: &[AnnualCashFlow],
) -> ArenaFinanceResult<CashFlowIndicators> {
    let mut project_flows: Vec<Money> = annual.iter().map(|a| a.net_cf).collect();
    if let Some(first) = project_flows.first_mut() {
        *first -= financing.equity_amount;
    }

    let npv_value = npv(resolved.discount_rate, &project_flows)?;
    let irr_value = match irr(&project_flows) {
        Ok(r) => Some(r),
        Err(e) => {
            warn!(error = %e, "project IRR unavailable");
            None
        }
    };
    let payback = payback_period(&project_flows);

    let total_operating: Money = annual.iter().map(|a| a.operating_cf).sum();
    let roi = (total_operating - financing.equity_amount).checked_div(financing.equity_amount);

    let break_even_monthly_revenue = break_even_units(
        params.monthly_fixed_costs,
        params.variable_cost_rate + resolved.tax_rate,
        Decimal::ONE,
    );

    let final_balance = periods
        .last()
        .map(|p| p.cumulative_balance)
        .unwrap_or(Decimal::ZERO);
    let min_cumulative_balance = periods
        .iter()
        .map(|p| p.cumulative_balance)
        .min()
        .unwrap_or(Decimal::ZERO);

    let criteria = vec![
        ViabilityCriterion {
            criterion: "Positive NPV".into(),
            passed: npv_value > Decimal::ZERO,
        },
        ViabilityCriterion {
            criterion: "IRR above the cost of capital".into(),
            passed: irr_value.is_some_and(|r| r > resolved.discount_rate),
        },
        ViabilityCriterion {
            criterion: "Payback within 4 years".into(),
            passed: payback.is_some_and(|p| p <= PAYBACK_TARGET_YEARS),
        },
        ViabilityCriterion {
            criterion: "Positive closing cash balance".into(),
            passed: final_balance > Decimal::ZERO,
        },
    ];
    let viability_score = 25 * criteria.iter().filter(|c| c.passed).count() as u32;
    let verdict = match viability_score {
        75.. => CashFlowVerdict::Viable,
        50..=74 => CashFlowVerdict::Questionable,
        _ => CashFlowVerdict::NotViable,
    };

    Ok(CashFlowIndicators {
        project_flows,
        npv: npv_value,
        irr: irr_value,
        payback_years: payback,
        roi,
        break_even_monthly_revenue,
        min_cumulative_balance,
        viability_score,
        criteria,
        verdict,
    })
}

fn recommend(
    params: &CashFlowParams,
    financing: &Financing,
    periods: &[CashFlowPeriod],
    indicators: &CashFlowIndicators,
) -> Vec<String> {
    let mut recs = Vec::new();

    if indicators.npv < Decimal::ZERO {
        recs.push("Negative NPV: raise revenue or cut costs before committing".to_string());
    }
    if Decimal::ONE - params.equity_share > dec!(0.5) {
        recs.push("More than half of the investment is debt; consider lower leverage".to_string());
    }
    if indicators.payback_years.is_some_and(|p| p > dec!(5)) {
        recs.push("Payback beyond 5 years increases exposure to market risk".to_string());
    }
    if indicators.min_cumulative_balance < -financing.initial_investment * dec!(0.2) {
        recs.push(format!(
            "Hold a cash reserve of at least {} to cover the negative balance",
            (-indicators.min_cumulative_balance).round_dp(2)
        ));
    }
    if !periods.is_empty() {
        let avg_operating = periods.iter().map(|p| p.operating_cf).sum::<Decimal>()
            / Decimal::from(periods.len() as u64);
        if avg_operating < params.monthly_fixed_costs * dec!(1.2) {
            recs.push("Operating cash flow is close to fixed costs; monitor occupancy".to_string());
        }
    }
    recs
}

/// NPV of annual operating flows with the initial investment in year one.
fn operating_project_npv(
    profile: &MarketProfile,
    params: &CashFlowParams,
    resolved: &Resolved,
) -> ArenaFinanceResult<Money> {
    let mut flows = Vec::with_capacity(params.projection_years as usize);
    for year_index in 0..params.projection_years {
        let mut total = Decimal::ZERO;
        for month in 1..=12 {
            total += operating_month(profile, params, resolved, year_index, month)?.operating_cf;
        }
        flows.push(total);
    }
    if let Some(first) = flows.first_mut() {
        *first -= resolved.initial_investment;
    }
    npv(resolved.discount_rate, &flows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use rust_decimal_macros::dec;

    fn run(params: &CashFlowParams) -> ComputationOutput<CashFlowOutput> {
        project_cash_flow(&Market::Brazil.profile(), params).unwrap()
    }

    #[test]
    fn test_cumulative_balance_is_running_sum() {
        let out = run(&CashFlowParams::default()).result;
        let mut balance = -out.financing.equity_amount;
        for p in &out.periods {
            balance += p.net_cf;
            assert_eq!(p.cumulative_balance, balance);
            assert_eq!(p.net_cf, p.operating_cf + p.investment_cf + p.financing_cf);
        }
    }

    #[test]
    fn test_first_month_flows() {
        let out = run(&CashFlowParams::default()).result;
        // Brazil, 2 fields: 435,000, 70% equity
        assert_eq!(out.financing.initial_investment, dec!(435000));
        assert_eq!(out.financing.equity_amount, dec!(304500));
        assert_eq!(out.financing.debt_amount, dec!(130500));
        let first = &out.periods[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(first.investment_cf, dec!(-435000));
        assert_eq!(
            first.financing_cf,
            out.financing.debt_amount - out.financing.monthly_payment
        );
        // January seasonality 1.2, no growth yet
        assert_eq!(first.revenue, dec!(72000));
    }

    #[test]
    fn test_loan_stops_after_term() {
        let params = CashFlowParams {
            projection_years: 6,
            ..Default::default()
        };
        let out = run(&params).result;
        assert_eq!(out.periods[59].loan_payment, out.financing.monthly_payment);
        assert_eq!(out.periods[60].loan_payment, Decimal::ZERO);
    }

    #[test]
    fn test_capex_inflates_in_later_years() {
        let params = CashFlowParams {
            cost_inflation: Some(dec!(0.10)),
            ..Default::default()
        };
        let out = run(&params).result;
        assert_eq!(out.periods[12].investment_cf, dec!(-16500));
        assert_eq!(out.periods[13].investment_cf, Decimal::ZERO);
    }

    #[test]
    fn test_annual_closing_balance_is_last_month() {
        let out = run(&CashFlowParams::default()).result;
        assert_eq!(out.annual.len(), 5);
        for (i, a) in out.annual.iter().enumerate() {
            assert_eq!(a.closing_balance, out.periods[i * 12 + 11].cumulative_balance);
        }
    }

    #[test]
    fn test_score_matches_criteria() {
        let out = run(&CashFlowParams::default()).result;
        let ind = &out.indicators;
        let passed = ind.criteria.iter().filter(|c| c.passed).count() as u32;
        assert_eq!(ind.viability_score, passed * 25);
        assert_eq!(ind.project_flows.len(), 5);
    }

    #[test]
    fn test_break_even_revenue() {
        let params = CashFlowParams {
            tax_rate: Some(dec!(0.15)),
            ..Default::default()
        };
        let out = run(&params).result;
        // 35,000 / (1 - 0.25 - 0.15)
        let be = out.indicators.break_even_monthly_revenue.unwrap();
        assert!((be - dec!(58333.333333)).abs() < dec!(0.001));
    }

    #[test]
    fn test_all_equity_has_no_financing_flows() {
        let params = CashFlowParams {
            equity_share: Decimal::ONE,
            ..Default::default()
        };
        let out = run(&params).result;
        assert!(out.periods.iter().all(|p| p.financing_cf.is_zero()));
    }

    #[test]
    fn test_sensitivity_to_revenue_is_increasing() {
        let profile = Market::Brazil.profile();
        let table = cash_flow_sensitivity(
            &profile,
            &CashFlowParams::default(),
            CashFlowDriver::Revenue,
            dec!(0.20),
        )
        .unwrap()
        .result;
        assert_eq!(table.rows.len(), 9);
        let outputs: Vec<Decimal> = table.rows.iter().map(|r| r.output.unwrap()).collect();
        assert!(outputs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_rejects_bad_horizon() {
        let params = CashFlowParams {
            projection_years: 13,
            ..Default::default()
        };
        assert!(project_cash_flow(&Market::Brazil.profile(), &params).is_err());
    }
}
