use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ArenaFinanceError;
use crate::market::MarketProfile;
use crate::revenue::{project_month, MonthlyRevenue, RevenueMix};
use crate::time_value::{cagr, compound_factor};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ArenaFinanceResult;

const MAX_PROJECTION_YEARS: u32 = 12;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Assumptions of the managerial income statement (DRE).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementParams {
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_projection_years")]
    pub projection_years: u32,
    #[serde(default = "default_num_fields")]
    pub num_fields: u32,
    /// Defaults to the market's standard mix for `num_fields`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_mix: Option<RevenueMix>,
    /// Variable costs as a share of net revenue
    #[serde(default = "default_variable_cost_rate")]
    pub variable_cost_rate: Rate,
    /// First-year fixed costs, inflated yearly
    #[serde(default = "default_fixed_costs")]
    pub base_fixed_costs: Money,
    /// First-year depreciation, inflated yearly
    #[serde(default = "default_depreciation")]
    pub base_depreciation: Money,
    /// Defaults to the market's inflation rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_inflation: Option<Rate>,
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

fn default_variable_cost_rate() -> Rate {
    dec!(0.25)
}

fn default_fixed_costs() -> Money {
    dec!(120000)
}

fn default_depreciation() -> Money {
    dec!(50000)
}

impl Default for IncomeStatementParams {
    fn default() -> Self {
        IncomeStatementParams {
            start_year: default_start_year(),
            projection_years: default_projection_years(),
            num_fields: default_num_fields(),
            revenue_mix: None,
            variable_cost_rate: default_variable_cost_rate(),
            base_fixed_costs: default_fixed_costs(),
            base_depreciation: default_depreciation(),
            cost_inflation: None,
        }
    }
}

/// Gross revenue split by source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevenueBySource {
    pub fields: Money,
    pub tournaments: Money,
    pub cafeteria: Money,
    pub events: Money,
    pub sponsorship: Money,
}

/// One annual row of the DRE.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementYear {
    pub year: i32,
    pub gross_revenue_by_source: RevenueBySource,
    pub gross_revenue: Money,
    pub taxes_on_sales: Money,
    pub net_revenue: Money,
    pub variable_costs: Money,
    pub contribution_margin: Money,
    pub fixed_costs: Money,
    pub ebitda: Money,
    pub depreciation: Money,
    pub ebit: Money,
    pub income_taxes: Money,
    pub net_income: Money,
    pub contribution_margin_pct: Option<Rate>,
    pub ebitda_margin: Option<Rate>,
    pub net_margin: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementSummary {
    pub net_revenue_cagr: Option<Rate>,
    pub average_ebitda_margin: Option<Rate>,
    pub average_net_margin: Option<Rate>,
    pub total_ebitda: Money,
    pub total_net_income: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStatementOutput {
    pub years: Vec<IncomeStatementYear>,
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub summary: IncomeStatementSummary,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the annual DRE from the revenue mix, sales taxes and cost assumptions.
pub fn project_income_statement(
    profile: &MarketProfile,
    params: &IncomeStatementParams,
) -> ArenaFinanceResult<ComputationOutput<IncomeStatementOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_params(params)?;
    let mix = params
        .revenue_mix
        .clone()
        .unwrap_or_else(|| RevenueMix::for_profile(profile, params.num_fields));
    mix.validate()?;
    let inflation = params.cost_inflation.unwrap_or(profile.inflation_rate);

    let mut years = Vec::with_capacity(params.projection_years as usize);
    let mut monthly = Vec::with_capacity(params.projection_years as usize * 12);

    for year_index in 0..params.projection_years {
        let mut by_source = RevenueBySource::default();
        for month in 1..=12 {
            let m = project_month(profile, &mix, year_index, month)?;
            by_source.fields += m.fields;
            by_source.tournaments += m.tournaments;
            by_source.cafeteria += m.cafeteria;
            by_source.events += m.events;
            by_source.sponsorship += m.sponsorship;
            monthly.push(m);
        }

        let year = params.start_year + year_index as i32;
        let row = build_year(profile, params, inflation, year, year_index, by_source)?;
        if row.net_income < Decimal::ZERO {
            warnings.push(format!("Net loss projected in {year}"));
        }
        years.push(row);
    }

    let summary = summarize(&years);
    let output = IncomeStatementOutput {
        years,
        monthly_revenue: monthly,
        summary,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Managerial income statement (DRE), {}", profile.name),
        &serde_json::json!({
            "market": profile.market,
            "params": params,
            "revenue_mix": mix,
            "cost_inflation": inflation,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_params(params: &IncomeStatementParams) -> ArenaFinanceResult<()> {
    if params.projection_years == 0 || params.projection_years > MAX_PROJECTION_YEARS {
        return Err(ArenaFinanceError::InvalidInput {
            field: "projection_years".into(),
            reason: format!("Must be between 1 and {MAX_PROJECTION_YEARS}"),
        });
    }
    if params.variable_cost_rate < Decimal::ZERO || params.variable_cost_rate > Decimal::ONE {
        return Err(ArenaFinanceError::InvalidInput {
            field: "variable_cost_rate".into(),
            reason: "Must be between 0 and 1".into(),
        });
    }
    if params.base_fixed_costs < Decimal::ZERO || params.base_depreciation < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "base_fixed_costs".into(),
            reason: "Fixed costs and depreciation cannot be negative".into(),
        });
    }
    if let Some(i) = params.cost_inflation {
        if i <= dec!(-1) {
            return Err(ArenaFinanceError::InvalidInput {
                field: "cost_inflation".into(),
                reason: "Inflation must be greater than -100%".into(),
            });
        }
    }
    Ok(())
}

fn build_year(
    profile: &MarketProfile,
    params: &IncomeStatementParams,
    inflation: Rate,
    year: i32,
    year_index: u32,
    by_source: RevenueBySource,
) -> ArenaFinanceResult<IncomeStatementYear> {
    let gross_revenue = by_source.fields
        + by_source.tournaments
        + by_source.cafeteria
        + by_source.events
        + by_source.sponsorship;
    let taxes_on_sales = profile.tax_rates.sales_taxes(gross_revenue);
    let net_revenue = gross_revenue - taxes_on_sales;

    let variable_costs = net_revenue * params.variable_cost_rate;
    let contribution_margin = net_revenue - variable_costs;
    let cost_factor = compound_factor(inflation, year_index)?;
    let fixed_costs = params.base_fixed_costs * cost_factor;
    let ebitda = contribution_margin - fixed_costs;

    let depreciation = params.base_depreciation * cost_factor;
    let ebit = ebitda - depreciation;
    let income_taxes = profile.tax_rates.income_taxes(ebit);
    let net_income = ebit - income_taxes;

    Ok(IncomeStatementYear {
        year,
        gross_revenue_by_source: by_source,
        gross_revenue,
        taxes_on_sales,
        net_revenue,
        variable_costs,
        contribution_margin,
        fixed_costs,
        ebitda,
        depreciation,
        ebit,
        income_taxes,
        net_income,
        contribution_margin_pct: contribution_margin.checked_div(net_revenue),
        ebitda_margin: ebitda.checked_div(net_revenue),
        net_margin: net_income.checked_div(net_revenue),
    })
}

fn mean(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    let (sum, count) = values.fold((Decimal::ZERO, 0u32), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / Decimal::from(count))
    }
}

fn summarize(years: &[IncomeStatementYear]) -> IncomeStatementSummary {
    let net_revenue_cagr = match (years.first(), years.last()) {
        (Some(first), Some(last)) if years.len() > 1 => {
            cagr(first.net_revenue, last.net_revenue, (years.len() - 1) as u32)
        }
        _ => None,
    };

    IncomeStatementSummary {
        net_revenue_cagr,
        average_ebitda_margin: mean(years.iter().filter_map(|y| y.ebitda_margin)),
        average_net_margin: mean(years.iter().filter_map(|y| y.net_margin)),
        total_ebitda: years.iter().map(|y| y.ebitda).sum(),
        total_net_income: years.iter().map(|y| y.net_income).sum(),
    }
}
