use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use arena_finance_core::cash_flow::{
    cash_flow_sensitivity, project_cash_flow, CashFlowDriver, CashFlowParams,
};
use arena_finance_core::market::Market;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CashFlowDriverArg {
    Revenue,
    FixedCosts,
    VariableCosts,
    Growth,
}

impl From<CashFlowDriverArg> for CashFlowDriver {
    fn from(arg: CashFlowDriverArg) -> Self {
        match arg {
            CashFlowDriverArg::Revenue => CashFlowDriver::Revenue,
            CashFlowDriverArg::FixedCosts => CashFlowDriver::FixedCosts,
            CashFlowDriverArg::VariableCosts => CashFlowDriver::VariableCosts,
            CashFlowDriverArg::Growth => CashFlowDriver::GrowthRate,
        }
    }
}

/// Arguments for the monthly cash-flow projection
#[derive(Args)]
pub struct CashFlowArgs {
    #[arg(long)]
    pub years: Option<u32>,

    /// Number of fields (sizes the default investment)
    #[arg(long)]
    pub fields: Option<u32>,

    /// Monthly revenue in the first year
    #[arg(long)]
    pub monthly_revenue: Option<Decimal>,

    #[arg(long)]
    pub monthly_fixed_costs: Option<Decimal>,

    #[arg(long)]
    pub variable_cost_rate: Option<Decimal>,

    /// Initial investment (defaults to the market's requirements)
    #[arg(long)]
    pub investment: Option<Decimal>,

    /// Share of the investment funded with equity
    #[arg(long)]
    pub equity_share: Option<Decimal>,

    #[arg(long)]
    pub interest_rate: Option<Decimal>,

    #[arg(long)]
    pub loan_years: Option<u32>,

    /// Report NPV sensitivity to this driver instead of the projection
    #[arg(long)]
    pub sensitivity: Option<CashFlowDriverArg>,

    /// Sensitivity swing either side of the base case
    #[arg(long, default_value = "0.20")]
    pub range: Decimal,

    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_cash_flow(args: CashFlowArgs, market: Market) -> Result<Value, Box<dyn std::error::Error>> {
    let mut params: CashFlowParams =
        input::read_params(args.input.as_deref())?.unwrap_or_default();

    if let Some(v) = args.years {
        params.projection_years = v;
    }
    if let Some(v) = args.fields {
        params.num_fields = v;
    }
    if let Some(v) = args.monthly_revenue {
        params.monthly_revenue_year1 = v;
    }
    if let Some(v) = args.monthly_fixed_costs {
        params.monthly_fixed_costs = v;
    }
    if let Some(v) = args.variable_cost_rate {
        params.variable_cost_rate = v;
    }
    if args.investment.is_some() {
        params.initial_investment = args.investment;
    }
    if let Some(v) = args.equity_share {
        params.equity_share = v;
    }
    if let Some(v) = args.interest_rate {
        params.annual_interest_rate = v;
    }
    if let Some(v) = args.loan_years {
        params.loan_term_years = v;
    }

    let profile = market.profile();
    match args.sensitivity {
        Some(driver) => {
            let result = cash_flow_sensitivity(&profile, &params, driver.into(), args.range)?;
            Ok(serde_json::to_value(result)?)
        }
        None => {
            let result = project_cash_flow(&profile, &params)?;
            Ok(serde_json::to_value(result)?)
        }
    }
}
