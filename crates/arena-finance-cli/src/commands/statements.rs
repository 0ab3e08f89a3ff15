use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use arena_finance_core::market::Market;
use arena_finance_core::statements::{project_income_statement, IncomeStatementParams};

use crate::input;

/// Arguments for the managerial income statement
#[derive(Args)]
pub struct IncomeStatementArgs {
    #[arg(long)]
    pub start_year: Option<i32>,

    #[arg(long)]
    pub years: Option<u32>,

    /// Number of fields (sizes the default revenue mix)
    #[arg(long)]
    pub fields: Option<u32>,

    /// Variable costs as a share of net revenue
    #[arg(long)]
    pub variable_cost_rate: Option<Decimal>,

    /// First-year fixed costs
    #[arg(long)]
    pub fixed_costs: Option<Decimal>,

    /// First-year depreciation
    #[arg(long)]
    pub depreciation: Option<Decimal>,

    /// Yearly cost inflation (defaults to the market's inflation)
    #[arg(long)]
    pub cost_inflation: Option<Decimal>,

    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_income_statement(
    args: IncomeStatementArgs,
    market: Market,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut params: IncomeStatementParams =
        input::read_params(args.input.as_deref())?.unwrap_or_default();

    if let Some(v) = args.start_year {
        params.start_year = v;
    }
    if let Some(v) = args.years {
        params.projection_years = v;
    }
    if let Some(v) = args.fields {
        params.num_fields = v;
    }
    if let Some(v) = args.variable_cost_rate {
        params.variable_cost_rate = v;
    }
    if let Some(v) = args.fixed_costs {
        params.base_fixed_costs = v;
    }
    if let Some(v) = args.depreciation {
        params.base_depreciation = v;
    }
    if args.cost_inflation.is_some() {
        params.cost_inflation = args.cost_inflation;
    }

    let result = project_income_statement(&market.profile(), &params)?;
    Ok(serde_json::to_value(result)?)
}
