use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use arena_finance_core::market::Market;
use arena_finance_core::valuation::{
    dcf_sensitivity, run_valuation as value_flows, ValuationInput,
};

use crate::input;

/// Arguments for a DCF valuation of explicit cash flows
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ValuationArgs {
    /// Free cash flows for years 1..N, comma-separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Outlay at T0
    #[arg(long, default_value = "0")]
    pub investment: Decimal,

    /// Discount rate (defaults to the market's rate)
    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// Perpetuity growth after the last explicit year
    #[arg(long, default_value = "0.03")]
    pub terminal_growth: Decimal,

    /// EV/EBITDA multiple for the residual-value cross-check
    #[arg(long, requires = "terminal_ebitda")]
    pub residual_multiple: Option<Decimal>,

    /// EBITDA of the last explicit year
    #[arg(long)]
    pub terminal_ebitda: Option<Decimal>,

    /// Add the discount-rate by terminal-growth EV grid
    #[arg(long)]
    pub sensitivity: bool,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_valuation(args: ValuationArgs, market: Market) -> Result<Value, Box<dyn std::error::Error>> {
    let valuation_input: ValuationInput = match input::read_params(args.input.as_deref())? {
        Some(params) => params,
        None => ValuationInput {
            initial_investment: args.investment,
            cash_flows: args
                .cash_flows
                .ok_or("--cash-flows is required (or provide --input)")?,
            discount_rate: args
                .discount_rate
                .unwrap_or_else(|| market.profile().discount_rate),
            terminal_growth: args.terminal_growth,
            residual_multiple: args.residual_multiple,
            terminal_ebitda: args.terminal_ebitda,
        },
    };

    let result = value_flows(&valuation_input)?;
    if !args.sensitivity {
        return Ok(serde_json::to_value(result)?);
    }

    let grid = dcf_sensitivity(&valuation_input)?;
    Ok(json!({
        "result": {
            "valuation": result.result,
            "sensitivity": grid.result,
        },
        "methodology": result.methodology,
        "warnings": result.warnings,
    }))
}
