use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use arena_finance_core::market::Market;
use arena_finance_core::working_capital::{project_working_capital, WorkingCapitalParams};

use crate::input;

/// Arguments for the working-capital (NCG) analysis
#[derive(Args)]
pub struct WorkingCapitalArgs {
    /// Months to analyse
    #[arg(long)]
    pub months: Option<u32>,

    /// Average monthly revenue before seasonality
    #[arg(long)]
    pub monthly_revenue: Option<Decimal>,

    /// Receivables days (defaults to the market's working-capital days)
    #[arg(long)]
    pub receivables_days: Option<u32>,

    #[arg(long)]
    pub payables_days: Option<u32>,

    #[arg(long)]
    pub inventory_days: Option<u32>,

    /// Share of revenue received in cash
    #[arg(long)]
    pub cash_share: Option<Decimal>,

    /// Share of revenue received by card
    #[arg(long)]
    pub card_share: Option<Decimal>,

    /// Yearly revenue growth (defaults to the market's growth potential)
    #[arg(long)]
    pub growth: Option<Decimal>,

    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_working_capital(
    args: WorkingCapitalArgs,
    market: Market,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut params: WorkingCapitalParams =
        input::read_params(args.input.as_deref())?.unwrap_or_default();

    if let Some(v) = args.months {
        params.analysis_months = v;
    }
    if let Some(v) = args.monthly_revenue {
        params.monthly_revenue = v;
    }
    if args.receivables_days.is_some() {
        params.receivables_days = args.receivables_days;
    }
    if let Some(v) = args.payables_days {
        params.payables_days = v;
    }
    if let Some(v) = args.inventory_days {
        params.inventory_days = v;
    }
    if let Some(v) = args.cash_share {
        params.cash_share = v;
    }
    if let Some(v) = args.card_share {
        params.card_share = v;
    }
    if args.growth.is_some() {
        params.growth_rate = args.growth;
    }

    let result = project_working_capital(&market.profile(), &params)?;
    Ok(serde_json::to_value(result)?)
}
