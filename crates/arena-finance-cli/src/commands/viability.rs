use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use arena_finance_core::market::Market;
use arena_finance_core::viability::{
    analyze_viability, viability_sensitivity, ViabilityDriver, ViabilityParams,
};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ViabilityDriverArg {
    Revenue,
    Growth,
    Margin,
    Investment,
    DiscountRate,
}

impl From<ViabilityDriverArg> for ViabilityDriver {
    fn from(arg: ViabilityDriverArg) -> Self {
        match arg {
            ViabilityDriverArg::Revenue => ViabilityDriver::InitialRevenue,
            ViabilityDriverArg::Growth => ViabilityDriver::GrowthRate,
            ViabilityDriverArg::Margin => ViabilityDriver::EbitdaMargin,
            ViabilityDriverArg::Investment => ViabilityDriver::Investment,
            ViabilityDriverArg::DiscountRate => ViabilityDriver::DiscountRate,
        }
    }
}

/// Arguments for the investment viability analysis
#[derive(Args)]
pub struct ViabilityArgs {
    #[arg(long)]
    pub years: Option<u32>,

    #[arg(long)]
    pub fields: Option<u32>,

    /// Initial investment (defaults to the market's requirements)
    #[arg(long)]
    pub investment: Option<Decimal>,

    /// Monthly revenue in the first year
    #[arg(long)]
    pub monthly_revenue: Option<Decimal>,

    #[arg(long)]
    pub growth: Option<Decimal>,

    #[arg(long)]
    pub discount_rate: Option<Decimal>,

    /// EV/EBITDA applied to the final year
    #[arg(long)]
    pub residual_multiple: Option<Decimal>,

    /// Report NPV sensitivity to this driver instead of the analysis
    #[arg(long)]
    pub sensitivity: Option<ViabilityDriverArg>,

    #[arg(long, default_value = "0.20")]
    pub range: Decimal,

    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_viability(args: ViabilityArgs, market: Market) -> Result<Value, Box<dyn std::error::Error>> {
    let mut params: ViabilityParams =
        input::read_params(args.input.as_deref())?.unwrap_or_default();

    if let Some(v) = args.years {
        params.analysis_years = v;
    }
    if let Some(v) = args.fields {
        params.num_fields = v;
    }
    if args.investment.is_some() {
        params.initial_investment = args.investment;
    }
    if let Some(v) = args.monthly_revenue {
        params.initial_monthly_revenue = v;
    }
    if args.growth.is_some() {
        params.growth_rate = args.growth;
    }
    if args.discount_rate.is_some() {
        params.discount_rate = args.discount_rate;
    }
    if let Some(v) = args.residual_multiple {
        params.residual_multiple = v;
    }

    let profile = market.profile();
    match args.sensitivity {
        Some(driver) => {
            let result = viability_sensitivity(&profile, &params, driver.into(), args.range)?;
            Ok(serde_json::to_value(result)?)
        }
        None => {
            let result = analyze_viability(&profile, &params)?;
            Ok(serde_json::to_value(result)?)
        }
    }
}
