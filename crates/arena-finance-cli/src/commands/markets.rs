use clap::Args;
use serde_json::{json, Value};

use arena_finance_core::market::{compare_markets, investment_requirements, Market};

use crate::output::currency::format_currency;

/// Arguments for the market profile
#[derive(Args)]
pub struct MarketArgs {
    /// Number of fields to size the investment for
    #[arg(long, default_value = "2")]
    pub fields: u32,
}

pub fn run_markets() -> Result<Value, Box<dyn std::error::Error>> {
    Ok(json!({ "result": { "markets": compare_markets() } }))
}

pub fn run_market(args: MarketArgs, market: Market) -> Result<Value, Box<dyn std::error::Error>> {
    let profile = market.profile();
    let investment = investment_requirements(&profile, args.fields)?;
    let total_display = format_currency(investment.total, profile.currency);
    Ok(json!({
        "result": {
            "profile": profile,
            "investment": investment,
            "investment_display": total_display,
        }
    }))
}
