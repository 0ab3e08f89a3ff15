use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use arena_finance_core::time_value::{discounted_payback_period, irr, loan_payment, npv, payback_period};

/// Arguments for NPV
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct NpvArgs {
    /// Discount rate per period
    #[arg(long)]
    pub rate: Decimal,

    /// Cash flows from T0, comma-separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,
}

/// Arguments for IRR
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct IrrArgs {
    /// Cash flows from T0, comma-separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,
}

/// Arguments for payback
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PaybackArgs {
    /// Cash flows from T0, comma-separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub cash_flows: Vec<Decimal>,

    /// Discount the flows at this rate before accumulating
    #[arg(long)]
    pub rate: Option<Decimal>,
}

/// Arguments for the loan installment
#[derive(Args)]
pub struct LoanArgs {
    #[arg(long)]
    pub principal: Decimal,

    /// Annual interest rate
    #[arg(long)]
    pub rate: Decimal,

    /// Term in years
    #[arg(long)]
    pub years: u32,
}

pub fn run_npv(args: NpvArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let value = npv(args.rate, &args.cash_flows)?;
    Ok(json!({ "result": { "npv": value, "rate": args.rate } }))
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let rate = irr(&args.cash_flows)?;
    Ok(json!({ "result": { "irr": rate } }))
}

pub fn run_payback(args: PaybackArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payback = match args.rate {
        Some(rate) => discounted_payback_period(rate, &args.cash_flows)?,
        None => payback_period(&args.cash_flows),
    };
    let mut warnings = Vec::new();
    if payback.is_none() {
        warnings.push("Cumulative cash flow never turns positive".to_string());
    }
    Ok(json!({
        "result": { "payback": payback, "discounted": args.rate.is_some() },
        "warnings": warnings,
    }))
}

pub fn run_loan(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payment = loan_payment(args.principal, args.rate, args.years)?;
    let months = Decimal::from(args.years * 12);
    let total = payment * months;
    Ok(json!({
        "result": {
            "payment": payment,
            "months": args.years * 12,
            "total_paid": total,
            "total_interest": total - args.principal,
        }
    }))
}
