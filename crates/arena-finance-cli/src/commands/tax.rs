use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde_json::Value;

use arena_finance_core::market::Market;
use arena_finance_core::tax::{
    calculate_taxes, project_taxes, BrazilRegime, TaxInput, TaxProjectionInput, TaxRateOverrides,
};
use arena_finance_core::tax::projection::PlanningSavingsInput;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RegimeArg {
    Simples,
    Presumido,
    Real,
}

impl From<RegimeArg> for BrazilRegime {
    fn from(arg: RegimeArg) -> Self {
        match arg {
            RegimeArg::Simples => BrazilRegime::SimplesNacional,
            RegimeArg::Presumido => BrazilRegime::LucroPresumido,
            RegimeArg::Real => BrazilRegime::LucroReal,
        }
    }
}

/// Statutory rate overrides shared by the tax commands
#[derive(Args)]
pub struct OverrideArgs {
    #[arg(long)]
    pub simples_rate: Option<Decimal>,
    #[arg(long)]
    pub iss_rate: Option<Decimal>,
    #[arg(long)]
    pub vat_rate: Option<Decimal>,
    #[arg(long)]
    pub corporate_tax_rate: Option<Decimal>,
    #[arg(long)]
    pub social_security_rate: Option<Decimal>,
}

impl OverrideArgs {
    fn into_overrides(self) -> TaxRateOverrides {
        TaxRateOverrides {
            simples_rate: self.simples_rate,
            iss_rate: self.iss_rate,
            vat_rate: self.vat_rate,
            corporate_tax_rate: self.corporate_tax_rate,
            social_security_rate: self.social_security_rate,
        }
    }
}

/// Arguments for a single-period tax calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct TaxArgs {
    /// Gross revenue of the period
    #[arg(long)]
    pub revenue: Option<Decimal>,

    /// Operating profit of the period (may be negative)
    #[arg(long)]
    pub profit: Option<Decimal>,

    /// Brazilian regime (Brazil only)
    #[arg(long)]
    pub regime: Option<RegimeArg>,

    /// Apply the tax-planning reduction
    #[arg(long)]
    pub planning: bool,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the multi-year tax projection
#[derive(Args)]
pub struct TaxProjectionArgs {
    /// First-year gross revenue
    #[arg(long)]
    pub revenue: Option<Decimal>,

    /// Operating profit as a share of revenue
    #[arg(long, default_value = "0.20")]
    pub profit_margin: Decimal,

    /// Yearly revenue growth (defaults to the market's growth potential)
    #[arg(long)]
    pub growth: Option<Decimal>,

    #[arg(long, default_value = "2024")]
    pub start_year: i32,

    #[arg(long, default_value = "5")]
    pub years: u32,

    /// Brazilian regime (Brazil only)
    #[arg(long)]
    pub regime: Option<RegimeArg>,

    /// Apply the tax-planning reduction
    #[arg(long)]
    pub planning: bool,

    /// Evaluate a planning engagement with this savings rate
    #[arg(long, requires = "planning_cost")]
    pub planning_savings_rate: Option<Decimal>,

    /// Implementation cost of the planning engagement
    #[arg(long)]
    pub planning_cost: Option<Decimal>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_taxes(args: TaxArgs, market: Market) -> Result<Value, Box<dyn std::error::Error>> {
    let tax_input: TaxInput = match input::read_params(args.input.as_deref())? {
        Some(params) => params,
        None => TaxInput {
            market,
            regime: args.regime.map(Into::into),
            revenue: args
                .revenue
                .ok_or("--revenue is required (or provide --input)")?,
            profit: args
                .profit
                .ok_or("--profit is required (or provide --input)")?,
            overrides: args.overrides.into_overrides(),
            tax_planning: args.planning,
        },
    };
    let result = calculate_taxes(&tax_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_tax_projection(
    args: TaxProjectionArgs,
    market: Market,
) -> Result<Value, Box<dyn std::error::Error>> {
    let projection: TaxProjectionInput = match input::read_params(args.input.as_deref())? {
        Some(params) => params,
        None => TaxProjectionInput {
            market,
            regime: args.regime.map(Into::into),
            overrides: args.overrides.into_overrides(),
            start_year: args.start_year,
            projection_years: args.years,
            annual_revenue: args
                .revenue
                .ok_or("--revenue is required (or provide --input)")?,
            revenue_growth: args.growth,
            profit_margin: args.profit_margin,
            deduction_rate: None,
            tax_planning: args.planning,
            planning: match (args.planning_savings_rate, args.planning_cost) {
                (Some(savings_rate), Some(implementation_cost)) => Some(PlanningSavingsInput {
                    savings_rate,
                    implementation_cost,
                }),
                _ => None,
            },
        },
    };
    let result = project_taxes(&projection)?;
    Ok(serde_json::to_value(result)?)
}
