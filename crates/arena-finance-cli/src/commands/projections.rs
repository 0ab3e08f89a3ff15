use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use arena_finance_core::market::Market;
use arena_finance_core::projections::{
    project_long_range, run_monte_carlo as simulate, LongRangeParams, MonteCarloParams,
    ScenarioPreset,
};

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScenarioArg {
    Conservative,
    Base,
    Optimistic,
}

/// Flags shared by the long-range and Monte Carlo commands
#[derive(Args)]
pub struct ProjectionFlags {
    /// Growth preset (ignored when --growth and --volatility are given)
    #[arg(long)]
    pub scenario: Option<ScenarioArg>,

    /// Custom organic growth rate
    #[arg(long, requires = "volatility")]
    pub growth: Option<Decimal>,

    /// Custom cyclical volatility
    #[arg(long, requires = "growth")]
    pub volatility: Option<Decimal>,

    #[arg(long)]
    pub start_year: Option<i32>,

    #[arg(long)]
    pub end_year: Option<i32>,

    /// Revenue of the first projected year
    #[arg(long)]
    pub revenue: Option<Decimal>,

    #[arg(long)]
    pub ebitda_margin: Option<Decimal>,
}

impl ProjectionFlags {
    fn apply(self, params: &mut LongRangeParams) {
        match (self.growth, self.volatility, self.scenario) {
            (Some(growth), Some(volatility), _) => {
                params.scenario = ScenarioPreset::Custom { growth, volatility };
            }
            (_, _, Some(ScenarioArg::Conservative)) => params.scenario = ScenarioPreset::Conservative,
            (_, _, Some(ScenarioArg::Base)) => params.scenario = ScenarioPreset::Base,
            (_, _, Some(ScenarioArg::Optimistic)) => params.scenario = ScenarioPreset::Optimistic,
            _ => {}
        }
        if let Some(v) = self.start_year {
            params.start_year = v;
        }
        if let Some(v) = self.end_year {
            params.end_year = v;
        }
        if let Some(v) = self.revenue {
            params.initial_annual_revenue = v;
        }
        if let Some(v) = self.ebitda_margin {
            params.base_ebitda_margin = v;
        }
    }
}

/// Arguments for the long-range projection
#[derive(Args)]
pub struct LongRangeArgs {
    #[command(flatten)]
    pub projection: ProjectionFlags,

    /// Path to JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the Monte Carlo simulation
#[derive(Args)]
pub struct MonteCarloArgs {
    #[command(flatten)]
    pub projection: ProjectionFlags,

    /// Number of simulated paths
    #[arg(long)]
    pub draws: Option<u32>,

    /// Seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Include every simulated path in the output
    #[arg(long)]
    pub samples: bool,

    /// Path to JSON or YAML input file with `projection` and `simulation` sections
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Default, Deserialize)]
struct MonteCarloRequest {
    #[serde(default)]
    projection: LongRangeParams,
    #[serde(default)]
    simulation: MonteCarloParams,
}

pub fn run_long_range(args: LongRangeArgs, market: Market) -> Result<Value, Box<dyn std::error::Error>> {
    let mut params: LongRangeParams =
        input::read_params(args.input.as_deref())?.unwrap_or_default();
    args.projection.apply(&mut params);

    let result = project_long_range(&market.profile(), &params)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_monte_carlo(
    args: MonteCarloArgs,
    market: Market,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut request: MonteCarloRequest =
        input::read_params(args.input.as_deref())?.unwrap_or_default();
    args.projection.apply(&mut request.projection);

    if let Some(v) = args.draws {
        request.simulation.draws = v;
    }
    if args.seed.is_some() {
        request.simulation.seed = args.seed;
    }
    if args.samples {
        request.simulation.include_samples = true;
    }

    let result = simulate(&market.profile(), &request.projection, &request.simulation)?;
    Ok(serde_json::to_value(result)?)
}
