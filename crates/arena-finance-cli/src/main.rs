mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use arena_finance_core::market::Market;

use commands::cash_flow::CashFlowArgs;
use commands::markets::MarketArgs;
use commands::primitives::{IrrArgs, LoanArgs, NpvArgs, PaybackArgs};
use commands::projections::{LongRangeArgs, MonteCarloArgs};
use commands::statements::IncomeStatementArgs;
use commands::tax::{TaxArgs, TaxProjectionArgs};
use commands::valuation::ValuationArgs;
use commands::viability::ViabilityArgs;
use commands::working_capital::WorkingCapitalArgs;

/// Financial planning for futsal and society sports facilities
#[derive(Parser)]
#[command(
    name = "arena",
    version,
    about = "Financial planning for futsal and society sports facilities",
    long_about = "A CLI for projecting the finances of a sports facility with decimal \
                  precision. Supports income statements, working capital, cash flow, \
                  taxes for Brazil, Europe and the UAE, long-range projections, \
                  Monte Carlo simulation, DCF valuation and viability scoring."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Market: brazil, europe or uae
    #[arg(long, default_value = "brazil", global = true)]
    market: String,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the key parameters of every market
    Markets,
    /// Show the full profile and investment requirements of the selected market
    Market(MarketArgs),
    /// Taxes for one period under the market's regime
    Taxes(TaxArgs),
    /// Multi-year tax projection with regime comparison
    TaxProjection(TaxProjectionArgs),
    /// Managerial income statement (DRE)
    IncomeStatement(IncomeStatementArgs),
    /// Monthly working-capital need (NCG) analysis
    WorkingCapital(WorkingCapitalArgs),
    /// Monthly cash flow with financing and project indicators
    CashFlow(CashFlowArgs),
    /// Long-range projection with milestones, scenarios and DCF
    LongRange(LongRangeArgs),
    /// Monte Carlo simulation of the long-range projection
    MonteCarlo(MonteCarloArgs),
    /// DCF valuation of explicit cash flows
    Valuation(ValuationArgs),
    /// Investment viability analysis and score
    Viability(ViabilityArgs),
    /// Net present value of a cash flow series
    Npv(NpvArgs),
    /// Internal rate of return of a cash flow series
    Irr(IrrArgs),
    /// Simple or discounted payback period
    Payback(PaybackArgs),
    /// Monthly installment of an amortizing loan
    Loan(LoanArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let market: Market = match cli.market.parse() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Markets => commands::markets::run_markets(),
        Commands::Market(args) => commands::markets::run_market(args, market),
        Commands::Taxes(args) => commands::tax::run_taxes(args, market),
        Commands::TaxProjection(args) => commands::tax::run_tax_projection(args, market),
        Commands::IncomeStatement(args) => commands::statements::run_income_statement(args, market),
        Commands::WorkingCapital(args) => {
            commands::working_capital::run_working_capital(args, market)
        }
        Commands::CashFlow(args) => commands::cash_flow::run_cash_flow(args, market),
        Commands::LongRange(args) => commands::projections::run_long_range(args, market),
        Commands::MonteCarlo(args) => commands::projections::run_monte_carlo(args, market),
        Commands::Valuation(args) => commands::valuation::run_valuation(args, market),
        Commands::Viability(args) => commands::viability::run_viability(args, market),
        Commands::Npv(args) => commands::primitives::run_npv(args),
        Commands::Irr(args) => commands::primitives::run_irr(args),
        Commands::Payback(args) => commands::primitives::run_payback(args),
        Commands::Loan(args) => commands::primitives::run_loan(args),
        Commands::Version => {
            println!("arena {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value, market.currency());
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
