pub mod error;
pub mod market;
pub mod revenue;
pub mod time_value;
pub mod types;

#[cfg(feature = "tax")]
pub mod tax;

#[cfg(feature = "income_statement")]
pub mod statements;

#[cfg(feature = "working_capital")]
pub mod working_capital;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "cash_flow")]
pub mod cash_flow;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "viability")]
pub mod viability;

#[cfg(feature = "projections")]
pub mod projections;

pub use error::ArenaFinanceError;
pub use types::*;

/// Standard result type for all arena-finance operations
pub type ArenaFinanceResult<T> = Result<T, ArenaFinanceError>;
