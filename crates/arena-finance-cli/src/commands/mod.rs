pub mod cash_flow;
pub mod markets;
pub mod primitives;
pub mod projections;
pub mod statements;
pub mod tax;
pub mod valuation;
pub mod viability;
pub mod working_capital;
