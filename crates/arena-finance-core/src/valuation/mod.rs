pub mod dcf;

pub use dcf::{dcf_sensitivity, enterprise_value, run_valuation, ValuationInput, ValuationResult};
