pub mod projection;
pub mod regime;

pub use projection::{
    compare_brazil_regimes, planning_savings, project_taxes, RegimeComparison, TaxProjectionInput,
    TaxProjectionOutput,
};
pub use regime::{calculate_taxes, BrazilRegime, TaxBreakdown, TaxInput, TaxRateOverrides, TaxRegime};
