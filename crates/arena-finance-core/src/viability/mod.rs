pub mod analysis;

pub use analysis::{
    analyze_viability, viability_sensitivity, ViabilityClass, ViabilityDriver, ViabilityOutput,
    ViabilityParams, ViabilityScenario, ViabilityYear,
};
