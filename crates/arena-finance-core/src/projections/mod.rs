pub mod long_range;
pub mod monte_carlo;

pub use long_range::{
    project_long_range, AlternativeScenario, BusinessPhase, LongRangeOutput, LongRangeParams,
    LongRangeSummary, LongRangeYear, Milestone, MilestoneKind, PhaseSummary, ScenarioPreset,
};
pub use monte_carlo::{run_monte_carlo, McStatistics, MonteCarloOutput, MonteCarloParams};
