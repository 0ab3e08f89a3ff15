pub mod model;
pub mod ncg;

pub use model::{
    project_working_capital, WorkingCapitalOutput, WorkingCapitalParams, WorkingCapitalSnapshot,
};
pub use ncg::{ncg, NcgBreakdown};
