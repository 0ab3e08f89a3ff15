pub mod model;

pub use model::{
    cash_flow_sensitivity, project_cash_flow, AnnualCashFlow, CashFlowDriver, CashFlowOutput,
    CashFlowParams, CashFlowPeriod, CashFlowVerdict, Financing,
};
