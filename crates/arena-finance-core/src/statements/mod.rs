pub mod income_statement;

pub use income_statement::{
    project_income_statement, IncomeStatementOutput, IncomeStatementParams, IncomeStatementYear,
};
