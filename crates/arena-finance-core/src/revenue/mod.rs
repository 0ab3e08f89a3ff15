pub mod projector;

pub use projector::{growth_factor, monthly_revenue, project_month, FieldType, MonthlyRevenue, RevenueMix};
