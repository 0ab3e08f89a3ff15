pub mod sensitivity;

pub use sensitivity::{
    evaluate_sensitivity, one_way_sensitivity, OneWayRow, OneWaySensitivity, SensitivityInput,
    SensitivityOutput,
};
