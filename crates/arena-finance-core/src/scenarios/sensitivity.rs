use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ArenaFinanceError;
use crate::types::*;
use crate::ArenaFinanceResult;

/// Input for 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// First variable to sweep (rows)
    pub variable_1: SensitivityVariable,
    /// Second variable to sweep (columns)
    pub variable_2: SensitivityVariable,
    /// Name of the output metric being measured
    pub output_metric: String,
}

/// Output of 2-way sensitivity analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub variable_1_name: String,
    pub variable_2_name: String,
    pub variable_1_values: Vec<Decimal>,
    pub variable_2_values: Vec<Decimal>,
    pub output_metric: String,
    /// Matrix[i][j] = output when variable_1 = variable_1_values[i], variable_2 = variable_2_values[j].
    /// `None` where the model is undefined for that pair.
    pub matrix: Vec<Vec<Option<Decimal>>>,
    /// Base case output value
    pub base_case_value: Option<Decimal>,
    /// Position of the base case in the matrix (row, col)
    pub base_case_position: (usize, usize),
}

/// One row of a one-way sensitivity table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneWayRow {
    /// Relative change applied to the base value (-0.20 = -20%)
    pub change: Rate,
    pub value: Decimal,
    pub output: Option<Decimal>,
    /// Relative change of the output vs the unchanged case
    pub output_change: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneWaySensitivity {
    pub variable: String,
    pub base_value: Decimal,
    pub base_output: Option<Decimal>,
    pub rows: Vec<OneWayRow>,
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> ArenaFinanceResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(ArenaFinanceError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    if values.is_empty() {
        values.push(var.min);
    }

    Ok(values)
}

/// Find the closest index to a target value in a sorted list.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Evaluate a 2-way sensitivity grid using a provided computation function.
///
/// The `eval_fn` receives (variable_1_value, variable_2_value) and returns
/// the output metric value. Cells where it fails are left as `None` and
/// reported in the warnings. The base case is the midpoint of both ranges.
pub fn evaluate_sensitivity<F>(
    input: &SensitivityInput,
    eval_fn: F,
) -> ArenaFinanceResult<ComputationOutput<SensitivityOutput>>
where
    F: Fn(Decimal, Decimal) -> ArenaFinanceResult<Decimal>,
{
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let v1_values = generate_sweep_values(&input.variable_1)?;
    let v2_values = generate_sweep_values(&input.variable_2)?;

    let mut matrix = Vec::with_capacity(v1_values.len());

    for v1 in &v1_values {
        let mut row = Vec::with_capacity(v2_values.len());
        for v2 in &v2_values {
            match eval_fn(*v1, *v2) {
                Ok(val) => row.push(Some(val)),
                Err(e) => {
                    warnings.push(format!("Evaluation failed at ({v1}, {v2}): {e}"));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    let mid1 = (input.variable_1.min + input.variable_1.max) / dec!(2);
    let mid2 = (input.variable_2.min + input.variable_2.max) / dec!(2);
    let base_row = closest_index(&v1_values, mid1);
    let base_col = closest_index(&v2_values, mid2);
    let base_case_value = matrix[base_row][base_col];

    let output = SensitivityOutput {
        variable_1_name: input.variable_1.name.clone(),
        variable_2_name: input.variable_2.name.clone(),
        variable_1_values: v1_values,
        variable_2_values: v2_values,
        output_metric: input.output_metric.clone(),
        matrix,
        base_case_value,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "2-Way Sensitivity Analysis",
        &serde_json::json!({
            "variable_1": input.variable_1.name,
            "variable_2": input.variable_2.name,
            "output_metric": input.output_metric,
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Vary one input from `-range` to `+range` (relative to `base_value`) and
/// record the model output at each step.
pub fn one_way_sensitivity<F>(
    variable: &str,
    base_value: Decimal,
    range: Rate,
    step: Rate,
    eval_fn: F,
) -> ArenaFinanceResult<OneWaySensitivity>
where
    F: Fn(Decimal) -> ArenaFinanceResult<Decimal>,
{
    if range < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "range".into(),
            reason: "Sensitivity range cannot be negative".into(),
        });
    }
    let changes = generate_sweep_values(&SensitivityVariable {
        name: variable.to_string(),
        min: -range,
        max: range,
        step,
    })?;

    let base_output = eval_fn(base_value).ok();

    let rows = changes
        .into_iter()
        .map(|change| {
            let value = base_value * (Decimal::ONE + change);
            let output = eval_fn(value).ok();
            let output_change = match (output, base_output) {
                (Some(out), Some(base)) => (out - base).checked_div(base.abs()),
                _ => None,
            };
            OneWayRow {
                change,
                value,
                output,
                output_change,
            }
        })
        .collect();

    Ok(OneWaySensitivity {
        variable: variable.to_string(),
        base_value,
        base_output,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> SensitivityInput {
        SensitivityInput {
            variable_1: SensitivityVariable {
                name: "Discount Rate".into(),
                min: dec!(0.08),
                max: dec!(0.12),
                step: dec!(0.01),
            },
            variable_2: SensitivityVariable {
                name: "Terminal Growth".into(),
                min: dec!(0.01),
                max: dec!(0.05),
                step: dec!(0.01),
            },
            output_metric: "Enterprise Value".into(),
        }
    }

    fn gordon(rate: Decimal, growth: Decimal) -> ArenaFinanceResult<Decimal> {
        let spread = rate - growth;
        if spread <= Decimal::ZERO {
            return Err(ArenaFinanceError::FinancialImpossibility(
                "rate must exceed growth".into(),
            ));
        }
        Ok(dec!(1000) / spread)
    }

    #[test]
    fn test_evaluate_sensitivity() {
        let result = evaluate_sensitivity(&sample_input(), gordon).unwrap();
        let out = &result.result;

        assert_eq!(out.variable_1_values.len(), 5);
        assert_eq!(out.variable_2_values.len(), 5);
        // Values decrease as the discount rate increases
        for i in 0..out.matrix.len() - 1 {
            assert!(out.matrix[i][0].unwrap() > out.matrix[i + 1][0].unwrap());
        }
        // Values increase with growth at a fixed rate
        for j in 0..out.matrix[4].len() - 1 {
            assert!(out.matrix[4][j].unwrap() < out.matrix[4][j + 1].unwrap());
        }
    }

    #[test]
    fn test_failed_cells_are_none() {
        let input = SensitivityInput {
            variable_1: SensitivityVariable {
                name: "Discount Rate".into(),
                min: dec!(0.02),
                max: dec!(0.04),
                step: dec!(0.01),
            },
            ..sample_input()
        };
        let result = evaluate_sensitivity(&input, gordon).unwrap();
        let out = &result.result;
        // rate 0.02, growth 0.03 is infeasible
        assert_eq!(out.matrix[0][2], None);
        assert!(out.matrix[2][0].is_some());
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_sweep_values() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(1),
            max: dec!(5),
            step: dec!(1),
        };
        let vals = generate_sweep_values(&var).unwrap();
        assert_eq!(vals, vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);
    }

    #[test]
    fn test_sweep_with_non_exact_step() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(0),
            max: dec!(1),
            step: dec!(0.3),
        };
        let vals = generate_sweep_values(&var).unwrap();
        // 0, 0.3, 0.6, 0.9, 1.0 (max appended)
        assert_eq!(vals.len(), 5);
        assert_eq!(*vals.last().unwrap(), dec!(1));
    }

    #[test]
    fn test_invalid_step() {
        let mut input = sample_input();
        input.variable_1.step = dec!(0);
        assert!(evaluate_sensitivity(&input, gordon).is_err());
    }

    #[test]
    fn test_base_case_position() {
        let result = evaluate_sensitivity(&sample_input(), gordon).unwrap();
        let out = &result.result;
        // Midpoints 0.10 and 0.03 => index 2 on both axes
        assert_eq!(out.base_case_position, (2, 2));
        assert_eq!(out.base_case_value, Some(dec!(1000) / dec!(0.07)));
    }

    #[test]
    fn test_one_way_linear_model() {
        let table =
            one_way_sensitivity("Revenue", dec!(100), dec!(0.20), dec!(0.05), |v| Ok(v * dec!(2)))
                .unwrap();
        assert_eq!(table.rows.len(), 9);
        assert_eq!(table.base_output, Some(dec!(200)));
        let first = &table.rows[0];
        assert_eq!(first.change, dec!(-0.20));
        assert_eq!(first.value, dec!(80));
        assert_eq!(first.output, Some(dec!(160)));
        assert_eq!(first.output_change, Some(dec!(-0.2)));
        assert_eq!(table.rows[4].output_change, Some(Decimal::ZERO));
    }

    #[test]
    fn test_one_way_zero_base_has_no_change() {
        let table =
            one_way_sensitivity("Cost", dec!(50), dec!(0.10), dec!(0.05), |v| Ok(v - dec!(50)))
                .unwrap();
        assert_eq!(table.base_output, Some(Decimal::ZERO));
        assert!(table.rows.iter().all(|r| r.output_change.is_none()));
    }
}
