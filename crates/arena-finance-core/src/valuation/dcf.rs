use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ArenaFinanceError;
use crate::scenarios::{evaluate_sensitivity, SensitivityInput, SensitivityOutput};
use crate::time_value::{compound_factor, discounted_payback_period, irr, npv, payback_period};
use crate::types::{
    with_metadata, ComputationOutput, Money, Multiple, Rate, SensitivityVariable, Years,
};
use crate::ArenaFinanceResult;

const TERMINAL_SHARE_WARNING: Decimal = dec!(0.75);
const RATE_SWING: Decimal = dec!(0.03);
const RATE_STEP: Decimal = dec!(0.005);
const GROWTH_SWING: Decimal = dec!(0.01);
const GROWTH_STEP: Decimal = dec!(0.002);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a Gordon-growth DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInput {
    /// Outlay at T0; zero when valuing an operating business
    #[serde(default)]
    pub initial_investment: Money,
    /// Free cash flows for years 1..N
    pub cash_flows: Vec<Money>,
    pub discount_rate: Rate,
    /// Perpetuity growth after year N
    pub terminal_growth: Rate,
    /// EV/EBITDA multiple for the residual-value cross-check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual_multiple: Option<Multiple>,
    /// EBITDA of year N, required with `residual_multiple`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_ebitda: Option<Money>,
}

/// Output of the DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Sum of present values of the explicit-period flows
    pub pv_explicit_flows: Money,
    /// Gordon growth terminal value at year N
    pub terminal_value: Money,
    pub pv_terminal_value: Money,
    /// PV(explicit) + PV(TV)
    pub enterprise_value: Money,
    /// NPV of [-investment, flows...]
    pub npv: Money,
    pub irr: Option<Rate>,
    pub payback_simple: Option<Years>,
    pub payback_discounted: Option<Years>,
    /// EV over initial investment
    pub multiple: Option<Multiple>,
    /// PV(TV) as a share of EV
    pub terminal_value_share: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pv_residual_value: Option<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Explicit-period PV plus Gordon growth terminal value discounted by `(1+r)^N`.
pub fn run_valuation(input: &ValuationInput) -> ArenaFinanceResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_valuation_input(input)?;

    let n = input.cash_flows.len() as u32;
    let pv_explicit_flows = pv_explicit(input.discount_rate, &input.cash_flows)?;
    let (terminal_value, pv_terminal_value) =
        gordon_terminal_value(&input.cash_flows, input.discount_rate, input.terminal_growth)?;
    let enterprise_value = pv_explicit_flows + pv_terminal_value;

    let mut project_flows = Vec::with_capacity(input.cash_flows.len() + 1);
    project_flows.push(-input.initial_investment);
    project_flows.extend_from_slice(&input.cash_flows);

    let npv_value = npv(input.discount_rate, &project_flows)?;
    let irr_value = if input.initial_investment > Decimal::ZERO {
        match irr(&project_flows) {
            Ok(r) => Some(r),
            Err(e) => {
                warnings.push(format!("IRR unavailable: {e}"));
                None
            }
        }
    } else {
        None
    };
    let payback_simple = payback_period(&project_flows);
    let payback_discounted = discounted_payback_period(input.discount_rate, &project_flows)?;

    let multiple = enterprise_value.checked_div(input.initial_investment);
    let terminal_value_share = pv_terminal_value.checked_div(enterprise_value);
    if terminal_value_share.is_some_and(|s| s > TERMINAL_SHARE_WARNING) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            terminal_value_share.unwrap_or_default() * dec!(100)
        ));
    }
    if enterprise_value < Decimal::ZERO {
        warnings.push("Enterprise value is negative".into());
    }

    let (residual_value, pv_residual_value) =
        match (input.residual_multiple, input.terminal_ebitda) {
            (Some(m), Some(ebitda)) => {
                let value = ebitda * m;
                (
                    Some(value),
                    Some(value / compound_factor(input.discount_rate, n)?),
                )
            }
            _ => (None, None),
        };

    let output = ValuationResult {
        pv_explicit_flows,
        terminal_value,
        pv_terminal_value,
        enterprise_value,
        npv: npv_value,
        irr: irr_value,
        payback_simple,
        payback_discounted,
        multiple,
        terminal_value_share,
        residual_value,
        pv_residual_value,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "DCF valuation (Gordon growth terminal value)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Enterprise value over a discount-rate (±3pp, 0.5pp step) by
/// terminal-growth (±1pp, 0.2pp step) grid. Cells where the rate does not
/// exceed growth are `None`.
pub fn dcf_sensitivity(
    input: &ValuationInput,
) -> ArenaFinanceResult<ComputationOutput<SensitivityOutput>> {
    if input.cash_flows.is_empty() {
        return Err(ArenaFinanceError::InsufficientData(
            "At least one explicit cash flow is required".into(),
        ));
    }
    let grid = SensitivityInput {
        variable_1: SensitivityVariable {
            name: "Discount Rate".into(),
            min: input.discount_rate - RATE_SWING,
            max: input.discount_rate + RATE_SWING,
            step: RATE_STEP,
        },
        variable_2: SensitivityVariable {
            name: "Terminal Growth".into(),
            min: input.terminal_growth - GROWTH_SWING,
            max: input.terminal_growth + GROWTH_SWING,
            step: GROWTH_STEP,
        },
        output_metric: "Enterprise Value".into(),
    };
    evaluate_sensitivity(&grid, |rate, growth| {
        enterprise_value(&input.cash_flows, rate, growth)
    })
}

/// EV only, for callers that sweep rates.
pub fn enterprise_value(
    cash_flows: &[Money],
    discount_rate: Rate,
    terminal_growth: Rate,
) -> ArenaFinanceResult<Money> {
    check_spread(discount_rate, terminal_growth)?;
    let pv = pv_explicit(discount_rate, cash_flows)?;
    let (_, pv_tv) = gordon_terminal_value(cash_flows, discount_rate, terminal_growth)?;
    Ok(pv + pv_tv)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_valuation_input(input: &ValuationInput) -> ArenaFinanceResult<()> {
    if input.cash_flows.is_empty() {
        return Err(ArenaFinanceError::InsufficientData(
            "At least one explicit cash flow is required".into(),
        ));
    }
    if input.initial_investment < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "initial_investment".into(),
            reason: "Investment cannot be negative".into(),
        });
    }
    check_spread(input.discount_rate, input.terminal_growth)?;
    if input.residual_multiple.is_some() && input.terminal_ebitda.is_none() {
        return Err(ArenaFinanceError::InvalidInput {
            field: "terminal_ebitda".into(),
            reason: "Required when a residual multiple is given".into(),
        });
    }
    if input.residual_multiple.is_some_and(|m| m < Decimal::ZERO) {
        return Err(ArenaFinanceError::InvalidInput {
            field: "residual_multiple".into(),
            reason: "Multiple cannot be negative".into(),
        });
    }
    Ok(())
}

fn check_spread(discount_rate: Rate, terminal_growth: Rate) -> ArenaFinanceResult<()> {
    if discount_rate <= dec!(-1) {
        return Err(ArenaFinanceError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Must be greater than -100%".into(),
        });
    }
    if discount_rate <= terminal_growth {
        return Err(ArenaFinanceError::FinancialImpossibility(format!(
            "Discount rate ({discount_rate}) must exceed terminal growth ({terminal_growth}) for a Gordon growth terminal value"
        )));
    }
    Ok(())
}

/// `Σ cf_t / (1+r)^t` for t = 1..N.
fn pv_explicit(rate: Rate, cash_flows: &[Money]) -> ArenaFinanceResult<Money> {
    let mut shifted = Vec::with_capacity(cash_flows.len() + 1);
    shifted.push(Decimal::ZERO);
    shifted.extend_from_slice(cash_flows);
    npv(rate, &shifted)
}

/// `cf_N (1+g) / (r-g)` and its value discounted by `(1+r)^N`.
fn gordon_terminal_value(
    cash_flows: &[Money],
    rate: Rate,
    growth: Rate,
) -> ArenaFinanceResult<(Money, Money)> {
    let last = cash_flows.last().copied().ok_or_else(|| {
        ArenaFinanceError::InsufficientData("No cash flows to extrapolate".into())
    })?;
    let spread = rate - growth;
    let tv = (last * (Decimal::ONE + growth))
        .checked_div(spread)
        .ok_or_else(|| ArenaFinanceError::DivisionByZero {
            context: "terminal value spread".into(),
        })?;
    let factor = compound_factor(rate, cash_flows.len() as u32)?;
    let pv_tv = tv
        .checked_div(factor)
        .ok_or_else(|| ArenaFinanceError::DivisionByZero {
            context: "terminal value discount factor".into(),
        })?;
    Ok((tv, pv_tv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_input() -> ValuationInput {
        ValuationInput {
            initial_investment: dec!(1000),
            cash_flows: vec![dec!(300), dec!(300), dec!(300), dec!(300), dec!(300)],
            discount_rate: dec!(0.10),
            terminal_growth: dec!(0.02),
            residual_multiple: None,
            terminal_ebitda: None,
        }
    }

    #[test]
    fn test_basic_valuation() {
        let out = run_valuation(&sample_input()).unwrap().result;
        // TV = 300 × 1.02 / 0.08 = 3825
        assert_eq!(out.terminal_value, dec!(3825));
        let pv_tv = dec!(3825) / dec!(1.61051);
        assert!((out.pv_terminal_value - pv_tv).abs() < dec!(0.0001));
        // Annuity factor for 5 years at 10% ≈ 3.790787
        assert!((out.pv_explicit_flows - dec!(1137.236)).abs() < dec!(0.01));
        assert_eq!(
            out.enterprise_value,
            out.pv_explicit_flows + out.pv_terminal_value
        );
        assert!((out.npv - (out.pv_explicit_flows - dec!(1000))).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_paybacks_and_irr() {
        let out = run_valuation(&sample_input()).unwrap().result;
        // cumulative turns positive in period 4: 4 + (200 - 300) / 300
        let payback = out.payback_simple.unwrap();
        assert!((payback - dec!(3.6667)).abs() < dec!(0.0001));
        assert!(out.payback_discounted.unwrap() > payback);
        let irr = out.irr.unwrap();
        assert!(irr > dec!(0.15) && irr < dec!(0.16));
    }

    #[test]
    fn test_terminal_growth_not_below_rate_rejected() {
        let mut input = sample_input();
        input.terminal_growth = dec!(0.10);
        assert!(matches!(
            run_valuation(&input),
            Err(ArenaFinanceError::FinancialImpossibility(_))
        ));
        input.terminal_growth = dec!(0.12);
        assert!(run_valuation(&input).is_err());
    }

    #[test]
    fn test_terminal_share_warning() {
        let mut input = sample_input();
        input.discount_rate = dec!(0.05);
        input.terminal_growth = dec!(0.04);
        let out = run_valuation(&input).unwrap();
        assert!(out.result.terminal_value_share.unwrap() > dec!(0.75));
        assert!(out.warnings.iter().any(|w| w.contains("Terminal value")));
    }

    #[test]
    fn test_zero_investment_has_no_multiple() {
        let mut input = sample_input();
        input.initial_investment = Decimal::ZERO;
        let out = run_valuation(&input).unwrap().result;
        assert_eq!(out.multiple, None);
        assert_eq!(out.irr, None);
    }

    #[test]
    fn test_residual_multiple_cross_check() {
        let mut input = sample_input();
        input.residual_multiple = Some(dec!(8));
        input.terminal_ebitda = Some(dec!(500));
        let out = run_valuation(&input).unwrap().result;
        assert_eq!(out.residual_value, Some(dec!(4000)));
        let pv = out.pv_residual_value.unwrap();
        assert!((pv - dec!(4000) / dec!(1.61051)).abs() < dec!(0.0001));

        input.terminal_ebitda = None;
        assert!(run_valuation(&input).is_err());
    }

    #[test]
    fn test_negative_residual_multiple_rejected() {
        let mut input = sample_input();
        input.residual_multiple = Some(dec!(-1));
        input.terminal_ebitda = Some(dec!(500));
        match run_valuation(&input) {
            Err(ArenaFinanceError::InvalidInput { field, .. }) => {
                assert_eq!(field, "residual_multiple")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_dcf_sensitivity_grid() {
        let out = dcf_sensitivity(&sample_input()).unwrap().result;
        // 0.07..=0.13 by 0.005, 0.01..=0.03 by 0.002
        assert_eq!(out.variable_1_values.len(), 13);
        assert_eq!(out.variable_2_values.len(), 11);
        assert_eq!(out.base_case_position, (6, 5));
        let base = out.base_case_value.unwrap();
        let ev = run_valuation(&sample_input()).unwrap().result.enterprise_value;
        assert_eq!(base, ev);
    }

    #[test]
    fn test_sensitivity_marks_infeasible_cells() {
        let mut input = sample_input();
        input.discount_rate = dec!(0.04);
        input.terminal_growth = dec!(0.02);
        let out = dcf_sensitivity(&input).unwrap().result;
        // rate 0.01 with growth 0.03 is infeasible
        assert_eq!(out.matrix[0][10], None);
        assert!(out.matrix[12][0].is_some());
    }
}
