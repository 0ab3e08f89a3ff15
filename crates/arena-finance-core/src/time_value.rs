use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::error::ArenaFinanceError;
use crate::types::{Money, Rate, Years};
use crate::ArenaFinanceResult;

const DISCOUNT_EPSILON: Decimal = dec!(0.0000000001);
const IRR_GUESS: Rate = dec!(0.10);
const IRR_TOLERANCE: Decimal = dec!(0.000001);
const MAX_IRR_ITERATIONS: u32 = 1000;
const MAX_BISECTION_ITERATIONS: u32 = 200;
const BISECTION_WIDTH: Decimal = dec!(0.000000000001);

/// Candidate rates scanned for a sign change when Newton-Raphson fails.
const IRR_BRACKET_GRID: [Decimal; 17] = [
    dec!(-0.99),
    dec!(-0.9),
    dec!(-0.75),
    dec!(-0.5),
    dec!(-0.25),
    dec!(0),
    dec!(0.05),
    dec!(0.1),
    dec!(0.2),
    dec!(0.35),
    dec!(0.5),
    dec!(0.75),
    dec!(1),
    dec!(2),
    dec!(3),
    dec!(5),
    dec!(10),
];

/// Net Present Value of a series of cash flows, the first one at t = 0.
///
/// Any rate is accepted except one that makes `1 + rate` (numerically) zero.
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ArenaFinanceResult<Money> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r.abs() < DISCOUNT_EPSILON {
        return Err(ArenaFinanceError::DivisionByZero {
            context: "NPV discount factor (rate of -100%)".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r).ok_or_else(|| {
                ArenaFinanceError::FinancialImpossibility(format!(
                    "NPV discount factor overflows at period {t}"
                ))
            })?;
        }
        if discount.is_zero() {
            return Err(ArenaFinanceError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| {
                ArenaFinanceError::FinancialImpossibility(format!(
                    "NPV discounted value overflows at period {t}"
                ))
            })?;
    }

    Ok(result)
}

/// Internal Rate of Return starting from a 10% guess.
pub fn irr(cash_flows: &[Money]) -> ArenaFinanceResult<Rate> {
    irr_with_guess(cash_flows, IRR_GUESS)
}

/// Internal Rate of Return using Newton-Raphson, with a bisection fallback
/// over the first sign-changing bracket closest to `guess`.
pub fn irr_with_guess(cash_flows: &[Money], guess: Rate) -> ArenaFinanceResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(ArenaFinanceError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    let has_inflow = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    let has_outflow = cash_flows.iter().any(|cf| *cf < Decimal::ZERO);
    if !has_inflow || !has_outflow {
        return Err(ArenaFinanceError::FinancialImpossibility(
            "IRR requires both negative and positive cash flows".into(),
        ));
    }

    let last_delta = match newton_raphson(cash_flows, guess) {
        Ok(rate) => return Ok(rate),
        Err(delta) => delta,
    };

    debug!(
        last_delta = %last_delta,
        "IRR Newton-Raphson did not converge, falling back to bisection"
    );
    bisection(cash_flows, guess, last_delta)
}

/// Return on investment: `(final - initial) / initial`.
pub fn roi(initial_investment: Money, final_value: Money) -> ArenaFinanceResult<Rate> {
    if initial_investment.is_zero() {
        return Err(ArenaFinanceError::DivisionByZero {
            context: "ROI initial investment".into(),
        });
    }
    Ok((final_value - initial_investment) / initial_investment)
}

/// Simple payback period in periods, interpolated inside the period where the
/// cumulative balance turns non-negative. `None` when it never does.
pub fn payback_period(cash_flows: &[Money]) -> Option<Years> {
    let mut cumulative = Decimal::ZERO;

    for (i, cf) in cash_flows.iter().enumerate() {
        cumulative += cf;
        if cumulative >= Decimal::ZERO {
            let period = Decimal::from(i as u64);
            if cf.is_zero() {
                return Some(period);
            }
            return Some(period + (cumulative - cf) / cf);
        }
    }

    None
}

/// Payback period of the discounted series `cf_t / (1 + rate)^t`.
pub fn discounted_payback_period(
    rate: Rate,
    cash_flows: &[Money],
) -> ArenaFinanceResult<Option<Years>> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r.abs() < DISCOUNT_EPSILON {
        return Err(ArenaFinanceError::DivisionByZero {
            context: "discounted payback factor (rate of -100%)".into(),
        });
    }

    let mut discounted = Vec::with_capacity(cash_flows.len());
    let mut discount = Decimal::ONE;
    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(ArenaFinanceError::DivisionByZero {
                context: format!("discounted payback factor at period {t}"),
            });
        }
        discounted.push(cf / discount);
    }

    Ok(payback_period(&discounted))
}

/// Units needed to cover fixed costs. `None` when each unit loses money.
pub fn break_even_units(
    fixed_costs: Money,
    variable_cost_per_unit: Money,
    price_per_unit: Money,
) -> Option<Decimal> {
    if price_per_unit <= variable_cost_per_unit {
        return None;
    }
    Some(fixed_costs / (price_per_unit - variable_cost_per_unit))
}

/// Payment (PMT), spreadsheet sign convention: borrowing a positive present
/// value yields a negative payment.
pub fn pmt(
    rate: Rate,
    nper: u32,
    present_value: Money,
    future_value: Money,
) -> ArenaFinanceResult<Money> {
    if nper == 0 {
        return Err(ArenaFinanceError::InvalidInput {
            field: "nper".into(),
            reason: "Number of periods must be > 0".into(),
        });
    }

    if rate.is_zero() {
        return Ok(-(present_value + future_value) / Decimal::from(nper));
    }

    let factor = compound_factor(rate, nper)?;
    let annuity_factor = (factor - Decimal::ONE) / rate;

    if annuity_factor.is_zero() {
        return Err(ArenaFinanceError::DivisionByZero {
            context: "PMT annuity factor".into(),
        });
    }

    Ok(-(present_value * factor + future_value) / annuity_factor)
}

/// Level monthly installment of an amortizing loan (positive amount).
pub fn loan_payment(principal: Money, annual_rate: Rate, years: u32) -> ArenaFinanceResult<Money> {
    if years == 0 {
        return Err(ArenaFinanceError::InvalidInput {
            field: "years".into(),
            reason: "Loan term must be at least one year".into(),
        });
    }
    if principal < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "principal".into(),
            reason: "Principal cannot be negative".into(),
        });
    }

    let monthly_rate = annual_rate / dec!(12);
    let months = years
        .checked_mul(12)
        .ok_or_else(|| ArenaFinanceError::InvalidInput {
            field: "years".into(),
            reason: format!("Loan term of {years} years is too long"),
        })?;
    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(months));
    }

    Ok(-pmt(monthly_rate, months, principal, Decimal::ZERO)?)
}

/// `(1 + rate)^periods` for whole periods. Fails when the factor does not
/// fit in a `Decimal`.
pub fn compound_factor(rate: Rate, periods: u32) -> ArenaFinanceResult<Decimal> {
    (Decimal::ONE + rate)
        .checked_powu(periods as u64)
        .ok_or_else(|| {
            ArenaFinanceError::FinancialImpossibility(format!(
                "compound factor (1 + {rate})^{periods} is not representable"
            ))
        })
}

/// `(1 + rate)^years` for fractional years (monthly compounding steps).
pub fn fractional_compound_factor(rate: Rate, years: Years) -> ArenaFinanceResult<Decimal> {
    let base = Decimal::ONE + rate;
    if base <= Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "rate".into(),
            reason: "Growth rate must be greater than -100%".into(),
        });
    }
    if years.is_zero() {
        return Ok(Decimal::ONE);
    }
    base.checked_powd(years)
        .ok_or_else(|| ArenaFinanceError::FinancialImpossibility(format!(
            "compound factor (1 + {rate})^{years} is not representable"
        )))
}

/// Compound annual growth rate between two values `periods` apart.
pub fn cagr(first: Money, last: Money, periods: u32) -> Option<Rate> {
    if periods == 0 || first <= Decimal::ZERO || last < Decimal::ZERO {
        return None;
    }
    if last.is_zero() {
        return Some(-Decimal::ONE);
    }
    let exponent = Decimal::ONE / Decimal::from(periods);
    (last / first)
        .checked_powd(exponent)
        .map(|factor| factor - Decimal::ONE)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// NPV and its derivative with respect to the rate, or `None` if the
/// arithmetic leaves the representable range.
fn npv_and_derivative(rate: Rate, cash_flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    if one_plus_r.abs() < DISCOUNT_EPSILON {
        return None;
    }

    let mut value = Decimal::ZERO;
    let mut derivative = Decimal::ZERO;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        if discount.is_zero() {
            return None;
        }
        value = value.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let next = discount.checked_mul(one_plus_r)?;
            if next.is_zero() {
                return None;
            }
            let term = Decimal::from(t as u64).checked_mul(*cf)?.checked_div(next)?;
            derivative = derivative.checked_sub(term)?;
        }
    }

    Some((value, derivative))
}

/// Newton-Raphson on NPV. On failure returns the last residual seen.
fn newton_raphson(cash_flows: &[Money], guess: Rate) -> Result<Rate, Decimal> {
    let mut rate = guess;
    let mut last_delta = Decimal::ZERO;

    for _ in 0..MAX_IRR_ITERATIONS {
        let (value, derivative) = npv_and_derivative(rate, cash_flows).ok_or(last_delta)?;
        last_delta = value;
        if value.abs() < IRR_TOLERANCE {
            return accept_root(rate, last_delta);
        }
        if derivative.is_zero() {
            return Err(last_delta);
        }
        let step = value.checked_div(derivative).ok_or(last_delta)?;
        rate = rate.checked_sub(step).ok_or(last_delta)?;
    }

    match npv_and_derivative(rate, cash_flows) {
        Some((value, _)) if value.abs() < IRR_TOLERANCE => accept_root(rate, value),
        Some((value, _)) => Err(value),
        None => Err(last_delta),
    }
}

fn accept_root(rate: Rate, residual: Decimal) -> Result<Rate, Decimal> {
    if rate > -Decimal::ONE {
        Ok(rate)
    } else {
        Err(residual)
    }
}

fn bisection(cash_flows: &[Money], guess: Rate, last_delta: Decimal) -> ArenaFinanceResult<Rate> {
    let evaluated: Vec<(Rate, Decimal)> = IRR_BRACKET_GRID
        .iter()
        .filter_map(|r| npv_and_derivative(*r, cash_flows).map(|(v, _)| (*r, v)))
        .collect();

    if let Some((rate, _)) = evaluated.iter().find(|(_, v)| v.is_zero()) {
        return Ok(*rate);
    }

    let bracket = evaluated
        .windows(2)
        .filter(|w| (w[0].1 > Decimal::ZERO) != (w[1].1 > Decimal::ZERO))
        .min_by_key(|w| ((w[0].0 + w[1].0) / dec!(2) - guess).abs())
        .map(|w| (w[0], w[1]));

    let Some(((mut lo, mut f_lo), (mut hi, _))) = bracket else {
        return Err(ArenaFinanceError::ConvergenceFailure {
            function: "IRR".into(),
            iterations: MAX_IRR_ITERATIONS,
            last_delta,
        });
    };

    for i in 0..MAX_BISECTION_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let Some((f_mid, _)) = npv_and_derivative(mid, cash_flows) else {
            return Err(ArenaFinanceError::ConvergenceFailure {
                function: "IRR (bisection)".into(),
                iterations: i,
                last_delta: f_lo,
            });
        };
        if f_mid.abs() < IRR_TOLERANCE || hi - lo < BISECTION_WIDTH {
            return Ok(mid);
        }
        if (f_mid > Decimal::ZERO) == (f_lo > Decimal::ZERO) {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }

    Ok((lo + hi) / dec!(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_npv_basic() {
        let cfs = vec![dec!(-1000), dec!(300), dec!(400), dec!(500)];
        let result = npv(dec!(0.10), &cfs).unwrap();
        // -1000 + 300/1.1 + 400/1.21 + 500/1.331 ≈ -21.04
        assert!((result - dec!(-21.04)).abs() < dec!(0.01));
    }

    #[test]
    fn test_npv_zero_rate_is_plain_sum() {
        let cfs = vec![dec!(100); 5];
        assert_eq!(npv(Decimal::ZERO, &cfs).unwrap(), dec!(500));
    }

    #[test]
    fn test_npv_negative_rate_allowed() {
        let cfs = vec![dec!(-100), dec!(50), dec!(50)];
        let result = npv(dec!(-0.5), &cfs).unwrap();
        // -100 + 100 + 200
        assert_eq!(result, dec!(200));
    }

    #[test]
    fn test_npv_rejects_minus_one_hundred_percent() {
        let cfs = vec![dec!(-100), dec!(50)];
        assert!(matches!(
            npv(dec!(-1), &cfs),
            Err(ArenaFinanceError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_irr_basic() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let result = irr(&cfs).unwrap();
        // ~9.7%
        assert!((result - dec!(0.097)).abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_zeroes_npv() {
        let cfs = vec![dec!(-50000), dec!(12000), dec!(15000), dec!(18000), dec!(21000)];
        let rate = irr(&cfs).unwrap();
        assert!(npv(rate, &cfs).unwrap().abs() < dec!(0.001));
    }

    #[test]
    fn test_irr_high_return() {
        let cfs = vec![dec!(-100), dec!(300)];
        let rate = irr(&cfs).unwrap();
        assert!((rate - dec!(2)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_irr_without_sign_change_fails() {
        let cfs = vec![dec!(100), dec!(200), dec!(300)];
        assert!(irr(&cfs).is_err());
    }

    #[test]
    fn test_irr_requires_two_flows() {
        assert!(matches!(
            irr(&[dec!(-100)]),
            Err(ArenaFinanceError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_bisection_finds_root_from_bad_guess() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        let rate = bisection(&cfs, dec!(0.10), Decimal::ZERO).unwrap();
        assert!((rate - dec!(0.097)).abs() < dec!(0.001));
    }

    #[test]
    fn test_payback_interpolates() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400)];
        assert_eq!(payback_period(&cfs), Some(dec!(2.5)));
    }

    #[test]
    fn test_payback_never_reached() {
        let cfs = vec![dec!(-1000), dec!(100), dec!(100)];
        assert_eq!(payback_period(&cfs), None);
    }

    #[test]
    fn test_discounted_payback_is_later() {
        let cfs = vec![dec!(-1000), dec!(400), dec!(400), dec!(400), dec!(400)];
        let simple = payback_period(&cfs).unwrap();
        let discounted = discounted_payback_period(dec!(0.10), &cfs).unwrap().unwrap();
        assert!(discounted > simple);
    }

    #[test]
    fn test_roi() {
        assert_eq!(roi(dec!(1000), dec!(1500)).unwrap(), dec!(0.5));
        assert!(roi(Decimal::ZERO, dec!(10)).is_err());
    }

    #[test]
    fn test_break_even_units() {
        assert_eq!(break_even_units(dec!(10000), dec!(30), dec!(80)), Some(dec!(200)));
        assert_eq!(break_even_units(dec!(10000), dec!(80), dec!(80)), None);
    }

    #[test]
    fn test_loan_payment_standard() {
        let payment = loan_payment(dec!(100000), dec!(0.12), 5).unwrap();
        assert!((payment - dec!(2224.44)).abs() < dec!(0.01));
    }

    #[test]
    fn test_loan_payment_zero_rate() {
        let payment = loan_payment(dec!(60000), Decimal::ZERO, 5).unwrap();
        assert_eq!(payment, dec!(1000));
    }

    #[test]
    fn test_pmt_sign_convention() {
        let payment = pmt(dec!(0.01), 60, dec!(100000), Decimal::ZERO).unwrap();
        assert!(payment < Decimal::ZERO);
    }

    #[test]
    fn test_compound_factor() {
        assert_eq!(compound_factor(dec!(0.10), 2).unwrap(), dec!(1.21));
        assert_eq!(compound_factor(dec!(0.10), 0).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_compound_factor_overflow_is_an_error() {
        let result = compound_factor(dec!(2), 100);
        assert!(matches!(
            result,
            Err(ArenaFinanceError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_pmt_overflowing_factor_is_an_error() {
        assert!(pmt(dec!(2), 100, dec!(1000), Decimal::ZERO).is_err());
    }

    #[test]
    fn test_loan_payment_extreme_rate_is_an_error() {
        // 1000% a year over 30 years does not fit in a Decimal
        assert!(loan_payment(dec!(100000), dec!(10), 30).is_err());
    }

    #[test]
    fn test_loan_payment_term_too_long() {
        let result = loan_payment(dec!(100000), dec!(0.12), u32::MAX);
        assert!(matches!(
            result,
            Err(ArenaFinanceError::InvalidInput { ref field, .. }) if field == "years"
        ));
    }

    #[test]
    fn test_cagr() {
        let rate = cagr(dec!(100), dec!(121), 2).unwrap();
        assert!((rate - dec!(0.10)).abs() < dec!(0.000001));
        assert_eq!(cagr(Decimal::ZERO, dec!(121), 2), None);
        assert_eq!(cagr(dec!(100), dec!(121), 0), None);
    }

    #[test]
    fn test_fractional_compound_factor() {
        let factor = fractional_compound_factor(dec!(0.21), dec!(0.5)).unwrap();
        assert!((factor - dec!(1.1)).abs() < dec!(0.000001));
        assert!(fractional_compound_factor(dec!(-1.5), dec!(0.5)).is_err());
    }
}
