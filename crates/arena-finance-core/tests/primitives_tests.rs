use arena_finance_core::market::{get_market_profile, get_market_profile_or_default, investment_requirements, Market};
use arena_finance_core::time_value::{
    break_even_units, discounted_payback_period, irr, loan_payment, npv, payback_period, roi,
};
use arena_finance_core::types::Currency;
use arena_finance_core::ArenaFinanceError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// NPV / IRR
// ===========================================================================

#[test]
fn test_npv_facility_project() {
    // 10% on [-1000, 500, 500, 500]
    // = -1000 + 454.545 + 413.223 + 375.657 ≈ 243.43
    let value = npv(dec!(0.10), &[dec!(-1000), dec!(500), dec!(500), dec!(500)]).unwrap();
    assert!(
        (value - dec!(243.43)).abs() < dec!(0.01),
        "Expected NPV ~243.43, got {value}"
    );
}

#[test]
fn test_npv_rate_of_minus_one_is_an_error() {
    let result = npv(dec!(-1), &[dec!(-100), dec!(200)]);
    assert!(matches!(result, Err(ArenaFinanceError::DivisionByZero { .. })));
}

#[test]
fn test_irr_zeroes_npv() {
    let flows = [dec!(-435000), dec!(120000), dec!(140000), dec!(160000), dec!(180000)];
    let rate = irr(&flows).unwrap();
    let residual = npv(rate, &flows).unwrap();
    assert!(
        residual.abs() < dec!(0.01),
        "NPV at IRR should be ~0, got {residual}"
    );
    assert!(rate > dec!(0.12) && rate < dec!(0.14), "IRR {rate} outside expected band");
}

#[test]
fn test_npv_strictly_decreases_with_rate_for_conventional_flows() {
    let flows = [dec!(-1000), dec!(300), dec!(400), dec!(500)];
    let values: Vec<Decimal> = (0..=30u32)
        .map(|bp| npv(Decimal::from(bp) / dec!(100), &flows).unwrap())
        .collect();
    for (i, w) in values.windows(2).enumerate() {
        assert!(
            w[0] > w[1],
            "NPV should fall as the rate rises: {} at {}% vs {} at {}%",
            w[0],
            i,
            w[1],
            i + 1
        );
    }
    assert!(values[0] > Decimal::ZERO);
    assert!(values[30] < Decimal::ZERO);
}

#[test]
fn test_npv_at_irr_is_zero_for_conventional_series() {
    let mut long_tail = vec![dec!(-1000)];
    long_tail.extend(std::iter::repeat(dec!(100)).take(30));
    let series = vec![
        vec![dec!(-1000), dec!(1100)],
        vec![dec!(-1000), dec!(300), dec!(400), dec!(500)],
        vec![dec!(-250000), dec!(40000), dec!(60000), dec!(80000), dec!(90000), dec!(90000)],
        vec![dec!(-500), dec!(50), dec!(50), dec!(50), dec!(50), dec!(800)],
        long_tail,
    ];
    for flows in &series {
        let rate = irr(flows).unwrap();
        let residual = npv(rate, flows).unwrap();
        assert!(
            residual.abs() < dec!(0.01),
            "NPV at IRR {rate} should be ~0, got {residual} for {flows:?}"
        );
    }
}

#[test]
fn test_irr_without_sign_change_fails() {
    assert!(irr(&[dec!(100), dec!(200), dec!(300)]).is_err());
    assert!(irr(&[dec!(-100)]).is_err());
}

// ===========================================================================
// Payback / ROI / break-even
// ===========================================================================

#[test]
fn test_payback_interpolates_inside_crossing_year() {
    // Cumulative after 2 years = -200; cf year 3 = 400 -> 2.5
    let payback = payback_period(&[dec!(-1000), dec!(400), dec!(400), dec!(400)]);
    assert_eq!(payback, Some(dec!(2.5)));
}

#[test]
fn test_payback_never_reached() {
    assert_eq!(payback_period(&[dec!(-1000), dec!(100), dec!(100)]), None);
}

#[test]
fn test_discounted_payback_is_later_than_simple() {
    let flows = [dec!(-1000), dec!(400), dec!(400), dec!(400), dec!(400)];
    let simple = payback_period(&flows).unwrap();
    let discounted = discounted_payback_period(dec!(0.10), &flows).unwrap().unwrap();
    assert!(discounted > simple);
}

#[test]
fn test_roi_and_zero_investment() {
    assert_eq!(roi(dec!(1000), dec!(1250)).unwrap(), dec!(0.25));
    assert!(roi(Decimal::ZERO, dec!(100)).is_err());
}

#[test]
fn test_break_even_requires_positive_unit_margin() {
    assert_eq!(break_even_units(dec!(30000), dec!(20), dec!(80)), Some(dec!(500)));
    assert_eq!(break_even_units(dec!(30000), dec!(80), dec!(80)), None);
}

#[test]
fn test_loan_payment_amortizes() {
    // 100,000 at 12% a year over 1 year: 1% a month, PMT ≈ 8,884.88
    let payment = loan_payment(dec!(100000), dec!(0.12), 1).unwrap();
    assert!(
        (payment - dec!(8884.88)).abs() < dec!(0.01),
        "Expected ~8884.88, got {payment}"
    );
    let zero_rate = loan_payment(dec!(120000), Decimal::ZERO, 5).unwrap();
    assert_eq!(zero_rate, dec!(2000));
}

// ===========================================================================
// Markets
// ===========================================================================

#[test]
fn test_market_lookup_by_name() {
    let europe = get_market_profile("europe").unwrap();
    assert_eq!(europe.currency, Currency::EUR);
    assert!(get_market_profile("mars").is_err());
    assert_eq!(get_market_profile_or_default("mars").market, Market::Brazil);
}

#[test]
fn test_every_market_has_twelve_seasonal_factors() {
    for market in Market::ALL {
        let profile = market.profile();
        for month in 1..=12 {
            assert!(profile.seasonal_factor(month).unwrap() > Decimal::ZERO);
        }
        assert!(profile.seasonal_factor(13).is_err());
    }
}

#[test]
fn test_brazil_two_field_investment() {
    let req = investment_requirements(&Market::Brazil.profile(), 2).unwrap();
    assert_eq!(req.total, dec!(435000));
    assert!(investment_requirements(&Market::Brazil.profile(), 0).is_err());
}
