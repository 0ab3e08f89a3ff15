use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ArenaFinanceError;
use crate::market::MarketProfile;
use crate::time_value::fractional_compound_factor;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ArenaFinanceResult;

use super::ncg::ncg;

const MAX_ANALYSIS_MONTHS: u32 = 120;
const SCENARIO_MONTHS: u32 = 12;
const HIGH_SEASON: [u32; 4] = [12, 1, 2, 3];
const LOW_SEASON: [u32; 3] = [6, 7, 8];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingCapitalParams {
    #[serde(default = "default_start_year")]
    pub start_year: i32,
    #[serde(default = "default_analysis_months")]
    pub analysis_months: u32,
    /// Average monthly revenue before seasonality and growth
    #[serde(default = "default_monthly_revenue")]
    pub monthly_revenue: Money,
    /// Defaults to the market's working-capital days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receivables_days: Option<u32>,
    #[serde(default = "default_payables_days")]
    pub payables_days: u32,
    #[serde(default = "default_inventory_days")]
    pub inventory_days: u32,
    /// Share of revenue received in cash
    #[serde(default = "default_cash_share")]
    pub cash_share: Rate,
    /// Share of revenue received by card (D+1)
    #[serde(default = "default_card_share")]
    pub card_share: Rate,
    /// Swing applied in high (Dec-Mar) and low (Jun-Aug) months
    #[serde(default = "default_seasonal_variation")]
    pub seasonal_variation: Rate,
    /// Defaults to the market's growth potential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<Rate>,
}

fn default_start_year() -> i32 {
    2024
}

fn default_analysis_months() -> u32 {
    24
}

fn default_monthly_revenue() -> Money {
    dec!(50000)
}

fn default_payables_days() -> u32 {
    45
}

fn default_inventory_days() -> u32 {
    15
}

fn default_cash_share() -> Rate {
    dec!(0.4)
}

fn default_card_share() -> Rate {
    dec!(0.5)
}

fn default_seasonal_variation() -> Rate {
    dec!(0.2)
}

impl Default for WorkingCapitalParams {
    fn default() -> Self {
        WorkingCapitalParams {
            start_year: default_start_year(),
            analysis_months: default_analysis_months(),
            monthly_revenue: default_monthly_revenue(),
            receivables_days: None,
            payables_days: default_payables_days(),
            inventory_days: default_inventory_days(),
            cash_share: default_cash_share(),
            card_share: default_card_share(),
            seasonal_variation: default_seasonal_variation(),
            growth_rate: None,
        }
    }
}

/// Working-capital position at the end of one month.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingCapitalSnapshot {
    /// 1-based month of the analysis
    pub period: u32,
    pub year: i32,
    pub month: u32,
    pub revenue: Money,
    pub receivables: Money,
    pub inventory: Money,
    pub payables: Money,
    pub ncg: Money,
    pub ncg_pct: Option<Rate>,
    pub variation_vs_prior: Money,
    pub investment_cg: Money,
    pub release_cg: Money,
    /// Cash effect of the variation (negative when capital is tied up)
    pub cash_impact: Money,
    pub cumulative_cash_impact: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptMix {
    pub cash: Rate,
    pub card: Rate,
    pub term: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingCapitalIndicators {
    pub average_ncg: Money,
    pub average_ncg_pct: Option<Rate>,
    pub max_ncg: Money,
    pub min_ncg: Money,
    pub ncg_amplitude: Money,
    /// Receivables + inventory - payables days
    pub financial_cycle_days: i64,
    /// Annualised revenue over average NCG; `None` when NCG is not positive
    pub annual_turnover: Option<Decimal>,
    pub total_investment: Money,
    pub total_release: Money,
    pub net_investment: Money,
    pub initial_ncg: Money,
    pub final_ncg: Money,
    pub ncg_annual_growth: Option<Rate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkingCapitalScenario {
    Conservative,
    Base,
    Optimistic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: WorkingCapitalScenario,
    pub growth: Rate,
    pub receivables_days: u32,
    pub seasonal_variation: Rate,
    pub average_ncg: Money,
    pub peak_ncg: Money,
    /// Capital to set aside: the peak NCG of the first year
    pub required_investment: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    HighNcg,
    LongCycle,
    LowTurnover,
    TermMismatch,
    HighSeasonality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingCapitalOutput {
    pub receipt_mix: ReceiptMix,
    pub snapshots: Vec<WorkingCapitalSnapshot>,
    pub indicators: WorkingCapitalIndicators,
    pub scenarios: Vec<ScenarioResult>,
    /// Empty when every parameter is within acceptable levels
    pub recommendations: Vec<Recommendation>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Month-by-month NCG with investment/release of capital and cash impact.
pub fn project_working_capital(
    profile: &MarketProfile,
    params: &WorkingCapitalParams,
) -> ArenaFinanceResult<ComputationOutput<WorkingCapitalOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let receipt_mix = validate_params(params)?;
    let receivables_days = params
        .receivables_days
        .unwrap_or(profile.working_capital_days);
    let growth = params.growth_rate.unwrap_or(profile.growth_potential);

    let mut snapshots = Vec::with_capacity(params.analysis_months as usize);
    let mut prior_ncg = Decimal::ZERO;
    let mut cumulative_cash_impact = Decimal::ZERO;

    for m in 0..params.analysis_months {
        let month = m % 12 + 1;
        let revenue = month_revenue(params.monthly_revenue, growth, params.seasonal_variation, m)?;
        let b = ncg(
            revenue,
            Decimal::from(receivables_days),
            Decimal::from(params.inventory_days),
            Decimal::from(params.payables_days),
        );

        let variation = b.ncg - prior_ncg;
        let cash_impact = -variation;
        cumulative_cash_impact += cash_impact;

        snapshots.push(WorkingCapitalSnapshot {
            period: m + 1,
            year: params.start_year + (m / 12) as i32,
            month,
            revenue,
            receivables: b.receivables,
            inventory: b.inventory,
            payables: b.payables,
            ncg: b.ncg,
            ncg_pct: b.ncg_pct,
            variation_vs_prior: variation,
            investment_cg: variation.max(Decimal::ZERO),
            release_cg: (-variation).max(Decimal::ZERO),
            cash_impact,
            cumulative_cash_impact,
        });
        prior_ncg = b.ncg;
    }

    let indicators = compute_indicators(&snapshots, params, receivables_days);
    if indicators.final_ncg < Decimal::ZERO {
        warnings.push("Payables exceed receivables and inventory: NCG is negative".into());
    }

    let scenarios = run_scenarios(params, receivables_days, profile.growth_potential)?;
    let recommendations = recommend(&indicators, params, receivables_days);

    let output = WorkingCapitalOutput {
        receipt_mix,
        snapshots,
        indicators,
        scenarios,
        recommendations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("Working capital need (NCG), {}", profile.name),
        &serde_json::json!({
            "market": profile.market,
            "params": params,
            "receivables_days": receivables_days,
            "growth_rate": growth,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate_params(params: &WorkingCapitalParams) -> ArenaFinanceResult<ReceiptMix> {
    if params.analysis_months == 0 || params.analysis_months > MAX_ANALYSIS_MONTHS {
        return Err(ArenaFinanceError::InvalidInput {
            field: "analysis_months".into(),
            reason: format!("Must be between 1 and {MAX_ANALYSIS_MONTHS}"),
        });
    }
    if params.monthly_revenue < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "monthly_revenue".into(),
            reason: "Revenue cannot be negative".into(),
        });
    }
    if params.seasonal_variation < Decimal::ZERO || params.seasonal_variation > Decimal::ONE {
        return Err(ArenaFinanceError::InvalidInput {
            field: "seasonal_variation".into(),
            reason: "Must be between 0 and 1".into(),
        });
    }
    let term = Decimal::ONE - params.cash_share - params.card_share;
    if params.cash_share < Decimal::ZERO || params.card_share < Decimal::ZERO || term < Decimal::ZERO
    {
        return Err(ArenaFinanceError::InvalidInput {
            field: "cash_share".into(),
            reason: "Cash and card shares must be non-negative and sum to at most 1".into(),
        });
    }
    Ok(ReceiptMix {
        cash: params.cash_share,
        card: params.card_share,
        term,
    })
}

fn seasonal_swing(month: u32, variation: Rate) -> Decimal {
    if HIGH_SEASON.contains(&month) {
        Decimal::ONE + variation
    } else if LOW_SEASON.contains(&month) {
        Decimal::ONE - variation
    } else {
        Decimal::ONE
    }
}

/// Revenue of 0-based analysis month `m`, growing fractionally each month.
fn month_revenue(
    base: Money,
    growth: Rate,
    seasonal_variation: Rate,
    m: u32,
) -> ArenaFinanceResult<Money> {
    let month = m % 12 + 1;
    let growth_factor = fractional_compound_factor(growth, Decimal::from(m) / dec!(12))?;
    Ok(base * seasonal_swing(month, seasonal_variation) * growth_factor)
}

fn compute_indicators(
    snapshots: &[WorkingCapitalSnapshot],
    params: &WorkingCapitalParams,
    receivables_days: u32,
) -> WorkingCapitalIndicators {
    let n = Decimal::from(snapshots.len().max(1) as u64);
    let ncgs: Vec<Money> = snapshots.iter().map(|s| s.ncg).collect();
    let average_ncg = ncgs.iter().copied().sum::<Decimal>() / n;
    let average_revenue = snapshots.iter().map(|s| s.revenue).sum::<Decimal>() / n;

    let pcts: Vec<Rate> = snapshots.iter().filter_map(|s| s.ncg_pct).collect();
    let average_ncg_pct = if pcts.is_empty() {
        None
    } else {
        Some(pcts.iter().copied().sum::<Decimal>() / Decimal::from(pcts.len() as u64))
    };

    let max_ncg = ncgs.iter().copied().max().unwrap_or(Decimal::ZERO);
    let min_ncg = ncgs.iter().copied().min().unwrap_or(Decimal::ZERO);
    let initial_ncg = ncgs.first().copied().unwrap_or(Decimal::ZERO);
    let final_ncg = ncgs.last().copied().unwrap_or(Decimal::ZERO);

    let total_investment: Money = snapshots.iter().map(|s| s.investment_cg).sum();
    let total_release: Money = snapshots.iter().map(|s| s.release_cg).sum();

    let annual_turnover = if average_ncg > Decimal::ZERO {
        Some(average_revenue * dec!(12) / average_ncg)
    } else {
        None
    };

    let ncg_annual_growth = if initial_ncg > Decimal::ZERO && final_ncg >= Decimal::ZERO {
        let exponent = dec!(12) / Decimal::from(params.analysis_months);
        (final_ncg / initial_ncg)
            .checked_powd(exponent)
            .map(|f| f - Decimal::ONE)
    } else {
        None
    };

    WorkingCapitalIndicators {
        average_ncg,
        average_ncg_pct,
        max_ncg,
        min_ncg,
        ncg_amplitude: max_ncg - min_ncg,
        financial_cycle_days: receivables_days as i64 + params.inventory_days as i64
            - params.payables_days as i64,
        annual_turnover,
        total_investment,
        total_release,
        net_investment: total_investment - total_release,
        initial_ncg,
        final_ncg,
        ncg_annual_growth,
    }
}

fn run_scenarios(
    params: &WorkingCapitalParams,
    receivables_days: u32,
    growth_potential: Rate,
) -> ArenaFinanceResult<Vec<ScenarioResult>> {
    let cases = [
        (
            WorkingCapitalScenario::Conservative,
            dec!(0.05),
            receivables_days + 10,
            params.seasonal_variation + dec!(0.1),
        ),
        (
            WorkingCapitalScenario::Base,
            growth_potential,
            receivables_days,
            params.seasonal_variation,
        ),
        (
            WorkingCapitalScenario::Optimistic,
            growth_potential + dec!(0.05),
            receivables_days.saturating_sub(10),
            (params.seasonal_variation - dec!(0.1)).max(Decimal::ZERO),
        ),
    ];

    let mut results = Vec::with_capacity(cases.len());
    for (scenario, growth, days, seasonal) in cases {
        let mut ncgs = Vec::with_capacity(SCENARIO_MONTHS as usize);
        for m in 0..SCENARIO_MONTHS {
            let revenue = month_revenue(params.monthly_revenue, growth, seasonal, m)?;
            let b = ncg(
                revenue,
                Decimal::from(days),
                Decimal::from(params.inventory_days),
                Decimal::from(params.payables_days),
            );
            ncgs.push(b.ncg);
        }
        let average_ncg = ncgs.iter().copied().sum::<Decimal>() / Decimal::from(SCENARIO_MONTHS);
        let peak_ncg = ncgs.iter().copied().max().unwrap_or(Decimal::ZERO);
        results.push(ScenarioResult {
            scenario,
            growth,
            receivables_days: days,
            seasonal_variation: seasonal,
            average_ncg,
            peak_ncg,
            required_investment: peak_ncg,
        });
    }
    Ok(results)
}

fn recommend(
    indicators: &WorkingCapitalIndicators,
    params: &WorkingCapitalParams,
    receivables_days: u32,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();
    let mut push = |kind: RecommendationKind, message: &str| {
        recs.push(Recommendation {
            kind,
            message: message.to_string(),
        })
    };

    if indicators.average_ncg_pct.is_some_and(|p| p > dec!(0.20)) {
        push(
            RecommendationKind::HighNcg,
            "NCG exceeds 20% of revenue; renegotiate receivable and payable terms",
        );
    }
    if indicators.financial_cycle_days > 45 {
        push(
            RecommendationKind::LongCycle,
            "Financial cycle above 45 days; shorten receivable terms",
        );
    }
    if indicators.annual_turnover.is_some_and(|t| t < dec!(4)) {
        push(
            RecommendationKind::LowTurnover,
            "Working capital turns fewer than 4 times a year; tighten inventory and collection",
        );
    }
    if receivables_days > params.payables_days + 15 {
        push(
            RecommendationKind::TermMismatch,
            "Customers pay much later than suppliers are paid; negotiate better terms",
        );
    }
    if params.seasonal_variation > dec!(0.3) {
        push(
            RecommendationKind::HighSeasonality,
            "High seasonal swing; keep a cash reserve for the low season",
        );
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use rust_decimal_macros::dec;

    fn run(params: &WorkingCapitalParams) -> WorkingCapitalOutput {
        project_working_capital(&Market::Brazil.profile(), params)
            .unwrap()
            .result
    }

    #[test]
    fn test_first_month_is_all_investment() {
        let out = run(&WorkingCapitalParams::default());
        let first = &out.snapshots[0];
        // January: 50,000 × 1.2, growth factor 1
        assert_eq!(first.revenue, dec!(60000));
        assert_eq!(first.variation_vs_prior, first.ncg);
        assert_eq!(first.investment_cg, first.ncg);
        assert_eq!(first.release_cg, Decimal::ZERO);
    }

    #[test]
    fn test_investment_and_release_are_exclusive() {
        let out = run(&WorkingCapitalParams::default());
        for s in &out.snapshots {
            assert_eq!(s.investment_cg * s.release_cg, Decimal::ZERO);
            assert_eq!(s.ncg, s.receivables + s.inventory - s.payables);
        }
    }

    #[test]
    fn test_cumulative_cash_impact_mirrors_final_ncg() {
        let out = run(&WorkingCapitalParams::default());
        let last = out.snapshots.last().unwrap();
        assert!((last.cumulative_cash_impact + last.ncg).abs() < dec!(0.000001));
    }

    #[test]
    fn test_indicators() {
        let out = run(&WorkingCapitalParams::default());
        let ind = &out.indicators;
        assert_eq!(ind.financial_cycle_days, 30 + 15 - 45);
        assert_eq!(ind.ncg_amplitude, ind.max_ncg - ind.min_ncg);
        assert!((ind.net_investment - ind.final_ncg).abs() < dec!(0.000001));
    }

    #[test]
    fn test_scenarios_order_by_risk() {
        let out = run(&WorkingCapitalParams::default());
        assert_eq!(out.scenarios.len(), 3);
        assert_eq!(out.scenarios[0].receivables_days, 40);
        assert_eq!(out.scenarios[2].receivables_days, 20);
        assert!(out.scenarios[0].peak_ncg > out.scenarios[2].peak_ncg);
    }

    #[test]
    fn test_recommendations_flag_long_terms() {
        let params = WorkingCapitalParams {
            receivables_days: Some(90),
            seasonal_variation: dec!(0.4),
            ..Default::default()
        };
        let out = run(&params);
        let kinds: Vec<RecommendationKind> = out.recommendations.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RecommendationKind::LongCycle));
        assert!(kinds.contains(&RecommendationKind::TermMismatch));
        assert!(kinds.contains(&RecommendationKind::HighSeasonality));
    }

    #[test]
    fn test_receipt_mix_must_fit() {
        let params = WorkingCapitalParams {
            cash_share: dec!(0.7),
            card_share: dec!(0.5),
            ..Default::default()
        };
        assert!(project_working_capital(&Market::Brazil.profile(), &params).is_err());
    }
}
