use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::time::Instant;
use tracing::debug;

use super::long_range::{project_years, validate_params, Drivers, LongRangeParams};
use crate::error::ArenaFinanceError;
use crate::market::MarketProfile;
use crate::types::{ComputationMetadata, ComputationOutput};
use crate::valuation::enterprise_value;
use crate::ArenaFinanceResult;

const MAX_DRAWS: u32 = 100_000;
const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Helper: build ComputationOutput without requiring Decimal
// ---------------------------------------------------------------------------

fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "ieee754_f64".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloParams {
    #[serde(default = "default_draws")]
    pub draws: u32,
    /// Optional seed for reproducibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Std dev of the EBITDA margin factor, centred on 1.
    #[serde(default = "default_margin_sigma")]
    pub margin_sigma: f64,
    /// Std dev of the market factor applied to growth, centred on 1.
    #[serde(default = "default_market_sigma")]
    pub market_sigma: f64,
    #[serde(default)]
    pub include_samples: bool,
}

fn default_draws() -> u32 {
    1_000
}

fn default_margin_sigma() -> f64 {
    0.10
}

fn default_market_sigma() -> f64 {
    0.15
}

impl Default for MonteCarloParams {
    fn default() -> Self {
        MonteCarloParams {
            draws: default_draws(),
            seed: None,
            margin_sigma: default_margin_sigma(),
            market_sigma: default_market_sigma(),
            include_samples: false,
        }
    }
}

/// Percentile summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McPercentiles {
    pub p5: f64,
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
}

/// A single histogram bin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u32,
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McStatistics {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub percentiles: McPercentiles,
}

/// Outcome of one simulated path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McSample {
    pub growth: f64,
    pub base_margin: f64,
    pub final_revenue: f64,
    pub total_fcf: f64,
    pub revenue_cagr: Option<f64>,
    pub enterprise_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloOutput {
    pub draws: u32,
    pub final_revenue: McStatistics,
    pub total_fcf: McStatistics,
    pub revenue_cagr: Option<McStatistics>,
    /// Only over paths whose valuation was feasible
    pub enterprise_value: Option<McStatistics>,
    pub valid_valuations: u32,
    pub probability_positive_fcf: f64,
    pub final_revenue_histogram: Vec<HistogramBin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<McSample>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Rerun the long-range projector under random growth, margin and market
/// factors drawn from normals centred on 1.
///
/// Growth factor uses the scenario volatility as its std dev. Each path is
/// projected without the cyclical term but keeps the margin improvement and
/// expansions of the base run. Factors with a zero std dev are not sampled.
pub fn run_monte_carlo(
    profile: &MarketProfile,
    params: &LongRangeParams,
    mc: &MonteCarloParams,
) -> ArenaFinanceResult<ComputationOutput<MonteCarloOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_params(params)?;
    validate_mc(mc)?;

    let base = Drivers::resolve(profile, params);
    let discount_rate = params.discount_rate.unwrap_or(profile.discount_rate);
    let growth_sigma = base.volatility.to_f64().unwrap_or_default();

    let growth_dist = factor_distribution(growth_sigma, "volatility")?;
    let margin_dist = factor_distribution(mc.margin_sigma, "margin_sigma")?;
    let market_dist = factor_distribution(mc.market_sigma, "market_sigma")?;

    let mut rng = match mc.seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let periods = params.num_years().saturating_sub(1);
    let initial_revenue = params.initial_annual_revenue.to_f64().unwrap_or_default();

    let n = mc.draws as usize;
    let mut samples: Vec<McSample> = Vec::with_capacity(n);

    for _ in 0..n {
        let growth_factor = draw(&mut rng, growth_dist.as_ref());
        let margin_factor = draw(&mut rng, margin_dist.as_ref());
        let market_factor = draw(&mut rng, market_dist.as_ref());

        let drivers = Drivers {
            growth: base.growth * to_decimal(growth_factor * market_factor)?,
            base_margin: base.base_margin * to_decimal(margin_factor)?,
            volatility: Decimal::ZERO,
            ..base.clone()
        };
        let years = project_years(params, &drivers);

        let final_revenue = years
            .last()
            .and_then(|y| y.revenue.to_f64())
            .unwrap_or_default();
        let fcfs: Vec<Decimal> = years.iter().map(|y| y.free_cash_flow).collect();
        let total_fcf = fcfs.iter().sum::<Decimal>().to_f64().unwrap_or_default();

        let revenue_cagr = if periods > 0 && initial_revenue > 0.0 && final_revenue > 0.0 {
            Some((final_revenue / initial_revenue).powf(1.0 / periods as f64) - 1.0)
        } else {
            None
        };
        let enterprise_value = enterprise_value(&fcfs, discount_rate, params.terminal_growth)
            .ok()
            .and_then(|ev| ev.to_f64());

        samples.push(McSample {
            growth: drivers.growth.to_f64().unwrap_or_default(),
            base_margin: drivers.base_margin.to_f64().unwrap_or_default(),
            final_revenue,
            total_fcf,
            revenue_cagr,
            enterprise_value,
        });
    }

    let mut revenues: Vec<f64> = samples.iter().map(|s| s.final_revenue).collect();
    let mut fcf_totals: Vec<f64> = samples.iter().map(|s| s.total_fcf).collect();
    let mut cagrs: Vec<f64> = samples.iter().filter_map(|s| s.revenue_cagr).collect();
    let mut evs: Vec<f64> = samples.iter().filter_map(|s| s.enterprise_value).collect();

    let positive = fcf_totals.iter().filter(|&&v| v > 0.0).count();
    let probability_positive_fcf = positive as f64 / n as f64;

    if evs.len() < n {
        warnings.push(format!(
            "{} of {} paths had no feasible valuation",
            n - evs.len(),
            mc.draws
        ));
    }
    debug!(draws = mc.draws, valid_valuations = evs.len(), "monte carlo finished");

    let no_paths = || ArenaFinanceError::InsufficientData("Monte Carlo produced no paths".into());
    let final_revenue = compute_statistics(&mut revenues).ok_or_else(no_paths)?;
    let final_revenue_histogram = build_histogram(&revenues, HISTOGRAM_BINS);
    let total_fcf = compute_statistics(&mut fcf_totals).ok_or_else(no_paths)?;

    let output = MonteCarloOutput {
        draws: mc.draws,
        final_revenue,
        total_fcf,
        revenue_cagr: compute_statistics(&mut cagrs),
        valid_valuations: evs.len() as u32,
        enterprise_value: compute_statistics(&mut evs),
        probability_positive_fcf,
        final_revenue_histogram,
        samples: mc.include_samples.then_some(samples),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        &format!(
            "Long-range Monte Carlo ({} draws), {}",
            mc.draws, profile.name
        ),
        &serde_json::json!({
            "market": profile.market,
            "growth": base.growth,
            "growth_sigma": growth_sigma,
            "margin_sigma": mc.margin_sigma,
            "market_sigma": mc.market_sigma,
            "discount_rate": discount_rate,
            "terminal_growth": params.terminal_growth,
            "seed": mc.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

fn validate_mc(mc: &MonteCarloParams) -> ArenaFinanceResult<()> {
    if mc.draws == 0 || mc.draws > MAX_DRAWS {
        return Err(ArenaFinanceError::InvalidInput {
            field: "draws".into(),
            reason: format!("Must be between 1 and {MAX_DRAWS}"),
        });
    }
    Ok(())
}

/// `None` when `sigma` is zero: the factor is then fixed at 1.
fn factor_distribution(sigma: f64, field: &str) -> ArenaFinanceResult<Option<Normal>> {
    if sigma == 0.0 {
        return Ok(None);
    }
    Normal::new(1.0, sigma)
        .map(Some)
        .map_err(|e| ArenaFinanceError::InvalidInput {
            field: field.into(),
            reason: format!("Invalid Normal parameters: {e}"),
        })
}

fn draw(rng: &mut StdRng, dist: Option<&Normal>) -> f64 {
    dist.map_or(1.0, |d| rng.sample(d))
}

fn to_decimal(value: f64) -> ArenaFinanceResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| ArenaFinanceError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Sampled factor {value} is not representable"),
    })
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Compute the percentile value from a **sorted** slice using linear interpolation.
fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    match sorted {
        [] => None,
        [only] => Some(*only),
        _ => {
            let rank = p / 100.0 * (sorted.len() - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let frac = rank - lower as f64;
            Some(sorted[lower] * (1.0 - frac) + sorted[upper] * frac)
        }
    }
}

/// Equal-width histogram of a **sorted**, non-empty slice.
fn build_histogram(sorted: &[f64], num_bins: usize) -> Vec<HistogramBin> {
    let (Some(&min_val), Some(&max_val)) = (sorted.first(), sorted.last()) else {
        return Vec::new();
    };

    if (max_val - min_val).abs() < f64::EPSILON {
        return vec![HistogramBin {
            lower: min_val,
            upper: max_val,
            count: sorted.len() as u32,
            frequency: 1.0,
        }];
    }

    let bin_width = (max_val - min_val) / num_bins as f64;
    let n = sorted.len() as f64;

    let mut bins: Vec<HistogramBin> = (0..num_bins)
        .map(|i| HistogramBin {
            lower: min_val + i as f64 * bin_width,
            upper: if i == num_bins - 1 {
                max_val
            } else {
                min_val + (i + 1) as f64 * bin_width
            },
            count: 0,
            frequency: 0.0,
        })
        .collect();

    for &val in sorted {
        let idx = (((val - min_val) / bin_width).floor() as usize).min(num_bins - 1);
        bins[idx].count += 1;
    }
    for bin in &mut bins {
        bin.frequency = bin.count as f64 / n;
    }
    bins
}

/// Descriptive statistics of a non-empty slice, which is sorted in place.
fn compute_statistics(values: &mut [f64]) -> Option<McStatistics> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len() as f64;

    let mean = values.iter().sum::<f64>() / n;
    let median = if values.len().is_multiple_of(2) {
        let mid = values.len() / 2;
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[values.len() / 2]
    };
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(McStatistics {
        mean,
        median,
        std_dev: variance.sqrt(),
        min: values[0],
        max: values[values.len() - 1],
        percentiles: McPercentiles {
            p5: percentile_sorted(values, 5.0)?,
            p10: percentile_sorted(values, 10.0)?,
            p25: percentile_sorted(values, 25.0)?,
            p50: percentile_sorted(values, 50.0)?,
            p75: percentile_sorted(values, 75.0)?,
            p90: percentile_sorted(values, 90.0)?,
            p95: percentile_sorted(values, 95.0)?,
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Market;
    use crate::projections::ScenarioPreset;
    use rust_decimal_macros::dec;

    const SEED: u64 = 42;

    fn seeded(draws: u32) -> MonteCarloParams {
        MonteCarloParams {
            draws,
            seed: Some(SEED),
            ..Default::default()
        }
    }

    #[test]
    fn test_seeded_reproducibility() {
        let profile = Market::Brazil.profile();
        let params = LongRangeParams::default();
        let r1 = run_monte_carlo(&profile, &params, &seeded(200)).unwrap();
        let r2 = run_monte_carlo(&profile, &params, &seeded(200)).unwrap();
        assert_eq!(r1.result.final_revenue.mean, r2.result.final_revenue.mean);
        assert_eq!(r1.result.total_fcf.std_dev, r2.result.total_fcf.std_dev);
    }

    #[test]
    fn test_percentile_ordering() {
        let out = run_monte_carlo(
            &Market::Europe.profile(),
            &LongRangeParams::default(),
            &seeded(500),
        )
        .unwrap()
        .result;
        let p = &out.final_revenue.percentiles;
        assert!(p.p5 <= p.p10);
        assert!(p.p10 <= p.p25);
        assert!(p.p25 <= p.p50);
        assert!(p.p50 <= p.p75);
        assert!(p.p75 <= p.p90);
        assert!(p.p90 <= p.p95);
        assert!(out.final_revenue.std_dev > 0.0);
        assert!((0.0..=1.0).contains(&out.probability_positive_fcf));
    }

    #[test]
    fn test_zero_sigmas_collapse_to_one_path() {
        let params = LongRangeParams {
            scenario: ScenarioPreset::Custom {
                growth: dec!(0.12),
                volatility: Decimal::ZERO,
            },
            ..Default::default()
        };
        let mc = MonteCarloParams {
            draws: 50,
            seed: Some(SEED),
            margin_sigma: 0.0,
            market_sigma: 0.0,
            include_samples: true,
        };
        let profile = Market::Uae.profile();
        let out = run_monte_carlo(&profile, &params, &mc).unwrap().result;
        assert_eq!(out.final_revenue.min, out.final_revenue.max);
        assert!(out.final_revenue.std_dev < 1e-6);
        assert_eq!(out.final_revenue_histogram.len(), 1);

        let drivers = Drivers::resolve(&profile, &params);
        let years = project_years(&params, &drivers);
        let expected = years.last().unwrap().revenue.to_f64().unwrap();
        assert!((out.final_revenue.mean - expected).abs() < expected * 1e-9);
        assert_eq!(out.samples.map(|s| s.len()), Some(50));
    }

    #[test]
    fn test_samples_omitted_by_default() {
        let out = run_monte_carlo(
            &Market::Brazil.profile(),
            &LongRangeParams::default(),
            &seeded(20),
        )
        .unwrap()
        .result;
        assert!(out.samples.is_none());
        assert_eq!(out.draws, 20);
        assert_eq!(out.valid_valuations, 20);
    }

    #[test]
    fn test_draw_bounds() {
        let profile = Market::Brazil.profile();
        let params = LongRangeParams::default();
        assert!(run_monte_carlo(&profile, &params, &seeded(0)).is_err());
        assert!(run_monte_carlo(&profile, &params, &seeded(MAX_DRAWS + 1)).is_err());
    }

    #[test]
    fn test_negative_sigma_rejected() {
        let mc = MonteCarloParams {
            margin_sigma: -0.1,
            ..seeded(10)
        };
        assert!(
            run_monte_carlo(&Market::Brazil.profile(), &LongRangeParams::default(), &mc).is_err()
        );
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&sorted, 50.0), Some(3.0));
        assert!((percentile_sorted(&sorted, 10.0).unwrap() - 1.4).abs() < 1e-12);
        assert_eq!(percentile_sorted(&[7.0], 95.0), Some(7.0));
    }

    #[test]
    fn test_empty_samples_have_no_statistics() {
        assert_eq!(percentile_sorted(&[], 50.0), None);
        assert!(compute_statistics(&mut []).is_none());
        assert!(build_histogram(&[], HISTOGRAM_BINS).is_empty());
    }
}
