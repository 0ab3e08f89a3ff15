use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::ArenaFinanceError;
use crate::market::{Market, MarketProfile, MarketTaxRates};
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::ArenaFinanceResult;

/// Presumed-profit base as a share of revenue (Lucro Presumido, services).
pub const PRESUMED_PROFIT_RATE: Rate = dec!(0.32);
pub const IRPJ_RATE: Rate = dec!(0.15);
pub const IRPJ_SURTAX_RATE: Rate = dec!(0.10);
/// Annual profit above which the IRPJ surtax applies.
pub const IRPJ_SURTAX_THRESHOLD: Money = dec!(240000);
pub const CSLL_RATE: Rate = dec!(0.09);
pub const PIS_PRESUMIDO_RATE: Rate = dec!(0.0065);
pub const COFINS_PRESUMIDO_RATE: Rate = dec!(0.03);
pub const PIS_REAL_RATE: Rate = dec!(0.0165);
pub const COFINS_REAL_RATE: Rate = dec!(0.076);
/// Uniform reduction applied by the tax-planning option.
pub const TAX_PLANNING_FACTOR: Rate = dec!(0.85);

const BUCKET_PREFIX: &str = "total_";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Brazilian corporate tax regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrazilRegime {
    SimplesNacional,
    LucroPresumido,
    LucroReal,
}

impl BrazilRegime {
    pub const ALL: [BrazilRegime; 3] = [
        BrazilRegime::SimplesNacional,
        BrazilRegime::LucroPresumido,
        BrazilRegime::LucroReal,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BrazilRegime::SimplesNacional => "Simples Nacional",
            BrazilRegime::LucroPresumido => "Lucro Presumido",
            BrazilRegime::LucroReal => "Lucro Real",
        }
    }
}

/// Caller-supplied replacements for the market's statutory rates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxRateOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simples_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corporate_tax_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_security_rate: Option<Rate>,
}

/// A fully resolved tax regime with the rates it will apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "regime", rename_all = "snake_case")]
pub enum TaxRegime {
    SimplesNacional {
        simples_rate: Rate,
        iss_rate: Rate,
    },
    LucroPresumido {
        iss_rate: Rate,
    },
    LucroReal {
        iss_rate: Rate,
    },
    Europe {
        vat_rate: Rate,
        corporate_tax_rate: Rate,
        social_security_rate: Rate,
    },
    Uae {
        vat_rate: Rate,
        corporate_tax_rate: Rate,
    },
}

/// Tax components by name plus the sum of the regime's `total_*` buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub regime: String,
    /// Profit base the profit taxes were computed on (presumed or actual)
    pub taxable_profit: Money,
    pub components: BTreeMap<String, Money>,
    pub total: Money,
}

/// Input for a single-period tax calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxInput {
    pub market: Market,
    /// Brazilian regime; defaults to Simples Nacional in Brazil
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regime: Option<BrazilRegime>,
    pub revenue: Money,
    pub profit: Money,
    #[serde(default)]
    pub overrides: TaxRateOverrides,
    #[serde(default)]
    pub tax_planning: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the tax breakdown for one period of revenue and profit.
pub fn calculate_taxes(input: &TaxInput) -> ArenaFinanceResult<ComputationOutput<TaxBreakdown>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.revenue < Decimal::ZERO {
        return Err(ArenaFinanceError::InvalidInput {
            field: "revenue".into(),
            reason: "Revenue cannot be negative".into(),
        });
    }

    let profile = input.market.profile();
    let regime = TaxRegime::for_profile(&profile, input.regime, &input.overrides)?;
    let mut breakdown = regime.compute(input.revenue, input.profit);
    if input.tax_planning {
        breakdown = breakdown.with_planning(TAX_PLANNING_FACTOR);
        warnings.push("Tax planning applies a uniform 15% reduction to every component".into());
    }
    if input.profit <= Decimal::ZERO {
        warnings.push("Profit is not positive: profit-based taxes are zero".into());
    }
    if breakdown.total > input.revenue && input.revenue > Decimal::ZERO {
        warnings.push(format!(
            "Total taxes ({}) exceed revenue ({})",
            breakdown.total.round_dp(2),
            input.revenue
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        &format!("{} tax calculation ({})", profile.name, breakdown.regime),
        input,
        warnings,
        elapsed,
        breakdown,
    ))
}

impl TaxRegime {
    /// Resolve the regime once from the market's statutory rates and overrides.
    pub fn for_profile(
        profile: &MarketProfile,
        regime: Option<BrazilRegime>,
        overrides: &TaxRateOverrides,
    ) -> ArenaFinanceResult<Self> {
        validate_overrides(overrides)?;

        match &profile.tax_rates {
            MarketTaxRates::Brazil {
                simples_rate,
                iss_rate,
                ..
            } => {
                reject_override("vat_rate", overrides.vat_rate, profile)?;
                reject_override("corporate_tax_rate", overrides.corporate_tax_rate, profile)?;
                reject_override("social_security_rate", overrides.social_security_rate, profile)?;
                let iss_rate = overrides.iss_rate.unwrap_or(*iss_rate);
                Ok(match regime.unwrap_or(BrazilRegime::SimplesNacional) {
                    BrazilRegime::SimplesNacional => TaxRegime::SimplesNacional {
                        simples_rate: overrides.simples_rate.unwrap_or(*simples_rate),
                        iss_rate,
                    },
                    BrazilRegime::LucroPresumido => TaxRegime::LucroPresumido { iss_rate },
                    BrazilRegime::LucroReal => TaxRegime::LucroReal { iss_rate },
                })
            }
            MarketTaxRates::Europe {
                vat_rate,
                corporate_tax_rate,
                social_security_rate,
            } => {
                reject_brazil_only(regime, overrides, profile)?;
                Ok(TaxRegime::Europe {
                    vat_rate: overrides.vat_rate.unwrap_or(*vat_rate),
                    corporate_tax_rate: overrides.corporate_tax_rate.unwrap_or(*corporate_tax_rate),
                    social_security_rate: overrides
                        .social_security_rate
                        .unwrap_or(*social_security_rate),
                })
            }
            MarketTaxRates::Uae {
                vat_rate,
                corporate_tax_rate,
            } => {
                reject_brazil_only(regime, overrides, profile)?;
                reject_override("social_security_rate", overrides.social_security_rate, profile)?;
                Ok(TaxRegime::Uae {
                    vat_rate: overrides.vat_rate.unwrap_or(*vat_rate),
                    corporate_tax_rate: overrides.corporate_tax_rate.unwrap_or(*corporate_tax_rate),
                })
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaxRegime::SimplesNacional { .. } => BrazilRegime::SimplesNacional.display_name(),
            TaxRegime::LucroPresumido { .. } => BrazilRegime::LucroPresumido.display_name(),
            TaxRegime::LucroReal { .. } => BrazilRegime::LucroReal.display_name(),
            TaxRegime::Europe { .. } => "Europe VAT + corporate",
            TaxRegime::Uae { .. } => "UAE VAT + corporate",
        }
    }

    /// Taxes due on `revenue` and `profit`. Profit taxes are zero for losses.
    pub fn compute(&self, revenue: Money, profit: Money) -> TaxBreakdown {
        let taxable_profit = match self {
            TaxRegime::LucroPresumido { .. } => revenue * PRESUMED_PROFIT_RATE,
            _ => profit,
        };
        let positive_profit = taxable_profit.max(Decimal::ZERO);

        let components: Vec<(&str, Money)> = match self {
            TaxRegime::SimplesNacional {
                simples_rate,
                iss_rate,
            } => {
                let simples = revenue * simples_rate;
                let iss = revenue * iss_rate;
                vec![
                    ("simples_nacional", simples),
                    ("iss", iss),
                    ("total_federal", simples),
                    ("total_municipal", iss),
                ]
            }
            TaxRegime::LucroPresumido { iss_rate } | TaxRegime::LucroReal { iss_rate } => {
                let (pis_rate, cofins_rate) = if matches!(self, TaxRegime::LucroPresumido { .. }) {
                    (PIS_PRESUMIDO_RATE, COFINS_PRESUMIDO_RATE)
                } else {
                    (PIS_REAL_RATE, COFINS_REAL_RATE)
                };
                let irpj = positive_profit * IRPJ_RATE;
                let surtax =
                    ((taxable_profit - IRPJ_SURTAX_THRESHOLD) * IRPJ_SURTAX_RATE).max(Decimal::ZERO);
                let csll = positive_profit * CSLL_RATE;
                let pis = revenue * pis_rate;
                let cofins = revenue * cofins_rate;
                let iss = revenue * iss_rate;
                vec![
                    ("irpj", irpj),
                    ("adicional_irpj", surtax),
                    ("csll", csll),
                    ("pis", pis),
                    ("cofins", cofins),
                    ("iss", iss),
                    ("total_federal", irpj + surtax + csll + pis + cofins),
                    ("total_municipal", iss),
                ]
            }
            TaxRegime::Europe {
                vat_rate,
                corporate_tax_rate,
                social_security_rate,
            } => {
                let vat = revenue * vat_rate;
                let corporate = positive_profit * corporate_tax_rate;
                let social = revenue * social_security_rate;
                vec![
                    ("vat", vat),
                    ("corporate_tax", corporate),
                    ("social_security", social),
                    ("total_indirect", vat),
                    ("total_direct", corporate + social),
                ]
            }
            TaxRegime::Uae {
                vat_rate,
                corporate_tax_rate,
            } => {
                let vat = revenue * vat_rate;
                let corporate = positive_profit * corporate_tax_rate;
                vec![
                    ("vat", vat),
                    ("corporate_tax", corporate),
                    ("total_indirect", vat),
                    ("total_direct", corporate),
                ]
            }
        };

        TaxBreakdown::from_components(self.name(), taxable_profit, components)
    }
}

impl TaxBreakdown {
    fn from_components(regime: &str, taxable_profit: Money, components: Vec<(&str, Money)>) -> Self {
        let components: BTreeMap<String, Money> = components
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let total = bucket_total(&components);
        TaxBreakdown {
            regime: regime.to_string(),
            taxable_profit,
            components,
            total,
        }
    }

    /// Amount of a component, zero when the regime does not levy it.
    pub fn component(&self, name: &str) -> Money {
        self.components.get(name).copied().unwrap_or(Decimal::ZERO)
    }

    /// Taxes levied on profit rather than revenue.
    pub fn income_taxes(&self) -> Money {
        ["irpj", "adicional_irpj", "csll", "corporate_tax"]
            .iter()
            .map(|name| self.component(name))
            .sum()
    }

    /// Direct taxes: the `total_direct` bucket in Europe and the UAE
    /// (social security included), the profit taxes in Brazil.
    pub fn direct_taxes(&self) -> Money {
        match self.components.get("total_direct") {
            Some(total) => *total,
            None => self.income_taxes(),
        }
    }

    /// Scale every component by `factor` and recompute the total.
    pub fn with_planning(&self, factor: Rate) -> Self {
        let components: BTreeMap<String, Money> = self
            .components
            .iter()
            .map(|(k, v)| (k.clone(), *v * factor))
            .collect();
        let total = bucket_total(&components);
        TaxBreakdown {
            regime: self.regime.clone(),
            taxable_profit: self.taxable_profit,
            components,
            total,
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn bucket_total(components: &BTreeMap<String, Money>) -> Money {
    components
        .iter()
        .filter(|(k, _)| k.starts_with(BUCKET_PREFIX))
        .map(|(_, v)| *v)
        .sum()
}

fn validate_overrides(overrides: &TaxRateOverrides) -> ArenaFinanceResult<()> {
    let rates = [
        ("simples_rate", overrides.simples_rate),
        ("iss_rate", overrides.iss_rate),
        ("vat_rate", overrides.vat_rate),
        ("corporate_tax_rate", overrides.corporate_tax_rate),
        ("social_security_rate", overrides.social_security_rate),
    ];
    for (field, rate) in rates {
        if let Some(r) = rate {
            if r < Decimal::ZERO || r > Decimal::ONE {
                return Err(ArenaFinanceError::InvalidInput {
                    field: field.into(),
                    reason: "Tax rate must be between 0 and 1".into(),
                });
            }
        }
    }
    Ok(())
}

fn reject_override(
    field: &str,
    rate: Option<Rate>,
    profile: &MarketProfile,
) -> ArenaFinanceResult<()> {
    if rate.is_some() {
        return Err(ArenaFinanceError::InvalidInput {
            field: field.into(),
            reason: format!("Not levied in {}", profile.name),
        });
    }
    Ok(())
}

fn reject_brazil_only(
    regime: Option<BrazilRegime>,
    overrides: &TaxRateOverrides,
    profile: &MarketProfile,
) -> ArenaFinanceResult<()> {
    if let Some(r) = regime {
        return Err(ArenaFinanceError::InvalidInput {
            field: "regime".into(),
            reason: format!("{} is a Brazilian regime, market is {}", r.display_name(), profile.name),
        });
    }
    reject_override("simples_rate", overrides.simples_rate, profile)?;
    reject_override("iss_rate", overrides.iss_rate, profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn regime(market: Market, regime: Option<BrazilRegime>) -> TaxRegime {
        TaxRegime::for_profile(&market.profile(), regime, &TaxRateOverrides::default()).unwrap()
    }

    #[test]
    fn test_brazil_defaults_to_simples() {
        assert_eq!(
            regime(Market::Brazil, None),
            TaxRegime::SimplesNacional {
                simples_rate: dec!(0.08),
                iss_rate: dec!(0.05)
            }
        );
    }

    #[test]
    fn test_simples_nacional() {
        let b = regime(Market::Brazil, None).compute(dec!(500000), dec!(100000));
        assert_eq!(b.component("simples_nacional"), dec!(40000));
        assert_eq!(b.component("iss"), dec!(25000));
        assert_eq!(b.total, dec!(65000));
    }

    #[test]
    fn test_lucro_presumido_buckets() {
        let b = regime(Market::Brazil, Some(BrazilRegime::LucroPresumido))
            .compute(dec!(1200000), dec!(240000));
        assert_eq!(b.taxable_profit, dec!(384000));
        assert_eq!(b.component("irpj"), dec!(57600));
        assert_eq!(b.component("adicional_irpj"), dec!(14400));
        assert_eq!(b.component("csll"), dec!(34560));
        assert_eq!(b.component("pis"), dec!(7800));
        assert_eq!(b.component("cofins"), dec!(36000));
        assert_eq!(b.component("iss"), dec!(60000));
        assert_eq!(b.component("total_federal"), dec!(150360));
        assert_eq!(b.total, dec!(210360));
    }

    #[test]
    fn test_lucro_real_surtax_only_above_threshold() {
        let r = regime(Market::Brazil, Some(BrazilRegime::LucroReal));
        let below = r.compute(dec!(1000000), dec!(200000));
        assert_eq!(below.component("adicional_irpj"), Decimal::ZERO);
        let above = r.compute(dec!(1000000), dec!(300000));
        assert_eq!(above.component("adicional_irpj"), dec!(6000));
    }

    #[test]
    fn test_lucro_real_loss_has_no_profit_taxes() {
        let b = regime(Market::Brazil, Some(BrazilRegime::LucroReal))
            .compute(dec!(1000000), dec!(-50000));
        assert_eq!(b.income_taxes(), Decimal::ZERO);
        assert_eq!(b.component("pis"), dec!(16500));
    }

    #[test]
    fn test_europe_buckets() {
        let b = regime(Market::Europe, None).compute(dec!(100000), dec!(20000));
        assert_eq!(b.component("total_indirect"), dec!(20000));
        assert_eq!(b.component("total_direct"), dec!(5000) + dec!(15000));
        assert_eq!(b.total, dec!(40000));
    }

    #[test]
    fn test_direct_taxes_per_market() {
        let eu = regime(Market::Europe, None).compute(dec!(100000), dec!(20000));
        assert_eq!(eu.direct_taxes(), dec!(20000));
        let uae = regime(Market::Uae, None).compute(dec!(100000), dec!(500000));
        assert_eq!(uae.direct_taxes(), uae.component("corporate_tax"));
        let br = regime(Market::Brazil, Some(BrazilRegime::LucroPresumido))
            .compute(dec!(1000000), dec!(200000));
        assert_eq!(br.direct_taxes(), br.income_taxes());
    }

    #[test]
    fn test_uae_loss() {
        let b = regime(Market::Uae, None).compute(dec!(100000), dec!(-1));
        assert_eq!(b.component("corporate_tax"), Decimal::ZERO);
        assert_eq!(b.total, dec!(5000));
    }

    #[test]
    fn test_total_is_sum_of_buckets_for_every_regime() {
        let regimes = [
            regime(Market::Brazil, Some(BrazilRegime::SimplesNacional)),
            regime(Market::Brazil, Some(BrazilRegime::LucroPresumido)),
            regime(Market::Brazil, Some(BrazilRegime::LucroReal)),
            regime(Market::Europe, None),
            regime(Market::Uae, None),
        ];
        for r in regimes {
            let b = r.compute(dec!(800000), dec!(350000));
            let buckets: Money = b
                .components
                .iter()
                .filter(|(k, _)| k.starts_with("total_"))
                .map(|(_, v)| *v)
                .sum();
            assert_eq!(b.total, buckets, "{}", b.regime);
            assert!(b.total <= dec!(800000));
        }
    }

    #[test]
    fn test_planning_scales_components() {
        let b = regime(Market::Europe, None).compute(dec!(100000), dec!(20000));
        let planned = b.with_planning(TAX_PLANNING_FACTOR);
        assert_eq!(planned.component("vat"), dec!(17000));
        assert_eq!(planned.total, dec!(34000));
    }

    #[test]
    fn test_brazil_regime_rejected_outside_brazil() {
        let result = TaxRegime::for_profile(
            &Market::Uae.profile(),
            Some(BrazilRegime::LucroReal),
            &TaxRateOverrides::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_applied_and_validated() {
        let overrides = TaxRateOverrides {
            vat_rate: Some(dec!(0.21)),
            ..Default::default()
        };
        let r = TaxRegime::for_profile(&Market::Europe.profile(), None, &overrides).unwrap();
        assert_eq!(r.compute(dec!(100), Decimal::ZERO).component("vat"), dec!(21));

        let bad = TaxRateOverrides {
            vat_rate: Some(dec!(1.5)),
            ..Default::default()
        };
        assert!(TaxRegime::for_profile(&Market::Europe.profile(), None, &bad).is_err());
    }

    #[test]
    fn test_calculate_taxes_envelope() {
        let input = TaxInput {
            market: Market::Brazil,
            regime: Some(BrazilRegime::LucroPresumido),
            revenue: dec!(1200000),
            profit: dec!(240000),
            overrides: TaxRateOverrides::default(),
            tax_planning: true,
        };
        let out = calculate_taxes(&input).unwrap();
        assert!((out.result.total - dec!(210360) * dec!(0.85)).abs() < dec!(0.0001));
        assert!(!out.warnings.is_empty());
    }
}
