pub mod investment;
pub mod profile;

pub use investment::{investment_requirements, InvestmentRequirements};
pub use profile::{
    compare_markets, get_market_profile, get_market_profile_or_default, Intensity, Market,
    MarketComparison, MarketProfile, MarketTaxRates, TaxBurdenBand,
};
