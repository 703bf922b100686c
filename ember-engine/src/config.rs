use ember_catalog::pricing::PricingConfig;
use ember_offer::ranker::RankingConfig;
use serde::Deserialize;
use std::env;

/// Fixed intervals for the periodic lifecycle tasks. The host scheduler is
/// cooperative, so at most one tick is in flight at a time.
#[derive(Debug, Deserialize, Clone)]
pub struct SweepConfig {
    #[serde(default = "default_price_refresh_secs")]
    pub price_refresh_secs: u64,
    #[serde(default = "default_countdown_sweep_secs")]
    pub countdown_sweep_secs: u64,
    #[serde(default = "default_benefit_sweep_secs")]
    pub benefit_sweep_secs: u64,
}

fn default_price_refresh_secs() -> u64 {
    60
}
fn default_countdown_sweep_secs() -> u64 {
    300
}
fn default_benefit_sweep_secs() -> u64 {
    3600
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            price_refresh_secs: default_price_refresh_secs(),
            countdown_sweep_secs: default_countdown_sweep_secs(),
            benefit_sweep_secs: default_benefit_sweep_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_max_offers")]
    pub max_offers: usize,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub sweeps: SweepConfig,
}

fn default_max_offers() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_offers: default_max_offers(),
            pricing: PricingConfig::default(),
            ranking: RankingConfig::default(),
            sweeps: SweepConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("EMBER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
