//! Tariff engine configuration

use crate::pricing::RecommendationStrategy;
use crate::resolver::CountryFallback;
use paybill_common::{Result, DEFAULT_RECOMMENDED_CURRENCY};
use serde::{Deserialize, Serialize};

/// Environment variable prefix; nested keys are separated by `__`,
/// e.g. `PAYBILL__RESOLVER__COUNTRY_FALLBACK=wildcard`
pub const ENV_PREFIX: &str = "PAYBILL";

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TariffEngineConfig {
    pub resolver: ResolverSettings,
    pub recommendation: RecommendationSettings,
    pub cache: CacheSettings,
}

impl TariffEngineConfig {
    /// Load configuration from `.env` and `PAYBILL__*` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an optional file, then the environment.
    ///
    /// Environment values override file values; missing keys keep their
    /// defaults.
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }
}

/// Cost rule resolution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Behaviour when the country group has no covering bracket
    pub country_fallback: CountryFallback,
}

/// Recommended price settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationSettings {
    pub default_strategy: RecommendationStrategy,
    /// Drop groups priced in the source currency from the result
    pub exclude_home_region: bool,
    /// Reference currency of the source price table
    pub default_currency: String,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        Self {
            default_strategy: RecommendationStrategy::Table,
            exclude_home_region: false,
            default_currency: DEFAULT_RECOMMENDED_CURRENCY.to_string(),
        }
    }
}

/// Rule cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Cached scopes per rule family
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
        }
    }
}
