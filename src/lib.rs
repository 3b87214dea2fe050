/*!
 * Bardsong - species descriptions, retold by the bard
 *
 * Fetches a species' descriptions from a remote data source, picks one and
 * rewrites it through a remote stylistic translation service:
 * - Retry with decorrelated jitter and per-destination circuit breaking
 *   (`bardsong-core-resilience`)
 * - Content-addressed translation cache with a fixed one hour TTL
 * - Closed failure taxonomy carried as plain `Result` values
 *
 * Version: 0.1.0
 */

pub mod cache;
pub mod config;
pub mod describe;
pub mod error;
pub mod features;
pub mod http;
pub mod logging;
pub mod species;
pub mod translation;

// Re-export commonly used types
pub use cache::{CacheBackend, MemoryCache, NullCache, TranslationCache, CACHE_TTL};
pub use config::{BardConfig, ConfigError};
pub use describe::{DescriptionResponse, DescriptionService, Selection};
pub use error::{Failure, Result};
pub use features::{Feature, FeatureToggle, StaticFeatures};
pub use http::{CallError, ResilientClient};
pub use species::{
    clean_description, normalize_species_name, DescriptionSet, SpeciesApiRepository,
    SpeciesRepository,
};
pub use translation::{FunTranslationsClient, Translator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
