/*!
 * Description pipeline: fetch descriptions, pick one, translate it
 *
 * ```text
 * FetchingDescriptions -> SelectingEntry -> Translating -> Done
 *          |                     |                |
 *          +---------------------+----------------+--> Done(failure)
 * ```
 *
 * Failures from either collaborator pass through unchanged; the only failure
 * produced here is `NotFound` for a species with nothing in the configured
 * language.
 */

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use bardsong_core_resilience::ResiliencePolicy;

use crate::cache::{MemoryCache, TranslationCache};
use crate::config::{BardConfig, ConfigError};
use crate::error::{Failure, Result};
use crate::features::{Feature, FeatureToggle, StaticFeatures};
use crate::http::ResilientClient;
use crate::species::{DescriptionSet, SpeciesApiRepository, SpeciesRepository};
use crate::translation::{FunTranslationsClient, Translator};

/// Pipeline stage, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchingDescriptions,
    SelectingEntry,
    Translating,
    Done,
}

/// Which entry of a description set gets translated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    First,
    Random,
}

impl Selection {
    fn from_toggle(features: &dyn FeatureToggle) -> Self {
        if features.is_enabled(Feature::RandomDescription) {
            Selection::Random
        } else {
            Selection::First
        }
    }

    /// Pick an entry; `None` only for an empty set
    pub fn pick<'a>(&self, set: &'a DescriptionSet) -> Option<&'a str> {
        match self {
            Selection::First => set.first(),
            Selection::Random if set.is_empty() => None,
            Selection::Random => set.get(rand::rng().random_range(0..set.len())),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::First => write!(f, "first"),
            Selection::Random => write!(f, "random"),
        }
    }
}

/// Success document handed to the inbound boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionResponse {
    pub name: String,
    pub description: String,
}

impl DescriptionResponse {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Composes a species repository with a translator
#[derive(Clone)]
pub struct DescriptionService {
    species: Arc<dyn SpeciesRepository>,
    translator: Arc<dyn Translator>,
    features: Arc<dyn FeatureToggle>,
    language: String,
}

impl fmt::Debug for DescriptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptionService")
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl DescriptionService {
    pub fn new(
        species: Arc<dyn SpeciesRepository>,
        translator: Arc<dyn Translator>,
        features: Arc<dyn FeatureToggle>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            species,
            translator,
            features,
            language: language.into(),
        }
    }

    /// Wire the HTTP-backed pipeline from configuration
    ///
    /// Both remote clients share one resilience policy; circuits are still
    /// tracked per destination.
    pub fn from_config(config: &BardConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let policy = Arc::new(ResiliencePolicy::new(
            config.resilience.retry_policy(),
            config.resilience.circuit_breaker(),
        ));

        let species_http = ResilientClient::new(
            Duration::from_secs(config.species_api.timeout_secs),
            policy.clone(),
        )?;
        let species = SpeciesApiRepository::new(species_http, config.species_base_url()?);

        let style = config.translation_api.style.clone();
        let cache = if config.cache.enabled {
            TranslationCache::new(Arc::new(MemoryCache::new()), style.clone())
        } else {
            TranslationCache::disabled(style.clone())
        };
        let translation_http = ResilientClient::new(
            Duration::from_secs(config.translation_api.timeout_secs),
            policy,
        )?;
        let translator = FunTranslationsClient::new(
            translation_http,
            config.translation_base_url()?,
            style,
            cache,
        );

        Ok(Self::new(
            Arc::new(species),
            Arc::new(translator),
            Arc::new(StaticFeatures::new(config.random_description)),
            config.language.clone(),
        ))
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Translated description of `name`
    pub async fn describe(&self, name: &str) -> Result<String> {
        let mut stage = Stage::FetchingDescriptions;
        debug!(species = name, ?stage, "Describing species");
        let descriptions = self.species.descriptions(name, &self.language).await?;

        stage = Stage::SelectingEntry;
        let selection = Selection::from_toggle(self.features.as_ref());
        info!(species = name, selection = %selection, "Picking {} description", selection);
        let text = selection
            .pick(&descriptions)
            .ok_or(Failure::NotFound)?
            .to_string();
        debug!(species = name, ?stage, candidates = descriptions.len(), "Selected entry");

        stage = Stage::Translating;
        debug!(species = name, ?stage, "Translating selected entry");
        let translated = self.translator.translate(&text).await?;

        stage = Stage::Done;
        debug!(species = name, ?stage, "Description ready");
        Ok(translated)
    }

    /// Like [`describe`](Self::describe), wrapped in the response document
    pub async fn describe_response(&self, name: &str) -> Result<DescriptionResponse> {
        self.describe(name)
            .await
            .map(|description| DescriptionResponse::new(name, description))
    }
}
