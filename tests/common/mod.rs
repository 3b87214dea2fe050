//! Shared helpers for the HTTP-level integration tests
//!
//! Every test gets its own mock servers for both remote APIs; timings are
//! shrunk to milliseconds so retry and cool-down paths run in real time.

#![allow(dead_code)]

use bardsong::{
    config::ResilienceConfig, BardConfig, FunTranslationsClient, MemoryCache, ResilientClient,
    SpeciesApiRepository, TranslationCache,
};
use bardsong_core_resilience::{RecordingSink, ResiliencePolicy};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const COOLDOWN: Duration = Duration::from_millis(300);

/// Resilience settings with millisecond backoff and a short cool-down
pub fn fast_resilience(failure_threshold: u32) -> ResilienceConfig {
    ResilienceConfig {
        backoff_seed_ms: 1,
        max_backoff_ms: 5,
        failure_threshold,
        ..ResilienceConfig::default()
    }
}

/// Configuration pointing at the two mock servers
pub fn config_for(species_url: &str, translation_url: &str, failure_threshold: u32) -> BardConfig {
    let mut config = BardConfig::default();
    config.species_api.base_url = species_url.to_string();
    config.species_api.timeout_secs = 5;
    config.translation_api.base_url = translation_url.to_string();
    config.translation_api.timeout_secs = 5;
    config.resilience = fast_resilience(failure_threshold);
    config
}

/// Species payload with `(text, language)` entries
pub fn species_body(entries: &[(&str, &str)]) -> String {
    let entries: Vec<serde_json::Value> = entries
        .iter()
        .map(|(text, language)| {
            serde_json::json!({
                "flavor_text": text,
                "language": { "name": language, "url": "https://pokeapi.co/api/v2/language/9/" },
                "version": { "name": "red", "url": "https://pokeapi.co/api/v2/version/1/" }
            })
        })
        .collect();
    serde_json::json!({ "id": 151, "name": "mew", "flavor_text_entries": entries }).to_string()
}

/// Translation payload as the remote API shapes it
pub fn translation_body(source: &str, translated: &str) -> String {
    serde_json::json!({
        "success": { "total": 1 },
        "contents": {
            "translated": translated,
            "text": source,
            "translation": "shakespeare"
        }
    })
    .to_string()
}

/// Hand-wired pipeline pieces sharing one policy that records its events
pub struct Harness {
    pub policy: Arc<ResiliencePolicy>,
    pub events: Arc<RecordingSink>,
    pub species: SpeciesApiRepository,
    pub translator: FunTranslationsClient,
    pub cache: Arc<MemoryCache>,
}

impl Harness {
    pub fn new(species_url: &str, translation_url: &str, resilience: &ResilienceConfig) -> Self {
        Self::with_cooldown(species_url, translation_url, resilience, COOLDOWN)
    }

    pub fn with_cooldown(
        species_url: &str,
        translation_url: &str,
        resilience: &ResilienceConfig,
        cooldown: Duration,
    ) -> Self {
        let events = Arc::new(RecordingSink::new());
        let mut circuit = resilience.circuit_breaker();
        circuit.cooldown = cooldown;
        let policy = Arc::new(ResiliencePolicy::with_sink(
            resilience.retry_policy(),
            circuit,
            events.clone(),
        ));

        let http = ResilientClient::new(Duration::from_secs(5), policy.clone())
            .expect("http client");
        let cache = Arc::new(MemoryCache::new());

        let species = SpeciesApiRepository::new(
            http.clone(),
            Url::parse(species_url).expect("species url"),
        );
        let translator = FunTranslationsClient::new(
            http,
            Url::parse(translation_url).expect("translation url"),
            "shakespeare",
            TranslationCache::new(cache.clone(), "shakespeare"),
        );

        Self {
            policy,
            events,
            species,
            translator,
            cache,
        }
    }
}

/// `host:port` of a mock server URL, the circuit key used for it
pub fn destination(server_url: &str) -> String {
    let url = Url::parse(server_url).expect("server url");
    bardsong::http::destination_of(&url)
}
