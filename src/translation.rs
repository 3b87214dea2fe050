/*!
 * Stylistic translation client with a cache in front
 */

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{error, info, warn};
use url::Url;

use crate::cache::TranslationCache;
use crate::error::{Failure, Result};
use crate::http::{destination_of, ResilientClient};

/// Rewrites text in some style
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TranslationEnvelope {
    contents: Option<TranslationContents>,
}

#[derive(Debug, Deserialize)]
struct TranslationContents {
    translated: Option<String>,
}

/// Client for `GET {base}/translate/{style}.json?text=...`
#[derive(Debug, Clone)]
pub struct FunTranslationsClient {
    http: ResilientClient,
    base_url: Url,
    style: String,
    cache: TranslationCache,
}

impl FunTranslationsClient {
    /// `cache` should be namespaced by `style`
    pub fn new(
        http: ResilientClient,
        base_url: Url,
        style: impl Into<String>,
        cache: TranslationCache,
    ) -> Self {
        Self {
            http,
            base_url,
            style: style.into(),
            cache,
        }
    }

    pub fn style(&self) -> &str {
        &self.style
    }

    fn translate_url(&self, text: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Failure::Unexpected(format!("{} cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .push("translate")
            .push(&format!("{}.json", self.style));
        url.query_pairs_mut().clear().append_pair("text", text);
        Ok(url)
    }

    async fn translate_remote(&self, text: &str) -> Result<String> {
        let url = self.translate_url(text)?;
        let destination = destination_of(&url);
        let response = self.http.get(&url).await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(destination = %destination, "Translation quota exhausted");
            return Err(Failure::RateLimited);
        }
        if !status.is_success() {
            return Err(Failure::Transport(format!(
                "{} answered {}",
                destination, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Failure::Transport(format!("failed to read translation payload: {}", e)))?;

        let translated = serde_json::from_slice::<Option<TranslationEnvelope>>(&body)
            .ok()
            .flatten()
            .and_then(|envelope| envelope.contents)
            .and_then(|contents| contents.translated);

        match translated {
            Some(translated) => Ok(translated),
            None => {
                error!(
                    destination = %destination,
                    status = status.as_u16(),
                    "Translation succeeded without a translated text"
                );
                Err(Failure::missing_payload(&destination))
            }
        }
    }
}

#[async_trait]
impl Translator for FunTranslationsClient {
    async fn translate(&self, text: &str) -> Result<String> {
        if let Some(cached) = self.cache.get(text).await {
            info!(style = %self.style, "Cache hit for translation");
            return Ok(cached);
        }

        let translated = self.translate_remote(text).await?;
        self.cache.put(text, &translated).await;
        Ok(translated)
    }
}
