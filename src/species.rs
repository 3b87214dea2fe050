/*!
 * Species repository: language-filtered, cleaned description entries
 */

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::{Failure, Result};
use crate::http::{destination_of, ResilientClient};

/// Ordered description entries for one species in one language
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptionSet {
    entries: Vec<String>,
}

impl DescriptionSet {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.entries.first().map(String::as_str)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.entries
    }
}

impl From<Vec<String>> for DescriptionSet {
    fn from(entries: Vec<String>) -> Self {
        Self::new(entries)
    }
}

/// Source of species descriptions
#[async_trait]
pub trait SpeciesRepository: Send + Sync {
    /// Descriptions of `name` tagged with `language`, in source order
    ///
    /// * `Err(Failure::NotFound)` - the species does not exist
    /// * `Ok(empty set)` - it exists but has nothing in `language`
    async fn descriptions(&self, name: &str, language: &str) -> Result<DescriptionSet>;
}

/// Replace every control character with a single space
///
/// Source texts are laid out for small screens and carry newlines, tabs,
/// form feeds and the odd bell character; none of them belong in prose.
pub fn clean_description(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

/// Trim and lowercase a species name; `None` when nothing is left
pub fn normalize_species_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[derive(Debug, Deserialize)]
struct SpeciesRecord {
    #[serde(default)]
    flavor_text_entries: Vec<FlavorTextEntry>,
}

#[derive(Debug, Deserialize)]
struct FlavorTextEntry {
    flavor_text: String,
    language: NamedResource,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

/// Repository backed by the remote species API (`/pokemon-species/{name}`)
#[derive(Debug, Clone)]
pub struct SpeciesApiRepository {
    http: ResilientClient,
    base_url: Url,
}

impl SpeciesApiRepository {
    pub fn new(http: ResilientClient, base_url: Url) -> Self {
        Self { http, base_url }
    }

    fn species_url(&self, name: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Failure::Unexpected(format!("{} cannot be used as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .push("pokemon-species")
            .push(name);
        Ok(url)
    }
}

#[async_trait]
impl SpeciesRepository for SpeciesApiRepository {
    async fn descriptions(&self, name: &str, language: &str) -> Result<DescriptionSet> {
        let url = self.species_url(name)?;
        let response = self.http.get(&url).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!(species = name, "Species not found");
            return Err(Failure::NotFound);
        }
        if !status.is_success() {
            return Err(Failure::Transport(format!(
                "{} answered {}",
                destination_of(&url),
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Failure::Transport(format!("failed to read species payload: {}", e)))?;
        if body.trim().is_empty() || body.trim() == "null" {
            return Err(Failure::NotFound);
        }

        let record: SpeciesRecord = serde_json::from_str(&body)
            .map_err(|e| Failure::Transport(format!("malformed species payload: {}", e)))?;

        let total = record.flavor_text_entries.len();
        let entries: Vec<String> = record
            .flavor_text_entries
            .into_iter()
            .filter(|entry| entry.language.name == language)
            .map(|entry| clean_description(&entry.flavor_text))
            .collect();

        debug!(
            species = name,
            language,
            total,
            matching = entries.len(),
            "Fetched descriptions"
        );
        Ok(DescriptionSet::new(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_description_replaces_control_characters() {
        assert_eq!(clean_description("With\nNew line"), "With New line");
        assert_eq!(clean_description("With\u{c}Form feed"), "With Form feed");
        assert_eq!(clean_description("With\tTab"), "With Tab");
        assert_eq!(clean_description("With\u{7}Bell"), "With Bell");
        assert_eq!(clean_description("Line\r\nBreak"), "Line  Break");
    }

    #[test]
    fn test_clean_description_preserves_everything_else() {
        let text = "Pokémon «Mew» — 151, ünïcödé & symbols!";
        assert_eq!(clean_description(text), text);
    }

    #[test]
    fn test_clean_description_same_length_in_chars() {
        let text = "a\nb\tc\u{c}d\u{7}e";
        let cleaned = clean_description(text);
        assert_eq!(cleaned.chars().count(), text.chars().count());
        assert!(!cleaned.chars().any(char::is_control));
        assert_eq!(cleaned, "a b c d e");
    }

    #[test]
    fn test_normalize_species_name() {
        assert_eq!(normalize_species_name("  Mew "), Some("mew".to_string()));
        assert_eq!(normalize_species_name("PIKACHU"), Some("pikachu".to_string()));
        assert_eq!(normalize_species_name("151"), Some("151".to_string()));
        assert_eq!(normalize_species_name("   "), None);
        assert_eq!(normalize_species_name(""), None);
    }

    #[test]
    fn test_description_set_accessors() {
        let set = DescriptionSet::from(vec!["Dummy1".to_string(), "Dummy2".to_string()]);
        assert_eq!(set.len(), 2);
        assert!(!set.is_empty());
        assert_eq!(set.first(), Some("Dummy1"));
        assert_eq!(set.get(1), Some("Dummy2"));
        assert_eq!(set.get(2), None);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["Dummy1", "Dummy2"]);
        assert!(DescriptionSet::default().is_empty());
    }

    #[test]
    fn test_species_record_decoding() {
        let json = r#"{
            "flavor_text_entries": [
                {"flavor_text": "English1", "language": {"name": "en"}, "version": {"name": "red"}},
                {"flavor_text": "Italian1", "language": {"name": "it"}, "version": {"name": "red"}}
            ],
            "name": "mew"
        }"#;
        let record: SpeciesRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.flavor_text_entries.len(), 2);
        assert_eq!(record.flavor_text_entries[1].language.name, "it");

        let empty: SpeciesRecord = serde_json::from_str("{}").unwrap();
        assert!(empty.flavor_text_entries.is_empty());
    }
}
