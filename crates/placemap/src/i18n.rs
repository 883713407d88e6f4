//! User-facing strings.
//!
//! Every message shown to a visitor (validation failures, empty states,
//! generic technical errors) is addressed by a key and resolved through a
//! [`Translator`]. Lookups fall back to English, then to the key itself.

use ahash::AHashMap as HashMap;
use tracing::debug;

pub const FALLBACK_LOCALE: &str = "en";

/// Message keys used by the engine.
pub mod keys {
    pub const MODE_INVALID: &str = "filters.error.mode";
    pub const LATITUDE_INVALID: &str = "filters.error.latitude";
    pub const LONGITUDE_INVALID: &str = "filters.error.longitude";
    pub const COORDINATES_PAIR: &str = "filters.error.coordinates_pair";
    pub const RADIUS_INVALID: &str = "filters.error.radius";
    pub const TAG_SLUG_INVALID: &str = "filters.error.tag_slug";
    pub const TAG_UNKNOWN: &str = "filters.error.tag_unknown";
    pub const LIST_MINIMAL_CONDITIONS: &str = "list.empty.minimal_conditions";
    pub const LIST_NO_RESULTS: &str = "list.empty.no_results";
    pub const SEARCH_FAILED: &str = "search.error.generic";
    pub const PREVIEW_NOT_FOUND: &str = "preview.error.not_found";
    pub const PREVIEW_MISSING_TRANSLATION: &str = "preview.error.missing_translation";
}

const EN: [(&str, &str); 12] = [
    (keys::MODE_INVALID, "Unknown search mode \"{mode}\"."),
    (keys::LATITUDE_INVALID, "Latitude must be between -90 and 90 (got {value})."),
    (keys::LONGITUDE_INVALID, "Longitude must be between -180 and 180 (got {value})."),
    (keys::COORDINATES_PAIR, "Latitude and longitude must be provided together."),
    (keys::RADIUS_INVALID, "Radius must be between {min} and {max} meters (got {radius})."),
    (keys::TAG_SLUG_INVALID, "\"{tag}\" is not a valid tag."),
    (keys::TAG_UNKNOWN, "Unknown tag \"{tag}\"."),
    (
        keys::LIST_MINIMAL_CONDITIONS,
        "Enter an address, or choose at least one tag or the featured filter, to start exploring.",
    ),
    (keys::LIST_NO_RESULTS, "No places match these filters."),
    (keys::SEARCH_FAILED, "Something went wrong while loading places. Please try again."),
    (keys::PREVIEW_NOT_FOUND, "This place no longer exists."),
    (keys::PREVIEW_MISSING_TRANSLATION, "This place is not available in your language yet."),
];

const FR: [(&str, &str); 12] = [
    (keys::MODE_INVALID, "Mode de recherche inconnu « {mode} »."),
    (keys::LATITUDE_INVALID, "La latitude doit être comprise entre -90 et 90 (reçu {value})."),
    (keys::LONGITUDE_INVALID, "La longitude doit être comprise entre -180 et 180 (reçu {value})."),
    (keys::COORDINATES_PAIR, "La latitude et la longitude doivent être fournies ensemble."),
    (keys::RADIUS_INVALID, "Le rayon doit être compris entre {min} et {max} mètres (reçu {radius})."),
    (keys::TAG_SLUG_INVALID, "« {tag} » n'est pas une étiquette valide."),
    (keys::TAG_UNKNOWN, "Étiquette inconnue « {tag} »."),
    (
        keys::LIST_MINIMAL_CONDITIONS,
        "Saisissez une adresse, ou choisissez au moins une étiquette ou le filtre « à la une », pour commencer.",
    ),
    (keys::LIST_NO_RESULTS, "Aucun lieu ne correspond à ces filtres."),
    (keys::SEARCH_FAILED, "Une erreur est survenue lors du chargement des lieux. Veuillez réessayer."),
    (keys::PREVIEW_NOT_FOUND, "Ce lieu n'existe plus."),
    (keys::PREVIEW_MISSING_TRANSLATION, "Ce lieu n'est pas encore disponible dans votre langue."),
];

/// Resolves message keys to localized text.
pub trait Translator: Send + Sync {
    /// Returns the template for `key` in `locale`, if known.
    fn template(&self, locale: &str, key: &str) -> Option<&str>;

    /// Renders `key` in `locale`, substituting `{name}` placeholders.
    fn translate(&self, locale: &str, key: &str, params: &[(&str, String)]) -> String {
        let template = self
            .template(locale, key)
            .or_else(|| self.template(FALLBACK_LOCALE, key));
        let Some(template) = template else {
            debug!(key, locale, "No translation for message key");
            return key.to_string();
        };
        params
            .iter()
            .fold(template.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}

/// In-memory message tables, one per locale.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    tables: HashMap<String, HashMap<String, String>>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        let mut catalog = Self {
            tables: HashMap::new(),
        };
        catalog.insert_all("en", EN);
        catalog.insert_all("fr", FR);
        catalog
    }
}

impl MessageCatalog {
    /// Catalog with the built-in English and French tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with no messages; every lookup falls back to the key.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    fn insert_all<const N: usize>(&mut self, locale: &str, entries: [(&str, &str); N]) {
        let table = self.tables.entry(locale.to_string()).or_default();
        for (key, text) in entries {
            table.insert(key.to_string(), text.to_string());
        }
    }

    /// Adds or overrides messages for `locale` from a flat JSON object
    /// (`{"key": "text", ...}`).
    pub fn extend_from_json(&mut self, locale: &str, json: &str) -> Result<usize, serde_json::Error> {
        let entries: std::collections::HashMap<String, String> = serde_json::from_str(json)?;
        let count = entries.len();
        self.tables
            .entry(locale.to_string())
            .or_default()
            .extend(entries);
        Ok(count)
    }

    #[must_use]
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }
}

impl Translator for MessageCatalog {
    fn template(&self, locale: &str, key: &str) -> Option<&str> {
        self.tables
            .get(locale)
            .and_then(|table| table.get(key))
            .map(String::as_str)
    }
}
