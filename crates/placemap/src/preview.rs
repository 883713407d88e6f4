//! Detail preview for a clicked marker.

use serde::Serialize;
use tracing::{info, warn};

use crate::{
    i18n::{Translator, keys},
    search::{PlaceSource, SearchError},
};

pub use error::PreviewError;

/// Localized content shown when a marker is clicked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacePreview {
    pub id: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub main_photo: Option<String>,
    pub tags: Vec<String>,
    pub featured: bool,
}

/// Fetches the preview of place `id` in `locale`.
///
/// Failures are logged with the id and error kind before being returned.
pub fn preview(source: &dyn PlaceSource, id: u32, locale: &str) -> Result<PlacePreview, PreviewError> {
    let result = load(source, id, locale);
    match &result {
        Ok(_) => info!(id, locale, "Preview loaded"),
        Err(e) => warn!(id, locale, kind = e.kind(), error = %e, "Preview unavailable"),
    }
    result
}

fn load(source: &dyn PlaceSource, id: u32, locale: &str) -> Result<PlacePreview, PreviewError> {
    let record = source.place(id)?.ok_or(PreviewError::NotFound { id })?;
    let translation =
        source
            .translation(id, locale)
            .ok_or_else(|| PreviewError::MissingTranslation {
                id,
                locale: locale.to_string(),
            })?;

    Ok(PlacePreview {
        id,
        latitude: record.latitude,
        longitude: record.longitude,
        title: translation.title,
        description: translation.description,
        address: record.address,
        main_photo: record.main_photo,
        tags: record.tags,
        featured: record.featured,
    })
}

impl PreviewError {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::MissingTranslation { .. } => "missing_translation",
            Self::Search(_) => "search",
        }
    }

    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => keys::PREVIEW_NOT_FOUND,
            Self::MissingTranslation { .. } => keys::PREVIEW_MISSING_TRANSLATION,
            Self::Search(_) => keys::SEARCH_FAILED,
        }
    }

    pub fn localize(&self, translator: &dyn Translator, locale: &str) -> String {
        translator.translate(locale, self.message_key(), &[])
    }
}

mod error {
    use thiserror::Error;

    use super::SearchError;

    #[derive(Error, Debug)]
    pub enum PreviewError {
        #[error("Place {id} does not exist")]
        NotFound { id: u32 },
        #[error("Place {id} has no '{locale}' translation")]
        MissingTranslation { id: u32, locale: String },
        #[error(transparent)]
        Search(#[from] SearchError),
    }
}
