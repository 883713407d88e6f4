use std::{fmt, sync::Arc};

use ahash::AHashSet as HashSet;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::{FilterState, Mode, RawFilters};
use crate::{
    geo::{LatLng, wrap_longitude},
    i18n::{Translator, keys},
};

static TAG_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("tag slug pattern is valid"));

/// How invalid input is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Clamp or default every bad field; never fails. For input that did not
    /// come straight from a visitor's action (URLs, re-checks of events).
    CorrectSilently,
    /// Reject the first bad field. For input a visitor just entered.
    Throw,
}

/// Radius bounds in meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiusLimits {
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl Default for RadiusLimits {
    fn default() -> Self {
        Self {
            min: 1_000,
            max: 500_000,
            default: 50_000,
        }
    }
}

/// Which tag slugs are accepted.
#[derive(Debug, Clone, Default)]
pub enum TagPolicy {
    /// Any well-formed slug.
    #[default]
    AnyWellFormed,
    /// Only slugs present in the catalog.
    Known(Arc<HashSet<String>>),
}

/// A typed validation failure; `message_key` addresses its localized text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown search mode '{0}'")]
    UnknownMode(String),
    #[error("Latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("Longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),
    #[error("Latitude and longitude must be provided together")]
    HalfCoordinatePair,
    #[error("Radius {radius} is outside [{min}, {max}]")]
    RadiusOutOfRange { radius: i64, min: u32, max: u32 },
    #[error("'{0}' is not a valid tag slug")]
    InvalidTagSlug(String),
    #[error("Unknown tag '{0}'")]
    UnknownTag(String),
}

impl ValidationError {
    #[must_use]
    pub const fn message_key(&self) -> &'static str {
        match self {
            Self::UnknownMode(_) => keys::MODE_INVALID,
            Self::InvalidLatitude(_) => keys::LATITUDE_INVALID,
            Self::InvalidLongitude(_) => keys::LONGITUDE_INVALID,
            Self::HalfCoordinatePair => keys::COORDINATES_PAIR,
            Self::RadiusOutOfRange { .. } => keys::RADIUS_INVALID,
            Self::InvalidTagSlug(_) => keys::TAG_SLUG_INVALID,
            Self::UnknownTag(_) => keys::TAG_UNKNOWN,
        }
    }

    /// User-facing message in `locale`.
    pub fn localize(&self, translator: &dyn Translator, locale: &str) -> String {
        let params = match self {
            Self::UnknownMode(mode) => vec![("mode", mode.clone())],
            Self::InvalidLatitude(value) | Self::InvalidLongitude(value) => {
                vec![("value", value.to_string())]
            }
            Self::HalfCoordinatePair => vec![],
            Self::RadiusOutOfRange { radius, min, max } => vec![
                ("radius", radius.to_string()),
                ("min", min.to_string()),
                ("max", max.to_string()),
            ],
            Self::InvalidTagSlug(tag) | Self::UnknownTag(tag) => vec![("tag", tag.clone())],
        };
        translator.translate(locale, self.message_key(), &params)
    }
}

/// A change applied under [`Strategy::CorrectSilently`].
#[derive(Debug, Clone, PartialEq)]
pub enum Correction {
    ModeDefaulted { given: String },
    CoordinatesDiscarded { reason: ValidationError },
    LatitudeClamped { from: f64, to: f64 },
    LongitudeWrapped { from: f64, to: f64 },
    RadiusClamped { from: i64, to: u32 },
    TagDropped { reason: ValidationError },
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModeDefaulted { given } => write!(f, "mode '{given}' replaced by default"),
            Self::CoordinatesDiscarded { reason } => write!(f, "coordinates discarded: {reason}"),
            Self::LatitudeClamped { from, to } => write!(f, "latitude {from} clamped to {to}"),
            Self::LongitudeWrapped { from, to } => write!(f, "longitude {from} wrapped to {to}"),
            Self::RadiusClamped { from, to } => write!(f, "radius {from} clamped to {to}"),
            Self::TagDropped { reason } => write!(f, "tag dropped: {reason}"),
        }
    }
}

/// Output of [`FilterValidator::correct`].
#[derive(Debug, Clone, PartialEq)]
pub struct Corrected {
    pub filters: FilterState,
    pub corrections: Vec<Correction>,
}

/// Result of checking one field: either valid, or a failure together with
/// the value to use when correcting silently.
enum Checked<T> {
    Valid(T),
    Invalid {
        error: ValidationError,
        fallback: T,
        corrections: Vec<Correction>,
    },
}

impl<T> Checked<T> {
    fn resolve(
        self,
        strategy: Strategy,
        applied: &mut Vec<Correction>,
    ) -> Result<T, ValidationError> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid { error, .. } if strategy == Strategy::Throw => Err(error),
            Self::Invalid {
                fallback,
                corrections,
                ..
            } => {
                applied.extend(corrections);
                Ok(fallback)
            }
        }
    }
}

/// Normalizes and validates raw filter input.
///
/// Pure: no I/O, no interior state, safe to call at every hop.
#[derive(Debug, Clone, Default)]
pub struct FilterValidator {
    limits: RadiusLimits,
    tags: TagPolicy,
}

impl FilterValidator {
    #[must_use]
    pub fn new(limits: RadiusLimits) -> Self {
        Self {
            limits,
            tags: TagPolicy::AnyWellFormed,
        }
    }

    /// Restricts accepted tags to `known`.
    #[must_use]
    pub fn with_known_tags<I, S>(mut self, known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = TagPolicy::Known(Arc::new(known.into_iter().map(Into::into).collect()));
        self
    }

    #[must_use]
    pub const fn limits(&self) -> RadiusLimits {
        self.limits
    }

    /// Validates `raw` under `strategy`.
    ///
    /// With [`Strategy::CorrectSilently`] this always returns `Ok`.
    pub fn validate(
        &self,
        raw: &RawFilters,
        strategy: Strategy,
    ) -> Result<FilterState, ValidationError> {
        self.run(raw, strategy).map(|c| c.filters)
    }

    /// Validates with [`Strategy::CorrectSilently`], reporting what changed.
    pub fn correct(&self, raw: &RawFilters) -> Corrected {
        self.run(raw, Strategy::CorrectSilently)
            .unwrap_or_else(|error| {
                warn!(%error, "Silent correction raised; falling back to default filters");
                Corrected {
                    filters: self.default_filters(),
                    corrections: vec![],
                }
            })
    }

    /// Initial filters from navigational state. Never fails.
    pub fn from_url_params<I, K, V>(&self, params: I) -> FilterState
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.correct(&RawFilters::from_url_params(params)).filters
    }

    #[must_use]
    pub fn default_filters(&self) -> FilterState {
        FilterState::from_parts(Mode::default(), None, self.limits.default, None, vec![], false)
    }

    fn run(&self, raw: &RawFilters, strategy: Strategy) -> Result<Corrected, ValidationError> {
        let mut corrections = Vec::new();

        let mode = Self::check_mode(raw.mode.as_deref()).resolve(strategy, &mut corrections)?;
        let coordinates =
            Self::check_coordinates(raw.latitude, raw.longitude).resolve(strategy, &mut corrections)?;
        let radius = self.check_radius(raw.radius).resolve(strategy, &mut corrections)?;
        let tags = self.check_tags(&raw.tags).resolve(strategy, &mut corrections)?;
        let address = raw
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(ToString::to_string);
        // Featured only scopes worldwide searches.
        let featured = mode == Mode::Worldwide && raw.featured.unwrap_or(false);

        Ok(Corrected {
            filters: FilterState::from_parts(mode, coordinates, radius, address, tags, featured),
            corrections,
        })
    }

    fn check_mode(mode: Option<&str>) -> Checked<Mode> {
        let Some(given) = mode else {
            return Checked::Valid(Mode::default());
        };
        match Mode::parse(given) {
            Some(mode) => Checked::Valid(mode),
            None => Checked::Invalid {
                error: ValidationError::UnknownMode(given.to_string()),
                fallback: Mode::default(),
                corrections: vec![Correction::ModeDefaulted {
                    given: given.to_string(),
                }],
            },
        }
    }

    fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Checked<Option<LatLng>> {
        let discard = |error: ValidationError| Checked::Invalid {
            error: error.clone(),
            fallback: None,
            corrections: vec![Correction::CoordinatesDiscarded { reason: error }],
        };

        let (lat, lng) = match (latitude, longitude) {
            (None, None) => return Checked::Valid(None),
            (Some(lat), Some(lng)) => (lat, lng),
            _ => return discard(ValidationError::HalfCoordinatePair),
        };
        if !lat.is_finite() {
            return discard(ValidationError::InvalidLatitude(lat));
        }
        if !lng.is_finite() {
            return discard(ValidationError::InvalidLongitude(lng));
        }

        let lat_ok = (-90.0..=90.0).contains(&lat);
        let lng_ok = (-180.0..=180.0).contains(&lng);
        if lat_ok && lng_ok {
            return Checked::Valid(Some(LatLng::new(lat, lng)));
        }

        let clamped_lat = lat.clamp(-90.0, 90.0);
        let wrapped_lng = wrap_longitude(lng);
        let mut corrections = Vec::new();
        if !lat_ok {
            corrections.push(Correction::LatitudeClamped {
                from: lat,
                to: clamped_lat,
            });
        }
        if !lng_ok {
            corrections.push(Correction::LongitudeWrapped {
                from: lng,
                to: wrapped_lng,
            });
        }
        Checked::Invalid {
            error: if lat_ok {
                ValidationError::InvalidLongitude(lng)
            } else {
                ValidationError::InvalidLatitude(lat)
            },
            fallback: Some(LatLng::new(clamped_lat, wrapped_lng)),
            corrections,
        }
    }

    fn check_radius(&self, radius: Option<i64>) -> Checked<u32> {
        let RadiusLimits { min, max, default } = self.limits;
        let Some(radius) = radius else {
            return Checked::Valid(default);
        };
        if (i64::from(min)..=i64::from(max)).contains(&radius) {
            return Checked::Valid(radius as u32);
        }
        let to = if radius < i64::from(min) { min } else { max };
        Checked::Invalid {
            error: ValidationError::RadiusOutOfRange { radius, min, max },
            fallback: to,
            corrections: vec![Correction::RadiusClamped { from: radius, to }],
        }
    }

    fn check_tags(&self, tags: &[String]) -> Checked<Vec<String>> {
        let mut kept = Vec::with_capacity(tags.len());
        let mut dropped = Vec::new();

        for slug in tags.iter().map(|t| t.trim().to_lowercase()).unique() {
            if !TAG_SLUG.is_match(&slug) {
                dropped.push(ValidationError::InvalidTagSlug(slug));
            } else if let TagPolicy::Known(known) = &self.tags
                && !known.contains(&slug)
            {
                dropped.push(ValidationError::UnknownTag(slug));
            } else {
                kept.push(slug);
            }
        }

        match dropped.first() {
            None => Checked::Valid(kept),
            Some(first) => Checked::Invalid {
                error: first.clone(),
                fallback: kept,
                corrections: dropped
                    .into_iter()
                    .map(|reason| Correction::TagDropped { reason })
                    .collect(),
            },
        }
    }
}
