//! Filter model shared by every exploration component.
//!
//! Components exchange [`RawFilters`] (the structurally typed component
//! data carried by events and URLs) and only ever act on a [`FilterState`],
//! which can only be obtained from a [`FilterValidator`].

use std::{collections::BTreeSet, fmt};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geo::{LatLng, round_micro};

mod validator;

pub use validator::{
    Corrected, Correction, FilterValidator, RadiusLimits, Strategy, TagPolicy, ValidationError,
};

/// Short URL keys used for shareable links.
pub mod url_keys {
    pub const MODE: &str = "mode";
    pub const LATITUDE: &str = "lat";
    pub const LONGITUDE: &str = "lng";
    pub const RADIUS: &str = "radius";
    pub const ADDRESS: &str = "address";
    pub const TAGS: &str = "tags";
    pub const FEATURED: &str = "featured";
}

/// How places are scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Within a radius around a point.
    #[default]
    Proximity,
    /// By tag / featured membership, anywhere.
    Worldwide,
}

impl Mode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Proximity => "proximity",
            Self::Worldwide => "worldwide",
        }
    }

    /// Parses a mode name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "proximity" => Some(Self::Proximity),
            "worldwide" => Some(Self::Worldwide),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated filter input, as carried by events, URLs and form controls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFilters {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub radius: Option<i64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub featured: Option<bool>,
}

impl RawFilters {
    #[must_use]
    pub fn proximity(latitude: f64, longitude: f64, radius: i64) -> Self {
        Self {
            mode: Some(Mode::Proximity.as_str().to_string()),
            latitude: Some(latitude),
            longitude: Some(longitude),
            radius: Some(radius),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn worldwide<I, S>(tags: I, featured: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mode: Some(Mode::Worldwide.as_str().to_string()),
            tags: tags.into_iter().map(Into::into).collect(),
            featured: Some(featured),
            ..Self::default()
        }
    }

    /// Parses navigational state (short URL keys).
    ///
    /// Parsing never fails: unparsable numbers are treated as absent and
    /// unknown keys are ignored. The result still has to go through
    /// [`FilterValidator`].
    pub fn from_url_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = Self::default();
        for (key, value) in params {
            let value = value.as_ref().trim();
            match key.as_ref() {
                url_keys::MODE => raw.mode = Some(value.to_string()),
                url_keys::LATITUDE => raw.latitude = parse_float(url_keys::LATITUDE, value),
                url_keys::LONGITUDE => raw.longitude = parse_float(url_keys::LONGITUDE, value),
                url_keys::RADIUS => {
                    raw.radius = value.parse::<i64>().ok().or_else(|| {
                        parse_float(url_keys::RADIUS, value)
                            .filter(|r| r.is_finite())
                            .map(|r| r.round() as i64)
                    });
                }
                url_keys::ADDRESS => {
                    raw.address = Some(value.to_string()).filter(|a| !a.is_empty());
                }
                url_keys::TAGS => {
                    raw.tags = value
                        .split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(ToString::to_string)
                        .collect();
                }
                url_keys::FEATURED => {
                    raw.featured = match value.to_ascii_lowercase().as_str() {
                        "1" | "true" | "yes" | "on" => Some(true),
                        "0" | "false" | "no" | "off" | "" => Some(false),
                        _ => None,
                    };
                }
                other => debug!(key = other, "Ignoring unknown filter parameter"),
            }
        }
        raw
    }
}

fn parse_float(key: &str, value: &str) -> Option<f64> {
    match value.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!(key, value, "Unparsable numeric filter parameter");
            None
        }
    }
}

/// A validated search request.
///
/// Only [`FilterValidator`] constructs this type; fields are read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    mode: Mode,
    coordinates: Option<LatLng>,
    radius: u32,
    address: Option<String>,
    tags: Vec<String>,
    featured: bool,
}

impl FilterState {
    pub(crate) const fn from_parts(
        mode: Mode,
        coordinates: Option<LatLng>,
        radius: u32,
        address: Option<String>,
        tags: Vec<String>,
        featured: bool,
    ) -> Self {
        Self {
            mode,
            coordinates,
            radius,
            address,
            tags,
            featured,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub const fn coordinates(&self) -> Option<LatLng> {
        self.coordinates
    }

    #[must_use]
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.lat)
    }

    #[must_use]
    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.lng)
    }

    /// Radius in meters.
    #[must_use]
    pub const fn radius(&self) -> u32 {
        self.radius
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Tag slugs in display order.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub const fn featured(&self) -> bool {
        self.featured
    }

    /// Tags as an order-insensitive set.
    #[must_use]
    pub fn tag_set(&self) -> BTreeSet<&str> {
        self.tags.iter().map(String::as_str).collect()
    }

    /// Whether a query can meaningfully run: proximity needs a point,
    /// worldwide needs at least one tag or the featured flag.
    #[must_use]
    pub fn minimal_conditions_met(&self) -> bool {
        match self.mode {
            Mode::Proximity => self.coordinates.is_some(),
            Mode::Worldwide => !self.tags.is_empty() || self.featured,
        }
    }

    /// Canonical bytes of the fields that affect which places match and in
    /// which order. `address` is display-only and left out.
    #[must_use]
    pub fn query_key(&self) -> String {
        let coordinates = self
            .coordinates
            .map(|c| format!("{},{}", round_micro(c.lat), round_micro(c.lng)))
            .unwrap_or_default();
        format!(
            "{}|{}|{}|{}|{}",
            self.mode,
            coordinates,
            self.radius,
            self.tag_set().iter().join(","),
            self.featured
        )
    }

    /// Component data for events.
    #[must_use]
    pub fn to_component_data(&self) -> RawFilters {
        RawFilters {
            mode: Some(self.mode.as_str().to_string()),
            latitude: self.latitude(),
            longitude: self.longitude(),
            radius: Some(i64::from(self.radius)),
            address: self.address.clone(),
            tags: self.tags.clone(),
            featured: Some(self.featured),
        }
    }

    /// Short-key navigational state; tags are flattened to CSV.
    #[must_use]
    pub fn to_url_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![(url_keys::MODE, self.mode.as_str().to_string())];
        if let Some(c) = self.coordinates {
            params.push((url_keys::LATITUDE, c.lat.to_string()));
            params.push((url_keys::LONGITUDE, c.lng.to_string()));
        }
        params.push((url_keys::RADIUS, self.radius.to_string()));
        if let Some(address) = &self.address {
            params.push((url_keys::ADDRESS, address.clone()));
        }
        if !self.tags.is_empty() {
            params.push((url_keys::TAGS, self.tags.join(",")));
        }
        if self.featured {
            params.push((url_keys::FEATURED, "1".to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn validator() -> FilterValidator {
        FilterValidator::new(RadiusLimits::default())
    }

    #[test]
    fn test_url_params_round_trip_is_lossless() {
        let raw = RawFilters {
            mode: Some("proximity".into()),
            latitude: Some(48.856_613),
            longitude: Some(2.352_222),
            radius: Some(25_000),
            address: Some("Paris, France".into()),
            tags: vec!["museum".into(), "esa".into()],
            featured: Some(false),
        };
        let state = validator().validate(&raw, Strategy::Throw).unwrap();

        let params = state.to_url_params();
        let parsed = RawFilters::from_url_params(params.iter().map(|(k, v)| (*k, v.as_str())));
        let back = validator().correct(&parsed).filters;
        assert_eq!(back, state);
    }

    #[test]
    fn test_worldwide_round_trip_keeps_featured_and_tag_order() {
        let raw = RawFilters::worldwide(["nasa", "launch-site"], true);
        let state = validator().validate(&raw, Strategy::Throw).unwrap();
        let params = state.to_url_params();
        assert!(params.contains(&(url_keys::TAGS, "nasa,launch-site".to_string())));
        assert!(params.contains(&(url_keys::FEATURED, "1".to_string())));

        let parsed = RawFilters::from_url_params(params.iter().map(|(k, v)| (*k, v.as_str())));
        assert_eq!(validator().correct(&parsed).filters, state);
    }

    #[test]
    fn test_component_data_round_trip() {
        let state = validator()
            .validate(&RawFilters::proximity(1.5, -3.25, 10_000), Strategy::Throw)
            .unwrap();
        let again = validator()
            .validate(&state.to_component_data(), Strategy::Throw)
            .unwrap();
        assert_eq!(again, state);
    }

    #[test]
    fn test_from_url_params_is_lenient() {
        let raw = RawFilters::from_url_params([
            ("mode", "Worldwide"),
            ("lat", "not-a-number"),
            ("radius", "1500.6"),
            ("tags", " nasa, ,esa "),
            ("featured", "maybe"),
            ("utm_source", "newsletter"),
        ]);
        assert_eq!(raw.mode.as_deref(), Some("Worldwide"));
        assert_eq!(raw.latitude, None);
        assert_eq!(raw.radius, Some(1501));
        assert_eq!(raw.tags, vec!["nasa", "esa"]);
        assert_eq!(raw.featured, None);
    }

    #[test]
    fn test_minimal_conditions() {
        let v = validator();
        let no_point = v.correct(&RawFilters::default()).filters;
        assert!(!no_point.minimal_conditions_met());

        let point = v.correct(&RawFilters::proximity(0.0, 0.0, 5_000)).filters;
        assert!(point.minimal_conditions_met());

        let bare_world = v
            .correct(&RawFilters::worldwide(Vec::<String>::new(), false))
            .filters;
        assert!(!bare_world.minimal_conditions_met());

        let featured_world = v
            .correct(&RawFilters::worldwide(Vec::<String>::new(), true))
            .filters;
        assert!(featured_world.minimal_conditions_met());
    }

    #[test]
    fn test_query_key_ignores_address_and_tag_order() {
        let v = validator();
        let mut a = RawFilters::proximity(10.0, 20.0, 5_000);
        a.tags = vec!["esa".into(), "nasa".into()];
        a.address = Some("A".into());
        let mut b = a.clone();
        b.tags = vec!["nasa".into(), "esa".into()];
        b.address = Some("B".into());

        assert_eq!(
            v.correct(&a).filters.query_key(),
            v.correct(&b).filters.query_key()
        );
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(Mode::parse(" PROXIMITY "), Some(Mode::Proximity));
        assert_eq!(Mode::parse("worldwide"), Some(Mode::Worldwide));
        assert_eq!(Mode::parse("galactic"), None);
    }
}
