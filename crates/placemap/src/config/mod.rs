use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::PlacemapError,
    filters::{FilterValidator, RadiusLimits},
    search::MAX_PAGE_SIZE,
};

/// Whether map queries are scoped to the visible viewport.
///
/// Chosen once per session from the catalog size; nothing downstream
/// branches on it except the Map component deciding which box to pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundsStrategy {
    /// Map queries take the viewport box; bounds events trigger re-queries.
    Scoped,
    /// Map queries return every match; bounds events are ignored.
    Unscoped,
}

/// Settings for one exploration session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    pub radius_min: u32,
    pub radius_max: u32,
    pub radius_default: u32,
    /// Rows per list page.
    pub page_size: usize,
    /// Catalog size above which map queries are viewport scoped.
    pub bounding_box_threshold: usize,
    /// Marker count above which markers are clustered.
    pub cluster_threshold: usize,
    /// Clustering grid cell size in screen pixels.
    pub cluster_grid_px: u32,
    pub locale: String,
    /// Append technical detail to generic error messages.
    pub debug: bool,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        let radius = RadiusLimits::default();
        Self {
            radius_min: radius.min,
            radius_max: radius.max,
            radius_default: radius.default,
            page_size: 20,
            bounding_box_threshold: 500,
            cluster_threshold: 50,
            cluster_grid_px: 60,
            locale: "en".to_string(),
            debug: false,
        }
    }
}

impl ExploreConfig {
    /// Parses and validates a JSON config; missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, PlacemapError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PlacemapError::Config(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PlacemapError> {
        if self.radius_min == 0 {
            return Err(PlacemapError::Config("radius_min must be positive".into()));
        }
        if self.radius_min > self.radius_max {
            return Err(PlacemapError::Config(format!(
                "radius_min ({}) exceeds radius_max ({})",
                self.radius_min, self.radius_max
            )));
        }
        if !(self.radius_min..=self.radius_max).contains(&self.radius_default) {
            return Err(PlacemapError::Config(format!(
                "radius_default ({}) is outside [{}, {}]",
                self.radius_default, self.radius_min, self.radius_max
            )));
        }
        if self.cluster_grid_px == 0 {
            return Err(PlacemapError::Config("cluster_grid_px must be positive".into()));
        }
        if self.locale.trim().is_empty() {
            return Err(PlacemapError::Config("locale must not be empty".into()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn radius_limits(&self) -> RadiusLimits {
        RadiusLimits {
            min: self.radius_min,
            max: self.radius_max,
            default: self.radius_default,
        }
    }

    #[must_use]
    pub fn validator(&self) -> FilterValidator {
        FilterValidator::new(self.radius_limits())
    }

    /// Page size within `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Picks the bounds strategy for a catalog of `catalog_size` places.
    #[must_use]
    pub fn bounds_strategy(&self, catalog_size: usize) -> BoundsStrategy {
        let strategy = if catalog_size > self.bounding_box_threshold {
            BoundsStrategy::Scoped
        } else {
            BoundsStrategy::Unscoped
        };
        info!(
            catalog_size,
            threshold = self.bounding_box_threshold,
            ?strategy,
            "Selected bounds strategy"
        );
        strategy
    }
}

/// Builder for [`ExploreConfig`].
#[derive(Debug, Clone, Default)]
pub struct ExploreConfigBuilder {
    config: ExploreConfig,
}

impl ExploreConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A few hundred places: every map query unscoped, no clustering below 100.
    pub fn small_catalog() -> Self {
        let mut builder = Self::new();
        builder.config.bounding_box_threshold = usize::MAX;
        builder.config.cluster_threshold = 100;
        builder
    }

    /// Large catalogs: always viewport scoped, aggressive clustering.
    pub fn large_catalog() -> Self {
        let mut builder = Self::new();
        builder.config.bounding_box_threshold = 0;
        builder.config.cluster_threshold = 30;
        builder.config.page_size = 50;
        builder
    }

    pub fn radius(mut self, min: u32, max: u32, default: u32) -> Self {
        self.config.radius_min = min;
        self.config.radius_max = max;
        self.config.radius_default = default;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn bounding_box_threshold(mut self, threshold: usize) -> Self {
        self.config.bounding_box_threshold = threshold;
        self
    }

    pub fn clustering(mut self, threshold: usize, grid_px: u32) -> Self {
        self.config.cluster_threshold = threshold;
        self.config.cluster_grid_px = grid_px;
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.config.locale = locale.into();
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    pub fn build(self) -> Result<ExploreConfig, PlacemapError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
