//! Placemap - Geospatial Exploration Engine
//!
//! Placemap powers an exploration page for space-related places: a filter
//! form, a map and an infinite-scroll list that stay in agreement while a
//! visitor searches around a point or across the whole world.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use placemap::{ExploreConfigBuilder, ExplorePage, FilterInput, ListDisplay, SimulatedMapLayer};
//! use placemap::data::{TestDataConfig, create_test_catalog};
//!
//! let catalog = create_test_catalog(&TestDataConfig::sample())?;
//! let config = ExploreConfigBuilder::small_catalog().build()?;
//!
//! // Open the page from a shared link.
//! let mut page = ExplorePage::open(
//!     Arc::new(catalog),
//!     config,
//!     SimulatedMapLayer::new(),
//!     [("mode", "worldwide"), ("tags", "nasa")],
//! )?;
//! assert!(matches!(page.list().display(), ListDisplay::Results { .. }));
//!
//! // Switch to a proximity search around Paris.
//! page.user_input(FilterInput::Mode("proximity".into()));
//! page.user_input(FilterInput::Location {
//!     latitude: Some(48.8566),
//!     longitude: Some(2.3522),
//!     address: Some("Paris".into()),
//! });
//! for place in page.list().places() {
//!     println!("{} at {:.0} m", place.id, place.distance.unwrap_or_default());
//! }
//! # Ok::<(), placemap::error::PlacemapError>(())
//! ```
//!
//! # Modes
//!
//! - **Proximity**: places within a radius of a point, nearest first
//! - **Worldwide**: places matching tags or the featured flag, by id
//!
//! Both modes are additionally scoped to the visible map area. List pages
//! are addressed by opaque cursors bound to the filters and area they were
//! issued for.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub mod cluster;
mod config;
pub mod error;
pub mod filters;
pub mod geo;
pub mod i18n;
mod preview;
pub mod search;
pub mod sync;
mod view;

pub use cluster::{Cluster, ClusterId, Highlight, HighlightState, MarkerClusterer, VisibleParent};
pub use config::{BoundsStrategy, ExploreConfig, ExploreConfigBuilder};
pub use filters::{
    FilterState, FilterValidator, Mode, RadiusLimits, RawFilters, Strategy, TagPolicy,
    ValidationError,
};
pub use geo::{BoundingBox, LatLng};
pub use i18n::{MessageCatalog, Translator};
pub use placemap_data as data;
pub use polars;
pub use preview::{PlacePreview, PreviewError, preview};
pub use search::{
    GeospatialSearch, MapCoordinate, MapCoordinates, PlacePage, PlaceSource, PlaceSummary,
    SearchError,
};
pub use sync::{
    Event, EventBus, ExplorePage, FilterInput, ListDisplay, MapLayer, SimulatedMapLayer,
};
pub use view::ViewAction;

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for placemap.
///
/// `RUST_LOG` takes precedence over `level` when set. Polars is capped at
/// `warn`.
///
/// ```rust
/// use placemap::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), placemap::error::PlacemapError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::PlacemapError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("polars=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .init();
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::{TestDataConfig, create_test_catalog};

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        setup_test_env();
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }

    #[test]
    fn test_open_with_defaults() {
        setup_test_env();

        let catalog = create_test_catalog(&TestDataConfig::sample()).unwrap();
        let page = ExplorePage::open(
            Arc::new(catalog),
            ExploreConfig::default(),
            SimulatedMapLayer::new(),
            std::iter::empty::<(&str, &str)>(),
        )
        .unwrap();

        assert_eq!(page.current_filters().mode(), Mode::Proximity);
        assert!(matches!(
            page.list().display(),
            ListDisplay::MinimalConditionsNotMet { .. }
        ));
        assert_eq!(page.history().first(), Some(&"sync-filters-view"));
    }
}
