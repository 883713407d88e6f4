//! Geospatial search over the place catalog.
//!
//! Two query shapes share one set of filter semantics:
//!
//! - [`GeospatialSearch::for_map`] returns every matching coordinate, scoped to
//!   an optional bounding box and never paginated;
//! - [`GeospatialSearch::for_list`] returns one cursor page of
//!   [`PlaceSummary`] rows, always scoped to a bounding box.
//!
//! Whether a box is supplied to `for_map` is decided once per session
//! ([`BoundsStrategy`](crate::BoundsStrategy)); the search itself only sees an
//! `Option`.

use std::{fmt, sync::Arc};

use itertools::{Itertools, izip};
use placemap_data::{
    PlaceCatalog, PlaceRecord, PlaceTranslation,
    columns::{DISTANCE, FEATURED, ID, LATITUDE, LONGITUDE},
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

pub use cursor::{CursorPager, CursorPosition, Decoded};
pub use error::{Result, SearchError};

use crate::{
    filters::{FilterState, Mode},
    geo::BoundingBox,
};

mod cursor;
mod query;

/// Largest page a list query will return.
pub const MAX_PAGE_SIZE: usize = 200;

/// Read-only access to the places being explored.
pub trait PlaceSource: Send + Sync {
    /// All places, with the `tag_key` column.
    fn places(&self) -> Result<LazyFrame>;

    fn place(&self, id: u32) -> Result<Option<PlaceRecord>>;

    fn translation(&self, id: u32, locale: &str) -> Option<PlaceTranslation>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every tag slug that appears on at least one place.
    fn known_tags(&self) -> Vec<String>;
}

impl PlaceSource for PlaceCatalog {
    fn places(&self) -> Result<LazyFrame> {
        Ok(self.lazy())
    }

    fn place(&self, id: u32) -> Result<Option<PlaceRecord>> {
        Ok(Self::place(self, id)?)
    }

    fn translation(&self, id: u32, locale: &str) -> Option<PlaceTranslation> {
        Self::translation(self, id, locale).cloned()
    }

    fn len(&self) -> usize {
        Self::len(self)
    }

    fn known_tags(&self) -> Vec<String> {
        self.stats().known_tags().map(ToString::to_string).collect()
    }
}

/// Minimal marker data for the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapCoordinate {
    pub id: u32,
    pub lat: f64,
    pub lng: f64,
    pub featured: bool,
}

/// Result of a coordinate query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapCoordinates {
    pub coordinates: Vec<MapCoordinate>,
    pub count: usize,
    /// `false` when the query ran without a bounding box.
    pub scoped: bool,
}

/// One row of a list page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceSummary {
    pub id: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub main_photo: Option<String>,
    pub tags: Vec<String>,
    /// Meters from the search point; proximity mode only.
    pub distance: Option<f64>,
    pub featured: bool,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PlaceSummary {
    fn from_record(record: PlaceRecord, distance: Option<f64>, translation: Option<PlaceTranslation>) -> Self {
        let (title, description) = translation
            .map(|t| (Some(t.title), t.description))
            .unwrap_or_default();
        Self {
            id: record.id,
            latitude: record.latitude,
            longitude: record.longitude,
            address: record.address,
            main_photo: record.main_photo,
            tags: record.tags,
            distance,
            featured: record.featured,
            title,
            description,
        }
    }
}

/// One page of list results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlacePage {
    pub places: Vec<PlaceSummary>,
    pub next_cursor: Option<String>,
    pub has_more_pages: bool,
}

/// Runs both query shapes against a [`PlaceSource`].
#[derive(Clone)]
pub struct GeospatialSearch {
    source: Arc<dyn PlaceSource>,
    locale: String,
}

impl fmt::Debug for GeospatialSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeospatialSearch")
            .field("places", &self.source.len())
            .field("locale", &self.locale)
            .finish()
    }
}

impl GeospatialSearch {
    pub fn new(source: Arc<dyn PlaceSource>, locale: impl Into<String>) -> Self {
        Self {
            source,
            locale: locale.into(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &Arc<dyn PlaceSource> {
        &self.source
    }

    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Every place matching `filters`, optionally limited to `bounds`.
    #[instrument(name = "Map query", level = "info", skip_all, fields(mode = %filters.mode(), scoped = bounds.is_some()))]
    pub fn for_map(
        &self,
        filters: &FilterState,
        bounds: Option<&BoundingBox>,
    ) -> Result<MapCoordinates> {
        let t_start = std::time::Instant::now();
        let bounds = bounds.map(|b| b.validated()).transpose()?;

        let Some(lf) = query::scope(self.source.places()?, filters, bounds.as_ref()) else {
            debug!("Minimal search conditions not met; no coordinates");
            return Ok(MapCoordinates {
                scoped: bounds.is_some(),
                ..MapCoordinates::default()
            });
        };

        let df = lf
            .select([col(ID), col(LATITUDE), col(LONGITUDE), col(FEATURED)])
            .collect()?;
        let cols = df.take_columns();
        let coordinates = izip!(cols[0].u32()?, cols[1].f64()?, cols[2].f64()?, cols[3].bool()?)
            .filter_map(|(id, lat, lng, featured)| {
                Some(MapCoordinate {
                    id: id?,
                    lat: lat?,
                    lng: lng?,
                    featured: featured.unwrap_or(false),
                })
            })
            .collect_vec();

        info!(elapsed = ?t_start.elapsed(), count = coordinates.len(), "Map query finished");
        Ok(MapCoordinates {
            count: coordinates.len(),
            coordinates,
            scoped: bounds.is_some(),
        })
    }

    /// One page of places matching `filters` inside `bounds`.
    ///
    /// `cursor` continues a previous page issued for the same filters and
    /// box. Stale or malformed cursors restart at the first page.
    #[instrument(name = "List query", level = "info", skip_all, fields(mode = %filters.mode(), page_size = page_size, continued = cursor.is_some()))]
    pub fn for_list(
        &self,
        filters: &FilterState,
        bounds: &BoundingBox,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<PlacePage> {
        let t_start = std::time::Instant::now();
        let bounds = bounds.validated()?;
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);

        let Some(mut lf) = query::scope(self.source.places()?, filters, Some(&bounds)) else {
            debug!("Minimal search conditions not met; empty page");
            return Ok(PlacePage::default());
        };

        let pager = CursorPager::new(filters, &bounds);
        if let Some(token) = cursor {
            match pager.decode(token) {
                Decoded::Valid(position) => {
                    lf = lf.filter(query::after_cursor(filters.mode(), position));
                }
                Decoded::Stale => debug!("Cursor issued for another request; restarting at page 1"),
                Decoded::Malformed => debug!("Malformed cursor; restarting at page 1"),
            }
        }

        let df = lf.limit((page_size + 1) as IdxSize).collect()?;
        let distances: Vec<Option<f64>> = match filters.mode() {
            Mode::Proximity => df.column(DISTANCE)?.f64()?.into_iter().collect(),
            Mode::Worldwide => vec![None; df.height()],
        };

        let mut places = PlaceRecord::from_df(&df)?
            .into_iter()
            .zip(distances)
            .map(|(record, distance)| {
                let translation = self.source.translation(record.id, &self.locale);
                PlaceSummary::from_record(record, distance, translation)
            })
            .collect_vec();

        let has_more_pages = places.len() > page_size;
        places.truncate(page_size);
        let next_cursor = if has_more_pages {
            places.last().map(|last| pager.encode(last))
        } else {
            None
        };

        info!(
            elapsed = ?t_start.elapsed(),
            rows = places.len(),
            has_more_pages,
            "List query finished"
        );
        Ok(PlacePage {
            places,
            next_cursor,
            has_more_pages,
        })
    }
}

/// Logs a technical query failure with its full context.
pub fn log_search_failure(err: &SearchError, filters: &FilterState, bounds: Option<&BoundingBox>) {
    let chain = std::iter::successors(
        Some(err as &(dyn std::error::Error + 'static)),
        |e| e.source(),
    )
    .map(ToString::to_string)
    .join(" <- ");
    error!(
        error = %err,
        kind = err.kind(),
        chain,
        filters = ?filters,
        bounds = ?bounds,
        "Place search failed"
    );
}

mod error {
    use placemap_data::DataError;
    use polars::prelude::PolarsError;
    use thiserror::Error;

    use crate::geo::BoundsError;

    #[derive(Error, Debug)]
    pub enum SearchError {
        #[error("Query error: {0}")]
        Polars(#[from] PolarsError),
        #[error("Catalog error: {0}")]
        Data(#[from] DataError),
        #[error("Invalid bounding box: {0}")]
        Bounds(#[from] BoundsError),
        #[error("Place source unavailable: {0}")]
        Unavailable(String),
    }

    impl SearchError {
        /// Stable variant name for logs.
        #[must_use]
        pub const fn kind(&self) -> &'static str {
            match self {
                Self::Polars(_) => "polars",
                Self::Data(_) => "data",
                Self::Bounds(_) => "bounds",
                Self::Unavailable(_) => "unavailable",
            }
        }
    }

    pub type Result<T> = std::result::Result<T, SearchError>;
}
