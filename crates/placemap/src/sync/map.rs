use std::sync::Arc;

use tracing::{debug, warn};

use super::{Event, Snapshot, failure_message, revalidate};
use crate::{
    config::BoundsStrategy,
    filters::{FilterState, FilterValidator, RawFilters},
    geo::BoundingBox,
    i18n::Translator,
    search::{GeospatialSearch, MapCoordinate, MapCoordinates, Result as SearchResult, log_search_failure},
    view::ViewAction,
};

const COMPONENT: &str = "map";

/// A coordinate query prepared by [`MapComponent`].
#[derive(Debug, Clone)]
pub struct MapQuery {
    snapshot: Snapshot,
    filters: FilterState,
    /// Issued from a `filters-updated`, answered through `sync-filters-view`.
    view_action: Option<ViewAction>,
}

/// Decides camera moves and keeps the map's coordinate set.
pub struct MapComponent {
    search: GeospatialSearch,
    validator: FilterValidator,
    translator: Arc<dyn Translator>,
    locale: String,
    debug: bool,
    strategy: BoundsStrategy,
    filters: FilterState,
    previous: FilterState,
    bounds: Option<BoundingBox>,
    coordinates: Vec<MapCoordinate>,
    error: Option<String>,
    generation: u64,
}

impl MapComponent {
    pub fn new(
        search: GeospatialSearch,
        validator: FilterValidator,
        translator: Arc<dyn Translator>,
        locale: impl Into<String>,
        debug: bool,
        strategy: BoundsStrategy,
        initial: FilterState,
    ) -> Self {
        Self {
            search,
            validator,
            translator,
            locale: locale.into(),
            debug,
            strategy,
            previous: initial.clone(),
            filters: initial,
            bounds: None,
            coordinates: Vec::new(),
            error: None,
            generation: 0,
        }
    }

    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub const fn strategy(&self) -> BoundsStrategy {
        self.strategy
    }

    pub const fn bounds(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    pub fn coordinates(&self) -> &[MapCoordinate] {
        &self.coordinates
    }

    /// Localized message for the last failed coordinate query, cleared by
    /// the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    const fn use_bounding_box(&self) -> bool {
        matches!(self.strategy, BoundsStrategy::Scoped)
    }

    /// Camera instruction for the first render.
    pub fn initial_view(&mut self) -> Vec<Event> {
        let action = ViewAction::initial_for(&self.filters);
        self.previous = self.filters.clone();
        self.emit_view(action)
    }

    pub fn handle(&mut self, event: &Event) -> Vec<Event> {
        match event {
            Event::FiltersUpdated { filters } => self.on_filters_updated(filters),
            Event::InitialMapBounds { bounds } => self.on_bounds(*bounds, None),
            Event::UpdateMapBounds { bounds, filters } => self.on_bounds(*bounds, filters.as_ref()),
            _ => vec![],
        }
    }

    fn on_filters_updated(&mut self, raw: &RawFilters) -> Vec<Event> {
        let next = revalidate(&self.validator, raw, COMPONENT);
        let action = ViewAction::resolve(&self.previous, &next);
        self.previous = next.clone();
        self.filters = next;
        self.generation += 1;
        debug!(action = action.name(), "Resolved view action");
        self.emit_view(action)
    }

    /// With the unscoped strategy the coordinate set rides along with the
    /// camera instruction; otherwise the map layer's next bounds report
    /// triggers the query.
    fn emit_view(&mut self, view_action: ViewAction) -> Vec<Event> {
        if self.use_bounding_box() {
            return vec![Event::SyncFiltersView {
                view_action,
                filters: self.filters.to_component_data(),
                coordinates: None,
                use_bounding_box: true,
            }];
        }
        let query = MapQuery {
            snapshot: self.snapshot(),
            filters: self.filters.clone(),
            view_action: Some(view_action),
        };
        let result = self.execute(&query);
        self.apply(query, result)
    }

    fn on_bounds(&mut self, bounds: BoundingBox, filters: Option<&RawFilters>) -> Vec<Event> {
        match self.prepare_bounds(bounds, filters) {
            Some(query) => {
                let result = self.execute(&query);
                self.apply(query, result)
            }
            None => vec![],
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.generation,
            query_key: self.filters.query_key(),
            bounds: self.bounds,
        }
    }

    /// Records a settled viewport. Returns `None` when bounds are ignored
    /// (unscoped strategy) or invalid.
    pub fn prepare_bounds(
        &mut self,
        bounds: BoundingBox,
        filters: Option<&RawFilters>,
    ) -> Option<MapQuery> {
        if !self.use_bounding_box() {
            debug!("Bounds ignored by unscoped map");
            return None;
        }
        let bounds = match bounds.validated() {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!(component = COMPONENT, error = %e, "Rejected bounds event");
                return None;
            }
        };
        if let Some(raw) = filters {
            self.filters = revalidate(&self.validator, raw, COMPONENT);
        }
        self.bounds = Some(bounds);
        self.generation += 1;
        Some(MapQuery {
            snapshot: self.snapshot(),
            filters: self.filters.clone(),
            view_action: None,
        })
    }

    pub fn execute(&self, query: &MapQuery) -> SearchResult<MapCoordinates> {
        self.search
            .for_map(&query.filters, query.snapshot.bounds.as_ref())
    }

    /// Stores a query result unless the map has moved on since `query` was
    /// prepared.
    pub fn apply(&mut self, query: MapQuery, result: SearchResult<MapCoordinates>) -> Vec<Event> {
        if query.snapshot != self.snapshot() {
            debug!(
                issued = query.snapshot.generation,
                current = self.generation,
                "Dropping stale map result"
            );
            return vec![];
        }

        let found = match result {
            Ok(found) => {
                self.error = None;
                found
            }
            Err(e) => {
                log_search_failure(&e, &query.filters, query.snapshot.bounds.as_ref());
                self.error = Some(failure_message(
                    self.translator.as_ref(),
                    &self.locale,
                    self.debug,
                    &e,
                ));
                MapCoordinates::default()
            }
        };
        self.coordinates.clone_from(&found.coordinates);

        match query.view_action {
            Some(view_action) => vec![Event::SyncFiltersView {
                view_action,
                filters: self.filters.to_component_data(),
                coordinates: Some(found.coordinates),
                use_bounding_box: false,
            }],
            None => vec![Event::CoordinatesUpdated {
                count: found.count,
                coordinates: found.coordinates,
            }],
        }
    }
}
