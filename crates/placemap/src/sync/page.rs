use std::sync::Arc;

use tracing::{debug, info};

use super::{Event, EventBus, FilterInput, FiltersComponent, ListComponent, MapComponent, MapLayer};
use crate::{
    cluster::{HighlightState, MarkerClusterer},
    config::ExploreConfig,
    error::PlacemapError,
    filters::{FilterState, RawFilters},
    geo::BoundingBox,
    i18n::{MessageCatalog, Translator},
    preview::{PlacePreview, preview},
    search::{GeospatialSearch, MapCoordinate, PlaceSource},
};

type BoundsUpdate = (BoundingBox, Option<RawFilters>);

/// Serializes list bounds updates.
///
/// While a list query is in flight further updates are held; only the most
/// recent one is kept and it is released by `list-update-complete`.
#[derive(Debug, Default)]
pub struct ViewportGate {
    in_flight: bool,
    pending: Option<BoundsUpdate>,
}

impl ViewportGate {
    /// Returns `true` if the update may run now; otherwise holds it.
    pub fn try_begin(&mut self, bounds: BoundingBox, filters: Option<RawFilters>) -> bool {
        if self.in_flight {
            if self.pending.replace((bounds, filters)).is_some() {
                debug!("Superseded a held list bounds update");
            }
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Marks the in-flight update done and hands back the held one.
    pub fn complete(&mut self) -> Option<BoundsUpdate> {
        self.in_flight = false;
        self.pending.take()
    }

    pub const fn is_busy(&self) -> bool {
        self.in_flight
    }
}

fn map_bounds(event: &Event) -> Option<BoundingBox> {
    match event {
        Event::InitialMapBounds { bounds } | Event::UpdateMapBounds { bounds, .. } => Some(*bounds),
        _ => None,
    }
}

fn list_bounds(event: &Event) -> Option<BoundsUpdate> {
    match event {
        Event::InitialListBounds { bounds } => Some((*bounds, None)),
        Event::UpdateListBounds { bounds, filters } => Some((*bounds, filters.clone())),
        _ => None,
    }
}

/// The exploration page: the three components, the client map layer and
/// the event routing between them.
pub struct ExplorePage<L: MapLayer> {
    config: ExploreConfig,
    translator: Arc<dyn Translator>,
    search: GeospatialSearch,
    filters: FiltersComponent,
    map: MapComponent,
    list: ListComponent,
    layer: L,
    clusterer: MarkerClusterer,
    highlight: HighlightState,
    bus: EventBus,
    gate: ViewportGate,
    bounds_reported: bool,
    preview: Option<Result<PlacePreview, String>>,
    history: Vec<&'static str>,
}

impl<L: MapLayer> ExplorePage<L> {
    /// Opens a page with the built-in message catalog.
    ///
    /// Initial filters come from navigational state and are corrected
    /// silently, so a malformed shared link never fails the page.
    pub fn open<I, K, V>(
        source: Arc<dyn PlaceSource>,
        config: ExploreConfig,
        layer: L,
        params: I,
    ) -> Result<Self, PlacemapError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::open_with(source, config, Arc::new(MessageCatalog::new()), layer, params)
    }

    pub fn open_with<I, K, V>(
        source: Arc<dyn PlaceSource>,
        config: ExploreConfig,
        translator: Arc<dyn Translator>,
        layer: L,
        params: I,
    ) -> Result<Self, PlacemapError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        config.validate()?;
        let validator = config.validator().with_known_tags(source.known_tags());
        let initial = validator.from_url_params(params);
        let strategy = config.bounds_strategy(source.len());
        let search = GeospatialSearch::new(source, config.locale.clone());

        let filters = FiltersComponent::new(
            validator.clone(),
            initial.clone(),
            Arc::clone(&translator),
            config.locale.clone(),
        );
        let map = MapComponent::new(
            search.clone(),
            validator.clone(),
            Arc::clone(&translator),
            config.locale.clone(),
            config.debug,
            strategy,
            initial.clone(),
        );
        let list = ListComponent::new(
            search.clone(),
            validator,
            Arc::clone(&translator),
            config.locale.clone(),
            config.effective_page_size(),
            config.debug,
            initial,
        );

        let mut page = Self {
            clusterer: MarkerClusterer::new(config.cluster_threshold, config.cluster_grid_px),
            config,
            translator,
            search,
            filters,
            map,
            list,
            layer,
            highlight: HighlightState::default(),
            bus: EventBus::new(),
            gate: ViewportGate::default(),
            bounds_reported: false,
            preview: None,
            history: Vec::new(),
        };
        info!(
            strategy = ?page.map.strategy(),
            filters = ?page.filters.filters(),
            "Explore page opened"
        );
        let events = page.map.initial_view();
        page.bus.emit_all(events);
        page.process();
        Ok(page)
    }

    /// Applies a filter control change. Returns whether the filters changed;
    /// a rejected change is exposed through [`Self::filters`].
    pub fn user_input(&mut self, input: FilterInput) -> bool {
        let events = self.filters.apply(input);
        let changed = !events.is_empty();
        self.bus.emit_all(events);
        self.process();
        changed
    }

    /// Moves the map as a visitor pan would.
    pub fn pan_to(&mut self, bounds: BoundingBox) {
        let settled = self.layer.pan_to(bounds);
        let filters = self.filters.filters().to_component_data();
        self.viewport_settled(settled, Some(filters));
        self.process();
    }

    /// List scroll sentinel.
    pub fn load_more(&mut self) -> bool {
        self.list.load_more()
    }

    pub fn click_marker(&mut self, place_id: u32) {
        self.dispatch(Event::MarkerClicked { place_id });
    }

    pub fn hover_list_item(&mut self, place_id: Option<u32>) {
        self.dispatch(Event::ListItemHovered { place_id });
    }

    /// Injects an event from outside, as the client map layer would.
    pub fn dispatch(&mut self, event: Event) {
        self.bus.emit(event);
        self.process();
    }

    /// Queues the bounds events of a settled viewport.
    fn viewport_settled(&mut self, bounds: BoundingBox, filters: Option<RawFilters>) {
        if self.bounds_reported {
            self.bus.emit(Event::UpdateMapBounds {
                bounds,
                filters: filters.clone(),
            });
            self.bus.emit(Event::UpdateListBounds { bounds, filters });
        } else {
            self.bounds_reported = true;
            self.bus.emit(Event::InitialMapBounds { bounds });
            self.bus.emit(Event::InitialListBounds { bounds });
        }
    }

    fn process(&mut self) {
        while let Some(event) = self.bus.pop() {
            self.history.push(event.name());
            self.route(event);
        }
    }

    fn route(&mut self, event: Event) {
        match &event {
            Event::FiltersUpdated { .. } => {
                let out = self.map.handle(&event);
                self.list.handle(&event);
                self.highlight.clear();
                self.bus.emit_all(out);
            }
            Event::SyncFiltersView {
                view_action,
                filters,
                coordinates,
                ..
            } => {
                let settled = self
                    .layer
                    .sync_filters_view(view_action, coordinates.as_deref());
                if let Some(coordinates) = coordinates {
                    self.render_markers(coordinates);
                }
                self.viewport_settled(settled, Some(filters.clone()));
            }
            Event::InitialMapBounds { .. } | Event::UpdateMapBounds { .. } => {
                let bounds = map_bounds(&event);
                let paired = self
                    .bus
                    .pending()
                    .next()
                    .and_then(list_bounds)
                    .is_some_and(|(b, _)| Some(b) == bounds);
                let list_event = if paired { self.bus.pop() } else { None };
                if let Some(list_event) = list_event {
                    self.history.push(list_event.name());
                    self.settle(&event, &list_event);
                } else {
                    let out = self.map.handle(&event);
                    self.bus.emit_all(out);
                }
            }
            Event::InitialListBounds { .. } | Event::UpdateListBounds { .. } => {
                if self.admit_list(&event) {
                    let out = self.list.handle(&event);
                    self.bus.emit_all(out);
                }
            }
            Event::ListUpdateComplete => {
                if let Some((bounds, filters)) = self.gate.complete() {
                    self.bus.emit(Event::UpdateListBounds { bounds, filters });
                }
            }
            Event::CoordinatesUpdated { coordinates, .. } => {
                self.layer.show_coordinates(coordinates);
                self.render_markers(coordinates);
            }
            Event::MarkerClicked { place_id } => {
                self.highlight.highlight_place(&self.clusterer, *place_id);
                let locale = self.config.locale.as_str();
                self.preview = Some(
                    preview(self.search.source().as_ref(), *place_id, locale)
                        .map_err(|e| e.localize(self.translator.as_ref(), locale)),
                );
            }
            Event::ListItemHovered { place_id } => {
                self.list.handle(&event);
                match place_id {
                    Some(id) => {
                        self.highlight.highlight_place(&self.clusterer, *id);
                    }
                    None => {
                        self.highlight.clear();
                    }
                }
            }
        }
    }

    fn admit_list(&mut self, event: &Event) -> bool {
        let Some((bounds, filters)) = list_bounds(event) else {
            return false;
        };
        let admitted = self.gate.try_begin(bounds, filters);
        if !admitted {
            debug!("List query in flight; holding bounds update");
        }
        admitted
    }

    /// Runs the Map and List queries of one viewport settle concurrently.
    /// Each result is applied only if its component has not moved on.
    fn settle(&mut self, map_event: &Event, list_event: &Event) {
        let map_query = match map_event {
            Event::InitialMapBounds { bounds } => self.map.prepare_bounds(*bounds, None),
            Event::UpdateMapBounds { bounds, filters } => {
                self.map.prepare_bounds(*bounds, filters.as_ref())
            }
            _ => None,
        };
        let admitted = self.admit_list(list_event);
        let list_query = if admitted {
            list_bounds(list_event)
                .and_then(|(bounds, filters)| self.list.prepare_bounds(bounds, filters.as_ref()))
        } else {
            None
        };

        let (map, list) = (&self.map, &self.list);
        let (map_result, list_result) = rayon::join(
            || {
                map_query.map(|q| {
                    let result = map.execute(&q);
                    (q, result)
                })
            },
            || {
                list_query.map(|q| {
                    let result = list.execute(&q);
                    (q, result)
                })
            },
        );

        if let Some((query, result)) = map_result {
            let out = self.map.apply(query, result);
            self.bus.emit_all(out);
        }
        if admitted {
            if let Some((query, result)) = list_result {
                self.list.apply(query, result);
            }
            self.bus.emit(Event::ListUpdateComplete);
        }
    }

    fn render_markers(&mut self, coordinates: &[MapCoordinate]) {
        let viewport = self.layer.viewport();
        self.clusterer.render(coordinates, &viewport, self.layer.zoom());
        match self.list.highlighted() {
            Some(id) => {
                self.highlight.highlight_place(&self.clusterer, id);
            }
            None => {
                self.highlight.clear();
            }
        }
    }

    pub const fn config(&self) -> &ExploreConfig {
        &self.config
    }

    pub const fn filters(&self) -> &FiltersComponent {
        &self.filters
    }

    pub const fn map(&self) -> &MapComponent {
        &self.map
    }

    pub const fn list(&self) -> &ListComponent {
        &self.list
    }

    pub const fn layer(&self) -> &L {
        &self.layer
    }

    pub const fn clusterer(&self) -> &MarkerClusterer {
        &self.clusterer
    }

    pub const fn highlight(&self) -> &HighlightState {
        &self.highlight
    }

    pub const fn gate(&self) -> &ViewportGate {
        &self.gate
    }

    /// Outcome of the last marker click: the preview or a localized error.
    pub const fn preview(&self) -> Option<&Result<PlacePreview, String>> {
        self.preview.as_ref()
    }

    /// Names of all routed events, oldest first.
    pub fn history(&self) -> &[&'static str] {
        &self.history
    }

    /// Navigational state for a shareable link.
    pub fn url_params(&self) -> Vec<(&'static str, String)> {
        self.current_filters().to_url_params()
    }

    pub const fn current_filters(&self) -> &FilterState {
        self.filters.filters()
    }
}
