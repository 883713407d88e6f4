use std::sync::Arc;

use tracing::{debug, warn};

use super::{Event, Snapshot, failure_message, revalidate};
use crate::{
    filters::{FilterState, FilterValidator, RawFilters},
    geo::BoundingBox,
    i18n::{Translator, keys},
    search::{GeospatialSearch, PlacePage, PlaceSummary, Result as SearchResult, log_search_failure},
};

const COMPONENT: &str = "list";

/// What the list shows. Exactly one state at a time, so the two empty
/// states can never render together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListDisplay {
    /// Proximity without a point, or worldwide without tag or featured.
    MinimalConditionsNotMet { message: String },
    /// Conditions are met but no bounds have been reported yet.
    Pending,
    /// A query ran and matched nothing.
    NoResults { message: String },
    Results { count: usize, has_more_pages: bool },
    Error { message: String },
}

/// A list query prepared by [`ListComponent`].
#[derive(Debug, Clone)]
pub struct ListQuery {
    snapshot: Snapshot,
    filters: FilterState,
    bounds: BoundingBox,
    cursor: Option<String>,
    append: bool,
}

/// Infinite-scroll list of places inside the current viewport.
pub struct ListComponent {
    search: GeospatialSearch,
    validator: FilterValidator,
    translator: Arc<dyn Translator>,
    locale: String,
    debug: bool,
    page_size: usize,
    filters: FilterState,
    bounds: Option<BoundingBox>,
    places: Vec<PlaceSummary>,
    cursor: Option<String>,
    has_more_pages: bool,
    query_ran: bool,
    error: Option<String>,
    highlighted: Option<u32>,
    generation: u64,
}

impl ListComponent {
    pub fn new(
        search: GeospatialSearch,
        validator: FilterValidator,
        translator: Arc<dyn Translator>,
        locale: impl Into<String>,
        page_size: usize,
        debug: bool,
        initial: FilterState,
    ) -> Self {
        Self {
            search,
            validator,
            translator,
            locale: locale.into(),
            debug,
            page_size,
            filters: initial,
            bounds: None,
            places: Vec::new(),
            cursor: None,
            has_more_pages: true,
            query_ran: false,
            error: None,
            highlighted: None,
            generation: 0,
        }
    }

    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn places(&self) -> &[PlaceSummary] {
        &self.places
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub const fn has_more_pages(&self) -> bool {
        self.has_more_pages
    }

    pub const fn highlighted(&self) -> Option<u32> {
        self.highlighted
    }

    pub fn display(&self) -> ListDisplay {
        if let Some(message) = &self.error {
            return ListDisplay::Error {
                message: message.clone(),
            };
        }
        if !self.filters.minimal_conditions_met() {
            return ListDisplay::MinimalConditionsNotMet {
                message: self.message(keys::LIST_MINIMAL_CONDITIONS),
            };
        }
        if !self.query_ran {
            return ListDisplay::Pending;
        }
        if self.places.is_empty() {
            return ListDisplay::NoResults {
                message: self.message(keys::LIST_NO_RESULTS),
            };
        }
        ListDisplay::Results {
            count: self.places.len(),
            has_more_pages: self.has_more_pages,
        }
    }

    fn message(&self, key: &str) -> String {
        self.translator.translate(&self.locale, key, &[])
    }

    pub fn handle(&mut self, event: &Event) -> Vec<Event> {
        match event {
            Event::FiltersUpdated { filters } => {
                self.filters = revalidate(&self.validator, filters, COMPONENT);
                self.reset();
                vec![]
            }
            Event::InitialListBounds { bounds } => self.on_bounds(*bounds, None),
            Event::UpdateListBounds { bounds, filters } => self.on_bounds(*bounds, filters.as_ref()),
            Event::ListItemHovered { place_id } => {
                self.highlighted = *place_id;
                vec![]
            }
            _ => vec![],
        }
    }

    /// Clears accumulated rows and pagination; in-flight results go stale.
    fn reset(&mut self) {
        self.places.clear();
        self.cursor = None;
        self.has_more_pages = true;
        self.query_ran = false;
        self.error = None;
        self.generation += 1;
    }

    fn on_bounds(&mut self, bounds: BoundingBox, filters: Option<&RawFilters>) -> Vec<Event> {
        if let Some(query) = self.prepare_bounds(bounds, filters) {
            let result = self.execute(&query);
            self.apply(query, result);
        }
        vec![Event::ListUpdateComplete]
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.generation,
            query_key: self.filters.query_key(),
            bounds: self.bounds,
        }
    }

    /// Resets pagination for a new viewport and prepares its first page.
    /// Returns `None` for invalid bounds or unmet search conditions.
    pub fn prepare_bounds(
        &mut self,
        bounds: BoundingBox,
        filters: Option<&RawFilters>,
    ) -> Option<ListQuery> {
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
        self.reset();

        if !self.filters.minimal_conditions_met() {
            debug!("Minimal search conditions not met; list query skipped");
            return None;
        }
        Some(ListQuery {
            snapshot: self.snapshot(),
            filters: self.filters.clone(),
            bounds,
            cursor: None,
            append: false,
        })
    }

    /// Prepares the next page. `None` (and no state change) when there is
    /// nothing more to load.
    pub fn prepare_load_more(&self) -> Option<ListQuery> {
        if !self.has_more_pages {
            return None;
        }
        let cursor = self.cursor.clone()?;
        let bounds = self.bounds?;
        Some(ListQuery {
            snapshot: self.snapshot(),
            filters: self.filters.clone(),
            bounds,
            cursor: Some(cursor),
            append: true,
        })
    }

    /// Appends the next page to the displayed rows. Returns whether a page
    /// was requested.
    pub fn load_more(&mut self) -> bool {
        let Some(query) = self.prepare_load_more() else {
            debug!("load_more ignored: no further pages");
            return false;
        };
        let result = self.execute(&query);
        self.apply(query, result);
        true
    }

    pub fn execute(&self, query: &ListQuery) -> SearchResult<PlacePage> {
        self.search.for_list(
            &query.filters,
            &query.bounds,
            self.page_size,
            query.cursor.as_deref(),
        )
    }

    /// Stores a page unless the list has moved on since `query` was
    /// prepared. Returns whether the result was applied.
    pub fn apply(&mut self, query: ListQuery, result: SearchResult<PlacePage>) -> bool {
        if query.snapshot != self.snapshot() {
            debug!(
                issued = query.snapshot.generation,
                current = self.generation,
                "Dropping stale list result"
            );
            return false;
        }
        // Appending changes the cursor, so a second result for the same
        // snapshot would duplicate rows.
        self.generation += 1;
        self.query_ran = true;

        match result {
            Ok(page) => {
                if query.append {
                    self.places.extend(page.places);
                } else {
                    self.places = page.places;
                }
                self.cursor = page.next_cursor;
                self.has_more_pages = page.has_more_pages;
                self.error = None;
            }
            Err(e) => {
                log_search_failure(&e, &query.filters, Some(&query.bounds));
                self.places.clear();
                self.cursor = None;
                self.has_more_pages = false;
                self.error = Some(failure_message(
                    self.translator.as_ref(),
                    &self.locale,
                    self.debug,
                    &e,
                ));
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use placemap_data::{TestDataConfig, create_test_catalog};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{filters::Strategy, i18n::MessageCatalog};

    fn list(page_size: usize) -> ListComponent {
        let catalog = create_test_catalog(&TestDataConfig::sample()).unwrap();
        let search = GeospatialSearch::new(Arc::new(catalog), "en");
        let validator = FilterValidator::default();
        let initial = validator.default_filters();
        ListComponent::new(
            search,
            validator,
            Arc::new(MessageCatalog::new()),
            "en",
            page_size,
            false,
            initial,
        )
    }

    fn raw_state(raw: &RawFilters) -> RawFilters {
        FilterValidator::default()
            .validate(raw, Strategy::Throw)
            .unwrap()
            .to_component_data()
    }

    #[test]
    fn test_minimal_conditions_state_before_any_query() {
        let mut list = list(5);
        assert!(matches!(list.display(), ListDisplay::MinimalConditionsNotMet { .. }));

        let events = list.handle(&Event::InitialListBounds { bounds: BoundingBox::WORLD });
        assert_eq!(events, vec![Event::ListUpdateComplete]);
        assert!(matches!(list.display(), ListDisplay::MinimalConditionsNotMet { .. }));
    }

    #[test]
    fn test_filters_updated_resets_without_querying() {
        let mut list = list(5);
        list.handle(&Event::FiltersUpdated {
            filters: raw_state(&RawFilters::worldwide(["nasa"], false)),
        });
        assert_eq!(list.display(), ListDisplay::Pending);
        assert!(list.places().is_empty());
        assert!(!list.load_more());
    }

    #[test]
    fn test_bounds_then_load_more_appends() {
        let mut list = list(3);
        list.handle(&Event::UpdateListBounds {
            bounds: BoundingBox::WORLD,
            filters: Some(raw_state(&RawFilters::worldwide(["nasa"], false))),
        });
        assert_eq!(list.places().len(), 3);
        assert!(list.has_more_pages());

        assert!(list.load_more());
        assert_eq!(list.places().len(), 6);
        let ids: Vec<u32> = list.places().iter().map(|p| p.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_load_more_noop_when_exhausted() {
        let mut list = list(200);
        list.handle(&Event::UpdateListBounds {
            bounds: BoundingBox::WORLD,
            filters: Some(raw_state(&RawFilters::worldwide(["nasa"], false))),
        });
        assert!(!list.has_more_pages());
        let before = list.places().to_vec();
        assert!(!list.load_more());
        assert_eq!(list.places(), before.as_slice());
    }

    #[test]
    fn test_no_results_state() {
        let mut list = list(5);
        let nowhere = BoundingBox::new(-80.0, -89.0, 1.0, 0.0).unwrap();
        list.handle(&Event::UpdateListBounds {
            bounds: nowhere,
            filters: Some(raw_state(&RawFilters::worldwide(["nasa"], false))),
        });
        assert_eq!(
            list.display(),
            ListDisplay::NoResults {
                message: "No places match these filters.".into()
            }
        );
    }

    #[test]
    fn test_stale_page_dropped_after_reset() {
        let mut list = list(3);
        let filters = raw_state(&RawFilters::worldwide(["nasa"], false));
        let first = list.prepare_bounds(BoundingBox::WORLD, Some(&filters)).unwrap();
        let first_page = list.execute(&first);
        list.handle(&Event::FiltersUpdated { filters });
        assert!(!list.apply(first, first_page));
        assert!(list.places().is_empty());
    }
}
