//! Filters, Map and List components and the page that connects them.
//!
//! The components never share state. They talk only through [`Event`]s
//! routed by [`ExplorePage`], and every component re-validates each filter
//! payload it receives, whoever sent it.
//!
//! Queries run in three steps so a page can run the Map and List queries of
//! one viewport settle concurrently:
//!
//! 1. `prepare_*` (`&mut self`) records the new state and snapshots it;
//! 2. `execute` (`&self`) runs the query;
//! 3. `apply` (`&mut self`) stores the result, unless the component has
//!    moved on since the snapshot, in which case the result is dropped.

use itertools::Itertools;
use tracing::error;

use crate::{
    filters::{Corrected, FilterState, FilterValidator, RawFilters},
    i18n::{Translator, keys},
    search::SearchError,
};

mod events;
mod filters;
mod list;
mod map;
mod map_layer;
mod page;

pub use events::{Event, EventBus};
pub use filters::{FilterInput, FiltersComponent};
pub use list::{ListComponent, ListDisplay, ListQuery};
pub use map::{MapComponent, MapQuery};
pub use map_layer::{MapLayer, SimulatedMapLayer};
pub use page::{ExplorePage, ViewportGate};

/// Re-checks a payload that was validated upstream.
///
/// A payload that needed correcting means a forged or stale event, which is
/// logged like a technical error.
fn revalidate(validator: &FilterValidator, raw: &RawFilters, component: &'static str) -> FilterState {
    let Corrected {
        filters,
        corrections,
    } = validator.correct(raw);
    if !corrections.is_empty() {
        error!(
            component,
            payload = ?raw,
            corrections = %corrections.iter().join("; "),
            "Event payload failed re-validation and was corrected"
        );
    }
    filters
}

/// Generic localized failure text; the error detail is appended only in
/// debug mode.
fn failure_message(
    translator: &dyn Translator,
    locale: &str,
    debug: bool,
    err: &SearchError,
) -> String {
    let mut message = translator.translate(locale, keys::SEARCH_FAILED, &[]);
    if debug {
        message.push_str(&format!(" [{}: {err}]", err.kind()));
    }
    message
}

/// Snapshot a query was issued under.
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    generation: u64,
    query_key: String,
    bounds: Option<crate::geo::BoundingBox>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{i18n::MessageCatalog, search::SearchError};

    fn setup_test_env() {
        let _ = crate::init_logging(tracing::Level::WARN);
    }

    #[test]
    fn test_revalidate_corrects_forged_payload() {
        setup_test_env();
        let validator = FilterValidator::default();

        let forged = RawFilters::proximity(48.8566, 2.3522, 9_000_000);
        let filters = revalidate(&validator, &forged, "list");
        assert_eq!(filters.radius(), 500_000);

        let clean = RawFilters::proximity(48.8566, 2.3522, 20_000);
        assert_eq!(revalidate(&validator, &clean, "map").radius(), 20_000);
    }

    #[test]
    fn test_failure_message_detail_only_in_debug() {
        let catalog = MessageCatalog::new();
        let err = SearchError::Unavailable("timeout".into());

        let plain = failure_message(&catalog, "fr", false, &err);
        assert_eq!(
            plain,
            "Une erreur est survenue lors du chargement des lieux. Veuillez réessayer."
        );
        let detailed = failure_message(&catalog, "fr", true, &err);
        assert!(detailed.starts_with(&plain));
        assert!(detailed.ends_with("[unavailable: Place source unavailable: timeout]"));
    }
}
