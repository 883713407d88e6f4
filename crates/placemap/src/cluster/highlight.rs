use serde::Serialize;
use tracing::trace;

use super::{ClusterId, MarkerClusterer, VisibleParent};

/// The single highlighted map element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "kebab-case")]
pub enum Highlight {
    #[default]
    None,
    Marker(u32),
    Cluster(ClusterId),
}

impl From<VisibleParent> for Highlight {
    fn from(parent: VisibleParent) -> Self {
        match parent {
            VisibleParent::Marker(id) => Self::Marker(id),
            VisibleParent::Cluster(id) => Self::Cluster(id),
        }
    }
}

/// Single-slot highlight state machine.
///
/// Every new highlight clears the previous one first, so at most one marker
/// or cluster is highlighted at a time.
#[derive(Debug, Clone, Default)]
pub struct HighlightState {
    current: Highlight,
}

impl HighlightState {
    #[must_use]
    pub const fn current(&self) -> Highlight {
        self.current
    }

    /// Removes any highlight and returns what was highlighted. Idempotent.
    pub fn clear(&mut self) -> Highlight {
        let previous = std::mem::take(&mut self.current);
        if previous != Highlight::None {
            trace!(?previous, "Highlight cleared");
        }
        previous
    }

    pub fn highlight(&mut self, target: VisibleParent) -> Highlight {
        self.clear();
        self.current = target.into();
        self.current
    }

    /// Highlights whatever currently shows `place_id` (list hover to map).
    /// Leaves nothing highlighted when the place is not rendered.
    pub fn highlight_place(&mut self, clusterer: &MarkerClusterer, place_id: u32) -> Highlight {
        self.clear();
        if let Some(parent) = clusterer.visible_parent_of(place_id) {
            self.current = parent.into();
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geo::BoundingBox, search::MapCoordinate};

    fn clusterer() -> MarkerClusterer {
        let mut clusterer = MarkerClusterer::new(1, 60);
        let coords = [
            MapCoordinate { id: 1, lat: 10.0, lng: 10.0, featured: false },
            MapCoordinate { id: 2, lat: 10.01, lng: 10.01, featured: false },
            MapCoordinate { id: 3, lat: -40.0, lng: -70.0, featured: false },
        ];
        clusterer.render(&coords, &BoundingBox::WORLD, 3.0);
        clusterer
    }

    #[test]
    fn test_single_slot() {
        let clusterer = clusterer();
        let mut state = HighlightState::default();

        assert_eq!(state.highlight_place(&clusterer, 3), Highlight::Marker(3));
        let cluster = state.highlight_place(&clusterer, 1);
        assert!(matches!(cluster, Highlight::Cluster(_)));
        assert_eq!(state.current(), cluster);
    }

    #[test]
    fn test_unrendered_place_clears_previous_highlight() {
        let clusterer = clusterer();
        let mut state = HighlightState::default();
        state.highlight(VisibleParent::Marker(3));
        assert_eq!(state.highlight_place(&clusterer, 42), Highlight::None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut state = HighlightState::default();
        state.highlight(VisibleParent::Marker(7));
        assert_eq!(state.clear(), Highlight::Marker(7));
        assert_eq!(state.clear(), Highlight::None);
        assert_eq!(state.current(), Highlight::None);
    }
}
