use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{filters::RawFilters, geo::BoundingBox, search::MapCoordinate, view::ViewAction};

/// Messages exchanged between the exploration components.
///
/// Payloads are fixed shapes; filter payloads are always [`RawFilters`] and
/// get re-validated by every receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum Event {
    FiltersUpdated {
        filters: RawFilters,
    },
    SyncFiltersView {
        view_action: ViewAction,
        filters: RawFilters,
        coordinates: Option<Vec<MapCoordinate>>,
        use_bounding_box: bool,
    },
    InitialMapBounds {
        bounds: BoundingBox,
    },
    UpdateMapBounds {
        bounds: BoundingBox,
        filters: Option<RawFilters>,
    },
    InitialListBounds {
        bounds: BoundingBox,
    },
    UpdateListBounds {
        bounds: BoundingBox,
        filters: Option<RawFilters>,
    },
    CoordinatesUpdated {
        coordinates: Vec<MapCoordinate>,
        count: usize,
    },
    ListUpdateComplete,
    MarkerClicked {
        place_id: u32,
    },
    ListItemHovered {
        place_id: Option<u32>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FiltersUpdated { .. } => "filters-updated",
            Self::SyncFiltersView { .. } => "sync-filters-view",
            Self::InitialMapBounds { .. } => "initial-map-bounds",
            Self::UpdateMapBounds { .. } => "update-map-bounds",
            Self::InitialListBounds { .. } => "initial-list-bounds",
            Self::UpdateListBounds { .. } => "update-list-bounds",
            Self::CoordinatesUpdated { .. } => "coordinates-updated",
            Self::ListUpdateComplete => "list-update-complete",
            Self::MarkerClicked { .. } => "marker-clicked",
            Self::ListItemHovered { .. } => "list-item-hovered",
        }
    }
}

/// FIFO queue of pending events.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
    emitted: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        self.emitted += 1;
        trace!(event = event.name(), seq = self.emitted, "Event emitted");
        self.queue.push_back(event);
    }

    pub fn emit_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Event> {
        self.queue.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Total number of events emitted since creation.
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut bus = EventBus::new();
        bus.emit(Event::ListUpdateComplete);
        bus.emit(Event::MarkerClicked { place_id: 4 });
        assert_eq!(bus.len(), 2);
        assert_eq!(bus.pop(), Some(Event::ListUpdateComplete));

        assert_eq!(bus.pending().collect::<Vec<_>>(), [&Event::MarkerClicked { place_id: 4 }]);
        assert_eq!(bus.pop(), Some(Event::MarkerClicked { place_id: 4 }));
        assert!(bus.is_empty());
        assert_eq!(bus.emitted(), 2);
    }

    #[test]
    fn test_wire_shape() {
        let event = Event::UpdateListBounds {
            bounds: BoundingBox::WORLD,
            filters: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "update-list-bounds");
        assert_eq!(json["payload"]["bounds"]["north"], 90.0);

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_misshaped_payload_rejected() {
        let forged = serde_json::json!({"event": "marker-clicked", "payload": {"place_id": "seven"}});
        assert!(serde_json::from_value::<Event>(forged).is_err());
        let unknown = serde_json::json!({"event": "teleport", "payload": {}});
        assert!(serde_json::from_value::<Event>(unknown).is_err());
    }
}
