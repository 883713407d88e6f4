//! Map camera instructions derived from consecutive filter states.

use serde::{Deserialize, Serialize};

use crate::filters::{FilterState, Mode};

/// How the map camera should react to a filter change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ViewAction {
    CenterOnLocation { lat: f64, lng: f64, radius: u32 },
    AdjustZoom { lat: f64, lng: f64, radius: u32 },
    ShowWorldView,
    NoChange,
}

impl ViewAction {
    /// Compares `previous` with `next`; first matching rule wins.
    ///
    /// Pure. Callers must record `next` as their new previous state only
    /// after this returns, otherwise every transition reads as `NoChange`.
    #[must_use]
    pub fn resolve(previous: &FilterState, next: &FilterState) -> Self {
        match (previous.mode(), next.mode()) {
            (Mode::Proximity, Mode::Worldwide) => return Self::ShowWorldView,
            (Mode::Worldwide, Mode::Proximity) if next.latitude().is_none() => {
                return Self::NoChange;
            }
            _ => {}
        }

        let Some(point) = next.coordinates() else {
            return Self::NoChange;
        };
        let previous_point = previous.coordinates().map(|c| c.rounded());

        if previous_point != Some(point.rounded()) {
            return Self::CenterOnLocation {
                lat: point.lat,
                lng: point.lng,
                radius: next.radius(),
            };
        }

        let only_radius_changed = previous.radius() != next.radius()
            && previous.mode() == next.mode()
            && previous.tag_set() == next.tag_set();
        if only_radius_changed {
            return Self::AdjustZoom {
                lat: point.lat,
                lng: point.lng,
                radius: next.radius(),
            };
        }

        Self::NoChange
    }

    /// Camera instruction for a freshly loaded page with no previous state.
    #[must_use]
    pub fn initial_for(filters: &FilterState) -> Self {
        match (filters.mode(), filters.coordinates()) {
            (Mode::Worldwide, _) => Self::ShowWorldView,
            (Mode::Proximity, Some(point)) => Self::CenterOnLocation {
                lat: point.lat,
                lng: point.lng,
                radius: filters.radius(),
            },
            (Mode::Proximity, None) => Self::NoChange,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CenterOnLocation { .. } => "center-on-location",
            Self::AdjustZoom { .. } => "adjust-zoom",
            Self::ShowWorldView => "show-world-view",
            Self::NoChange => "no-change",
        }
    }
}
