use tracing::debug;

use crate::{
    geo::{BoundingBox, LatLng},
    search::MapCoordinate,
    view::ViewAction,
};

/// The client map renderer.
///
/// It owns the camera. The engine hands it view actions and coordinate sets
/// and gets back the viewport once the camera has settled.
pub trait MapLayer {
    /// Applies a camera instruction; returns the settled viewport.
    fn sync_filters_view(
        &mut self,
        action: &ViewAction,
        coordinates: Option<&[MapCoordinate]>,
    ) -> BoundingBox;

    /// Replaces the rendered coordinate set.
    fn show_coordinates(&mut self, coordinates: &[MapCoordinate]);

    /// Moves the camera as a visitor pan would; returns the settled viewport.
    fn pan_to(&mut self, viewport: BoundingBox) -> BoundingBox;

    fn viewport(&self) -> BoundingBox;

    /// Current zoom level (0 shows the whole world in one tile).
    fn zoom(&self) -> f64;
}

/// Deterministic stand-in for a browser map.
#[derive(Debug, Clone)]
pub struct SimulatedMapLayer {
    viewport: BoundingBox,
    rendered: Vec<MapCoordinate>,
    actions: Vec<ViewAction>,
}

impl Default for SimulatedMapLayer {
    fn default() -> Self {
        Self {
            viewport: BoundingBox::WORLD,
            rendered: Vec::new(),
            actions: Vec::new(),
        }
    }
}

impl SimulatedMapLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every view action received, oldest first.
    pub fn actions(&self) -> &[ViewAction] {
        &self.actions
    }

    pub fn rendered(&self) -> &[MapCoordinate] {
        &self.rendered
    }
}

impl MapLayer for SimulatedMapLayer {
    fn sync_filters_view(
        &mut self,
        action: &ViewAction,
        coordinates: Option<&[MapCoordinate]>,
    ) -> BoundingBox {
        self.actions.push(*action);
        match *action {
            ViewAction::CenterOnLocation { lat, lng, radius }
            | ViewAction::AdjustZoom { lat, lng, radius } => {
                self.viewport = BoundingBox::around(LatLng::new(lat, lng), f64::from(radius));
            }
            ViewAction::ShowWorldView => self.viewport = BoundingBox::WORLD,
            ViewAction::NoChange => {}
        }
        if let Some(coordinates) = coordinates {
            self.show_coordinates(coordinates);
        }
        debug!(action = action.name(), viewport = ?self.viewport, "Camera settled");
        self.viewport
    }

    fn show_coordinates(&mut self, coordinates: &[MapCoordinate]) {
        self.rendered = coordinates.to_vec();
    }

    fn pan_to(&mut self, viewport: BoundingBox) -> BoundingBox {
        self.viewport = viewport;
        self.viewport
    }

    fn viewport(&self) -> BoundingBox {
        self.viewport
    }

    fn zoom(&self) -> f64 {
        let span = self.viewport.lng_span().max(1e-6);
        (360.0 / span).log2().clamp(0.0, 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_follows_actions() {
        let mut layer = SimulatedMapLayer::new();
        assert!(layer.zoom().abs() < 1e-9);

        let settled = layer.sync_filters_view(
            &ViewAction::CenterOnLocation {
                lat: 48.8566,
                lng: 2.3522,
                radius: 50_000,
            },
            None,
        );
        assert!(settled.contains(LatLng::new(48.8566, 2.3522)));
        assert!(layer.zoom() > 5.0);

        let unchanged = layer.sync_filters_view(&ViewAction::NoChange, Some(&[]));
        assert_eq!(unchanged, settled);

        assert_eq!(layer.sync_filters_view(&ViewAction::ShowWorldView, None), BoundingBox::WORLD);
        assert_eq!(layer.actions().len(), 3);
    }
}
