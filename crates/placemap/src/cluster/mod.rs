//! Client-side marker aggregation.
//!
//! Coordinates inside the viewport are projected to Web Mercator pixels at
//! the current zoom and bucketed into a square grid. Above the configured
//! count threshold, every grid cell holding two or more places becomes a
//! cluster; below it, every place is its own marker.

use std::collections::BTreeMap;

use ahash::AHashMap as HashMap;
use serde::Serialize;
use tracing::debug;

use crate::{
    geo::{BoundingBox, LatLng},
    search::MapCoordinate,
};

mod highlight;

pub use highlight::{Highlight, HighlightState};

pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the Web Mercator projection.
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;

fn lon_to_x(lon: f64, zoom: f64) -> f64 {
    ((lon + 180.0) / 360.0) * 2.0f64.powf(zoom) * TILE_SIZE
}

fn lat_to_y(lat: f64, zoom: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0
        * 2.0f64.powf(zoom)
        * TILE_SIZE
}

/// Identifies a cluster within the current render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClusterId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub count: usize,
    /// At least one member is featured.
    pub featured: bool,
    pub center: LatLng,
    pub members: Vec<u32>,
}

/// What currently represents a place on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "kebab-case")]
pub enum VisibleParent {
    Marker(u32),
    Cluster(ClusterId),
}

#[derive(Debug, Clone)]
pub struct MarkerClusterer {
    threshold: usize,
    grid_px: u32,
    markers: Vec<MapCoordinate>,
    clusters: Vec<Cluster>,
    parents: HashMap<u32, VisibleParent>,
}

impl MarkerClusterer {
    #[must_use]
    pub fn new(threshold: usize, grid_px: u32) -> Self {
        Self {
            threshold,
            grid_px: grid_px.max(1),
            markers: Vec::new(),
            clusters: Vec::new(),
            parents: HashMap::new(),
        }
    }

    /// Rebuilds markers and clusters for `coordinates` visible in `viewport`.
    pub fn render(&mut self, coordinates: &[MapCoordinate], viewport: &BoundingBox, zoom: f64) {
        self.markers.clear();
        self.clusters.clear();
        self.parents.clear();

        let visible: Vec<&MapCoordinate> = coordinates
            .iter()
            .filter(|c| viewport.contains(LatLng::new(c.lat, c.lng)))
            .collect();

        if visible.len() <= self.threshold {
            for c in visible {
                self.push_marker(*c);
            }
            debug!(markers = self.markers.len(), "Rendered unclustered markers");
            return;
        }

        let cell = f64::from(self.grid_px);
        let mut cells: BTreeMap<(i64, i64), Vec<&MapCoordinate>> = BTreeMap::new();
        for c in visible {
            let key = (
                (lon_to_x(c.lng, zoom) / cell).floor() as i64,
                (lat_to_y(c.lat, zoom) / cell).floor() as i64,
            );
            cells.entry(key).or_default().push(c);
        }

        for members in cells.into_values() {
            if let [single] = members.as_slice() {
                self.push_marker(**single);
                continue;
            }
            let id = ClusterId(self.clusters.len() as u32);
            let count = members.len();
            let (lat_sum, lng_sum) = members
                .iter()
                .fold((0.0, 0.0), |(lat, lng), c| (lat + c.lat, lng + c.lng));
            for c in &members {
                self.parents.insert(c.id, VisibleParent::Cluster(id));
            }
            self.clusters.push(Cluster {
                id,
                count,
                featured: members.iter().any(|c| c.featured),
                center: LatLng::new(lat_sum / count as f64, lng_sum / count as f64),
                members: members.iter().map(|c| c.id).collect(),
            });
        }

        debug!(
            markers = self.markers.len(),
            clusters = self.clusters.len(),
            zoom,
            "Rendered clustered markers"
        );
    }

    fn push_marker(&mut self, c: MapCoordinate) {
        self.parents.insert(c.id, VisibleParent::Marker(c.id));
        self.markers.push(c);
    }

    #[must_use]
    pub fn markers(&self) -> &[MapCoordinate] {
        &self.markers
    }

    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id.0 as usize)
    }

    #[must_use]
    pub fn is_clustered(&self) -> bool {
        !self.clusters.is_empty()
    }

    /// The marker or cluster showing `place_id`; `None` when it is off the
    /// viewport or not rendered.
    #[must_use]
    pub fn visible_parent_of(&self, place_id: u32) -> Option<VisibleParent> {
        self.parents.get(&place_id).copied()
    }
}
