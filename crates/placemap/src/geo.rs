//! Geographic primitives: points, viewport boxes and great-circle distance.

use serde::{Deserialize, Serialize};

pub use error::BoundsError;

/// Mean Earth radius (IUGG) in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Length of one degree of latitude on the mean sphere.
pub const METERS_PER_DEGREE: f64 = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

/// A WGS84 point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Coordinates as integer micro-degrees (6 decimal places, roughly 0.1 m).
    #[must_use]
    pub fn rounded(&self) -> (i64, i64) {
        (round_micro(self.lat), round_micro(self.lng))
    }
}

pub(crate) fn round_micro(value: f64) -> i64 {
    (value * 1e6).round() as i64
}

/// Great-circle distance in meters (haversine).
#[must_use]
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lng - a.lng).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Wraps a longitude into `[-180, 180]`.
#[must_use]
pub fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        return lng;
    }
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 { 180.0 } else { wrapped }
}

/// A rectangular map viewport.
///
/// `north > south` always holds for a validated box. A box whose `east` is
/// smaller than its `west` crosses the antimeridian and matches longitudes
/// `>= west` or `<= east`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// The whole map.
    pub const WORLD: Self = Self {
        north: 90.0,
        south: -90.0,
        east: 180.0,
        west: -180.0,
    };

    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Result<Self, BoundsError> {
        Self {
            north,
            south,
            east,
            west,
        }
        .validated()
    }

    /// Re-checks a box that arrived from outside (deserialized event payloads).
    pub fn validated(self) -> Result<Self, BoundsError> {
        let values = [self.north, self.south, self.east, self.west];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(BoundsError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&self.north) || !(-90.0..=90.0).contains(&self.south) {
            return Err(BoundsError::LatitudeOutOfRange {
                north: self.north,
                south: self.south,
            });
        }
        if !(-180.0..=180.0).contains(&self.east) || !(-180.0..=180.0).contains(&self.west) {
            return Err(BoundsError::LongitudeOutOfRange {
                east: self.east,
                west: self.west,
            });
        }
        if self.north <= self.south {
            return Err(BoundsError::Inverted {
                north: self.north,
                south: self.south,
            });
        }
        Ok(self)
    }

    /// Smallest box containing the circle of `radius_m` around `center`.
    ///
    /// The longitude half-width is `asin(sin(r) / cos(lat))` for the angular
    /// radius `r`, taken at the circle's tangent points rather than at the
    /// center's latitude. When the circle reaches a pole, or `sin(r)` is at
    /// least `cos(lat)`, the box covers every longitude.
    #[must_use]
    pub fn around(center: LatLng, radius_m: f64) -> Self {
        let d_lat = radius_m / METERS_PER_DEGREE;
        let north = (center.lat + d_lat).min(90.0);
        let south = (center.lat - d_lat).max(-90.0);

        let angular = radius_m / EARTH_RADIUS_M;
        let sin_r = angular.sin();
        let cos_lat = center.lat.to_radians().cos();
        let d_lng = if angular < std::f64::consts::FRAC_PI_2 && sin_r < cos_lat {
            (sin_r / cos_lat).asin().to_degrees()
        } else {
            f64::INFINITY
        };

        if north >= 90.0 || south <= -90.0 || d_lng >= 180.0 {
            return Self {
                north,
                south,
                east: 180.0,
                west: -180.0,
            };
        }

        Self {
            north,
            south,
            east: wrap_longitude(center.lng + d_lng),
            west: wrap_longitude(center.lng - d_lng),
        }
    }

    #[must_use]
    pub fn wraps_antimeridian(&self) -> bool {
        self.east < self.west
    }

    #[must_use]
    pub fn contains(&self, point: LatLng) -> bool {
        let lat_ok = point.lat >= self.south && point.lat <= self.north;
        let lng_ok = if self.wraps_antimeridian() {
            point.lng >= self.west || point.lng <= self.east
        } else {
            point.lng >= self.west && point.lng <= self.east
        };
        lat_ok && lng_ok
    }

    /// Longitude extent in degrees, accounting for antimeridian wrap.
    #[must_use]
    pub fn lng_span(&self) -> f64 {
        if self.wraps_antimeridian() {
            360.0 - (self.west - self.east)
        } else {
            self.east - self.west
        }
    }

    #[must_use]
    pub fn center(&self) -> LatLng {
        let lng = wrap_longitude(self.west + self.lng_span() / 2.0);
        LatLng::new(f64::midpoint(self.north, self.south), lng)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum BoundsError {
        #[error("Bounding box contains a non-finite value")]
        NotFinite,
        #[error("Bounding box latitudes out of range (north {north}, south {south})")]
        LatitudeOutOfRange { north: f64, south: f64 },
        #[error("Bounding box longitudes out of range (east {east}, west {west})")]
        LongitudeOutOfRange { east: f64, west: f64 },
        #[error("Bounding box north ({north}) must be greater than south ({south})")]
        Inverted { north: f64, south: f64 },
    }
}
