//! Polars expressions for the two query shapes.

use placemap_data::columns::{DISTANCE, FEATURED, ID, LATITUDE, LONGITUDE, TAG_KEY};
use polars::prelude::*;

use super::cursor::CursorPosition;
use crate::{
    filters::{FilterState, Mode},
    geo::{BoundingBox, EARTH_RADIUS_M, LatLng},
};

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Great-circle distance in meters from `origin`, aliased to `distance`.
pub(super) fn distance_expr(origin: LatLng) -> Expr {
    let d_phi = (col(LATITUDE) - lit(origin.lat)) * lit(DEG_TO_RAD);
    let d_lambda = (col(LONGITUDE) - lit(origin.lng)) * lit(DEG_TO_RAD);
    let sin_phi = (d_phi / lit(2.0)).sin();
    let sin_lambda = (d_lambda / lit(2.0)).sin();

    let h = sin_phi.clone() * sin_phi
        + lit(origin.lat.to_radians().cos())
            * (col(LATITUDE) * lit(DEG_TO_RAD)).cos()
            * sin_lambda.clone()
            * sin_lambda;
    let h = when(h.clone().gt(lit(1.0))).then(lit(1.0)).otherwise(h);

    (lit(2.0 * EARTH_RADIUS_M) * h.sqrt().arcsin()).alias(DISTANCE)
}

/// Rows whose coordinates fall inside `bounds`; wraps across the antimeridian
/// when `east < west`.
pub(super) fn bounds_predicate(bounds: &BoundingBox) -> Expr {
    let lat = col(LATITUDE)
        .gt_eq(lit(bounds.south))
        .and(col(LATITUDE).lt_eq(lit(bounds.north)));
    let lng = if bounds.wraps_antimeridian() {
        col(LONGITUDE)
            .gt_eq(lit(bounds.west))
            .or(col(LONGITUDE).lt_eq(lit(bounds.east)))
    } else {
        col(LONGITUDE)
            .gt_eq(lit(bounds.west))
            .and(col(LONGITUDE).lt_eq(lit(bounds.east)))
    };
    lat.and(lng)
}

/// Rows holding at least one of `tags`, or `None` when no tag is requested.
pub(super) fn tags_predicate(tags: &[String]) -> Option<Expr> {
    tags.iter()
        .map(|slug| {
            col(TAG_KEY)
                .str()
                .contains_literal(lit(format!(",{slug},")))
        })
        .reduce(Expr::or)
}

/// Rows strictly after `position` in the sort order of `mode`.
pub(super) fn after_cursor(mode: Mode, position: CursorPosition) -> Expr {
    let after_id = col(ID).gt(lit(position.id));
    match (mode, position.distance) {
        (Mode::Proximity, Some(distance)) => col(DISTANCE)
            .gt(lit(distance))
            .or(col(DISTANCE).eq(lit(distance)).and(after_id)),
        _ => after_id,
    }
}

/// Applies the mode, tag, featured and box semantics of `filters`.
///
/// Returns `None` while the minimal search conditions are not met. The
/// result is sorted in the mode's stable order: distance then id for
/// proximity, id for worldwide.
pub(super) fn scope(
    places: LazyFrame,
    filters: &FilterState,
    bounds: Option<&BoundingBox>,
) -> Option<LazyFrame> {
    if !filters.minimal_conditions_met() {
        return None;
    }
    let mut lf = places;
    if let Some(bounds) = bounds {
        lf = lf.filter(bounds_predicate(bounds));
    }
    if let Some(tags) = tags_predicate(filters.tags()) {
        lf = lf.filter(tags);
    }

    let lf = match filters.mode() {
        Mode::Proximity => {
            let origin = filters.coordinates()?;
            let radius = f64::from(filters.radius());
            lf.filter(bounds_predicate(&BoundingBox::around(origin, radius)))
                .with_column(distance_expr(origin))
                .filter(col(DISTANCE).lt_eq(lit(radius)))
                .sort([DISTANCE, ID], SortMultipleOptions::default())
        }
        Mode::Worldwide => {
            if filters.featured() {
                lf = lf.filter(col(FEATURED).eq(lit(true)));
            }
            lf.sort([ID], SortMultipleOptions::default())
        }
    };
    Some(lf)
}
