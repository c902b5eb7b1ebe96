//! Geometry primitives over polygon features
//!
//! Everything here is pure. Lengths are great-circle (haversine) distances in
//! meters and midpoints are great-circle midpoints, so a label sits on the same
//! arc its length was measured along.

use crate::{LookupError, PolygonFeature, Result, utils::EARTH_RADIUS_M};
use geo::{Intersects, Point};
use std::cmp::Ordering;

/// A boundary edge: two consecutive exterior ring vertices
pub type Edge = (Point<f64>, Point<f64>);

/// Length annotation of one boundary edge
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeLabel {
    /// Great-circle midpoint of the edge (lon/lat degrees)
    pub midpoint: Point<f64>,
    /// Edge length in meters
    pub length_m: f64,
}

/// Point-in-polygon test. Holes are excluded; points exactly on a ring count
/// as contained.
#[inline]
pub fn contains(point: Point<f64>, feature: &PolygonFeature) -> bool {
    let bounds = feature.bounds();
    if point.x() < bounds.min().x
        || point.x() > bounds.max().x
        || point.y() < bounds.min().y
        || point.y() > bounds.max().y
    {
        return false;
    }
    feature.geometry().intersects(&point)
}

/// Consecutive vertex pairs of each exterior ring, in ring order.
///
/// The closing vertex is not paired with itself, so a closed ring of `n + 1`
/// coordinates yields `n` edges.
pub fn boundary_edges(feature: &PolygonFeature) -> Result<Vec<Edge>> {
    let edges: Vec<Edge> = feature
        .geometry()
        .0
        .iter()
        .flat_map(|polygon| polygon.exterior().lines())
        .map(|line| (Point::from(line.start), Point::from(line.end)))
        .collect();

    if edges.is_empty() {
        return Err(LookupError::InvalidGeometry(format!(
            "feature {} has no boundary edges",
            feature.code()
        )));
    }
    Ok(edges)
}

/// Haversine distance between two lon/lat points in meters.
///
/// The endpoints are put in a canonical order first, so the result does not
/// depend on argument order down to the last bit.
pub fn edge_length(a: Point<f64>, b: Point<f64>) -> f64 {
    let (p1, p2) = canonical_order(a, b);

    let lat1 = p1.y().to_radians();
    let lat2 = p2.y().to_radians();
    let delta_lat = (p2.y() - p1.y()).to_radians();
    let delta_lon = (p2.x() - p1.x()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Great-circle midpoint of two lon/lat points
pub fn midpoint(a: Point<f64>, b: Point<f64>) -> Point<f64> {
    let (p1, p2) = canonical_order(a, b);

    let lat1 = p1.y().to_radians();
    let lon1 = p1.x().to_radians();
    let lat2 = p2.y().to_radians();
    let delta_lon = (p2.x() - p1.x()).to_radians();

    let bx = lat2.cos() * delta_lon.cos();
    let by = lat2.cos() * delta_lon.sin();

    let lat = (lat1.sin() + lat2.sin()).atan2(((lat1.cos() + bx).powi(2) + by.powi(2)).sqrt());
    let lon = lon1 + by.atan2(lat1.cos() + bx);

    // Normalize to [-180, 180)
    let lon = (lon.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    Point::new(lon, lat.to_degrees())
}

/// Length labels for the feature's edges, skipping edges shorter than
/// `min_length_m`
pub fn edge_labels(feature: &PolygonFeature, min_length_m: f64) -> Result<Vec<EdgeLabel>> {
    Ok(boundary_edges(feature)?
        .into_iter()
        .map(|(a, b)| EdgeLabel {
            midpoint: midpoint(a, b),
            length_m: edge_length(a, b),
        })
        .filter(|label| label.length_m >= min_length_m)
        .collect())
}

fn canonical_order(a: Point<f64>, b: Point<f64>) -> (Point<f64>, Point<f64>) {
    let order = a
        .x()
        .partial_cmp(&b.x())
        .unwrap_or(Ordering::Equal)
        .then(a.y().partial_cmp(&b.y()).unwrap_or(Ordering::Equal));
    if order == Ordering::Greater {
        (b, a)
    } else {
        (a, b)
    }
}
