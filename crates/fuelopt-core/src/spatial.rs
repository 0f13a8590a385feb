//! Great-circle math for route distance and leg courses.

use crate::error::{OptimizationError, Result};
use crate::models::Waypoint;

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Calculate the great-circle distance between two points using the
/// Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in nautical miles
pub fn haversine_distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1.0 for antipodal points.
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_NM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Distance between two waypoints in nautical miles.
pub fn distance(a: &Waypoint, b: &Waypoint) -> f64 {
    haversine_distance_nm(a.latitude(), a.longitude(), b.latitude(), b.longitude())
}

/// Total distance along an ordered route.
pub fn route_distance(waypoints: &[Waypoint]) -> Result<f64> {
    if waypoints.len() < 2 {
        return Err(OptimizationError::InvalidRoute(format!(
            "route has {} waypoint(s), at least 2 required",
            waypoints.len()
        )));
    }
    Ok(waypoints
        .windows(2)
        .map(|leg| distance(&leg[0], &leg[1]))
        .sum())
}

/// Initial bearing from point 1 to point 2 in degrees true, 0..360.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lon2 - lon1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y).to_degrees().rem_euclid(360.0)
}

/// Course flown at waypoint `index`: the outbound leg, or the inbound leg
/// for the final waypoint.
pub fn leg_course_deg(waypoints: &[Waypoint], index: usize) -> Option<f64> {
    let (from, to) = if index + 1 < waypoints.len() {
        (waypoints.get(index)?, waypoints.get(index + 1)?)
    } else {
        (waypoints.get(index.checked_sub(1)?)?, waypoints.get(index)?)
    };
    Some(bearing_deg(
        from.latitude(),
        from.longitude(),
        to.latitude(),
        to.longitude(),
    ))
}

/// Mean absolute latitude of the route, used for jet stream checks.
pub fn mean_abs_latitude(waypoints: &[Waypoint]) -> f64 {
    if waypoints.is_empty() {
        return 0.0;
    }
    waypoints.iter().map(|w| w.latitude().abs()).sum::<f64>() / waypoints.len() as f64
}
