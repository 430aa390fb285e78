//! Great-circle helpers.
use crate::place::Coordinates;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Initial compass bearing from `from` to `to` in degrees, within `[0, 360)`.
///
/// Identical points yield 0. Antipodal points yield whatever `atan2` settles
/// on; the heading is undefined there and callers get no special treatment.
#[must_use]
pub fn bearing(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();

    normalize_degrees(y.atan2(x).to_degrees())
}

/// Fold an angle in `(-360, 360)` into `[0, 360)`.
#[must_use]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let folded = (degrees + 360.0) % 360.0;
    // -1e-14 + 360 rounds to exactly 360.0 before the modulo on some inputs.
    if folded >= 360.0 { 0.0 } else { folded }
}

/// Great-circle distance in kilometres (haversine).
#[must_use]
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Total distance along a path of coordinates.
#[must_use]
pub fn path_length_km(points: &[Coordinates]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_km(pair[0], pair[1]))
        .sum()
}
