//! Distance and voyage-time figures derived from path geometry.

use shared::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;
const KM_PER_NAUTICAL_MILE: f64 = 1.852;

/// Cruising speed the routing service assumes when it estimates voyage time.
pub const DEFAULT_SPEED_KNOTS: f64 = 15.0;

pub fn path_length_km(path: &[GeoPoint]) -> f64 {
    path.windows(2).map(|w| haversine_km(w[0], w[1])).sum()
}

pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat().to_radians();
    let lat2 = b.lat().to_radians();
    let dlat = (b.lat() - a.lat()).to_radians();
    let dlon = (b.lon() - a.lon()).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

pub fn travel_time_hours(distance_km: f64, speed_knots: f64) -> f64 {
    round2(distance_km / (speed_knots * KM_PER_NAUTICAL_MILE))
}

/// Fills the summary numbers the service left out: distance from the path
/// geometry, time from the distance at [`DEFAULT_SPEED_KNOTS`].
pub fn fill_route_figures(
    path: &[GeoPoint],
    distance_km: Option<f64>,
    estimated_time_hours: Option<f64>,
) -> (f64, f64) {
    let distance = distance_km.unwrap_or_else(|| round2(path_length_km(path)));
    let time =
        estimated_time_hours.unwrap_or_else(|| travel_time_hours(distance, DEFAULT_SPEED_KNOTS));
    (distance, time)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
