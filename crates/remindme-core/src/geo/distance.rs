use super::Location;

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two locations, rounded to whole meters.
///
/// Uses the Haversine formula on a sphere of radius [`EARTH_RADIUS_M`].
/// Identical coordinates yield exactly `0.0`.
pub fn distance_meters(a: &Location, b: &Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat_2 = (dlat / 2.0).sin();
    let sin_dlon_2 = (dlon / 2.0).sin();
    let h = sin_dlat_2 * sin_dlat_2 + lat1.cos() * lat2.cos() * sin_dlon_2 * sin_dlon_2;
    // Rounding error can push h a hair past 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    (EARTH_RADIUS_M * c).round()
}

/// `true` when `target` lies inside the circle around `center`.
///
/// The boundary counts as inside.
pub fn is_within_radius(center: &Location, target: &Location, radius_m: f64) -> bool {
    distance_meters(center, target) <= radius_m
}

/// Format a distance for display: `"850m"` below a kilometre, `"2.3km"` above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters.round() as i64)
    } else {
        let tenths_of_km = (meters / 100.0).round();
        format!("{:.1}km", tenths_of_km / 10.0)
    }
}
