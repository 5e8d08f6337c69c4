use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

const EARTH_MEAN_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters, by the haversine formula.
pub fn distance_coord_to_coord(from: &Coord, to: &Coord) -> f64 {
    let (from_lat, to_lat) = (from.lat.to_radians(), to.lat.to_radians());
    let half_delta_lat = (to_lat - from_lat) / 2.0;
    let half_delta_lon = (to.lon - from.lon).to_radians() / 2.0;
    let chord = half_delta_lat.sin().powi(2)
        + from_lat.cos() * to_lat.cos() * half_delta_lon.sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_METERS * chord.sqrt().asin()
}

/// A (lat_min, lat_max, lon_min, lon_max) box containing every point within
/// `radius` meters of `center`. Cheap pre-filter only : points inside the
/// box still need the exact distance check.
pub fn bounding_box(center: Coord, radius: f64) -> (f64, f64, f64, f64) {
    let lat_delta = (radius / EARTH_MEAN_RADIUS_METERS).to_degrees();
    let lon_delta = lat_delta / center.lat.to_radians().cos();
    (
        center.lat - lat_delta,
        center.lat + lat_delta,
        center.lon - lon_delta,
        center.lon + lon_delta,
    )
}

pub fn within_box(bbox: &(f64, f64, f64, f64), point: &Coord) -> bool {
    point.lat > bbox.0 && point.lat < bbox.1 && point.lon > bbox.2 && point.lon < bbox.3
}
