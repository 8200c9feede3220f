use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// WGS84 semi-major axis (meters), used as the radius of the reference sphere.
pub const WGS84_A: f64 = 6_378_137.0;

/// Geographic position in degrees.
///
/// Latitude is expected in `[-90, 90]` and longitude in `[-180, 180]`.
/// Nothing here clamps; out-of-range input is the caller's problem.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    pub fn is_in_range(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Great-circle distance in meters (haversine on a sphere of radius [`WGS84_A`]).
///
/// Exactly symmetric and exactly zero for identical points. NaN in, NaN out.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let sin_half_lat = (d_lat * 0.5).sin();
    let sin_half_lon = (d_lon * 0.5).sin();
    let h = sin_half_lat * sin_half_lat + lat_a.cos() * lat_b.cos() * sin_half_lon * sin_half_lon;

    // Rounding can push `h` a hair past 1 for antipodal points. `clamp`
    // keeps NaN, unlike `min`.
    let h = h.clamp(0.0, 1.0);
    2.0 * WGS84_A * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Destination reached from `from` after travelling `distance_m` along the
/// initial bearing `bearing_rad` (0 = north, clockwise).
///
/// The bearing is reduced modulo 2π. The returned longitude is wrapped into
/// `[-180, 180)`.
pub fn offset(from: GeoPoint, distance_m: f64, bearing_rad: f64) -> GeoPoint {
    let bearing = bearing_rad.rem_euclid(TAU);
    let angular = distance_m / WGS84_A;

    let lat1 = from.latitude.to_radians();
    let lon1 = from.longitude.to_radians();
    let (sin_lat1, cos_lat1) = lat1.sin_cos();
    let (sin_ang, cos_ang) = angular.sin_cos();

    let sin_lat2 = (sin_lat1 * cos_ang + cos_lat1 * sin_ang * bearing.cos()).clamp(-1.0, 1.0);
    let lat2 = sin_lat2.asin();
    let lon2 = lon1 + (bearing.sin() * sin_ang * cos_lat1).atan2(cos_ang - sin_lat1 * sin_lat2);

    GeoPoint::new(lat2.to_degrees(), wrap_longitude(lon2.to_degrees()))
}

fn wrap_longitude(lon_deg: f64) -> f64 {
    if (-180.0..180.0).contains(&lon_deg) {
        return lon_deg;
    }
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}
