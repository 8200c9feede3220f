use serde::{Deserialize, Serialize};

use crate::math::GeoPoint;

/// Axis-aligned latitude/longitude rectangle in degrees. Bounds are inclusive.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeoBounds {
    pub min: GeoPoint,
    pub max: GeoPoint,
}

impl GeoBounds {
    pub fn new(min: GeoPoint, max: GeoPoint) -> Self {
        GeoBounds { min, max }
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.latitude >= self.min.latitude
            && p.latitude <= self.max.latitude
            && p.longitude >= self.min.longitude
            && p.longitude <= self.max.longitude
    }
}

/// Visible map rectangle: a center plus the angular span (degrees) on each axis.
///
/// Spans are expected to be finite and strictly positive. Smaller `span_lat`
/// means the map is zoomed further in.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: GeoPoint,
    pub span_lat: f64,
    pub span_lon: f64,
}

impl Viewport {
    pub fn new(center: GeoPoint, span_lat: f64, span_lon: f64) -> Self {
        Self {
            center,
            span_lat,
            span_lon,
        }
    }

    /// `center ± span / 2` on both axes. No antimeridian or pole handling.
    pub fn bounds(&self) -> GeoBounds {
        let half_lat = self.span_lat * 0.5;
        let half_lon = self.span_lon * 0.5;
        GeoBounds::new(
            GeoPoint::new(
                self.center.latitude - half_lat,
                self.center.longitude - half_lon,
            ),
            GeoPoint::new(
                self.center.latitude + half_lat,
                self.center.longitude + half_lon,
            ),
        )
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        self.bounds().contains(p)
    }

    pub fn has_valid_span(&self) -> bool {
        self.span_lat.is_finite()
            && self.span_lon.is_finite()
            && self.span_lat > 0.0
            && self.span_lon > 0.0
    }
}
