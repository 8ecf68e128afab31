//! Great-circle distance and proximity classification

use crate::contract::{AttendanceStatus, GeoPoint};

/// Mean Earth radius, kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Haversine distance between two points, kilometres
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push h slightly above 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Present inside the radius (boundary included), absent outside
pub fn proximity_status(distance_km: f64, radius_km: f64) -> AttendanceStatus {
    if distance_km <= radius_km {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Absent
    }
}
