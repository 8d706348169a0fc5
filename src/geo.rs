//! Great-circle geometry on (latitude, longitude) degrees.

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// One knot in km/h.
pub const KT_TO_KMH: f64 = 1.852;

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

pub fn kt_to_kmh(speed_kt: f64) -> f64 {
    speed_kt * KT_TO_KMH
}

/// Haversine distance in kilometers.
pub fn distance_km(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Initial great-circle bearing from `a` to `b`, degrees clockwise from north.
pub fn initial_bearing_deg(a: LatLon, b: LatLon) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Destination point after travelling `distance_km` along `bearing_deg`.
pub fn destination(start: LatLon, bearing_deg: f64, distance_km: f64) -> LatLon {
    let ang = distance_km / EARTH_RADIUS_KM;
    let brg = bearing_deg.to_radians();
    let lat1 = start.lat.to_radians();
    let lon1 = start.lon.to_radians();
    let lat2 = (lat1.sin() * ang.cos() + lat1.cos() * ang.sin() * brg.cos()).asin();
    let lon2 =
        lon1 + (brg.sin() * ang.sin() * lat1.cos()).atan2(ang.cos() - lat1.sin() * lat2.sin());
    LatLon::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Advance from `from` toward `to` by `travel_km`, arriving exactly at the
/// goal when `travel_km` covers the remaining distance. Intermediate points
/// are linear in lat/lon, matching per-tick vessel movement.
pub fn move_toward(from: LatLon, to: LatLon, travel_km: f64) -> LatLon {
    let remaining = distance_km(from, to);
    if remaining <= f64::EPSILON || travel_km >= remaining {
        return to;
    }
    let ratio = (travel_km / remaining).clamp(0.0, 1.0);
    LatLon::new(
        from.lat + (to.lat - from.lat) * ratio,
        from.lon + (to.lon - from.lon) * ratio,
    )
}
