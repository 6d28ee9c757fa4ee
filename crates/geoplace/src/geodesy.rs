//! WGS84 geodesy and local tangent frames.
//!
//! The renderer works in a local East-North-Up frame anchored at a geographic
//! origin, mapped onto a Y-up scene: east is `+X`, up is `+Y` and north is
//! `-Z`.

use glam::DVec3;

/// WGS84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis (meters).
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);
/// WGS84 second eccentricity squared.
pub const WGS84_EP2: f64 = (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);

/// Equatorial circumference used by web-mercator zoom levels (meters).
pub const EARTH_CIRCUMFERENCE: f64 = 40_075_016.686;
/// Tile size in pixels that zoom levels are defined against.
pub const TILE_SIZE: f64 = 512.0;

/// A geographic position in degrees and meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngAlt {
    pub lat: f64,
    pub lng: f64,
    pub alt: f64,
}

impl LatLngAlt {
    pub fn new(lat: f64, lng: f64, alt: f64) -> Self {
        Self { lat, lng, alt }
    }
}

/// Convert geodetic coordinates to ECEF.
pub fn geodetic_to_ecef(position: LatLngAlt) -> DVec3 {
    let (sin_lat, cos_lat) = position.lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = position.lng.to_radians().sin_cos();

    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    DVec3::new(
        (n + position.alt) * cos_lat * cos_lon,
        (n + position.alt) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + position.alt) * sin_lat,
    )
}

/// Convert ECEF to geodetic coordinates (Bowring's method).
///
/// Returns `None` for points too close to the Earth's centre to have a
/// meaningful surface position.
pub fn ecef_to_geodetic(ecef: DVec3) -> Option<LatLngAlt> {
    if ecef.length() < WGS84_B * 0.5 || !ecef.is_finite() {
        return None;
    }

    let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    let lon = ecef.y.atan2(ecef.x);

    let theta = (ecef.z * WGS84_A).atan2(p * WGS84_B);
    let (sin_theta, cos_theta) = theta.sin_cos();

    let lat = (ecef.z + WGS84_EP2 * WGS84_B * sin_theta.powi(3))
        .atan2(p - WGS84_E2 * WGS84_A * cos_theta.powi(3));

    let sin_lat = lat.sin();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    let alt = if lat.cos().abs() > 1e-9 {
        p / lat.cos() - n
    } else {
        ecef.z.abs() - WGS84_B
    };

    Some(LatLngAlt::new(lat.to_degrees(), lon.to_degrees(), alt))
}

/// East-North-Up tangent frame at a geographic origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnuFrame {
    pub origin: LatLngAlt,
    origin_ecef: DVec3,
    east: DVec3,
    north: DVec3,
    up: DVec3,
}

impl EnuFrame {
    pub fn new(origin: LatLngAlt) -> Self {
        let (sin_lat, cos_lat) = origin.lat.to_radians().sin_cos();
        let (sin_lon, cos_lon) = origin.lng.to_radians().sin_cos();

        Self {
            origin,
            origin_ecef: geodetic_to_ecef(origin),
            east: DVec3::new(-sin_lon, cos_lon, 0.0),
            north: DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
            up: DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
        }
    }

    /// ECEF point to `(east, north, up)` meters.
    pub fn ecef_to_enu(&self, ecef: DVec3) -> DVec3 {
        let d = ecef - self.origin_ecef;
        DVec3::new(d.dot(self.east), d.dot(self.north), d.dot(self.up))
    }

    /// `(east, north, up)` meters to an ECEF point.
    pub fn enu_to_ecef(&self, enu: DVec3) -> DVec3 {
        self.origin_ecef + self.east * enu.x + self.north * enu.y + self.up * enu.z
    }

    /// Geographic position to Y-up scene coordinates.
    pub fn to_scene(&self, position: LatLngAlt) -> DVec3 {
        enu_to_scene(self.ecef_to_enu(geodetic_to_ecef(position)))
    }

    /// Y-up scene coordinates to a geographic position.
    pub fn from_scene(&self, scene: DVec3) -> Option<LatLngAlt> {
        ecef_to_geodetic(self.enu_to_ecef(scene_to_enu(scene)))
    }
}

/// `(east, north, up)` to Y-up scene axes.
pub fn enu_to_scene(enu: DVec3) -> DVec3 {
    DVec3::new(enu.x, enu.z, -enu.y)
}

/// Y-up scene axes to `(east, north, up)`.
pub fn scene_to_enu(scene: DVec3) -> DVec3 {
    DVec3::new(scene.x, -scene.z, scene.y)
}

/// Ground resolution of a zoom level at a latitude, in meters per pixel.
pub fn meters_per_pixel(latitude: f64, zoom: f64) -> f64 {
    EARTH_CIRCUMFERENCE * latitude.to_radians().cos().abs().max(1e-6) / (TILE_SIZE * zoom.exp2())
}

/// Camera distance that shows `viewport_height` pixels at `zoom`.
pub fn camera_distance(latitude: f64, zoom: f64, viewport_height: f64) -> f64 {
    1.5 * viewport_height * meters_per_pixel(latitude, zoom)
}

/// Zoom level whose camera distance would frame a sphere of `radius` meters.
pub fn zoom_for_radius(radius: f64) -> Option<f64> {
    (radius.is_finite() && radius > 0.0).then(|| (EARTH_CIRCUMFERENCE / (2.0 * radius)).log2())
}
