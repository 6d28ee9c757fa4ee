//! Photorealistic 3D Tiles root manifest.

use glam::{DMat4, DVec3};
use serde::Deserialize;

use crate::error::Result;
use crate::geodesy::{LatLngAlt, ecef_to_geodetic, geodetic_to_ecef, zoom_for_radius};

use super::ProviderClient;

pub const TILES_ROOT_URL: &str = "https://tile.googleapis.com/v1/3dtiles/root.json";

pub fn build_tiles_url(key: &str) -> String {
    format!("{TILES_ROOT_URL}?key={}", urlencoding::encode(key))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TilesetManifest {
    #[serde(default)]
    pub asset: Option<TilesetAsset>,
    #[serde(default)]
    pub geometric_error: Option<f64>,
    pub root: TileNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TilesetAsset {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileNode {
    pub bounding_volume: BoundingVolume,
    /// Column-major 4x4 matrix.
    #[serde(default)]
    pub transform: Option<Vec<f64>>,
    #[serde(default)]
    pub children: Vec<serde_json::Value>,
}

/// A 3D Tiles bounding volume; exactly one field is expected to be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundingVolume {
    /// Centre followed by three half-axis vectors.
    #[serde(default, rename = "box")]
    pub obb: Option<Vec<f64>>,
    /// `[west, south, east, north, min_height, max_height]`, radians and metres.
    #[serde(default)]
    pub region: Option<Vec<f64>>,
    /// Centre and radius.
    #[serde(default)]
    pub sphere: Option<Vec<f64>>,
}

/// Where the tileset sits on the globe, if anywhere in particular.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TilesetInfo {
    pub center: Option<LatLngAlt>,
    pub zoom: Option<f64>,
}

impl BoundingVolume {
    /// ECEF bounding sphere of the volume, before any tile transform.
    fn bounding_sphere(&self) -> Option<(DVec3, f64)> {
        if let Some(obb) = self.obb.as_deref()
            && obb.len() >= 12
        {
            let center = DVec3::new(obb[0], obb[1], obb[2]);
            let half_axes = [
                DVec3::new(obb[3], obb[4], obb[5]),
                DVec3::new(obb[6], obb[7], obb[8]),
                DVec3::new(obb[9], obb[10], obb[11]),
            ];
            let radius = half_axes.iter().map(|axis| axis.length_squared()).sum::<f64>().sqrt();
            return Some((center, radius));
        }

        if let Some(region) = self.region.as_deref()
            && region.len() >= 6
        {
            let [west, south, east, north] =
                [region[0], region[1], region[2], region[3]].map(f64::to_degrees);
            let (min_h, max_h) = (region[4], region[5]);
            let low = geodetic_to_ecef(LatLngAlt::new(south, west, min_h));
            let high = geodetic_to_ecef(LatLngAlt::new(north, east, max_h));
            let center = geodetic_to_ecef(LatLngAlt::new(
                (south + north) / 2.0,
                (west + east) / 2.0,
                (min_h + max_h) / 2.0,
            ));
            return Some((center, low.distance(high) / 2.0));
        }

        if let Some(sphere) = self.sphere.as_deref()
            && sphere.len() >= 4
        {
            return Some((DVec3::new(sphere[0], sphere[1], sphere[2]), sphere[3]));
        }

        None
    }
}

/// Derive the geographic centre and a framing zoom from the root tile.
///
/// A root volume centred on the Earth's core (a global tileset) has no
/// meaningful centre and yields an empty [`TilesetInfo`].
pub fn tileset_info(manifest: &TilesetManifest) -> TilesetInfo {
    let Some((mut center, mut radius)) = manifest.root.bounding_volume.bounding_sphere() else {
        return TilesetInfo::default();
    };

    if let Some(values) = manifest.root.transform.as_deref()
        && let Ok(cols) = <[f64; 16]>::try_from(values)
    {
        let transform = DMat4::from_cols_array(&cols);
        center = transform.transform_point3(center);
        let (scale, _, _) = transform.to_scale_rotation_translation();
        radius *= scale.abs().max_element();
    }

    match ecef_to_geodetic(center) {
        Some(center) => TilesetInfo {
            center: Some(center),
            zoom: zoom_for_radius(radius),
        },
        None => TilesetInfo::default(),
    }
}

impl ProviderClient {
    /// Fetch the tileset root manifest.
    pub async fn fetch_tileset(&self, key: &str) -> Result<TilesetManifest> {
        self.fetch_tileset_at(&build_tiles_url(key), Some(key)).await
    }

    /// Fetch a tileset manifest from an explicit root URL.
    pub async fn fetch_tileset_at(
        &self,
        url: &str,
        google_key: Option<&str>,
    ) -> Result<TilesetManifest> {
        self.fetch_json(url, google_key, "tileset manifest").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(json: &str) -> TilesetManifest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_build_tiles_url() {
        assert_eq!(
            build_tiles_url("abc"),
            "https://tile.googleapis.com/v1/3dtiles/root.json?key=abc"
        );
    }

    #[test]
    fn test_global_box_has_no_center() {
        let global = manifest(
            r#"{
                "asset": {"version": "1.0"},
                "geometricError": 100000000,
                "root": {
                    "boundingVolume": {"box": [0,0,0, 7972671,0,0, 0,7972671,0, 0,0,7945940.5]},
                    "children": [{"content": {"uri": "/v1/3dtiles/datasets/CgA/files/UlRPVEYuYnVsa21ldGFkYXRhLnBsYW5ldG9pZD1lYXJ0aCxidWxrX21ldGFkYXRhX2Vwb2NoPTk2MSxwYXRoPSxjYWNoZV92ZXJzaW9uPTY.json"}}]
                }
            }"#,
        );
        assert_eq!(tileset_info(&global), TilesetInfo::default());
        assert_eq!(global.root.children.len(), 1);
    }

    #[test]
    fn test_sphere_center() {
        let position = LatLngAlt::new(48.8584, 2.2945, 0.0);
        let ecef = geodetic_to_ecef(position);
        let json = format!(
            r#"{{"root": {{"boundingVolume": {{"sphere": [{}, {}, {}, 500]}}}}}}"#,
            ecef.x, ecef.y, ecef.z
        );

        let info = tileset_info(&manifest(&json));
        let center = info.center.unwrap();
        assert!((center.lat - position.lat).abs() < 1e-6);
        assert!((center.lng - position.lng).abs() < 1e-6);
        assert!(info.zoom.unwrap() > 10.0);
    }

    #[test]
    fn test_region_center() {
        let (west, south, east, north) = (
            (-122.5f64).to_radians(),
            37.7f64.to_radians(),
            (-122.3f64).to_radians(),
            37.9f64.to_radians(),
        );
        let json = format!(
            r#"{{"root": {{"boundingVolume": {{"region": [{west}, {south}, {east}, {north}, 0, 200]}}}}}}"#
        );

        let center = tileset_info(&manifest(&json)).center.unwrap();
        assert!((center.lat - 37.8).abs() < 1e-6);
        assert!((center.lng + 122.4).abs() < 1e-6);
        assert!((center.alt - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_root_transform_moves_center() {
        let ecef = geodetic_to_ecef(LatLngAlt::new(0.0, 90.0, 0.0));
        let json = format!(
            r#"{{"root": {{
                "transform": [1,0,0,0, 0,1,0,0, 0,0,1,0, {}, {}, {}, 1],
                "boundingVolume": {{"box": [0,0,0, 10,0,0, 0,10,0, 0,0,10]}}
            }}}}"#,
            ecef.x, ecef.y, ecef.z
        );

        let center = tileset_info(&manifest(&json)).center.unwrap();
        assert!(center.lat.abs() < 1e-6);
        assert!((center.lng - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_volume() {
        let empty = manifest(r#"{"root": {"boundingVolume": {}}}"#);
        assert_eq!(tileset_info(&empty), TilesetInfo::default());
    }
}
