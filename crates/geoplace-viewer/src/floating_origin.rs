//! Floating origin for rendering geographic positions with f32 precision.
//!
//! The scene is laid out in a Y-up East-North-Up frame whose origin is the
//! camera's view centre on the ellipsoid. Anchored entities keep their f64
//! geographic position and are re-projected whenever the origin moves.

use bevy::prelude::*;
use geoplace::geodesy::{EnuFrame, LatLngAlt};
use geoplace::state::{DEFAULT_LATITUDE, DEFAULT_LONGITUDE};

use crate::controller::{AppController, ViewerSet};

/// Plugin for the floating origin coordinate system.
pub struct FloatingOriginPlugin;

impl Plugin for FloatingOriginPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FloatingOrigin>()
            .add_systems(Update, follow_view_center.in_set(ViewerSet::Sync))
            .add_systems(PostUpdate, update_anchored_transforms);
    }
}

/// The tangent frame every anchored transform is expressed in.
#[derive(Resource)]
pub struct FloatingOrigin {
    pub frame: EnuFrame,
}

impl Default for FloatingOrigin {
    fn default() -> Self {
        Self {
            frame: EnuFrame::new(LatLngAlt::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE, 0.0)),
        }
    }
}

impl FloatingOrigin {
    /// Scene position of a geographic point, relative to the origin.
    pub fn to_scene(&self, position: LatLngAlt) -> Vec3 {
        self.frame.to_scene(position).as_vec3()
    }

    /// Geographic position of a scene point.
    pub fn to_geographic(&self, scene: Vec3) -> Option<LatLngAlt> {
        self.frame.from_scene(scene.as_dvec3())
    }
}

/// High-precision geographic position for an entity.
///
/// The entity's `Transform::translation` is overwritten from this each frame.
#[derive(Component, Clone, Copy, Debug)]
pub struct GeoAnchor(pub LatLngAlt);

/// Move the origin to the current view centre.
pub(crate) fn follow_view_center(
    controller: Res<AppController>,
    mut origin: ResMut<FloatingOrigin>,
) {
    let view = controller.renderer().view_state();
    let center = LatLngAlt::new(view.latitude, view.longitude, 0.0);
    if origin.frame.origin != center {
        origin.frame = EnuFrame::new(center);
    }
}

/// Update all anchored transforms to be relative to the floating origin.
///
/// This runs in `PostUpdate` so every origin move of the frame is applied.
fn update_anchored_transforms(
    origin: Res<FloatingOrigin>,
    mut query: Query<(&GeoAnchor, &mut Transform)>,
) {
    for (anchor, mut transform) in &mut query {
        transform.translation = origin.to_scene(anchor.0);
    }
}
