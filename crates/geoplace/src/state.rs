//! Camera view state, placed-model state and their configured ranges.

use geoplace_mesh::ScenePackage;

/// A closed numeric range with a default value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl Range {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Initial camera target (UC Berkeley campus).
pub const DEFAULT_LATITUDE: f64 = 37.871_903;
pub const DEFAULT_LONGITUDE: f64 = -122.258_536;

/// Zoom levels the camera may use ("view distance").
pub const VIEW_DISTANCE_RANGE: Range = Range {
    min: 8.0,
    max: 22.0,
    default: 15.0,
};

/// Multiplier range of the model scale slider.
pub const SCALE_RANGE: Range = Range {
    min: 0.01,
    max: 3.0,
    default: 1.0,
};
pub const SCALE_STEP: f64 = 0.01;

/// Heading slider, degrees.
pub const HEADING_RANGE: Range = Range {
    min: 0.0,
    max: 360.0,
    default: 0.0,
};

/// Pitch slider, degrees.
pub const PITCH_RANGE: Range = Range {
    min: -90.0,
    max: 90.0,
    default: 0.0,
};

/// Altitude slider, metres. Snapped elevations may fall outside it.
pub const ALTITUDE_RANGE: Range = Range {
    min: -100.0,
    max: 1000.0,
    default: 0.0,
};

pub const DEFAULT_CAMERA_PITCH: f64 = 65.0;
pub const DEFAULT_CAMERA_BEARING: f64 = -20.0;

/// Largest extent of a freshly loaded model, in metres.
pub const MODEL_BASE_SIZE: f32 = 60.0;

/// Renderer units per unit of `ModelTransform::scale`, in metres.
///
/// Packages keep their source units and `base_scale` already maps the model's
/// largest extent to [`MODEL_BASE_SIZE`], so this stays at one.
pub const MODEL_BASE_UNIT: f64 = 1.0;

/// The camera's geographic view state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraViewState {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
    /// Degrees from straight down.
    pub pitch: f64,
    /// Degrees clockwise from north.
    pub bearing: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for CameraViewState {
    fn default() -> Self {
        create_initial_view_state(VIEW_DISTANCE_RANGE.default)
    }
}

/// A partial update of [`CameraViewState`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialViewState {
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub zoom: Option<f64>,
    pub pitch: Option<f64>,
    pub bearing: Option<f64>,
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
}

impl PartialViewState {
    /// Recentre on a location, leaving everything else alone.
    pub fn center(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }

    pub fn zoom(zoom: f64) -> Self {
        Self {
            zoom: Some(zoom),
            ..Self::default()
        }
    }
}

impl From<CameraViewState> for PartialViewState {
    fn from(state: CameraViewState) -> Self {
        Self {
            longitude: Some(state.longitude),
            latitude: Some(state.latitude),
            zoom: Some(state.zoom),
            pitch: Some(state.pitch),
            bearing: Some(state.bearing),
            min_zoom: Some(state.min_zoom),
            max_zoom: Some(state.max_zoom),
        }
    }
}

/// Orientation and size of the placed model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    /// Absolute size factor: `base_scale × slider multiplier`.
    pub scale: f64,
    /// Heading in degrees.
    pub rotation: f64,
    /// Pitch in degrees.
    pub pitch: f64,
}

/// Geographic anchor of the placed model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPosition {
    pub lat: f64,
    pub lng: f64,
    /// Metres above the ellipsoid.
    pub altitude: f64,
}

/// Everything the renderer needs to draw the placed model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    /// Exported scene; `None` until a model has been loaded.
    pub scenegraph_source: Option<ScenePackage>,
    /// Normalization scale of the loaded model.
    pub base_scale: f64,
    pub transform: ModelTransform,
    pub position: ModelPosition,
}

impl Default for ModelState {
    fn default() -> Self {
        create_model_state()
    }
}

impl ModelState {
    pub fn has_model(&self) -> bool {
        self.scenegraph_source
            .as_ref()
            .is_some_and(|source| !source.is_empty())
    }
}

/// Clamp a zoom level to [`VIEW_DISTANCE_RANGE`].
pub fn clamp_zoom(value: f64) -> f64 {
    if value.is_nan() {
        return VIEW_DISTANCE_RANGE.default;
    }
    VIEW_DISTANCE_RANGE.clamp(value)
}

pub fn clamp_latitude(value: f64) -> f64 {
    value.clamp(-90.0, 90.0)
}

pub fn clamp_longitude(value: f64) -> f64 {
    value.clamp(-180.0, 180.0)
}

pub fn clamp_scale_multiplier(value: f64) -> f64 {
    if value.is_nan() {
        return SCALE_RANGE.default;
    }
    SCALE_RANGE.clamp(value)
}

/// The view state used at boot.
pub fn create_initial_view_state(zoom: f64) -> CameraViewState {
    CameraViewState {
        longitude: DEFAULT_LONGITUDE,
        latitude: DEFAULT_LATITUDE,
        zoom: clamp_zoom(zoom),
        pitch: DEFAULT_CAMERA_PITCH,
        bearing: DEFAULT_CAMERA_BEARING,
        min_zoom: VIEW_DISTANCE_RANGE.min,
        max_zoom: VIEW_DISTANCE_RANGE.max,
    }
}

/// An empty model state at the default location.
pub fn create_model_state() -> ModelState {
    ModelState {
        scenegraph_source: None,
        base_scale: 1.0,
        transform: ModelTransform {
            scale: 1.0,
            rotation: 0.0,
            pitch: 0.0,
        },
        position: ModelPosition {
            lat: DEFAULT_LATITUDE,
            lng: DEFAULT_LONGITUDE,
            altitude: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clamp_zoom_bounds() {
        assert!((clamp_zoom(5.0) - 8.0).abs() < f64::EPSILON);
        assert!((clamp_zoom(30.0) - 22.0).abs() < f64::EPSILON);
        assert!((clamp_zoom(12.5) - 12.5).abs() < f64::EPSILON);
        assert!((clamp_zoom(f64::NEG_INFINITY) - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_initial_view_state_defaults() {
        let state = create_initial_view_state(14.0);
        assert!((state.latitude - 37.871_903).abs() < 1e-9);
        assert!((state.longitude + 122.258_536).abs() < 1e-9);
        assert!((state.zoom - 14.0).abs() < f64::EPSILON);
        assert!((state.pitch - 65.0).abs() < f64::EPSILON);
        assert!((state.bearing + 20.0).abs() < f64::EPSILON);
        assert!((state.min_zoom - 8.0).abs() < f64::EPSILON);
        assert!((state.max_zoom - 22.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_initial_view_state_clamps_zoom() {
        assert!((create_initial_view_state(3.0).zoom - 8.0).abs() < f64::EPSILON);
        assert!((create_initial_view_state(40.0).zoom - 22.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_model_state_defaults() {
        let state = create_model_state();
        assert!(state.scenegraph_source.is_none());
        assert!(!state.has_model());
        assert!((state.base_scale - 1.0).abs() < f64::EPSILON);
        assert!((state.transform.scale - 1.0).abs() < f64::EPSILON);
        assert!(state.transform.rotation.abs() < f64::EPSILON);
        assert!(state.transform.pitch.abs() < f64::EPSILON);
        assert!((state.position.lat - DEFAULT_LATITUDE).abs() < f64::EPSILON);
        assert!((state.position.lng - DEFAULT_LONGITUDE).abs() < f64::EPSILON);
        assert!(state.position.altitude.abs() < f64::EPSILON);
    }

    #[test]
    fn test_scale_multiplier_clamp() {
        assert!((clamp_scale_multiplier(0.0) - 0.01).abs() < f64::EPSILON);
        assert!((clamp_scale_multiplier(7.0) - 3.0).abs() < f64::EPSILON);
        assert!((clamp_scale_multiplier(f64::NAN) - 1.0).abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn test_clamp_zoom_in_range(value in -1.0e6f64..1.0e6) {
            let zoom = clamp_zoom(value);
            prop_assert!((VIEW_DISTANCE_RANGE.min..=VIEW_DISTANCE_RANGE.max).contains(&zoom));
            if (VIEW_DISTANCE_RANGE.min..=VIEW_DISTANCE_RANGE.max).contains(&value) {
                prop_assert!((zoom - value).abs() < f64::EPSILON);
            }
        }
    }
}
