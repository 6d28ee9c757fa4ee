//! The scene coordinator: the single owner of renderer-facing state.
//!
//! [`SceneCoordinator`] keeps the authoritative [`CameraViewState`], the basemap
//! tile layer and the transient model layer, and pushes every change through a
//! [`SceneRenderer`]. Renderer callbacks come back in as [`RendererEvent`]s and
//! leave as [`SceneEvent`]s for the application controller to drain.

use std::collections::VecDeque;

use geoplace_mesh::ScenePackage;

use crate::providers::GOOGLE_API_KEY_HEADER;
use crate::providers::tileset::{TilesetInfo, build_tiles_url};
use crate::state::{CameraViewState, MODEL_BASE_UNIT, ModelState, PartialViewState, clamp_zoom};

pub const TILE_LAYER_ID: &str = "google-3d-tiles";
pub const MODEL_LAYER_ID: &str = "uploaded-model";

/// Identifies a scene package registered with the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneHandle(pub u64);

/// What a primary-button drag does to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMode {
    #[default]
    Pan,
    Rotate,
}

/// Camera interaction style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraMode {
    #[default]
    Orbit,
    Free,
}

impl CameraMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Orbit => "Orbit",
            Self::Free => "Free",
        }
    }

    pub fn controller_config(self) -> ControllerConfig {
        match self {
            Self::Orbit => ControllerConfig {
                double_click_zoom: true,
                drag_mode: DragMode::Pan,
                inertia_ms: 400,
                keyboard: true,
            },
            Self::Free => ControllerConfig {
                double_click_zoom: true,
                drag_mode: DragMode::Rotate,
                inertia_ms: 0,
                keyboard: true,
            },
        }
    }
}

/// Camera controller settings handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub double_click_zoom: bool,
    pub drag_mode: DragMode,
    pub inertia_ms: u32,
    pub keyboard: bool,
}

/// The streamed photorealistic basemap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileLayer {
    pub id: &'static str,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
}

impl TileLayer {
    pub fn google(api_key: &str) -> Self {
        Self {
            id: TILE_LAYER_ID,
            url: build_tiles_url(api_key),
            headers: vec![(GOOGLE_API_KEY_HEADER, api_key.to_string())],
        }
    }
}

/// The user's model, drawn once at a geographic anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelLayer {
    pub id: &'static str,
    pub scene: SceneHandle,
    /// `[lng, lat, altitude]`.
    pub position: [f64; 3],
    /// `[pitch, yaw, roll]` in degrees, with heading as the roll component.
    pub orientation: [f64; 3],
    pub size_scale: f64,
    pub animation_speed: f64,
    pub pickable: bool,
}

/// Layers in draw order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerStack {
    pub tiles: Option<TileLayer>,
    pub model: Option<ModelLayer>,
}

/// The port through which the coordinator drives a renderer.
pub trait SceneRenderer {
    fn apply_view_state(&mut self, view_state: &CameraViewState);
    fn apply_controller(&mut self, config: ControllerConfig);
    fn apply_layers(&mut self, layers: &LayerStack);
    fn register_scene(&mut self, package: &ScenePackage) -> SceneHandle;
    fn release_scene(&mut self, handle: SceneHandle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Start,
    Move,
    End,
}

/// Raw callbacks from the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererEvent {
    /// The user moved the camera.
    ViewStateChanged(PartialViewState),
    TilesetLoaded(TilesetInfo),
    TileLoaded(String),
    TileError(String),
    /// `coordinate` is `(lat, lng)` on the ground, if the click hit it.
    Click { coordinate: Option<(f64, f64)> },
    Drag {
        phase: DragPhase,
        coordinate: Option<(f64, f64)>,
        layer_id: Option<String>,
    },
    ModelError(String),
}

/// Notifications for the application controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    ViewStateChanged(CameraViewState),
    TilesetLoaded(TilesetInfo),
    TileLoaded(String),
    TileError(String),
    MapClicked { lat: f64, lng: f64 },
    ModelError(String),
    ModelDragStart { lat: f64, lng: f64 },
    ModelDrag { lat: f64, lng: f64 },
    ModelDragEnd,
}

pub struct SceneCoordinator<R> {
    renderer: R,
    view_state: CameraViewState,
    auto_center: bool,
    camera_mode: CameraMode,
    controller: ControllerConfig,
    layers: LayerStack,
    owned_scene: Option<SceneHandle>,
    events: VecDeque<SceneEvent>,
}

impl<R: SceneRenderer> SceneCoordinator<R> {
    pub fn new(
        mut renderer: R,
        initial_view_state: CameraViewState,
        auto_center: bool,
        camera_mode: CameraMode,
    ) -> Self {
        let controller = camera_mode.controller_config();
        let layers = LayerStack::default();

        renderer.apply_controller(controller);
        renderer.apply_view_state(&initial_view_state);
        renderer.apply_layers(&layers);

        Self {
            renderer,
            view_state: initial_view_state,
            auto_center,
            camera_mode,
            controller,
            layers,
            owned_scene: None,
            events: VecDeque::new(),
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn view_state(&self) -> CameraViewState {
        self.view_state
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera_mode
    }

    pub fn controller_config(&self) -> ControllerConfig {
        self.controller
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    pub fn owned_scene(&self) -> Option<SceneHandle> {
        self.owned_scene
    }

    /// Take all pending events, oldest first.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    /// Create the basemap layer. Later calls are ignored.
    pub fn initialize_layers(&mut self, api_key: &str) {
        if self.layers.tiles.is_some() {
            return;
        }
        tracing::info!("Initializing photorealistic tile layer");
        self.layers.tiles = Some(TileLayer::google(api_key));
        self.renderer.apply_layers(&self.layers);
    }

    pub fn set_camera_mode(&mut self, mode: CameraMode) {
        if mode == self.camera_mode {
            return;
        }
        self.camera_mode = mode;
        self.controller = mode.controller_config();
        self.renderer.apply_controller(self.controller);
    }

    /// Override the drag behaviour for the current gesture.
    pub fn set_drag_mode(&mut self, drag_mode: DragMode) {
        if self.controller.drag_mode == drag_mode {
            return;
        }
        self.controller.drag_mode = drag_mode;
        self.renderer.apply_controller(self.controller);
    }

    /// Restore the camera mode's own drag behaviour.
    pub fn reset_drag_mode(&mut self) {
        let config = self.camera_mode.controller_config();
        if self.controller == config {
            return;
        }
        self.controller = config;
        self.renderer.apply_controller(self.controller);
    }

    /// Merge a partial update into the view state and push it to the renderer.
    ///
    /// Zoom is re-clamped and the configured zoom bounds cannot be changed.
    pub fn set_view_state(&mut self, partial: PartialViewState) {
        let current = self.view_state;
        let merged = CameraViewState {
            longitude: partial.longitude.unwrap_or(current.longitude),
            latitude: partial.latitude.unwrap_or(current.latitude),
            zoom: clamp_zoom(partial.zoom.unwrap_or(current.zoom)),
            pitch: partial.pitch.unwrap_or(current.pitch),
            bearing: partial.bearing.unwrap_or(current.bearing),
            min_zoom: current.min_zoom,
            max_zoom: current.max_zoom,
        };

        self.view_state = merged;
        self.renderer.apply_view_state(&merged);
        self.events.push_back(SceneEvent::ViewStateChanged(merged));
    }

    /// Mirror the placed model into the renderer.
    ///
    /// The previously registered scene is always released before a new one is
    /// registered.
    pub fn update_model(&mut self, model: Option<&ModelState>) {
        self.release_owned_scene();

        let Some((model, package)) = model.and_then(|model| {
            model
                .scenegraph_source
                .as_ref()
                .filter(|package| !package.is_empty())
                .map(|package| (model, package))
        }) else {
            self.layers.model = None;
            self.renderer.apply_layers(&self.layers);
            return;
        };

        let handle = self.renderer.register_scene(package);
        self.owned_scene = Some(handle);

        self.layers.model = Some(ModelLayer {
            id: MODEL_LAYER_ID,
            scene: handle,
            position: [model.position.lng, model.position.lat, model.position.altitude],
            orientation: [model.transform.pitch, 0.0, model.transform.rotation],
            size_scale: model.transform.scale * MODEL_BASE_UNIT,
            animation_speed: 0.0,
            pickable: true,
        });
        self.renderer.apply_layers(&self.layers);
    }

    pub fn handle_renderer_event(&mut self, event: RendererEvent) {
        match event {
            RendererEvent::ViewStateChanged(partial) => self.set_view_state(partial),
            RendererEvent::TilesetLoaded(info) => {
                if self.auto_center
                    && let Some(center) = info.center
                {
                    self.set_view_state(PartialViewState {
                        latitude: Some(center.lat),
                        longitude: Some(center.lng),
                        zoom: Some(info.zoom.unwrap_or(self.view_state.zoom)),
                        ..PartialViewState::default()
                    });
                }
                self.events.push_back(SceneEvent::TilesetLoaded(info));
            }
            RendererEvent::TileLoaded(tile) => {
                self.events.push_back(SceneEvent::TileLoaded(tile));
            }
            RendererEvent::TileError(error) => {
                self.events.push_back(SceneEvent::TileError(error));
            }
            RendererEvent::ModelError(error) => {
                self.events.push_back(SceneEvent::ModelError(error));
            }
            RendererEvent::Click { coordinate } => {
                if let Some((lat, lng)) = coordinate {
                    self.events.push_back(SceneEvent::MapClicked { lat, lng });
                }
            }
            RendererEvent::Drag {
                phase,
                coordinate,
                layer_id,
            } => {
                let Some((lat, lng)) = coordinate else {
                    return;
                };
                if layer_id.as_deref() != Some(MODEL_LAYER_ID) {
                    return;
                }
                self.events.push_back(match phase {
                    DragPhase::Start => SceneEvent::ModelDragStart { lat, lng },
                    DragPhase::Move => SceneEvent::ModelDrag { lat, lng },
                    DragPhase::End => SceneEvent::ModelDragEnd,
                });
            }
        }
    }

    /// Release everything the coordinator owns in the renderer.
    pub fn shutdown(&mut self) {
        self.release_owned_scene();
        self.layers.model = None;
        self.renderer.apply_layers(&self.layers);
    }

    fn release_owned_scene(&mut self) {
        if let Some(handle) = self.owned_scene.take() {
            self.renderer.release_scene(handle);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{Call, FakeRenderer};
    use super::*;
    use crate::geodesy::LatLngAlt;
    use crate::state::{create_initial_view_state, create_model_state};
    use geoplace_mesh::PackageFormat;
    use std::sync::Arc;

    fn coordinator(auto_center: bool) -> SceneCoordinator<FakeRenderer> {
        SceneCoordinator::new(
            FakeRenderer::default(),
            create_initial_view_state(15.0),
            auto_center,
            CameraMode::Orbit,
        )
    }

    fn loaded_model() -> ModelState {
        let mut model = create_model_state();
        model.scenegraph_source = Some(ScenePackage {
            format: PackageFormat::Binary,
            bytes: Arc::from(&b"glTF"[..]),
        });
        model.transform.scale = 2.5;
        model.transform.rotation = 90.0;
        model.transform.pitch = 10.0;
        model.position.altitude = 12.0;
        model
    }

    #[test]
    fn test_new_pushes_initial_state() {
        let scene = coordinator(false);
        let calls = &scene.renderer().calls;
        assert!(calls.contains(&Call::Controller(CameraMode::Orbit.controller_config())));
        assert!(calls.contains(&Call::ViewState(create_initial_view_state(15.0))));
    }

    #[test]
    fn test_initialize_layers_is_idempotent() {
        let mut scene = coordinator(false);
        scene.initialize_layers("key-1");
        scene.initialize_layers("key-2");

        let tiles = scene.layers().tiles.as_ref().unwrap();
        assert_eq!(tiles.url, "https://tile.googleapis.com/v1/3dtiles/root.json?key=key-1");
        assert_eq!(tiles.headers, vec![("X-GOOG-API-KEY", "key-1".to_string())]);

        let layer_pushes = scene
            .renderer()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Layers(layers) if layers.tiles.is_some()))
            .count();
        assert_eq!(layer_pushes, 1);
    }

    #[test]
    fn test_camera_mode_configs() {
        let orbit = CameraMode::Orbit.controller_config();
        assert_eq!(orbit.drag_mode, DragMode::Pan);
        assert_eq!(orbit.inertia_ms, 400);
        assert!(orbit.double_click_zoom && orbit.keyboard);

        let free = CameraMode::Free.controller_config();
        assert_eq!(free.drag_mode, DragMode::Rotate);
        assert_eq!(free.inertia_ms, 0);
        assert!(free.double_click_zoom && free.keyboard);
    }

    #[test]
    fn test_set_camera_mode_noop_when_unchanged() {
        let mut scene = coordinator(false);
        let before = scene.renderer().calls.len();
        scene.set_camera_mode(CameraMode::Orbit);
        assert_eq!(scene.renderer().calls.len(), before);

        scene.set_camera_mode(CameraMode::Free);
        assert_eq!(scene.camera_mode(), CameraMode::Free);
        assert_eq!(
            scene.renderer().last_controller(),
            Some(CameraMode::Free.controller_config())
        );
    }

    #[test]
    fn test_drag_mode_override_and_reset() {
        let mut scene = coordinator(false);
        scene.set_drag_mode(DragMode::Rotate);
        assert_eq!(scene.controller_config().drag_mode, DragMode::Rotate);
        assert_eq!(scene.controller_config().inertia_ms, 400);

        scene.reset_drag_mode();
        assert_eq!(scene.controller_config(), CameraMode::Orbit.controller_config());
        assert_eq!(
            scene.renderer().last_controller(),
            Some(CameraMode::Orbit.controller_config())
        );
    }

    #[test]
    fn test_set_view_state_merges_and_clamps() {
        let mut scene = coordinator(false);
        scene.set_view_state(PartialViewState {
            latitude: Some(10.0),
            zoom: Some(40.0),
            min_zoom: Some(0.0),
            max_zoom: Some(30.0),
            ..PartialViewState::default()
        });

        let state = scene.view_state();
        assert!((state.latitude - 10.0).abs() < f64::EPSILON);
        assert!((state.longitude - create_initial_view_state(15.0).longitude).abs() < f64::EPSILON);
        assert!((state.zoom - 22.0).abs() < f64::EPSILON);
        assert!((state.min_zoom - 8.0).abs() < f64::EPSILON);
        assert!((state.max_zoom - 22.0).abs() < f64::EPSILON);

        assert_eq!(scene.renderer().calls.last(), Some(&Call::ViewState(state)));
        assert_eq!(scene.drain_events(), vec![SceneEvent::ViewStateChanged(state)]);
        assert!(scene.drain_events().is_empty());
    }

    #[test]
    fn test_update_model_builds_layer() {
        let mut scene = coordinator(false);
        let model = loaded_model();
        scene.update_model(Some(&model));

        let layer = scene.layers().model.clone().unwrap();
        assert_eq!(layer.id, MODEL_LAYER_ID);
        assert_eq!(
            layer.position,
            [model.position.lng, model.position.lat, 12.0]
        );
        assert_eq!(layer.orientation, [10.0, 0.0, 90.0]);
        assert!((layer.size_scale - 2.5 * MODEL_BASE_UNIT).abs() < f64::EPSILON);
        assert!(layer.animation_speed.abs() < f64::EPSILON);
        assert!(layer.pickable);
        assert_eq!(scene.owned_scene(), Some(layer.scene));
    }

    #[test]
    fn test_update_model_releases_before_register() {
        let mut scene = coordinator(false);
        let model = loaded_model();
        scene.update_model(Some(&model));
        scene.update_model(Some(&model));
        scene.update_model(Some(&model));

        assert_eq!(scene.renderer().live.len(), 1);
        let lifecycle: Vec<_> = scene
            .renderer()
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Register(_) | Call::Release(_)))
            .cloned()
            .collect();
        assert_eq!(
            lifecycle,
            vec![
                Call::Register(SceneHandle(1)),
                Call::Release(SceneHandle(1)),
                Call::Register(SceneHandle(2)),
                Call::Release(SceneHandle(2)),
                Call::Register(SceneHandle(3)),
            ]
        );
    }

    #[test]
    fn test_update_model_none_removes_layer() {
        let mut scene = coordinator(false);
        scene.update_model(Some(&loaded_model()));
        scene.update_model(None);

        assert!(scene.layers().model.is_none());
        assert!(scene.owned_scene().is_none());
        assert!(scene.renderer().live.is_empty());

        scene.update_model(Some(&create_model_state()));
        assert!(scene.layers().model.is_none());
        assert_eq!(scene.renderer().last_layers(), Some(&LayerStack::default()));
    }

    #[test]
    fn test_tileset_auto_center() {
        let mut scene = coordinator(true);
        let info = TilesetInfo {
            center: Some(LatLngAlt::new(48.85, 2.35, 0.0)),
            zoom: None,
        };
        scene.handle_renderer_event(RendererEvent::TilesetLoaded(info));

        let state = scene.view_state();
        assert!((state.latitude - 48.85).abs() < f64::EPSILON);
        assert!((state.longitude - 2.35).abs() < f64::EPSILON);
        assert!((state.zoom - 15.0).abs() < f64::EPSILON);

        let events = scene.drain_events();
        assert!(matches!(events[0], SceneEvent::ViewStateChanged(_)));
        assert_eq!(events[1], SceneEvent::TilesetLoaded(info));
    }

    #[test]
    fn test_tileset_without_auto_center() {
        let mut scene = coordinator(false);
        let before = scene.view_state();
        scene.handle_renderer_event(RendererEvent::TilesetLoaded(TilesetInfo {
            center: Some(LatLngAlt::new(48.85, 2.35, 0.0)),
            zoom: Some(12.0),
        }));
        assert_eq!(scene.view_state(), before);

        let mut auto = coordinator(true);
        auto.handle_renderer_event(RendererEvent::TilesetLoaded(TilesetInfo::default()));
        assert_eq!(auto.view_state(), before);
    }

    #[test]
    fn test_clicks_without_coordinate_are_ignored() {
        let mut scene = coordinator(false);
        scene.handle_renderer_event(RendererEvent::Click { coordinate: None });
        scene.handle_renderer_event(RendererEvent::Click {
            coordinate: Some((1.0, 2.0)),
        });
        assert_eq!(
            scene.drain_events(),
            vec![SceneEvent::MapClicked { lat: 1.0, lng: 2.0 }]
        );
    }

    #[test]
    fn test_drag_attribution() {
        let mut scene = coordinator(false);
        let drag = |phase, layer: Option<&str>| RendererEvent::Drag {
            phase,
            coordinate: Some((1.0, 2.0)),
            layer_id: layer.map(str::to_string),
        };

        scene.handle_renderer_event(drag(DragPhase::Start, Some(TILE_LAYER_ID)));
        scene.handle_renderer_event(drag(DragPhase::Start, None));
        scene.handle_renderer_event(RendererEvent::Drag {
            phase: DragPhase::Move,
            coordinate: None,
            layer_id: Some(MODEL_LAYER_ID.to_string()),
        });
        assert!(scene.drain_events().is_empty());

        scene.handle_renderer_event(drag(DragPhase::Start, Some(MODEL_LAYER_ID)));
        scene.handle_renderer_event(drag(DragPhase::Move, Some(MODEL_LAYER_ID)));
        scene.handle_renderer_event(drag(DragPhase::End, Some(MODEL_LAYER_ID)));
        assert_eq!(
            scene.drain_events(),
            vec![
                SceneEvent::ModelDragStart { lat: 1.0, lng: 2.0 },
                SceneEvent::ModelDrag { lat: 1.0, lng: 2.0 },
                SceneEvent::ModelDragEnd,
            ]
        );
    }

    #[test]
    fn test_user_camera_moves_keep_zoom_bounds() {
        let mut scene = coordinator(false);
        scene.handle_renderer_event(RendererEvent::ViewStateChanged(PartialViewState {
            bearing: Some(45.0),
            zoom: Some(3.0),
            ..PartialViewState::default()
        }));

        let state = scene.view_state();
        assert!((state.bearing - 45.0).abs() < f64::EPSILON);
        assert!((state.zoom - 8.0).abs() < f64::EPSILON);
        assert_eq!(scene.drain_events(), vec![SceneEvent::ViewStateChanged(state)]);
    }

    #[test]
    fn test_errors_are_forwarded() {
        let mut scene = coordinator(false);
        scene.handle_renderer_event(RendererEvent::TileError("quota".into()));
        scene.handle_renderer_event(RendererEvent::ModelError("bad mesh".into()));
        assert_eq!(
            scene.drain_events(),
            vec![
                SceneEvent::TileError("quota".into()),
                SceneEvent::ModelError("bad mesh".into()),
            ]
        );
    }

    #[test]
    fn test_shutdown_releases_scene() {
        let mut scene = coordinator(false);
        scene.update_model(Some(&loaded_model()));
        scene.shutdown();
        assert!(scene.renderer().live.is_empty());
        assert!(scene.owned_scene().is_none());
    }
}
