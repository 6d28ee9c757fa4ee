//! The Bevy side of the scene port.
//!
//! [`BevyRenderer`] records what the coordinator asks for. ECS systems read it
//! each frame and bring the camera, the model entity and the tile loader in
//! line, using the revision counters to skip unchanged state.

use std::collections::HashMap;

use geoplace::mesh::ScenePackage;
use geoplace::scene::{ControllerConfig, LayerStack, SceneHandle, SceneRenderer};
use geoplace::state::CameraViewState;

#[derive(Debug)]
pub struct BevyRenderer {
    view_state: CameraViewState,
    controller: ControllerConfig,
    layers: LayerStack,
    scenes: HashMap<SceneHandle, ScenePackage>,
    next_handle: u64,
    view_revision: u64,
    layers_revision: u64,
}

impl BevyRenderer {
    pub fn new(view_state: CameraViewState, controller: ControllerConfig) -> Self {
        Self {
            view_state,
            controller,
            layers: LayerStack::default(),
            scenes: HashMap::new(),
            next_handle: 0,
            view_revision: 0,
            layers_revision: 0,
        }
    }

    pub fn view_state(&self) -> &CameraViewState {
        &self.view_state
    }

    pub fn controller(&self) -> ControllerConfig {
        self.controller
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// The package behind a registered handle.
    pub fn scene(&self, handle: SceneHandle) -> Option<&ScenePackage> {
        self.scenes.get(&handle)
    }

    pub fn live_scenes(&self) -> usize {
        self.scenes.len()
    }

    pub fn view_revision(&self) -> u64 {
        self.view_revision
    }

    pub fn layers_revision(&self) -> u64 {
        self.layers_revision
    }
}

impl SceneRenderer for BevyRenderer {
    fn apply_view_state(&mut self, view_state: &CameraViewState) {
        self.view_state = *view_state;
        self.view_revision += 1;
    }

    fn apply_controller(&mut self, config: ControllerConfig) {
        self.controller = config;
    }

    fn apply_layers(&mut self, layers: &LayerStack) {
        if self.layers == *layers {
            return;
        }
        self.layers = layers.clone();
        self.layers_revision += 1;
    }

    fn register_scene(&mut self, package: &ScenePackage) -> SceneHandle {
        self.next_handle += 1;
        let handle = SceneHandle(self.next_handle);
        self.scenes.insert(handle, package.clone());
        handle
    }

    fn release_scene(&mut self, handle: SceneHandle) {
        if self.scenes.remove(&handle).is_none() {
            tracing::warn!(?handle, "Released an unknown scene");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use geoplace::mesh::PackageFormat;
    use geoplace::scene::{CameraMode, SceneCoordinator, TILE_LAYER_ID};
    use geoplace::state::{ModelState, create_initial_view_state};

    use super::*;

    fn coordinator() -> SceneCoordinator<BevyRenderer> {
        let view = create_initial_view_state(15.0);
        SceneCoordinator::new(
            BevyRenderer::new(view, CameraMode::Orbit.controller_config()),
            view,
            false,
            CameraMode::Orbit,
        )
    }

    fn model() -> ModelState {
        let mut model = ModelState::default();
        model.scenegraph_source = Some(ScenePackage {
            format: PackageFormat::Binary,
            bytes: Arc::from(&b"glTF"[..]),
        });
        model
    }

    #[test]
    fn test_layers_revision_tracks_changes() {
        let mut scene = coordinator();
        let before = scene.renderer().layers_revision();

        scene.initialize_layers("key");
        let after = scene.renderer().layers_revision();
        assert!(after > before);
        assert_eq!(
            scene.renderer().layers().tiles.as_ref().map(|t| t.id),
            Some(TILE_LAYER_ID)
        );

        scene.initialize_layers("key");
        assert_eq!(scene.renderer().layers_revision(), after);
    }

    #[test]
    fn test_model_updates_keep_one_live_scene() {
        let mut scene = coordinator();
        let model = model();
        for _ in 0..3 {
            scene.update_model(Some(&model));
        }
        assert_eq!(scene.renderer().live_scenes(), 1);

        let handle = scene.owned_scene().unwrap();
        assert_eq!(
            scene.renderer().scene(handle),
            model.scenegraph_source.as_ref()
        );

        scene.shutdown();
        assert_eq!(scene.renderer().live_scenes(), 0);
        assert!(scene.renderer().layers().model.is_none());
    }

    #[test]
    fn test_view_state_is_recorded() {
        let mut scene = coordinator();
        let before = scene.renderer().view_revision();
        scene.set_view_state(geoplace::PartialViewState::zoom(12.0));
        assert!(scene.renderer().view_revision() > before);
        assert!((scene.renderer().view_state().zoom - 12.0).abs() < f64::EPSILON);
    }
}
