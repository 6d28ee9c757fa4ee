//! The application controller.
//!
//! [`Controller`] owns the placed-model state and a [`SceneCoordinator`]. Hosts
//! feed it [`Message`]s and execute the [`Effect`]s it queues; results of async
//! work come back as token-stamped messages so late responses are ignored.

pub mod message;
pub mod screenshot;
pub mod search;
pub mod start_screen;

use geoplace_mesh::PreparedModel;

use crate::config::{Config, GOOGLE_MAPS_API_KEY_VAR};
use crate::model::{
    ElevationResult, detect_model_format, elevation_failure_status, format_altitude,
    format_coordinates, format_degrees, format_scale_multiplier,
};
use crate::pan::{KeyboardPan, PanDirection};
use crate::providers::elevation::ELEVATION_KEY_MISSING;
use crate::providers::geocode::GeocodeProvider;
use crate::scene::{CameraMode, DragMode, SceneCoordinator, SceneEvent, SceneRenderer};
use crate::state::{
    CameraViewState, MODEL_BASE_SIZE, ModelPosition, ModelState, ModelTransform,
    PartialViewState, SCALE_RANGE, clamp_latitude, clamp_longitude, clamp_scale_multiplier,
    clamp_zoom, create_model_state,
};

pub use message::{
    ClipboardOutcome, Effect, Message, PointerButton, RequestToken, SaveOutcome,
    ScreenshotImage, Timer, TokenSource, TransformMode,
};
pub use screenshot::{SCREENSHOT_FILE_NAME, ScreenshotState};
pub use search::{SearchPanel, SearchState};
pub use start_screen::{StartPhase, StartScreen};

use start_screen::{FALLBACK_DELAY_MS, LAUNCH_DELAY_MS};

/// Text of the lat/lng inputs in the model panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionInputs {
    pub lat: String,
    pub lng: String,
}

pub struct Controller<R> {
    config: Config,
    geocoder: Option<GeocodeProvider>,
    scene: SceneCoordinator<R>,
    view_state: CameraViewState,

    model: ModelState,
    model_label: Option<&'static str>,
    scale_multiplier: f64,
    transform_mode: TransformMode,
    placing: bool,
    dragging: bool,
    position_inputs: PositionInputs,

    pan: KeyboardPan,
    search: SearchState,
    screenshot: ScreenshotState,
    start: StartScreen,
    status: String,
    labels_visible: bool,
    booted: bool,

    tokens: TokenSource,
    pending_decode: Option<RequestToken>,
    pending_elevation: Option<RequestToken>,
    effects: Vec<Effect>,
}

impl<R: SceneRenderer> Controller<R> {
    pub fn new(
        renderer: R,
        config: Config,
        initial_view_state: CameraViewState,
        camera_mode: CameraMode,
    ) -> Self {
        let scene = SceneCoordinator::new(
            renderer,
            initial_view_state,
            config.auto_center_tileset,
            camera_mode,
        );

        let mut controller = Self {
            geocoder: GeocodeProvider::from_config(&config),
            config,
            scene,
            view_state: initial_view_state,
            model: create_model_state(),
            model_label: None,
            scale_multiplier: SCALE_RANGE.default,
            transform_mode: TransformMode::default(),
            placing: false,
            dragging: false,
            position_inputs: PositionInputs::default(),
            pan: KeyboardPan::default(),
            search: SearchState::default(),
            screenshot: ScreenshotState::default(),
            start: StartScreen::default(),
            status: String::new(),
            labels_visible: true,
            booted: false,
            tokens: TokenSource::default(),
            pending_decode: None,
            pending_elevation: None,
            effects: Vec::new(),
        };
        controller.sync_position_inputs();
        controller.set_status("Initializing photorealistic scene...");
        controller
    }

    pub fn update(&mut self, message: Message) {
        self.dispatch(message);
        self.process_scene_events();
    }

    fn dispatch(&mut self, message: Message) {
        match message {
            Message::Boot => self.boot(),
            Message::OpenModelPicker => self.effects.push(Effect::PickModelFile),
            Message::FileSelected(file) => {
                let Some(format) = detect_model_format(&file.name) else {
                    self.set_status("Only .gltf, .glb or .obj files are supported.");
                    return;
                };
                tracing::info!(name = %file.name, bytes = file.bytes.len(), "Loading model file");
                self.set_status(format!("Loading {} model...", format.label()));
                let token = self.tokens.issue();
                self.pending_decode = Some(token);
                self.effects.push(Effect::DecodeModel {
                    token,
                    file,
                    target_size: MODEL_BASE_SIZE,
                });
            }
            Message::ModelDecoded { token, result } => {
                if self.pending_decode != Some(token) {
                    tracing::debug!(?token, "Dropping stale model");
                    return;
                }
                self.pending_decode = None;
                match result {
                    Ok(prepared) => self.place_model(prepared),
                    Err(error) => {
                        tracing::error!("Model load failed: {error}");
                        self.set_status("Model failed to load. Check console for details.");
                    }
                }
            }
            Message::PointerMoved { coordinate } => {
                if self.placing
                    && self.model.has_model()
                    && let Some((lat, lng)) = coordinate
                {
                    self.update_model_position(lat, lng);
                }
            }
            Message::PointerPressed { button, ctrl } => {
                if ctrl || button == PointerButton::Secondary {
                    self.scene.set_drag_mode(DragMode::Rotate);
                } else if button == PointerButton::Primary {
                    self.scene.set_drag_mode(DragMode::Pan);
                }
            }
            Message::PointerReleased => self.scene.reset_drag_mode(),
            Message::Renderer(event) => self.scene.handle_renderer_event(event),

            Message::ScaleChanged(raw) => {
                if !self.model.has_model() {
                    return;
                }
                self.scale_multiplier = clamp_scale_multiplier(raw);
                self.model.transform.scale = self.model.base_scale * self.scale_multiplier;
                self.update_model_layer();
            }
            Message::RotationChanged(rotation) => {
                if !self.model.has_model() {
                    return;
                }
                self.model.transform.rotation = rotation;
                self.update_model_layer();
            }
            Message::PitchChanged(pitch) => {
                if !self.model.has_model() {
                    return;
                }
                self.model.transform.pitch = pitch;
                self.update_model_layer();
            }
            Message::AltitudeChanged(altitude) => {
                if !self.model.has_model() {
                    return;
                }
                self.model.position.altitude = altitude;
                self.update_model_layer();
            }
            Message::ViewDistanceChanged(zoom) => {
                self.scene.set_view_state(PartialViewState::zoom(clamp_zoom(zoom)));
            }
            Message::LatitudeInputChanged(text) => self.position_inputs.lat = text,
            Message::LongitudeInputChanged(text) => self.position_inputs.lng = text,
            Message::CommitPositionInputs => self.commit_position_inputs(),
            Message::CenterModelOnCamera => {
                if !self.model.has_model() {
                    self.set_status("Load a model before aligning to camera.");
                    return;
                }
                self.update_model_position(self.view_state.latitude, self.view_state.longitude);
                self.set_status("Model centered on current camera view.");
            }
            Message::SetTransformMode(mode) => self.set_transform_mode(mode),
            Message::SetCameraMode(mode) => self.scene.set_camera_mode(mode),
            Message::DropToTerrain => self.drop_to_terrain(),
            Message::ElevationCompleted { token, result } => {
                self.elevation_completed(token, result);
            }

            Message::KeyDown {
                key,
                text_input_focused,
            } => {
                if text_input_focused {
                    return;
                }
                if let Some(direction) = PanDirection::from_key(&key)
                    && self.pan.key_down(direction)
                {
                    self.effects.push(Effect::RequestAnimationFrame);
                }
            }
            Message::KeyUp { key } => {
                if let Some(direction) = PanDirection::from_key(&key) {
                    self.pan.key_up(direction);
                }
            }
            Message::WindowBlur => self.pan.clear(),
            Message::AnimationFrame { timestamp } => {
                let view = self.scene.view_state();
                let Some(step) = self.pan.tick(timestamp, view.zoom) else {
                    return;
                };
                if step.delta_lat != 0.0 || step.delta_lng != 0.0 {
                    self.scene.set_view_state(PartialViewState::center(
                        clamp_latitude(view.latitude + step.delta_lat),
                        clamp_longitude(view.longitude + step.delta_lng),
                    ));
                }
                self.effects.push(Effect::RequestAnimationFrame);
            }

            Message::SearchTextChanged(text) => self.search_text_changed(text),
            Message::SearchSubmitted => self.run_search(),
            Message::SearchFocusLost => self.search_focus_lost(),
            Message::GeocodeCompleted { token, result } => self.geocode_completed(token, result),
            Message::SearchResultChosen(index) => self.search_result_chosen(index),

            Message::CaptureScreenshot => self.capture_screenshot(),
            Message::ScreenshotCaptured(image) => self.screenshot_captured(image),
            Message::ScreenshotFailed(error) => self.screenshot_failed(&error),
            Message::ClipboardWritten(outcome) => self.clipboard_written(outcome),
            Message::DownloadScreenshot => self.download_screenshot(),
            Message::ScreenshotSaved(outcome) => self.screenshot_saved(outcome),
            Message::CloseScreenshotModal => self.close_screenshot_modal(),

            Message::ToggleLabels => self.labels_visible = !self.labels_visible,
            Message::ProviderStatusClicked => {
                if self.config.google_maps_api_key.is_some() {
                    self.set_status("Google photorealistic tiles active.");
                } else {
                    self.set_status(format!(
                        "Missing API key. Update {GOOGLE_MAPS_API_KEY_VAR} and reload."
                    ));
                }
            }
            Message::StartPressed => {
                if self.start.press() {
                    let token = self.tokens.issue();
                    self.start.launch = Some(token);
                    self.effects.push(Effect::Schedule {
                        timer: Timer::StartLaunch,
                        token,
                        delay_ms: LAUNCH_DELAY_MS,
                    });
                }
            }
            Message::TimerElapsed { timer, token } => match timer {
                Timer::SearchDebounce | Timer::SearchBlur => {
                    self.search_timer_elapsed(timer, token);
                }
                Timer::StartFallback => {
                    if self.start.fallback == Some(token) {
                        self.start.fallback_elapsed();
                    }
                }
                Timer::StartLaunch => {
                    if self.start.launch == Some(token) {
                        self.start.launch_elapsed();
                    }
                }
            },
            Message::Shutdown => {
                self.pan.clear();
                self.scene.shutdown();
            }
        }
    }

    /// Take all queued effects, oldest first.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scene(&self) -> &SceneCoordinator<R> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneCoordinator<R> {
        &mut self.scene
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn view_state(&self) -> CameraViewState {
        self.view_state
    }

    pub fn model(&self) -> &ModelState {
        &self.model
    }

    pub fn has_model(&self) -> bool {
        self.model.has_model()
    }

    /// Upper-case format of the loaded model, e.g. `"GLB"`.
    pub fn model_label(&self) -> Option<&'static str> {
        self.model_label
    }

    pub fn transform_mode(&self) -> TransformMode {
        self.transform_mode
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.scene.camera_mode()
    }

    pub fn is_placing(&self) -> bool {
        self.placing
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn is_loading_model(&self) -> bool {
        self.pending_decode.is_some()
    }

    pub fn is_snapping(&self) -> bool {
        self.pending_elevation.is_some()
    }

    pub fn labels_visible(&self) -> bool {
        self.labels_visible
    }

    pub fn position_inputs(&self) -> &PositionInputs {
        &self.position_inputs
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn screenshot(&self) -> &ScreenshotState {
        &self.screenshot
    }

    pub fn start_screen(&self) -> &StartScreen {
        &self.start
    }

    pub fn scale_multiplier(&self) -> f64 {
        self.scale_multiplier
    }

    pub fn scale_label(&self) -> String {
        format_scale_multiplier(self.scale_multiplier)
    }

    pub fn heading_label(&self) -> String {
        format_degrees(self.model.transform.rotation)
    }

    pub fn pitch_label(&self) -> String {
        format_degrees(self.model.transform.pitch)
    }

    pub fn altitude_label(&self) -> String {
        format_altitude(self.model.position.altitude)
    }

    pub fn coordinates_label(&self) -> String {
        format_coordinates(self.view_state.latitude, self.view_state.longitude)
    }

    pub fn view_distance_label(&self) -> String {
        format!("{:.1}", clamp_zoom(self.view_state.zoom))
    }

    pub fn provider_ready(&self) -> bool {
        self.config.google_maps_api_key.is_some()
    }

    pub fn provider_badge(&self) -> &'static str {
        if self.provider_ready() {
            "READY"
        } else {
            "MISSING KEY"
        }
    }

    pub fn provider_tooltip(&self) -> String {
        if self.provider_ready() {
            "Google photorealistic tiles enabled.".to_string()
        } else {
            format!("Set {GOOGLE_MAPS_API_KEY_VAR} to enable streaming.")
        }
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        tracing::debug!(status = %self.status, "status");
        self.start.status_changed(&self.status);
    }

    fn boot(&mut self) {
        if self.booted {
            return;
        }
        self.booted = true;

        let Some(key) = self.config.google_maps_api_key.clone() else {
            tracing::warn!("{GOOGLE_MAPS_API_KEY_VAR} is not set, starting without tiles");
            self.start.offer_without_map(&format!(
                "Missing {GOOGLE_MAPS_API_KEY_VAR}. You can still enter to view the UI."
            ));
            self.set_status(format!(
                "Missing {GOOGLE_MAPS_API_KEY_VAR}. Photorealistic tiles will not load."
            ));
            return;
        };

        let message = "Loading Google photorealistic 3D tiles...";
        self.start.show_loading(message);
        self.set_status(message);
        self.scene.initialize_layers(&key);

        let token = self.tokens.issue();
        self.start.fallback = Some(token);
        self.effects.push(Effect::Schedule {
            timer: Timer::StartFallback,
            token,
            delay_ms: FALLBACK_DELAY_MS,
        });
    }

    fn process_scene_events(&mut self) {
        for event in self.scene.drain_events() {
            match event {
                SceneEvent::ViewStateChanged(view_state) => self.view_state = view_state,
                SceneEvent::TilesetLoaded(info) => {
                    tracing::info!(center = ?info.center, "Tileset loaded");
                    self.set_status("Photorealistic 3D map ready. Load a model to continue.");
                    self.start.mark_ready("Photorealistic 3D map ready.");
                }
                SceneEvent::TileLoaded(tile) => tracing::debug!(%tile, "Tile loaded"),
                SceneEvent::TileError(error) => {
                    tracing::error!("Tile error: {error}");
                    self.set_status("Failed to load Google photorealistic tiles. Verify API quota.");
                    self.start.tile_failed();
                }
                SceneEvent::MapClicked { lat, lng } => self.handle_map_placement(lat, lng),
                SceneEvent::ModelError(error) => {
                    tracing::error!("Scene package load error: {error}");
                    self.set_status("Model failed to render. See console for details.");
                }
                SceneEvent::ModelDragStart { lat, lng } => {
                    if !self.model.has_model()
                        || self.transform_mode != TransformMode::Translate
                        || self.placing
                    {
                        continue;
                    }
                    self.dragging = true;
                    self.set_status("Dragging model. Release to drop.");
                    self.update_model_position(lat, lng);
                }
                SceneEvent::ModelDrag { lat, lng } => {
                    if self.dragging
                        && self.model.has_model()
                        && self.transform_mode == TransformMode::Translate
                    {
                        self.update_model_position(lat, lng);
                    }
                }
                SceneEvent::ModelDragEnd => {
                    if self.dragging {
                        self.dragging = false;
                        self.set_status("Model moved. Adjust altitude if needed.");
                    }
                }
            }
        }
    }

    fn place_model(&mut self, prepared: PreparedModel) {
        tracing::info!(
            format = %prepared.format,
            triangles = prepared.triangle_count,
            "Placing model"
        );

        let base_scale = f64::from(prepared.base_scale);
        self.model = ModelState {
            scenegraph_source: Some(prepared.package),
            base_scale,
            transform: ModelTransform {
                scale: base_scale,
                rotation: 0.0,
                pitch: 0.0,
            },
            position: ModelPosition {
                lat: self.view_state.latitude,
                lng: self.view_state.longitude,
                altitude: 0.0,
            },
        };
        self.model_label = Some(prepared.format.label());
        self.scale_multiplier = SCALE_RANGE.default;
        self.pending_elevation = None;
        self.dragging = false;
        self.sync_position_inputs();
        self.placing = true;
        self.set_transform_mode(TransformMode::Translate);

        self.update_model_layer();
        self.set_status(format!(
            "{} model loaded. Move cursor, then click to place on the map.",
            prepared.format.label()
        ));
    }

    fn handle_map_placement(&mut self, lat: f64, lng: f64) {
        if !self.model.has_model() {
            self.set_status("Load a model before placing it on the map.");
            return;
        }
        if self.placing {
            self.placing = false;
            self.update_model_position(lat, lng);
            self.set_status("Model placed. Dropping to terrain...");
            self.drop_to_terrain();
            return;
        }
        if self.transform_mode != TransformMode::Translate {
            self.set_status("Switch to Move mode to reposition the model.");
            return;
        }
        if self.dragging {
            return;
        }
        self.update_model_position(lat, lng);
        self.set_status("Model moved to selected map location.");
    }

    fn drop_to_terrain(&mut self) {
        if !self.model.has_model() {
            self.set_status("Load a model before dropping it to terrain.");
            return;
        }
        if self.placing {
            self.set_status("Click the map to place the model before dropping it to terrain.");
            return;
        }
        if self.pending_elevation.is_some() {
            self.set_status("Terrain lookup already in progress.");
            return;
        }
        self.set_status("Aligning model with terrain...");

        let Some(key) = self.config.google_maps_api_key.clone() else {
            self.set_status(elevation_failure_status(Some(ELEVATION_KEY_MISSING)));
            return;
        };

        let token = self.tokens.issue();
        self.pending_elevation = Some(token);
        self.effects.push(Effect::LookupElevation {
            token,
            lat: self.model.position.lat,
            lng: self.model.position.lng,
            key,
        });
    }

    fn elevation_completed(&mut self, token: RequestToken, result: ElevationResult) {
        if self.pending_elevation != Some(token) {
            tracing::debug!(?token, "Dropping stale elevation");
            return;
        }
        self.pending_elevation = None;

        let Some(altitude) = result.altitude else {
            self.set_status(elevation_failure_status(result.reason.as_deref()));
            return;
        };
        if !self.model.has_model() {
            return;
        }
        self.model.position.altitude = altitude;
        self.update_model_layer();
        self.set_status("Model snapped to ground elevation.");
    }

    fn commit_position_inputs(&mut self) {
        if !self.model.has_model() {
            self.set_status("Load a model before adjusting position.");
            return;
        }
        let lat = parse_coordinate(&self.position_inputs.lat, self.model.position.lat);
        let lng = parse_coordinate(&self.position_inputs.lng, self.model.position.lng);
        self.update_model_position(lat, lng);
        self.set_status("Model coordinates updated.");
    }

    fn set_transform_mode(&mut self, mode: TransformMode) {
        self.transform_mode = mode;
        self.set_status(mode.status());
    }

    fn update_model_position(&mut self, lat: f64, lng: f64) {
        // An elevation reply for the old coordinates no longer applies.
        if self.pending_elevation.take().is_some() {
            tracing::debug!("Model moved, dropping pending elevation lookup");
        }
        self.model.position.lat = clamp_latitude(lat);
        self.model.position.lng = clamp_longitude(lng);
        self.sync_position_inputs();
        self.update_model_layer();
    }

    fn update_model_layer(&mut self) {
        let model = self.model.has_model().then_some(&self.model);
        self.scene.update_model(model);
    }

    fn sync_position_inputs(&mut self) {
        self.position_inputs = PositionInputs {
            lat: format!("{:.6}", self.model.position.lat),
            lng: format!("{:.6}", self.model.position.lng),
        };
    }
}

/// Parse a coordinate field, keeping `fallback` for anything non-numeric.
fn parse_coordinate(text: &str, fallback: f64) -> f64 {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(fallback)
}
