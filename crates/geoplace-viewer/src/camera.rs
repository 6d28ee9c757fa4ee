//! Orbit camera driven by the coordinator's view state.
//!
//! The camera always looks at the view centre, which is also the floating
//! origin. User gestures never move the camera directly: they are turned into
//! view-state updates and sent through the coordinator, and the camera follows
//! whatever view state the renderer last received.

use bevy::ecs::message::MessageReader;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::input::egui_wants_any_keyboard_input;
use geoplace::Message;
use geoplace::geodesy::camera_distance;
use geoplace::scene::{DragMode, RendererEvent};
use geoplace::state::{CameraViewState, PartialViewState, clamp_latitude, clamp_longitude};
use web_time::Instant;

use crate::controller::{AppController, Inbox, ViewerSet};
use crate::floating_origin::FloatingOrigin;
use crate::picking::{Pointer, cursor_ray, ground_point};

/// Highest pitch the orbit allows, in degrees from straight down.
pub const MAX_PITCH: f64 = 85.0;
/// Degrees of bearing or pitch per logical pixel of rotate-drag.
const ROTATE_SENSITIVITY: f64 = 0.25;
/// Two primary presses closer than this zoom in.
const DOUBLE_CLICK_SECS: f32 = 0.3;
/// Pan speeds below this (m/s) do not coast.
const MIN_INERTIA_SPEED: f32 = 0.5;

/// Plugin for the orbit camera.
pub struct CameraControllerPlugin;

impl Plugin for CameraControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraGesture>()
            .add_systems(Startup, spawn_camera)
            .add_systems(
                Update,
                (
                    camera_pointer_input.after(crate::picking::track_pointer),
                    camera_keyboard_input.run_if(not(egui_wants_any_keyboard_input)),
                )
                    .in_set(ViewerSet::Input),
            )
            .add_systems(
                Update,
                sync_camera_transform
                    .in_set(ViewerSet::Sync)
                    .after(crate::floating_origin::follow_view_center),
            );
    }
}

/// Marker for the camera that renders the scene.
#[derive(Component)]
pub struct OrbitCamera;

/// Gesture bookkeeping that outlives a single frame.
#[derive(Resource, Default)]
struct CameraGesture {
    /// Recent pan velocity in scene metres per second.
    pan_velocity: Vec3,
    coast: Option<Coast>,
    last_primary_press: Option<(Instant, Vec2)>,
}

/// Pan inertia after a release.
#[derive(Clone, Copy)]
struct Coast {
    velocity: Vec3,
    remaining: f32,
    duration: f32,
}

/// Camera placement for a view state, relative to the view centre.
///
/// East is +X, up is +Y and north is -Z. Pitch 0 looks straight down and
/// bearing rotates clockwise from north.
pub fn orbit_transform(view: &CameraViewState, viewport_height: f32) -> Transform {
    let distance = camera_distance(view.latitude, view.zoom, f64::from(viewport_height)) as f32;
    let pitch = view.pitch.clamp(0.0, MAX_PITCH).to_radians() as f32;
    let bearing = view.bearing.to_radians() as f32;

    let forward = Vec3::new(bearing.sin(), 0.0, -bearing.cos());
    let position = -forward * distance * pitch.sin() + Vec3::Y * distance * pitch.cos();
    let up = if pitch < 0.01 { forward } else { Vec3::Y };

    Transform::from_translation(position).looking_at(Vec3::ZERO, up)
}

/// Offset of the new view centre when zooming by `delta` levels about `point`.
///
/// `point` stays under the cursor; the current centre is the scene origin.
pub fn zoom_about(point: Vec3, delta: f64) -> Vec3 {
    let shrink = (-delta).exp2() as f32;
    point * (1.0 - shrink)
}

/// Bearing in `[-180, 180)`.
pub fn wrap_bearing(bearing: f64) -> f64 {
    (bearing + 180.0).rem_euclid(360.0) - 180.0
}

/// Accumulated changes for one frame.
#[derive(Default)]
struct ViewDelta {
    center_offset: Vec3,
    zoom: f64,
    bearing: f64,
    pitch: f64,
}

impl ViewDelta {
    fn is_zero(&self) -> bool {
        self.center_offset == Vec3::ZERO && self.zoom == 0.0 && self.bearing == 0.0 && self.pitch == 0.0
    }

    /// Add a zoom change, limited to the view's zoom bounds. Returns the applied step.
    fn zoom_step(&mut self, view: &CameraViewState, step: f64) -> f64 {
        let current = view.zoom + self.zoom;
        let applied = (current + step).clamp(view.min_zoom, view.max_zoom) - current;
        self.zoom += applied;
        applied
    }

    fn into_partial(self, view: &CameraViewState, origin: &FloatingOrigin) -> PartialViewState {
        let mut partial = PartialViewState::default();
        if self.center_offset != Vec3::ZERO
            && let Some(center) = origin.to_geographic(self.center_offset)
        {
            partial.latitude = Some(clamp_latitude(center.lat));
            partial.longitude = Some(clamp_longitude(center.lng));
        }
        if self.zoom != 0.0 {
            partial.zoom = Some(view.zoom + self.zoom);
        }
        if self.bearing != 0.0 {
            partial.bearing = Some(wrap_bearing(view.bearing + self.bearing));
        }
        if self.pitch != 0.0 {
            partial.pitch = Some((view.pitch + self.pitch).clamp(0.0, MAX_PITCH));
        }
        partial
    }
}

/// Set up the camera and lighting.
fn spawn_camera(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: std::f32::consts::FRAC_PI_4,
            near: 0.5,
            far: 20_000_000.0,
            ..Default::default()
        }),
        Transform::default(),
        OrbitCamera,
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 12_000.0,
            ..default()
        },
        Transform::from_xyz(0.4, 1.0, 0.3).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 3_000.0,
            ..default()
        },
        Transform::from_xyz(-0.5, 0.6, -0.4).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Turn drags and the wheel into view-state changes.
#[allow(clippy::too_many_arguments, clippy::needless_pass_by_value)]
fn camera_pointer_input(
    time: Res<Time>,
    mut wheel: MessageReader<MouseWheel>,
    mouse: Res<ButtonInput<MouseButton>>,
    pointer: Res<Pointer>,
    camera: Single<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    origin: Res<FloatingOrigin>,
    controller: Res<AppController>,
    inbox: Res<Inbox>,
    mut gesture: ResMut<CameraGesture>,
) {
    let (camera, camera_transform) = *camera;
    let config = controller.renderer().controller();
    let view = *controller.renderer().view_state();
    let dt = time.delta_secs();
    let mut delta = ViewDelta::default();

    let ground_at = |position: Vec2| {
        cursor_ray(camera, camera_transform, position).and_then(ground_point)
    };

    // Wheel zoom about the cursor.
    let mut scroll = 0.0;
    for event in wheel.read() {
        scroll += match event.unit {
            MouseScrollUnit::Line => f64::from(event.y) * 0.5,
            MouseScrollUnit::Pixel => f64::from(event.y) / 240.0,
        };
    }
    if scroll != 0.0
        && let Some(cursor) = pointer.cursor
    {
        let step = delta.zoom_step(&view, scroll);
        if let Some(point) = ground_at(cursor) {
            delta.center_offset += zoom_about(point, step);
        }
    }

    // Double-click zoom.
    if config.double_click_zoom
        && mouse.just_pressed(MouseButton::Left)
        && let Some(press) = pointer.press.filter(|p| p.button == MouseButton::Left)
    {
        let now = Instant::now();
        let is_double = gesture.last_primary_press.is_some_and(|(at, position)| {
            now.duration_since(at).as_secs_f32() < DOUBLE_CLICK_SECS
                && position.distance(press.origin) < crate::picking::CLICK_TOLERANCE
        });
        if is_double {
            gesture.last_primary_press = None;
            let step = delta.zoom_step(&view, 1.0);
            if let Some(point) = ground_at(press.origin) {
                delta.center_offset += zoom_about(point, step);
            }
        } else {
            gesture.last_primary_press = Some((now, press.origin));
        }
    }

    // Drags.
    match pointer.press {
        Some(press) if !press.on_model => {
            gesture.coast = None;
            // Secondary and middle drags always rotate.
            let mode = if press.button == MouseButton::Left {
                config.drag_mode
            } else {
                DragMode::Rotate
            };
            let moved = match (pointer.previous, pointer.cursor) {
                (Some(previous), Some(current)) if previous != current => Some((previous, current)),
                _ => None,
            };
            match mode {
                DragMode::Pan => {
                    let offset = moved
                        .and_then(|(previous, current)| Some(ground_at(previous)? - ground_at(current)?))
                        .unwrap_or(Vec3::ZERO);
                    delta.center_offset += offset;
                    if dt > 0.0 {
                        gesture.pan_velocity = gesture.pan_velocity.lerp(offset / dt, 0.5);
                    }
                }
                DragMode::Rotate => {
                    if let Some((previous, current)) = moved {
                        let moved = current - previous;
                        delta.bearing += f64::from(moved.x) * ROTATE_SENSITIVITY;
                        delta.pitch -= f64::from(moved.y) * ROTATE_SENSITIVITY;
                    }
                }
            }
        }
        Some(_) => gesture.pan_velocity = Vec3::ZERO,
        None => {
            // Start coasting on the frame after a pan release.
            if gesture.pan_velocity != Vec3::ZERO {
                let velocity = std::mem::take(&mut gesture.pan_velocity);
                if config.inertia_ms > 0 && velocity.length() > MIN_INERTIA_SPEED {
                    let duration = config.inertia_ms as f32 / 1000.0;
                    gesture.coast = Some(Coast {
                        velocity,
                        remaining: duration,
                        duration,
                    });
                }
            }
            if let Some(mut coast) = gesture.coast {
                let ease = (coast.remaining / coast.duration).clamp(0.0, 1.0);
                delta.center_offset += coast.velocity * ease * dt;
                coast.remaining -= dt;
                gesture.coast = (coast.remaining > 0.0).then_some(coast);
            }
        }
    }

    if !delta.is_zero() {
        let partial = delta.into_partial(&view, &origin);
        inbox.send(Message::Renderer(RendererEvent::ViewStateChanged(partial)));
    }
}

/// `+` and `-` zoom when the controller allows keyboard navigation.
#[allow(clippy::needless_pass_by_value)]
fn camera_keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    controller: Res<AppController>,
    inbox: Res<Inbox>,
) {
    if !controller.renderer().controller().keyboard {
        return;
    }
    let mut zoom = 0.0;
    if keyboard.any_just_pressed([KeyCode::Equal, KeyCode::NumpadAdd]) {
        zoom += 1.0;
    }
    if keyboard.any_just_pressed([KeyCode::Minus, KeyCode::NumpadSubtract]) {
        zoom -= 1.0;
    }
    if zoom != 0.0 {
        let view = controller.renderer().view_state();
        inbox.send(Message::Renderer(RendererEvent::ViewStateChanged(
            PartialViewState::zoom(view.zoom + zoom),
        )));
    }
}

/// Place the camera for the renderer's current view state.
#[allow(clippy::needless_pass_by_value)]
fn sync_camera_transform(
    controller: Res<AppController>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut camera: Single<&mut Transform, With<OrbitCamera>>,
) {
    let view = controller.renderer().view_state();
    **camera = orbit_transform(view, window.height().max(1.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoplace::state::create_initial_view_state;

    #[test]
    fn test_orbit_transform_looks_at_center() {
        let mut view = create_initial_view_state(15.0);
        view.pitch = 60.0;
        view.bearing = 0.0;

        let transform = orbit_transform(&view, 720.0);
        let expected = camera_distance(view.latitude, view.zoom, 720.0) as f32;
        assert!((transform.translation.length() - expected).abs() / expected < 1e-4);

        // Bearing 0 looks north, so the camera sits south (+Z) and above.
        assert!(transform.translation.z > 0.0);
        assert!(transform.translation.y > 0.0);
        let forward = *transform.forward();
        let to_center = (-transform.translation).normalize();
        assert!(forward.dot(to_center) > 0.999);
    }

    #[test]
    fn test_orbit_transform_straight_down() {
        let mut view = create_initial_view_state(15.0);
        view.pitch = 0.0;
        view.bearing = 90.0;

        let transform = orbit_transform(&view, 720.0);
        assert!(transform.translation.x.abs() < 1e-3);
        assert!(transform.translation.z.abs() < 1e-3);
        // Screen-up points along the bearing (east).
        assert!(transform.up().x > 0.99);
    }

    #[test]
    fn test_zoom_about_keeps_point() {
        let point = Vec3::new(100.0, 0.0, -40.0);
        assert_eq!(zoom_about(point, 0.0), Vec3::ZERO);

        let offset = zoom_about(point, 1.0);
        assert!((offset - point * 0.5).length() < 1e-4);

        let out = zoom_about(point, -1.0);
        assert!((out + point).length() < 1e-4);
    }

    #[test]
    fn test_zoom_step_stops_at_bounds() {
        let mut view = create_initial_view_state(15.0);
        view.zoom = view.max_zoom - 0.25;

        let mut delta = ViewDelta::default();
        assert!((delta.zoom_step(&view, 1.0) - 0.25).abs() < 1e-9);
        assert!(delta.zoom_step(&view, 1.0).abs() < 1e-9);
        assert!((delta.zoom_step(&view, -1.0) + 1.0).abs() < 1e-9);
        assert!((delta.zoom + 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_wrap_bearing() {
        assert!((wrap_bearing(190.0) + 170.0).abs() < 1e-9);
        assert!((wrap_bearing(-200.0) - 160.0).abs() < 1e-9);
        assert!((wrap_bearing(45.0) - 45.0).abs() < 1e-9);
    }
}
