//! Pointer tracking, ground unprojection and model hit-testing.
//!
//! Turns raw mouse input over the map into controller messages: cursor
//! coordinates, presses, clicks and drags of the placed model. Pointer input
//! that egui claims never reaches the map.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;
use geoplace::controller::{PointerButton, TransformMode};
use geoplace::scene::{DragPhase, MODEL_LAYER_ID, RendererEvent};
use geoplace::Message;

use crate::camera::OrbitCamera;
use crate::controller::{AppController, Inbox, ViewerSet};
use crate::floating_origin::FloatingOrigin;

/// Movement in logical pixels before a press stops counting as a click.
pub const CLICK_TOLERANCE: f32 = 4.0;

pub struct PickingPlugin;

impl Plugin for PickingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Pointer>()
            .add_systems(Update, track_pointer.in_set(ViewerSet::Input));
    }
}

/// Bounding sphere used to hit-test an entity, in its local space.
#[derive(Component, Clone, Copy, Debug)]
pub struct PickSphere {
    pub center: Vec3,
    pub radius: f32,
}

/// A mouse button held down over the map.
#[derive(Clone, Copy, Debug)]
pub struct Press {
    pub button: MouseButton,
    pub origin: Vec2,
    pub moved: bool,
    /// The press grabbed the model, so the camera must stay put.
    pub on_model: bool,
    pub dragging_model: bool,
}

#[derive(Resource, Default, Debug)]
pub struct Pointer {
    /// Cursor over the map, in logical window pixels.
    pub cursor: Option<Vec2>,
    pub previous: Option<Vec2>,
    pub press: Option<Press>,
}

impl Pointer {
    /// Cursor movement since the previous frame.
    pub fn delta(&self) -> Option<Vec2> {
        Some(self.cursor? - self.previous?)
    }
}

/// World-space ray under a window position.
pub fn cursor_ray(camera: &Camera, transform: &GlobalTransform, cursor: Vec2) -> Option<Ray3d> {
    camera.viewport_to_world(transform, cursor).ok()
}

/// Intersection of a ray with the `y = 0` ground plane, in front of the ray.
pub fn ground_point(ray: Ray3d) -> Option<Vec3> {
    let distance = ray.intersect_plane(Vec3::ZERO, InfinitePlane3d::new(Vec3::Y))?;
    Some(ray.get_point(distance))
}

/// Whether a ray passes through a sphere in front of its origin.
pub fn ray_hits_sphere(ray: Ray3d, center: Vec3, radius: f32) -> bool {
    let to_center = center - ray.origin;
    let along = to_center.dot(*ray.direction);
    if along < 0.0 {
        return to_center.length_squared() <= radius * radius;
    }
    to_center.length_squared() - along * along <= radius * radius
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

#[allow(clippy::too_many_arguments, clippy::needless_pass_by_value)]
pub(crate) fn track_pointer(
    window: Single<&Window, With<PrimaryWindow>>,
    mouse: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mut contexts: EguiContexts,
    camera: Single<(&Camera, &GlobalTransform), With<OrbitCamera>>,
    models: Query<(&GlobalTransform, &PickSphere)>,
    origin: Res<FloatingOrigin>,
    controller: Res<AppController>,
    inbox: Res<Inbox>,
    mut pointer: ResMut<Pointer>,
) {
    let (camera, camera_transform) = *camera;
    let over_ui = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.is_pointer_over_area() || ctx.is_using_pointer());

    // A press that started on the map keeps tracking over panels.
    let cursor = window
        .cursor_position()
        .filter(|_| !over_ui || pointer.press.is_some());

    pointer.previous = pointer.cursor;
    pointer.cursor = cursor;

    let coordinate_at = |position: Vec2| {
        let ray = cursor_ray(camera, camera_transform, position)?;
        let ground = ground_point(ray)?;
        let geo = origin.to_geographic(ground)?;
        Some((geo.lat, geo.lng))
    };
    let coordinate = cursor.and_then(coordinate_at);

    if cursor.is_some() && cursor != pointer.previous {
        inbox.send(Message::PointerMoved { coordinate });
    }

    let model_draggable = controller.0.has_model()
        && controller.0.transform_mode() == TransformMode::Translate
        && !controller.0.is_placing()
        && controller
            .renderer()
            .layers()
            .model
            .as_ref()
            .is_some_and(|layer| layer.pickable);

    if pointer.press.is_none()
        && let Some(position) = cursor
    {
        for button in [MouseButton::Left, MouseButton::Right, MouseButton::Middle] {
            if !mouse.just_pressed(button) {
                continue;
            }
            let Some(mapped) = pointer_button(button) else {
                continue;
            };
            let ctrl = keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]);
            inbox.send(Message::PointerPressed {
                button: mapped,
                ctrl,
            });

            let on_model = button == MouseButton::Left
                && !ctrl
                && model_draggable
                && cursor_ray(camera, camera_transform, position).is_some_and(|ray| {
                    models.iter().any(|(transform, sphere)| {
                        let center = transform.transform_point(sphere.center);
                        let scale = transform.compute_transform().scale.max_element();
                        ray_hits_sphere(ray, center, sphere.radius * scale)
                    })
                });

            pointer.press = Some(Press {
                button,
                origin: position,
                moved: false,
                on_model,
                dragging_model: false,
            });
            break;
        }
        return;
    }

    let Some(mut press) = pointer.press else {
        return;
    };

    if let Some(position) = cursor
        && position.distance(press.origin) > CLICK_TOLERANCE
    {
        press.moved = true;
    }

    let released = mouse.just_released(press.button) || !mouse.pressed(press.button);
    let left_map = window.cursor_position().is_none();

    if press.on_model && press.moved && !released && !left_map {
        let phase = if press.dragging_model {
            DragPhase::Move
        } else {
            DragPhase::Start
        };
        if cursor != pointer.previous || phase == DragPhase::Start {
            inbox.send(Message::Renderer(RendererEvent::Drag {
                phase,
                coordinate,
                layer_id: Some(MODEL_LAYER_ID.to_string()),
            }));
        }
        press.dragging_model = true;
    }

    if released || left_map {
        if press.dragging_model {
            inbox.send(Message::Renderer(RendererEvent::Drag {
                phase: DragPhase::End,
                coordinate,
                layer_id: Some(MODEL_LAYER_ID.to_string()),
            }));
        }
        if released && !press.moved && press.button == MouseButton::Left {
            inbox.send(Message::Renderer(RendererEvent::Click { coordinate }));
        }
        inbox.send(Message::PointerReleased);
        pointer.press = None;
        return;
    }

    pointer.press = Some(press);
}
