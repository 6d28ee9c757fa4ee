//! Keyboard and window-focus forwarding.

use bevy::ecs::message::MessageReader;
use bevy::input::ButtonState;
use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::prelude::*;
use bevy::window::WindowFocused;
use bevy_egui::EguiContexts;
use geoplace::Message;

use crate::controller::{Inbox, ViewerSet};

pub struct KeyboardInputPlugin;

impl Plugin for KeyboardInputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (forward_keys, forward_focus).in_set(ViewerSet::Input),
        );
    }
}

/// Logical key name in the `KeyboardEvent.key` style, for keys with one.
pub fn key_name(key: &Key) -> Option<&str> {
    match key {
        Key::ArrowUp => Some("ArrowUp"),
        Key::ArrowDown => Some("ArrowDown"),
        Key::ArrowLeft => Some("ArrowLeft"),
        Key::ArrowRight => Some("ArrowRight"),
        Key::Character(text) => Some(text.as_str()),
        _ => None,
    }
}

#[allow(clippy::needless_pass_by_value)]
fn forward_keys(
    mut keys: MessageReader<KeyboardInput>,
    mut contexts: EguiContexts,
    inbox: Res<Inbox>,
) {
    let text_input_focused = contexts
        .ctx_mut()
        .ok()
        .is_some_and(|ctx| ctx.wants_keyboard_input());

    for event in keys.read() {
        let Some(key) = key_name(&event.logical_key) else {
            continue;
        };
        match event.state {
            ButtonState::Pressed if !event.repeat => inbox.send(Message::KeyDown {
                key: key.to_string(),
                text_input_focused,
            }),
            ButtonState::Pressed => {}
            ButtonState::Released => inbox.send(Message::KeyUp {
                key: key.to_string(),
            }),
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn forward_focus(mut focus: MessageReader<WindowFocused>, inbox: Res<Inbox>) {
    if focus.read().any(|event| !event.focused) {
        inbox.send(Message::WindowBlur);
    }
}
