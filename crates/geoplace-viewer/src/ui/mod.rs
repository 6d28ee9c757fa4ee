//! The egui overlay: toolbar, model panel, status bar and modal overlays.
//!
//! Widgets never mutate the controller. Each panel reads controller state and
//! collects the [`Message`]s its interactions produce; they are posted to the
//! [`Inbox`] once the pass finishes.

mod model_panel;
mod overlays;
mod status_bar;
mod toolbar;

use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass};
use geoplace::{Controller, Message};

use crate::controller::{AppController, Inbox};
use crate::renderer::BevyRenderer;

/// Controller as seen by the UI.
type AppState = Controller<BevyRenderer>;

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

#[allow(clippy::needless_pass_by_value)]
fn ui_system(
    mut contexts: EguiContexts,
    controller: Res<AppController>,
    inbox: Res<Inbox>,
) -> Result {
    let ctx = contexts.ctx_mut()?;
    let state = &controller.0;
    let mut out = Vec::new();

    toolbar::show(ctx, state, &mut out);
    status_bar::show(ctx, state, &mut out);
    model_panel::show(ctx, state, &mut out);
    overlays::screenshot_modal(ctx, state, &mut out);
    overlays::start_screen(ctx, state, &mut out);

    for message in out {
        inbox.send(message);
    }
    Ok(())
}

/// A slider bound to a value owned by the controller.
///
/// Returns the new value when the user moved it.
fn value_slider(
    ui: &mut bevy_egui::egui::Ui,
    value: f64,
    range: geoplace::state::Range,
    step: Option<f64>,
) -> Option<f64> {
    let mut edited = value;
    let mut slider =
        bevy_egui::egui::Slider::new(&mut edited, range.min..=range.max).show_value(false);
    if let Some(step) = step {
        slider = slider.step_by(step);
    }
    ui.add(slider).changed().then_some(edited)
}

fn send(out: &mut Vec<Message>, clicked: bool, message: Message) {
    if clicked {
        out.push(message);
    }
}
