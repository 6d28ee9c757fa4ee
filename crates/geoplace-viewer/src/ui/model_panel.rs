//! Placement controls for the loaded model.

use bevy_egui::egui;
use geoplace::Message;
use geoplace::controller::TransformMode;
use geoplace::state::{
    ALTITUDE_RANGE, HEADING_RANGE, PITCH_RANGE, SCALE_RANGE, SCALE_STEP, VIEW_DISTANCE_RANGE,
};

use super::{AppState, send, value_slider};

pub(super) fn show(ctx: &egui::Context, state: &AppState, out: &mut Vec<Message>) {
    if !state.start_screen().is_ready() {
        return;
    }

    egui::Window::new("Model")
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            match state.model_label() {
                Some(label) => ui.label(format!("Loaded {label} model")),
                None => ui.weak("Open a .gltf, .glb or .obj file to place it."),
            };

            ui.add_enabled_ui(state.has_model(), |ui| {
                transform_controls(ui, state, out);
                ui.separator();
                position_controls(ui, state, out);
            });

            ui.separator();

            ui.horizontal(|ui| {
                ui.label("View distance");
                let zoom = state.view_state().zoom;
                if let Some(zoom) = value_slider(ui, zoom, VIEW_DISTANCE_RANGE, Some(0.1)) {
                    out.push(Message::ViewDistanceChanged(zoom));
                }
                ui.monospace(state.view_distance_label());
            });
        });
}

fn transform_controls(ui: &mut egui::Ui, state: &AppState, out: &mut Vec<Message>) {
    ui.horizontal(|ui| {
        for mode in TransformMode::ALL {
            let selected = state.transform_mode() == mode;
            let clicked = ui.selectable_label(selected, mode.label()).clicked();
            send(out, clicked && !selected, Message::SetTransformMode(mode));
        }
    });

    let model = state.model();
    egui::Grid::new("model-transform")
        .num_columns(3)
        .show(ui, |ui| {
            ui.label("Scale");
            if let Some(value) =
                value_slider(ui, state.scale_multiplier(), SCALE_RANGE, Some(SCALE_STEP))
            {
                out.push(Message::ScaleChanged(value));
            }
            ui.monospace(state.scale_label());
            ui.end_row();

            ui.label("Heading");
            if let Some(value) = value_slider(ui, model.transform.rotation, HEADING_RANGE, Some(1.0))
            {
                out.push(Message::RotationChanged(value));
            }
            ui.monospace(state.heading_label());
            ui.end_row();

            ui.label("Pitch");
            if let Some(value) = value_slider(ui, model.transform.pitch, PITCH_RANGE, Some(1.0)) {
                out.push(Message::PitchChanged(value));
            }
            ui.monospace(state.pitch_label());
            ui.end_row();

            ui.label("Altitude");
            if let Some(value) =
                value_slider(ui, model.position.altitude, ALTITUDE_RANGE, Some(1.0))
            {
                out.push(Message::AltitudeChanged(value));
            }
            ui.monospace(state.altitude_label());
            ui.end_row();
        });
}

fn position_controls(ui: &mut egui::Ui, state: &AppState, out: &mut Vec<Message>) {
    let inputs = state.position_inputs();

    let mut commit = false;
    ui.horizontal(|ui| {
        ui.label("Lat");
        let mut lat = inputs.lat.clone();
        let response = ui.add(egui::TextEdit::singleline(&mut lat).desired_width(90.0));
        if response.changed() {
            out.push(Message::LatitudeInputChanged(lat));
        }
        commit |= response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

        ui.label("Lng");
        let mut lng = inputs.lng.clone();
        let response = ui.add(egui::TextEdit::singleline(&mut lng).desired_width(90.0));
        if response.changed() {
            out.push(Message::LongitudeInputChanged(lng));
        }
        commit |= response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
    });
    send(out, commit, Message::CommitPositionInputs);

    ui.horizontal(|ui| {
        let center = ui.button("Center on camera").clicked();
        send(out, center, Message::CenterModelOnCamera);

        let can_snap = !state.is_snapping() && !state.is_placing();
        let snap = ui
            .add_enabled(can_snap, egui::Button::new("Drop to terrain"))
            .clicked();
        send(out, snap, Message::DropToTerrain);
        if state.is_snapping() {
            ui.spinner();
        }
    });
}
