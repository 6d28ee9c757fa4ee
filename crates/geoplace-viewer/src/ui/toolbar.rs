//! Top bar: location search, model picker, camera mode and screenshot.

use bevy_egui::egui;
use geoplace::Message;
use geoplace::controller::SearchPanel;
use geoplace::scene::CameraMode;

use super::{AppState, send};

const SEARCH_WIDTH: f32 = 280.0;

pub(super) fn show(ctx: &egui::Context, state: &AppState, out: &mut Vec<Message>) {
    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            search_box(ui, state, out);

            ui.separator();

            let open = ui.add_enabled(
                !state.is_loading_model(),
                egui::Button::new("Open model..."),
            );
            send(out, open.clicked(), Message::OpenModelPicker);
            if state.is_loading_model() {
                ui.spinner();
            }

            ui.separator();

            ui.label("Camera:");
            for mode in [CameraMode::Orbit, CameraMode::Free] {
                let selected = state.camera_mode() == mode;
                let clicked = ui.selectable_label(selected, mode.label()).clicked();
                send(out, clicked && !selected, Message::SetCameraMode(mode));
            }

            ui.separator();

            let capture = ui.add_enabled(
                !state.screenshot().is_capturing(),
                egui::Button::new("Screenshot"),
            );
            send(out, capture.clicked(), Message::CaptureScreenshot);
        });
    });
}

fn search_box(ui: &mut egui::Ui, state: &AppState, out: &mut Vec<Message>) {
    let search = state.search();
    let mut query = search.query.clone();
    let response = ui.add(
        egui::TextEdit::singleline(&mut query)
            .hint_text("Search a place or lat,lng")
            .desired_width(SEARCH_WIDTH),
    );

    if response.changed() {
        out.push(Message::SearchTextChanged(query));
    }
    if response.lost_focus() {
        if ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            out.push(Message::SearchSubmitted);
        } else {
            out.push(Message::SearchFocusLost);
        }
    }

    let anchor = response.rect.left_bottom();
    let popup = |ui: &mut egui::Ui, add: &mut dyn FnMut(&mut egui::Ui)| {
        egui::Area::new(egui::Id::new("search-results"))
            .order(egui::Order::Foreground)
            .fixed_pos(anchor)
            .show(ui.ctx(), |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_width(SEARCH_WIDTH);
                    add(ui);
                });
            });
    };

    match &search.panel {
        SearchPanel::Hidden => {}
        SearchPanel::Message(message) => popup(ui, &mut |ui| {
            ui.weak(message);
        }),
        SearchPanel::Results(results) => popup(ui, &mut |ui| {
            for (index, result) in results.iter().enumerate() {
                let chosen = ui
                    .selectable_label(false, &result.label)
                    .on_hover_text(&result.detail)
                    .clicked();
                send(out, chosen, Message::SearchResultChosen(index));
            }
        }),
    }
}
