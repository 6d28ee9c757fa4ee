//! Full-window overlays: the start screen and the screenshot modal.

use bevy_egui::egui;
use geoplace::Message;
use geoplace::controller::StartPhase;

use super::{AppState, send};

pub(super) fn start_screen(ctx: &egui::Context, state: &AppState, out: &mut Vec<Message>) {
    let start = state.start_screen();
    if !start.is_visible() {
        return;
    }

    // Fade out while the launch animation runs.
    let opacity = if start.phase() == StartPhase::Launching {
        0.5
    } else {
        0.92
    };
    let screen = ctx.screen_rect();

    egui::Area::new(egui::Id::new("start-screen"))
        .order(egui::Order::Foreground)
        .fixed_pos(screen.min)
        .show(ctx, |ui| {
            ui.painter().rect_filled(
                screen,
                0.0,
                egui::Color32::from_black_alpha((opacity * 255.0) as u8),
            );
            ui.scope_builder(egui::UiBuilder::new().max_rect(screen), |ui| {
                ui.vertical_centered(|ui| {
                    ui.add_space(screen.height() * 0.3);
                    ui.heading("geoplace");
                    ui.label("Place a model anywhere on photorealistic 3D tiles.");
                    ui.add_space(16.0);
                    if !start.message().is_empty() {
                        ui.label(start.message());
                        ui.add_space(8.0);
                    }
                    let button = ui.add_enabled(
                        start.button_enabled(),
                        egui::Button::new(start.button_label()).min_size(egui::vec2(160.0, 32.0)),
                    );
                    send(out, button.clicked(), Message::StartPressed);
                    if start.phase() == StartPhase::Loading {
                        ui.add_space(8.0);
                        ui.spinner();
                    }
                });
            });
        });
}

pub(super) fn screenshot_modal(ctx: &egui::Context, state: &AppState, out: &mut Vec<Message>) {
    let screenshot = state.screenshot();
    let Some(message) = screenshot.modal_message() else {
        return;
    };

    egui::Window::new("Screenshot")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(message);
            if let Some(image) = screenshot.last() {
                ui.weak(format!("{} × {} px", image.width, image.height));
            }
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let download = ui
                    .add_enabled(screenshot.last().is_some(), egui::Button::new("Download"))
                    .clicked();
                send(out, download, Message::DownloadScreenshot);
                send(out, ui.button("Close").clicked(), Message::CloseScreenshotModal);
            });
        });
}
