//! Bottom bar with the status line, coordinates and provider badge.

use bevy_egui::egui;
use geoplace::Message;

use super::{AppState, send};

pub(super) fn show(ctx: &egui::Context, state: &AppState, out: &mut Vec<Message>) {
    egui::TopBottomPanel::bottom("status-bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            let badge_color = if state.provider_ready() {
                egui::Color32::from_rgb(80, 180, 110)
            } else {
                egui::Color32::from_rgb(220, 90, 80)
            };
            let badge = ui
                .add(
                    egui::Button::new(
                        egui::RichText::new(state.provider_badge())
                            .color(badge_color)
                            .small()
                            .strong(),
                    )
                    .frame(false),
                )
                .on_hover_text(state.provider_tooltip());
            send(out, badge.clicked(), Message::ProviderStatusClicked);

            ui.separator();
            ui.label(state.status());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let labels = if state.labels_visible() {
                    "Hide labels"
                } else {
                    "Show labels"
                };
                send(out, ui.small_button(labels).clicked(), Message::ToggleLabels);

                if state.labels_visible() {
                    ui.monospace(state.coordinates_label());
                }
            });
        });
    });
}
