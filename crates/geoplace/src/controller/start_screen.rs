//! The overlay shown while the basemap comes up.

use super::message::RequestToken;

/// Wait before offering to enter while tiles are still loading.
pub const FALLBACK_DELAY_MS: u64 = 5000;
/// Time the launch animation runs before the overlay disappears.
pub const LAUNCH_DELAY_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    Loading,
    Ready,
    Launching,
    Hidden,
}

#[derive(Debug, Clone)]
pub struct StartScreen {
    phase: StartPhase,
    message: String,
    button_label: &'static str,
    button_enabled: bool,
    pub(crate) fallback: Option<RequestToken>,
    pub(crate) launch: Option<RequestToken>,
}

impl Default for StartScreen {
    fn default() -> Self {
        Self {
            phase: StartPhase::Loading,
            message: String::new(),
            button_label: "Loading map...",
            button_enabled: false,
            fallback: None,
            launch: None,
        }
    }
}

impl StartScreen {
    pub fn phase(&self) -> StartPhase {
        self.phase
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn button_label(&self) -> &'static str {
        self.button_label
    }

    pub fn button_enabled(&self) -> bool {
        self.button_enabled
    }

    pub fn is_visible(&self) -> bool {
        self.phase != StartPhase::Hidden
    }

    /// Whether the user may start (or has started) the session.
    pub fn is_ready(&self) -> bool {
        self.phase != StartPhase::Loading
    }

    pub(crate) fn show_loading(&mut self, message: &str) {
        self.phase = StartPhase::Loading;
        self.button_label = "Loading map...";
        self.button_enabled = false;
        self.message = message.to_string();
        self.fallback = None;
    }

    /// Ready without a map: the key is missing.
    pub(crate) fn offer_without_map(&mut self, message: &str) {
        self.show_loading(message);
        self.phase = StartPhase::Ready;
        self.button_label = "Enter without map";
        self.button_enabled = true;
    }

    pub(crate) fn mark_ready(&mut self, message: &str) {
        if matches!(self.phase, StartPhase::Launching | StartPhase::Hidden) {
            return;
        }
        self.phase = StartPhase::Ready;
        self.button_label = "Start";
        self.button_enabled = true;
        self.message = format!("{message} Click Start to enter.");
        self.fallback = None;
    }

    pub(crate) fn fallback_elapsed(&mut self) {
        self.fallback = None;
        if self.is_ready() {
            return;
        }
        self.phase = StartPhase::Ready;
        self.button_label = "Enter anyway";
        self.button_enabled = true;
        self.message = "Still loading tiles. You can enter while data streams.".to_string();
    }

    pub(crate) fn tile_failed(&mut self) {
        if self.is_ready() || !self.is_visible() {
            return;
        }
        self.phase = StartPhase::Ready;
        self.button_label = "Enter anyway";
        self.button_enabled = true;
        self.message =
            "Tiles could not stream. Check the API quota, or continue to retry in-app.".to_string();
        self.fallback = None;
    }

    /// Mirror status text while the overlay is still waiting.
    pub(crate) fn status_changed(&mut self, status: &str) {
        if self.is_visible() && !self.is_ready() {
            self.message = status.to_string();
        }
    }

    /// Returns `true` when the launch timer must be scheduled.
    pub(crate) fn press(&mut self) -> bool {
        if self.phase != StartPhase::Ready || self.launch.is_some() {
            return false;
        }
        self.phase = StartPhase::Launching;
        self.button_label = "Starting...";
        self.button_enabled = false;
        self.message = "Launching experience...".to_string();
        true
    }

    pub(crate) fn launch_elapsed(&mut self) {
        self.launch = None;
        self.phase = StartPhase::Hidden;
    }
}
