//! Capture, copy and download of the current view.

use crate::scene::SceneRenderer;

use super::Controller;
use super::message::{ClipboardOutcome, Effect, SaveOutcome, ScreenshotImage};

pub const SCREENSHOT_FILE_NAME: &str = "geoplace-screenshot.png";

#[derive(Debug, Clone, Default)]
pub struct ScreenshotState {
    last: Option<ScreenshotImage>,
    /// Message of the open modal; `None` when closed.
    modal: Option<String>,
    capturing: bool,
}

impl ScreenshotState {
    pub fn last(&self) -> Option<&ScreenshotImage> {
        self.last.as_ref()
    }

    pub fn modal_message(&self) -> Option<&str> {
        self.modal.as_deref()
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }
}

impl<R: SceneRenderer> Controller<R> {
    pub(super) fn capture_screenshot(&mut self) {
        if self.screenshot.capturing {
            return;
        }
        self.screenshot.capturing = true;
        self.effects.push(Effect::CaptureScreenshot);
    }

    pub(super) fn screenshot_captured(&mut self, image: ScreenshotImage) {
        self.screenshot.capturing = false;
        tracing::debug!(width = image.width, height = image.height, "Screenshot captured");
        self.screenshot.last = Some(image.clone());
        self.effects.push(Effect::CopyImageToClipboard(image));
    }

    pub(super) fn screenshot_failed(&mut self, error: &str) {
        self.screenshot.capturing = false;
        tracing::error!("Screenshot failed: {error}");
        self.set_status("Screenshot blocked (likely due to cross-origin tiles).");
    }

    pub(super) fn clipboard_written(&mut self, outcome: ClipboardOutcome) {
        let copied = outcome == ClipboardOutcome::Copied;
        match outcome {
            ClipboardOutcome::Copied => self.set_status("Screenshot copied to clipboard."),
            ClipboardOutcome::Failed(error) => {
                tracing::warn!("Clipboard write failed: {error}");
                self.set_status(
                    "Screenshot captured. Clipboard unavailable for images (browser policy).",
                );
            }
            ClipboardOutcome::Unsupported => {
                self.set_status("Screenshot captured. Clipboard unavailable.");
            }
        }

        self.screenshot.modal = Some(
            if copied {
                "Screenshot copied. What do you want to do next?"
            } else {
                "Screenshot captured. Clipboard unavailable. Choose next action."
            }
            .to_string(),
        );
    }

    pub(super) fn download_screenshot(&mut self) {
        let Some(image) = self.screenshot.last.clone() else {
            self.set_status("Capture a screenshot first.");
            return;
        };
        self.effects.push(Effect::SaveScreenshot {
            file_name: SCREENSHOT_FILE_NAME,
            image,
        });
    }

    pub(super) fn screenshot_saved(&mut self, outcome: SaveOutcome) {
        match outcome {
            SaveOutcome::Saved => self.set_status("Screenshot downloaded."),
            SaveOutcome::Cancelled => {}
            SaveOutcome::Failed(error) => {
                tracing::error!("Screenshot save failed: {error}");
                self.set_status(format!("Screenshot download failed ({error})."));
            }
        }
    }

    pub(super) fn close_screenshot_modal(&mut self) {
        self.screenshot.modal = None;
    }
}
