//! Inputs to and outputs from the [`Controller`](super::Controller).

use std::sync::Arc;

use geoplace_mesh::{MeshError, ModelFile, PreparedModel};

use crate::error::Error;
use crate::model::ElevationResult;
use crate::providers::geocode::{GeocodeProvider, SearchSuggestion};
use crate::scene::{CameraMode, RendererEvent};

/// Stamps an async request so late responses can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

/// Issues strictly increasing [`RequestToken`]s.
#[derive(Debug, Default)]
pub struct TokenSource {
    next: u64,
}

impl TokenSource {
    pub fn issue(&mut self) -> RequestToken {
        self.next += 1;
        RequestToken(self.next)
    }
}

/// One-shot timers the controller schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    SearchDebounce,
    SearchBlur,
    StartFallback,
    StartLaunch,
}

/// How the placed model is being manipulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl TransformMode {
    pub const ALL: [Self; 3] = [Self::Translate, Self::Rotate, Self::Scale];

    pub fn label(self) -> &'static str {
        match self {
            Self::Translate => "Move",
            Self::Rotate => "Rotate",
            Self::Scale => "Scale",
        }
    }

    pub fn status(self) -> &'static str {
        match self {
            Self::Translate => "Move mode: click on the map to reposition the model.",
            Self::Rotate => "Rotate mode: use the heading and pitch sliders.",
            Self::Scale => "Scale mode: drag the scale slider to resize the model.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// A captured frame, tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardOutcome {
    Copied,
    /// The platform refused the image.
    Failed(String),
    /// No image clipboard on this platform.
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum Message {
    /// Start the scene: create layers or report the missing key.
    Boot,
    /// Ask for a model file.
    OpenModelPicker,
    FileSelected(ModelFile),
    ModelDecoded {
        token: RequestToken,
        result: Result<PreparedModel, MeshError>,
    },
    /// Ground position under the cursor, if any.
    PointerMoved { coordinate: Option<(f64, f64)> },
    PointerPressed { button: PointerButton, ctrl: bool },
    /// Pointer released, cancelled or left the map.
    PointerReleased,
    Renderer(RendererEvent),

    ScaleChanged(f64),
    RotationChanged(f64),
    PitchChanged(f64),
    AltitudeChanged(f64),
    ViewDistanceChanged(f64),
    LatitudeInputChanged(String),
    LongitudeInputChanged(String),
    CommitPositionInputs,
    CenterModelOnCamera,
    SetTransformMode(TransformMode),
    SetCameraMode(CameraMode),
    DropToTerrain,
    ElevationCompleted {
        token: RequestToken,
        result: ElevationResult,
    },

    /// A logical key name such as `"ArrowUp"` or `"w"`.
    KeyDown { key: String, text_input_focused: bool },
    KeyUp { key: String },
    WindowBlur,
    /// Timestamp in milliseconds.
    AnimationFrame { timestamp: f64 },

    SearchTextChanged(String),
    SearchSubmitted,
    SearchFocusLost,
    GeocodeCompleted {
        token: RequestToken,
        result: Result<Vec<SearchSuggestion>, Error>,
    },
    SearchResultChosen(usize),

    CaptureScreenshot,
    ScreenshotCaptured(ScreenshotImage),
    ScreenshotFailed(String),
    ClipboardWritten(ClipboardOutcome),
    DownloadScreenshot,
    ScreenshotSaved(SaveOutcome),
    CloseScreenshotModal,

    ToggleLabels,
    ProviderStatusClicked,
    StartPressed,
    TimerElapsed { timer: Timer, token: RequestToken },
    Shutdown,
}

/// Work the controller asks its host to perform.
#[derive(Debug, Clone)]
pub enum Effect {
    PickModelFile,
    /// Import, normalize and package a model, off the UI thread.
    DecodeModel {
        token: RequestToken,
        file: ModelFile,
        target_size: f32,
    },
    Geocode {
        token: RequestToken,
        provider: GeocodeProvider,
        query: String,
    },
    LookupElevation {
        token: RequestToken,
        lat: f64,
        lng: f64,
        key: String,
    },
    RequestAnimationFrame,
    Schedule {
        timer: Timer,
        token: RequestToken,
        delay_ms: u64,
    },
    CaptureScreenshot,
    CopyImageToClipboard(ScreenshotImage),
    SaveScreenshot {
        file_name: &'static str,
        image: ScreenshotImage,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_increase() {
        let mut tokens = TokenSource::default();
        let a = tokens.issue();
        let b = tokens.issue();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_transform_mode_status() {
        assert_eq!(
            TransformMode::Translate.status(),
            "Move mode: click on the map to reposition the model."
        );
        assert_eq!(TransformMode::Scale.label(), "Scale");
    }
}
