//! Executes the effects the controller queues.
//!
//! Every effect ends in a [`Message`] posted back to the [`Inbox`], either on
//! the same frame or from a background task once its work completes.

use std::time::Duration;

use bevy::prelude::*;
use bevy::render::view::screenshot::{Screenshot, ScreenshotCaptured};
use bevy_egui::EguiContexts;
use geoplace::controller::{
    ClipboardOutcome, Effect, RequestToken, SaveOutcome, ScreenshotImage, Timer,
};
use geoplace::mesh::{ModelFile, prepare_model};
use geoplace::{Message, ProviderClient};
use web_time::Instant;

use crate::async_runtime::{TaskSpawner, spawn_compute};
use crate::controller::{AppController, Inbox, ViewerSet};

/// Model formats offered by the file picker.
const MODEL_EXTENSIONS: [&str; 3] = ["gltf", "glb", "obj"];

pub struct EffectsPlugin;

impl Plugin for EffectsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Providers>()
            .init_resource::<Timers>()
            .init_resource::<FrameRequest>()
            .add_systems(
                Update,
                (fire_timers, fire_animation_frame).in_set(ViewerSet::Input),
            )
            .add_systems(Update, run_effects.in_set(ViewerSet::Effects));
    }
}

/// Shared HTTP client for every provider request.
#[derive(Resource, Clone)]
pub struct Providers(pub ProviderClient);

impl Default for Providers {
    fn default() -> Self {
        #[cfg(not(target_family = "wasm"))]
        {
            let http = reqwest::Client::builder()
                .user_agent(concat!("geoplace/", env!("CARGO_PKG_VERSION")))
                .build();
            match http {
                Ok(http) => return Self(ProviderClient::with_http(http)),
                Err(e) => tracing::warn!("Falling back to default HTTP client: {e}"),
            }
        }
        Self(ProviderClient::new())
    }
}

/// One-shot timers waiting to fire.
#[derive(Resource, Default, Debug)]
pub struct Timers {
    pending: Vec<PendingTimer>,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    due: Instant,
    timer: Timer,
    token: RequestToken,
}

impl Timers {
    pub fn schedule(&mut self, now: Instant, timer: Timer, token: RequestToken, delay_ms: u64) {
        self.pending.push(PendingTimer {
            due: now + Duration::from_millis(delay_ms),
            timer,
            token,
        });
    }

    /// Remove and return every timer due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(Timer, RequestToken)> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = pending;
        due.sort_by_key(|p| p.due);
        due.into_iter().map(|p| (p.timer, p.token)).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

/// Set when the controller asked for an animation frame.
#[derive(Resource, Default)]
struct FrameRequest(bool);

#[allow(clippy::needless_pass_by_value)]
fn fire_timers(mut timers: ResMut<Timers>, inbox: Res<Inbox>) {
    for (timer, token) in timers.take_due(Instant::now()) {
        inbox.send(Message::TimerElapsed { timer, token });
    }
}

#[allow(clippy::needless_pass_by_value)]
fn fire_animation_frame(time: Res<Time>, mut request: ResMut<FrameRequest>, inbox: Res<Inbox>) {
    if std::mem::take(&mut request.0) {
        inbox.send(Message::AnimationFrame {
            timestamp: time.elapsed_secs_f64() * 1000.0,
        });
    }
}

#[allow(clippy::too_many_arguments, clippy::needless_pass_by_value)]
fn run_effects(
    mut commands: Commands,
    mut controller: ResMut<AppController>,
    inbox: Res<Inbox>,
    spawner: TaskSpawner,
    providers: Res<Providers>,
    mut timers: ResMut<Timers>,
    mut frame: ResMut<FrameRequest>,
    mut contexts: EguiContexts,
) {
    for effect in controller.0.drain_effects() {
        match effect {
            Effect::PickModelFile => pick_model_file(&spawner, inbox.sender()),
            Effect::DecodeModel {
                token,
                file,
                target_size,
            } => {
                let tx = inbox.sender();
                spawn_compute(async move {
                    let result = prepare_model(&file, target_size);
                    if let Err(e) = &result {
                        tracing::warn!(name = %file.name, "Model import failed: {e}");
                    }
                    let _ = tx.send(Message::ModelDecoded { token, result }).await;
                });
            }
            Effect::Geocode {
                token,
                provider,
                query,
            } => {
                let client = providers.0.clone();
                let tx = inbox.sender();
                spawner.spawn(async move {
                    let result = client.geocode(&provider, &query).await;
                    let _ = tx.send(Message::GeocodeCompleted { token, result }).await;
                });
            }
            Effect::LookupElevation {
                token,
                lat,
                lng,
                key,
            } => {
                let client = providers.0.clone();
                let tx = inbox.sender();
                spawner.spawn(async move {
                    let result = client.lookup_elevation(lat, lng, &key).await;
                    let _ = tx.send(Message::ElevationCompleted { token, result }).await;
                });
            }
            Effect::RequestAnimationFrame => frame.0 = true,
            Effect::Schedule {
                timer,
                token,
                delay_ms,
            } => timers.schedule(Instant::now(), timer, token, delay_ms),
            Effect::CaptureScreenshot => capture_screenshot(&mut commands, inbox.sender()),
            Effect::CopyImageToClipboard(image) => {
                let outcome = copy_to_clipboard(&mut contexts, &image);
                inbox.send(Message::ClipboardWritten(outcome));
            }
            Effect::SaveScreenshot { file_name, image } => {
                save_screenshot(&spawner, inbox.sender(), file_name, image);
            }
        }
    }
}

fn pick_model_file(spawner: &TaskSpawner, tx: async_channel::Sender<Message>) {
    spawner.spawn(async move {
        let Some(handle) = rfd::AsyncFileDialog::new()
            .set_title("Open model")
            .add_filter("3D model", &MODEL_EXTENSIONS)
            .pick_file()
            .await
        else {
            tracing::debug!("Model picker dismissed");
            return;
        };

        let file = ModelFile::new(handle.file_name(), handle.read().await);
        #[cfg(not(target_family = "wasm"))]
        let file = match handle.path().parent() {
            Some(dir) => file.with_base_dir(dir),
            None => file,
        };
        let _ = tx.send(Message::FileSelected(file)).await;
    });
}

/// Capture the primary window; the result arrives through an observer.
fn capture_screenshot(commands: &mut Commands, tx: async_channel::Sender<Message>) {
    commands
        .spawn(Screenshot::primary_window())
        .observe(move |captured: On<ScreenshotCaptured>| {
            let message = match screenshot_image(&captured.image) {
                Ok(image) => Message::ScreenshotCaptured(image),
                Err(e) => {
                    tracing::error!("Screenshot failed: {e}");
                    Message::ScreenshotFailed(e)
                }
            };
            if let Err(e) = tx.try_send(message) {
                tracing::warn!("Dropping screenshot: {e}");
            }
        });
}

/// Convert a captured frame into packed RGBA8.
fn screenshot_image(image: &Image) -> Result<ScreenshotImage, String> {
    let dynamic = image
        .clone()
        .try_into_dynamic()
        .map_err(|e| format!("Unsupported screenshot format: {e}"))?;
    let rgba = dynamic.to_rgba8();
    Ok(ScreenshotImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw().into(),
    })
}

fn copy_to_clipboard(contexts: &mut EguiContexts, image: &ScreenshotImage) -> ClipboardOutcome {
    if cfg!(target_family = "wasm") {
        return ClipboardOutcome::Unsupported;
    }
    let Ok(ctx) = contexts.ctx_mut() else {
        return ClipboardOutcome::Failed("No UI context".to_string());
    };
    let size = [image.width as usize, image.height as usize];
    ctx.copy_image(bevy_egui::egui::ColorImage::from_rgba_unmultiplied(
        size,
        &image.rgba,
    ));
    ClipboardOutcome::Copied
}

/// Encode packed RGBA8 as PNG.
pub fn encode_png(image: &ScreenshotImage) -> Result<Vec<u8>, String> {
    use image::ImageEncoder;
    use image::codecs::png::PngEncoder;

    let expected = image.width as usize * image.height as usize * 4;
    if image.rgba.len() != expected {
        return Err(format!(
            "Screenshot buffer holds {} bytes, expected {expected}",
            image.rgba.len()
        ));
    }

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(
            &image.rgba,
            image.width,
            image.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| e.to_string())?;
    Ok(bytes)
}

fn save_screenshot(
    spawner: &TaskSpawner,
    tx: async_channel::Sender<Message>,
    file_name: &'static str,
    image: ScreenshotImage,
) {
    spawner.spawn(async move {
        let outcome = match encode_png(&image) {
            Err(e) => SaveOutcome::Failed(e),
            Ok(bytes) => match rfd::AsyncFileDialog::new()
                .set_file_name(file_name)
                .add_filter("PNG image", &["png"])
                .save_file()
                .await
            {
                None => SaveOutcome::Cancelled,
                Some(handle) => match handle.write(&bytes).await {
                    Ok(()) => SaveOutcome::Saved,
                    Err(e) => SaveOutcome::Failed(e.to_string()),
                },
            },
        };
        let _ = tx.send(Message::ScreenshotSaved(outcome)).await;
    });
}
