//! Hosting the application [`Controller`] inside Bevy.
//!
//! Systems and background tasks never touch the controller directly. They post
//! [`Message`]s to the [`Inbox`], which is drained once per frame between input
//! handling and effect execution.

use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use geoplace::{Controller, Message};

use crate::launch_params::LaunchParams;
use crate::renderer::BevyRenderer;

/// Frame phases, run in order within `Update`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewerSet {
    /// Turn window input into messages.
    Input,
    /// Feed queued messages to the controller.
    Controller,
    /// Execute the effects the controller queued.
    Effects,
    /// Bring entities in line with the renderer state.
    Sync,
}

/// The application controller, owning the scene coordinator and renderer state.
#[derive(Resource)]
pub struct AppController(pub Controller<BevyRenderer>);

impl AppController {
    pub fn renderer(&self) -> &BevyRenderer {
        self.0.scene().renderer()
    }
}

/// Message queue shared by systems and async tasks.
#[derive(Resource, Clone)]
pub struct Inbox {
    tx: async_channel::Sender<Message>,
    rx: async_channel::Receiver<Message>,
}

impl Default for Inbox {
    fn default() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self { tx, rx }
    }
}

impl Inbox {
    pub fn send(&self, message: Message) {
        if let Err(e) = self.tx.try_send(message) {
            tracing::warn!("Dropping message: {e}");
        }
    }

    /// A sender for background tasks.
    pub fn sender(&self) -> async_channel::Sender<Message> {
        self.tx.clone()
    }
}

pub struct ControllerPlugin;

impl Plugin for ControllerPlugin {
    fn build(&self, app: &mut App) {
        let params = app
            .world()
            .get_resource::<LaunchParams>()
            .cloned()
            .unwrap_or_default();

        let view = geoplace::state::create_initial_view_state(params.zoom);
        let renderer = BevyRenderer::new(view, params.camera_mode.controller_config());
        let controller = Controller::new(renderer, params.config, view, params.camera_mode);

        app.configure_sets(
            Update,
            (
                ViewerSet::Input,
                ViewerSet::Controller,
                ViewerSet::Effects,
                ViewerSet::Sync,
            )
                .chain(),
        )
        .insert_resource(AppController(controller))
        .init_resource::<Inbox>()
        .add_systems(Startup, boot)
        .add_systems(Update, process_inbox.in_set(ViewerSet::Controller))
        .add_systems(Last, shutdown_on_exit);
    }
}

fn boot(inbox: Res<Inbox>) {
    inbox.send(Message::Boot);
}

#[allow(clippy::needless_pass_by_value)]
fn process_inbox(mut controller: ResMut<AppController>, inbox: Res<Inbox>) {
    while let Ok(message) = inbox.rx.try_recv() {
        controller.0.update(message);
    }
}

fn shutdown_on_exit(mut exits: MessageReader<AppExit>, mut controller: ResMut<AppController>) {
    if exits.read().next().is_some() {
        tracing::info!("Shutting down scene");
        controller.0.update(Message::Shutdown);
    }
}
