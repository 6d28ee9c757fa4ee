//! Composite a user model onto Google's photorealistic 3D tiles.
//!
//! This crate holds everything that does not depend on a particular renderer:
//!
//! - [`state`]: camera view state and placed-model state
//! - [`model`]: placement helpers, display formatting, elevation parsing
//! - [`geodesy`]: WGS84 conversions and local tangent frames
//! - [`providers`]: HTTP clients for tiles, elevation and geocoding
//! - [`scene`]: the [`SceneCoordinator`] and its [`SceneRenderer`] port
//! - [`controller`]: the message/effect [`Controller`] driving the UI
//! - [`pan`]: keyboard panning
//!
//! Mesh import and packaging live in `geoplace-mesh`.

pub mod config;
pub mod controller;
pub mod error;
pub mod geodesy;
pub mod model;
pub mod pan;
pub mod providers;
pub mod scene;
pub mod state;

pub use config::Config;
pub use controller::{Controller, Effect, Message, RequestToken};
pub use error::{Error, Result};
pub use geodesy::{EnuFrame, LatLngAlt};
pub use providers::ProviderClient;
pub use scene::{
    CameraMode, RendererEvent, SceneCoordinator, SceneEvent, SceneHandle, SceneRenderer,
};
pub use state::{CameraViewState, ModelState, PartialViewState};

pub use geoplace_mesh as mesh;
