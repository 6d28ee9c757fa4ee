//! Import, normalize and package user-supplied 3D models.
//!
//! This crate provides pure synchronous functions for turning a glTF, GLB or
//! OBJ upload into a self-contained scene package that a renderer can draw.
//! Nothing here touches threads or I/O beyond optional sidecar buffers; the
//! caller decides where the work runs.
//!
//! # Pipeline
//!
//! 1. [`import_model`] parses the upload into a [`ModelGroup`].
//! 2. [`normalize_model`] fits it to a target size, centred on its footprint
//!    and resting on `y = 0`.
//! 3. [`export_glb`] or [`export_gltf_embedded`] writes a [`ScenePackage`].
//!
//! [`prepare_model`] runs all three steps.

mod bounds;
mod error;
mod format;
mod gltf_import;
mod group;
mod obj;
mod package;

pub use bounds::Aabb;
pub use error::{MeshError, MeshResult};
pub use format::{ModelFile, ModelFormat, detect_model_format, is_valid_model_file};
pub use gltf_import::import_gltf;
pub use group::{DEFAULT_TARGET_SIZE, GroupTransform, MeshPart, ModelGroup, normalize_model};
pub use obj::import_obj;
pub use package::{
    PackageFormat, ScenePackage, decode_package, export_glb, export_gltf_embedded,
};

/// Import a model file, dispatching on its extension.
pub fn import_model(file: &ModelFile) -> MeshResult<ModelGroup> {
    let format = file.format().ok_or_else(|| MeshError::UnsupportedFormat {
        name: file.name.clone(),
    })?;

    match format {
        ModelFormat::Gltf | ModelFormat::Glb => import_gltf(&file.bytes, file.base_dir.as_deref()),
        ModelFormat::Obj => import_obj(&file.bytes),
    }
}

/// A normalized model ready to hand to a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedModel {
    pub format: ModelFormat,
    pub package: ScenePackage,
    /// Uniform scale that brings the packaged geometry to the target size.
    pub base_scale: f32,
    /// Bounds of the packaged geometry after `base_scale` is applied.
    pub bounds: Aabb,
    pub triangle_count: usize,
}

/// Import, normalize and export a model in one go.
///
/// GLB uploads are re-packaged as GLB; glTF and OBJ uploads become embedded
/// glTF JSON.
pub fn prepare_model(file: &ModelFile, target_size: f32) -> MeshResult<PreparedModel> {
    let format = file.format().ok_or_else(|| MeshError::UnsupportedFormat {
        name: file.name.clone(),
    })?;

    let mut model = import_model(file)?;
    let base_scale = normalize_model(&mut model, target_size);
    let package = match format {
        ModelFormat::Glb => export_glb(&model)?,
        ModelFormat::Gltf | ModelFormat::Obj => export_gltf_embedded(&model)?,
    };

    tracing::debug!(
        name = %file.name,
        %format,
        base_scale,
        bytes = package.len(),
        "Prepared model"
    );

    Ok(PreparedModel {
        format,
        package,
        base_scale,
        bounds: model.bounds(),
        triangle_count: model.triangle_count(),
    })
}
