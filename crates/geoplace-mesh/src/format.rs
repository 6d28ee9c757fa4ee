//! Model file formats and upload validation.

use std::fmt;
use std::path::PathBuf;

/// A supported model source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelFormat {
    /// glTF JSON, with embedded or sidecar buffers.
    Gltf,
    /// Binary glTF.
    Glb,
    /// Wavefront OBJ.
    Obj,
}

impl ModelFormat {
    pub const ALL: [Self; 3] = [Self::Gltf, Self::Glb, Self::Obj];

    pub fn extension(self) -> &'static str {
        match self {
            Self::Gltf => "gltf",
            Self::Glb => "glb",
            Self::Obj => "obj",
        }
    }

    /// Upper-case label used in status messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Gltf => "GLTF",
            Self::Glb => "GLB",
            Self::Obj => "OBJ",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Detect the model format from a file name, case-insensitively.
pub fn detect_model_format(name: &str) -> Option<ModelFormat> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ModelFormat::ALL
        .into_iter()
        .find(|format| format.extension() == ext)
}

/// Whether `name` carries one of the accepted model extensions.
pub fn is_valid_model_file(name: &str) -> bool {
    detect_model_format(name).is_some()
}

/// A model file selected by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Directory used to resolve sidecar buffers of `.gltf` files.
    pub base_dir: Option<PathBuf>,
}

impl ModelFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
            base_dir: None,
        }
    }

    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    pub fn format(&self) -> Option<ModelFormat> {
        detect_model_format(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_model_file() {
        let cases = [
            ("building.gltf", true),
            ("building.GLB", true),
            ("mesh.Obj", true),
            ("archive.tar.glb", true),
            ("model.fbx", false),
            ("model.glb.txt", false),
            ("glb", false),
            ("", false),
            ("noextension.", false),
        ];
        for (name, expected) in cases {
            assert_eq!(is_valid_model_file(name), expected, "{name}");
        }
    }

    #[test]
    fn test_detect_model_format() {
        assert_eq!(detect_model_format("a.GlTf"), Some(ModelFormat::Gltf));
        assert_eq!(detect_model_format("a.glb"), Some(ModelFormat::Glb));
        assert_eq!(detect_model_format("a.OBJ"), Some(ModelFormat::Obj));
        assert_eq!(detect_model_format("a.stl"), None);
    }

    #[test]
    fn test_format_labels() {
        assert_eq!(ModelFormat::Glb.to_string(), "GLB");
        assert_eq!(ModelFile::new("x.obj", vec![]).format(), Some(ModelFormat::Obj));
    }
}
