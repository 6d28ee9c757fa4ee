//! Error types for model import and export.

use std::fmt;

/// Errors that can occur while importing, exporting or decoding models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// The file name does not carry a supported extension.
    UnsupportedFormat { name: String },
    /// The glTF/GLB document could not be parsed or its buffers resolved.
    Gltf { detail: String },
    /// A line of an OBJ file could not be parsed.
    Obj { line: usize, detail: String },
    /// The model contains no triangles.
    Empty,
    /// Serializing the scene package failed.
    Export { detail: String },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFormat { name } => {
                write!(f, "unsupported model file: {name}")
            }
            Self::Gltf { detail } => write!(f, "invalid glTF: {detail}"),
            Self::Obj { line, detail } => write!(f, "invalid OBJ at line {line}: {detail}"),
            Self::Empty => write!(f, "model contains no triangles"),
            Self::Export { detail } => write!(f, "scene export failed: {detail}"),
        }
    }
}

impl std::error::Error for MeshError {}

impl From<gltf::Error> for MeshError {
    fn from(e: gltf::Error) -> Self {
        Self::Gltf {
            detail: e.to_string(),
        }
    }
}

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
